//! Rendering of command results and failures.

use chrono::DateTime;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Value, json};

use milestone_core::CoreError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Text,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// JSON body for a failed command: `{error, errors?}`.
pub fn error_body(err: &anyhow::Error) -> Value {
    let violations = err
        .downcast_ref::<CoreError>()
        .map(CoreError::violations)
        .unwrap_or_default();
    if violations.is_empty() {
        json!({ "error": format!("{err:#}") })
    } else {
        json!({ "error": "Validation failed", "errors": violations })
    }
}

/// JSON failures go to stdout so callers parse one stream; text goes to stderr.
pub fn print_error(format: OutputFormat, err: &anyhow::Error) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(&error_body(err)) {
            Ok(body) => println!("{body}"),
            Err(_) => eprintln!("Error: {err:#}"),
        },
        OutputFormat::Text => {
            let violations = err
                .downcast_ref::<CoreError>()
                .map(CoreError::violations)
                .unwrap_or_default();
            if violations.is_empty() {
                eprintln!("Error: {err:#}");
            } else {
                eprintln!("Validation errors:");
                for violation in violations {
                    eprintln!("  - {violation}");
                }
            }
        }
    }
}

pub fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

pub fn check_mark(ok: bool) -> &'static str {
    if ok { "✓" } else { "✗" }
}

#[cfg(test)]
mod tests {
    use milestone_core::CoreError;
    use serde_json::json;

    use super::{error_body, format_timestamp};

    #[test]
    fn validation_failures_list_every_violation() {
        let err = anyhow::Error::new(CoreError::ValidationFailed {
            errors: vec!["first".to_string(), "second".to_string()],
        });
        assert_eq!(
            error_body(&err),
            json!({ "error": "Validation failed", "errors": ["first", "second"] })
        );
    }

    #[test]
    fn other_failures_carry_the_message_only() {
        let err = anyhow::Error::new(CoreError::NotFound {
            milestone_id: "m-9".to_string(),
        });
        let body = error_body(&err);
        assert!(body.get("errors").is_none());
        assert_eq!(body["error"], "Milestone m-9 not found in contract allocations");
    }

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_timestamp(1_735_689_600), "2025-01-01 00:00:00 UTC");
    }
}
