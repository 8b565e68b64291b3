//! Storage key encoding.
//!
//! Contract addresses and milestone ids become file names under the data
//! directory. Bech32 addresses and typical milestone ids pass through
//! unchanged. Anything that could escape the directory or is rejected by
//! common filesystems is percent-encoded, and `%` itself is always encoded,
//! so distinct inputs never share a key.

/// Characters rejected in file names on at least one supported platform.
const PATH_UNSAFE: &[char] = &['%', '/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Key for the empty string. Never produced for other input, since a
/// literal `%` always encodes as `%25`.
const EMPTY_KEY: &str = "%";

/// Encode `raw` as a single path component.
#[must_use]
pub fn storage_key(raw: &str) -> String {
    if raw.is_empty() {
        return EMPTY_KEY.to_string();
    }
    // `.` and `..` would name a directory.
    let dots_only = raw.chars().all(|c| c == '.');

    let mut key = String::with_capacity(raw.len());
    for c in raw.chars() {
        if PATH_UNSAFE.contains(&c) || c.is_control() || (dots_only && c == '.') {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                key.push_str(&format!("%{byte:02X}"));
            }
        } else {
            key.push(c);
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::storage_key;

    #[test]
    fn bech32_addresses_and_milestone_ids_are_unchanged() {
        assert_eq!(storage_key("addr_test1qxyz"), "addr_test1qxyz");
        assert_eq!(storage_key("milestone-001"), "milestone-001");
        assert_eq!(storage_key("addr_test1q..."), "addr_test1q...");
        assert_eq!(storage_key("phase_1"), "phase_1");
    }

    #[test]
    fn path_unsafe_characters_are_percent_encoded() {
        assert_eq!(storage_key("../etc/passwd"), "..%2Fetc%2Fpasswd");
        assert_eq!(storage_key("a:b*c?d"), "a%3Ab%2Ac%3Fd");
        assert_eq!(storage_key("tab\there"), "tab%09here");
        assert_eq!(storage_key("50%"), "50%25");
    }

    #[test]
    fn empty_and_dot_only_keys_cannot_name_a_directory() {
        assert_eq!(storage_key(""), "%");
        assert_eq!(storage_key("."), "%2E");
        assert_eq!(storage_key(".."), "%2E%2E");
    }

    #[test]
    fn lookalike_inputs_get_distinct_keys() {
        let inputs = [
            "phase/1", "phase_1", "phase%2F1", "phase:1", "..", "___", "%2E%2E", "", "%", "a\\b",
            "a/b", "a_b",
        ];
        let keys: HashSet<String> = inputs.iter().map(|raw| storage_key(raw)).collect();
        assert_eq!(keys.len(), inputs.len());
    }
}
