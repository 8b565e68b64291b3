//! Shared infrastructure utilities.
//!
//! Cross-cutting helpers that the core needs but that don't belong in the
//! domain-pure `milestone-types` crate:
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename)
//! - **`key`**: Path-safe storage keys for addresses and milestone ids

pub mod atomic_write;
pub mod key;

pub use atomic_write::{recover_bak_file, write_json_atomic};
pub use key::storage_key;
