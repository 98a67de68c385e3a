//! Ledger key layout for device and assignment records.
//!
//! Devices and assignments are both keyed by the device identifier. Under
//! [`KeyLayout::Namespaced`] each entity gets its own prefix so the two
//! records for one device never overwrite each other. [`KeyLayout::Shared`]
//! stores both under the raw identifier, matching ledgers written before the
//! prefixes existed.

use serde::{Deserialize, Serialize};

const DEVICE_PREFIX: &str = "device:";
const ASSIGNMENT_PREFIX: &str = "assignment:";

/// How entity identifiers map to world-state keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLayout {
    /// `device:{id}` and `assignment:{id}`.
    #[default]
    Namespaced,
    /// Raw identifier for both entities.
    Shared,
}

impl KeyLayout {
    /// World-state key of a device.
    #[must_use]
    pub fn device_key(self, device_id: &str) -> String {
        self.key(DEVICE_PREFIX, device_id)
    }

    /// World-state key of a device's assignment.
    #[must_use]
    pub fn assignment_key(self, device_id: &str) -> String {
        self.key(ASSIGNMENT_PREFIX, device_id)
    }

    /// Translates a device-id range into a world-state key range.
    ///
    /// Empty bounds stay unbounded in the sense of the device namespace: an
    /// empty `start` begins at the first device key and an empty `end` stops
    /// after the last one, so other entities are never scanned.
    #[must_use]
    pub fn device_range(self, start: &str, end: &str) -> (String, String) {
        match self {
            Self::Shared => (start.to_owned(), end.to_owned()),
            Self::Namespaced => {
                let lower = format!("{DEVICE_PREFIX}{start}");
                let upper = if end.is_empty() {
                    prefix_upper_bound(DEVICE_PREFIX)
                } else {
                    format!("{DEVICE_PREFIX}{end}")
                };
                (lower, upper)
            },
        }
    }

    fn key(self, prefix: &str, id: &str) -> String {
        match self {
            Self::Namespaced => format!("{prefix}{id}"),
            Self::Shared => id.to_owned(),
        }
    }
}

/// Smallest string greater than every string starting with `prefix`.
///
/// Prefixes here end in `:`, so bumping the last character is enough.
fn prefix_upper_bound(prefix: &str) -> String {
    let mut bound = prefix.to_owned();
    if let Some(last) = bound.pop() {
        let next = char::from_u32(u32::from(last) + 1).unwrap_or(char::MAX);
        bound.push(next);
    }
    bound
}
