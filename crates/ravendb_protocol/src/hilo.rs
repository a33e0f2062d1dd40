//! HiLo identifier range allocation.

use serde::{Deserialize, Serialize};

/// Body of a `GET /databases/{db}/hilo/next` response.
///
/// The client may hand out every id in `low..=high` without contacting the
/// server again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HiLoResult {
    /// Id prefix, e.g. `users/`.
    pub prefix: String,
    /// First value of the reserved range.
    pub low: i64,
    /// Last value of the reserved range.
    pub high: i64,
    /// Size of the reserved range.
    pub last_size: i64,
    /// Tag of the node that reserved the range.
    pub server_tag: String,
    /// Reservation timestamp.
    #[serde(default)]
    pub last_range_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WireMessage;

    #[test]
    fn decodes_range() {
        let result = HiLoResult::from_json_slice(
            br#"{"Prefix":"users/","Low":33,"High":64,"LastSize":32,"ServerTag":"A","LastRangeAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(result.low, 33);
        assert_eq!(result.high, 64);
        assert_eq!(result.server_tag, "A");
    }
}
