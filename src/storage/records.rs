use crate::domain::toast::Toast;
use serde_json::Value;

/// Result of decoding a stored session queue.
#[derive(Debug, Default)]
pub struct Decoded {
    pub toasts: Vec<Toast>,
    /// Records that could not be rebuilt and were dropped.
    pub malformed: usize,
}

/// Rebuilds toasts from stored records, dropping any record that does not decode.
#[must_use]
pub fn decode_records(records: Vec<Value>) -> Decoded {
    let mut decoded = Decoded { toasts: Vec::with_capacity(records.len()), malformed: 0 };

    for record in records {
        let id = record.get("id").and_then(Value::as_str).map(ToString::to_string);
        match Toast::from_record(record) {
            Ok(toast) => decoded.toasts.push(toast),
            Err(e) => {
                tracing::warn!(error = %e, id = ?id, "Dropping malformed toast record");
                decoded.malformed += 1;
            }
        }
    }

    decoded
}

/// # Errors
/// Returns an error if a toast's custom data cannot be represented as JSON.
pub fn encode_records(toasts: &[Toast]) -> Result<Vec<Value>, serde_json::Error> {
    toasts.iter().map(Toast::to_record).collect()
}
