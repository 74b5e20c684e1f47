// Uniform response envelope module

use crate::storage::Record;
use serde::Serialize;

/// The uniform `{code, message, data}` wrapper carried by every reply.
///
/// `code == 0` together with `message == "success"` means the operation fully
/// succeeded; any other code carries a human-readable message and null data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub code: i32,
    pub message: String,
    pub data: Option<Vec<Record>>,
}

impl Envelope {
    /// Successful result. `data` is always a sequence, empty when the query
    /// matched no rows.
    pub fn success(rows: Vec<Record>) -> Self {
        Self {
            code: 0,
            message: "success".to_string(),
            data: Some(rows),
        }
    }

    /// Error envelope; `data` stays null.
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_serializes_with_data_array() {
        let envelope = Envelope::success(vec![]);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value, json!({"code": 0, "message": "success", "data": []}));
    }

    #[test]
    fn error_serializes_with_null_data() {
        let envelope = Envelope::error(400, "Invalid action parameter");
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({"code": 400, "message": "Invalid action parameter", "data": null})
        );
    }
}
