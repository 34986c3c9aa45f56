//! Response envelopes of the two APIs.
//!
//! Legacy writes answer with a list of `{"success": {...}}` / `{"error":
//! {...}}` entries, and legacy reads with an error list when something is
//! wrong. The modern API wraps every answer in `{"errors": [...], "data": [...]}`.

use serde_json::Value;

use crate::bridge::Reply;
use crate::error::{BulbError, Result};

/// Interpret a 2xx legacy body. A list made only of errors is a rejection;
/// errors mixed with successes become warnings.
pub fn parse_legacy(body: Value) -> Result<Reply> {
    let Some(entries) = body.as_array() else {
        return Ok(Reply::new(body));
    };

    let mut successes = 0;
    let mut errors = Vec::new();
    for entry in entries {
        if entry.get("success").is_some() {
            successes += 1;
        } else if let Some(error) = entry.get("error") {
            errors.push(legacy_error(error));
        }
    }

    if errors.is_empty() {
        return Ok(Reply::new(body));
    }
    if successes == 0 {
        let (address, description) = errors.swap_remove(0);
        return Err(BulbError::Rejected {
            address,
            description,
        });
    }

    Ok(Reply {
        body,
        warnings: errors
            .into_iter()
            .map(|(address, description)| format!("{address}: {description}"))
            .collect(),
    })
}

fn legacy_error(error: &Value) -> (String, String) {
    let address = error
        .get("address")
        .and_then(Value::as_str)
        .unwrap_or("/")
        .to_string();
    let description = error
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    (address, description)
}

/// Interpret a 2xx modern body: `data` becomes the reply body and any
/// `errors` entries become warnings.
pub fn parse_modern(body: Value) -> Result<Reply> {
    let Value::Object(mut obj) = body else {
        return Err(BulbError::Malformed(
            "v2 response is not an object".to_string(),
        ));
    };
    let warnings = modern_errors(obj.get("errors"));
    let data = obj.remove("data").unwrap_or(Value::Null);
    Ok(Reply {
        body: data,
        warnings,
    })
}

/// Descriptions from a modern `errors` member, used for both warnings and
/// failed-status messages.
pub fn modern_errors(errors: Option<&Value>) -> Vec<String> {
    errors
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|e| e.get("description").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Best-effort message for a failed status: bridge error descriptions when
/// the body has them, otherwise the raw text.
pub fn failure_message(text: &str) -> String {
    let Ok(body) = serde_json::from_str::<Value>(text) else {
        return text.trim().to_string();
    };
    let mut messages = modern_errors(body.get("errors"));
    if let Some(entries) = body.as_array() {
        messages.extend(
            entries
                .iter()
                .filter_map(|e| e.get("error"))
                .map(|e| legacy_error(e).1),
        );
    }
    if messages.is_empty() {
        text.trim().to_string()
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_success_list_passes_through() {
        let body = json!([{"success": {"/groups/1/lights": ["5", "7"]}}]);
        let reply = parse_legacy(body.clone()).unwrap();
        assert_eq!(reply.body, body);
        assert!(reply.warnings.is_empty());
    }

    #[test]
    fn legacy_error_only_list_is_rejected() {
        let body = json!([{"error": {"type": 1, "address": "/", "description": "unauthorized user"}}]);
        let err = parse_legacy(body).unwrap_err();
        assert!(matches!(err, BulbError::Rejected { ref description, .. } if description == "unauthorized user"));
    }

    #[test]
    fn legacy_mixed_list_becomes_warnings() {
        let body = json!([
            {"success": {"/scenes/abc/lights": ["5", "7"]}},
            {"error": {"type": 8, "address": "/scenes/abc/name", "description": "parameter not modifiable"}}
        ]);
        let reply = parse_legacy(body).unwrap();
        assert_eq!(
            reply.warnings,
            vec!["/scenes/abc/name: parameter not modifiable".to_string()]
        );
    }

    #[test]
    fn legacy_object_body_is_untouched() {
        let body = json!({"5": {"name": "Lamp"}});
        assert_eq!(parse_legacy(body.clone()).unwrap().body, body);
    }

    #[test]
    fn modern_envelope_unwraps_data_and_keeps_errors_as_warnings() {
        let body = json!({
            "errors": [{"description": "device unreachable"}],
            "data": [{"rid": "guid-a", "rtype": "light"}]
        });
        let reply = parse_modern(body).unwrap();
        assert_eq!(reply.body, json!([{"rid": "guid-a", "rtype": "light"}]));
        assert_eq!(reply.warnings, vec!["device unreachable".to_string()]);
    }

    #[test]
    fn modern_non_object_is_malformed() {
        assert!(matches!(
            parse_modern(json!([])),
            Err(BulbError::Malformed(_))
        ));
    }

    #[test]
    fn failure_message_prefers_bridge_descriptions() {
        let text = r#"{"errors":[{"description":"invalid body"}],"data":[]}"#;
        assert_eq!(failure_message(text), "invalid body");
        assert_eq!(failure_message("  gateway down \n"), "gateway down");
    }
}
