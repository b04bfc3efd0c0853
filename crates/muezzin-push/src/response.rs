//! Gateway response classification
//!
//! The gateway answers with either a ticket object, an array of tickets (one
//! per message, in order) or a top-level `errors` array. Anything we cannot
//! read is treated as transient.

use serde_json::Value;

/// Error codes meaning the registration token will never work again
pub const STALE_CODES: [&str; 2] = ["DeviceNotRegistered", "InvalidCredentials"];

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    StaleRegistration { code: String },
    TransientFailure { reason: String },
}

impl DeliveryOutcome {
    pub fn transient(reason: impl Into<String>) -> Self {
        DeliveryOutcome::TransientFailure {
            reason: reason.into(),
        }
    }

    pub fn stale(code: impl Into<String>) -> Self {
        DeliveryOutcome::StaleRegistration { code: code.into() }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, DeliveryOutcome::StaleRegistration { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::StaleRegistration { .. } => "stale_registration",
            DeliveryOutcome::TransientFailure { .. } => "transient_failure",
        }
    }
}

pub fn is_stale_code(code: &str) -> bool {
    STALE_CODES.contains(&code)
}

/// Classify a raw response body into one outcome per sent message
pub fn classify_response(status: u16, body: &str, expected: usize) -> Vec<DeliveryOutcome> {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(_) => {
            return vec![DeliveryOutcome::transient(format!("non-JSON response (HTTP {})", status)); expected]
        }
    };

    if let Some(errors) = parsed.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let codes: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("code").and_then(Value::as_str))
                .collect();
            let outcome = match codes.iter().find(|code| is_stale_code(code)) {
                Some(code) => DeliveryOutcome::stale(*code),
                None => DeliveryOutcome::transient(format!(
                    "gateway error (HTTP {}): {}",
                    status,
                    codes.join(", ")
                )),
            };
            return vec![outcome; expected];
        }
    }

    let tickets: Vec<&Value> = match parsed.get("data") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(ticket @ Value::Object(_)) => vec![ticket],
        _ => Vec::new(),
    };

    (0..expected)
        .map(|i| match tickets.get(i) {
            Some(ticket) => classify_ticket(ticket),
            None => DeliveryOutcome::transient(format!("missing ticket (HTTP {})", status)),
        })
        .collect()
}

/// Classify one per-message ticket
pub fn classify_ticket(ticket: &Value) -> DeliveryOutcome {
    match ticket.get("status").and_then(Value::as_str) {
        Some("ok") => DeliveryOutcome::Delivered,
        Some("error") => {
            let code = ticket
                .get("details")
                .and_then(|d| d.get("error"))
                .and_then(Value::as_str);
            match code {
                Some(code) if is_stale_code(code) => DeliveryOutcome::stale(code),
                _ => {
                    let reason = ticket
                        .get("message")
                        .and_then(Value::as_str)
                        .or(code)
                        .unwrap_or("unknown ticket error");
                    DeliveryOutcome::transient(reason)
                }
            }
        }
        _ => DeliveryOutcome::transient("unrecognized ticket"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_ok_ticket() {
        let body = r#"{"data":{"status":"ok","id":"XXXX-XXXX"}}"#;
        assert_eq!(classify_response(200, body, 1), vec![DeliveryOutcome::Delivered]);
    }

    #[test]
    fn test_device_not_registered_ticket() {
        let body = r#"{"data":{"status":"error","message":"not a valid token","details":{"error":"DeviceNotRegistered"}}}"#;
        let outcomes = classify_response(200, body, 1);
        assert_eq!(outcomes, vec![DeliveryOutcome::stale("DeviceNotRegistered")]);
    }

    #[test]
    fn test_unknown_ticket_error_is_transient() {
        let body = r#"{"data":{"status":"error","message":"slow down","details":{"error":"MessageRateExceeded"}}}"#;
        let outcomes = classify_response(200, body, 1);
        assert_eq!(outcomes, vec![DeliveryOutcome::transient("slow down")]);
    }

    #[test]
    fn test_top_level_errors() {
        let body = r#"{"errors":[{"code":"InvalidCredentials","message":"bad key"}]}"#;
        let outcomes = classify_response(401, body, 2);
        assert!(outcomes.iter().all(|o| o == &DeliveryOutcome::stale("InvalidCredentials")));
        assert_eq!(outcomes.len(), 2);

        let body = r#"{"errors":[{"code":"INTERNAL_SERVER_ERROR","message":"oops"}]}"#;
        let outcomes = classify_response(500, body, 1);
        assert!(matches!(outcomes[0], DeliveryOutcome::TransientFailure { .. }));
    }

    #[test]
    fn test_batch_in_order_with_missing_tickets() {
        let body = r#"{"data":[
            {"status":"ok","id":"a"},
            {"status":"error","details":{"error":"DeviceNotRegistered"}}
        ]}"#;
        let outcomes = classify_response(200, body, 3);
        assert_eq!(outcomes[0], DeliveryOutcome::Delivered);
        assert!(outcomes[1].is_stale());
        assert!(matches!(outcomes[2], DeliveryOutcome::TransientFailure { .. }));
    }

    #[test]
    fn test_non_json_is_transient() {
        let outcomes = classify_response(502, "<html>Bad Gateway</html>", 1);
        assert_eq!(
            outcomes,
            vec![DeliveryOutcome::transient("non-JSON response (HTTP 502)")]
        );
    }

    #[test]
    fn test_http_error_without_body_data() {
        let outcomes = classify_response(503, "{}", 1);
        assert!(matches!(outcomes[0], DeliveryOutcome::TransientFailure { .. }));
    }
}
