use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment status reported by the gateway for a single invoice.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Expired,
    Partial,
    Refunded,
    /// Fallback for status strings the gateway reports that we do not model.
    Unknown,
}

impl PaymentStatus {
    /// Maps a raw gateway status string. Unrecognized values become `Unknown`
    /// rather than failing the whole response.
    pub fn from_wire(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => PaymentStatus::Pending,
            "PAID" => PaymentStatus::Paid,
            "FAILED" => PaymentStatus::Failed,
            "EXPIRED" => PaymentStatus::Expired,
            "PARTIAL" => PaymentStatus::Partial,
            "REFUNDED" => PaymentStatus::Refunded,
            _ => PaymentStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Unknown => "UNKNOWN",
        }
    }

    /// Statuses that can never become `Paid` within the same session.
    ///
    /// `Expired` is deliberately not included: the gateway may still settle
    /// an expired invoice, so observers decide themselves whether to stop.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a failed query attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network/server failure; eligible for continued polling.
    Transient,
    /// Authentication or authorization failure; polling must stop.
    Fatal,
}

/// A query attempt that did not produce a classified payment status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    pub message: String,
    pub class: ErrorClass,
}

impl StatusError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            class: ErrorClass::Transient,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            class: ErrorClass::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.class == ErrorClass::Fatal
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Success fields returned alongside a status. The poller passes these
/// through without interpreting them; the checkout screen reads the
/// activation artifacts once the invoice is paid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatusPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iccid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smdp_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_code: Option<String>,
    /// Gateway fields this crate does not model.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extra: serde_json::Value,
}

/// One successfully classified gateway response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: PaymentStatus,
    pub payload: StatusPayload,
}

impl StatusSnapshot {
    pub fn new(status: PaymentStatus) -> Self {
        Self {
            status,
            payload: StatusPayload::default(),
        }
    }

    pub fn with_payload(status: PaymentStatus, payload: StatusPayload) -> Self {
        Self { status, payload }
    }
}

/// Outcome of a single query attempt.
pub type StatusResult = Result<StatusSnapshot, StatusError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_from_wire_known_statuses() {
        assert_eq!(PaymentStatus::from_wire("PAID"), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_wire("pending"), PaymentStatus::Pending);
        assert_eq!(PaymentStatus::from_wire("Refunded"), PaymentStatus::Refunded);
    }

    #[test]
    fn test_from_wire_unrecognized_is_unknown() {
        assert_eq!(
            PaymentStatus::from_wire("SETTLEMENT_IN_PROGRESS"),
            PaymentStatus::Unknown
        );
        assert_eq!(PaymentStatus::from_wire(""), PaymentStatus::Unknown);
    }

    #[test]
    fn test_unrecoverable_statuses() {
        assert!(PaymentStatus::Failed.is_unrecoverable());
        assert!(PaymentStatus::Refunded.is_unrecoverable());
        // Expired invoices may still settle; kept recoverable.
        assert!(!PaymentStatus::Expired.is_unrecoverable());
        assert!(!PaymentStatus::Pending.is_unrecoverable());
        assert!(!PaymentStatus::Partial.is_unrecoverable());
        assert!(!PaymentStatus::Unknown.is_unrecoverable());
    }

    #[test]
    fn test_error_classification() {
        let transient = StatusError::transient("connection reset");
        assert!(!transient.is_fatal());

        let fatal = StatusError::fatal("unauthorized");
        assert!(fatal.is_fatal());
        assert_eq!(fatal.to_string(), "unauthorized");
    }

    #[test]
    fn test_payload_serialization_skips_empty_fields() {
        let payload = StatusPayload {
            order_id: Some("ord_1".to_string()),
            amount: Some(dec!(9.99)),
            currency: Some("USD".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["order_id"], "ord_1");
        assert!(json.get("iccid").is_none());
        assert!(json.get("extra").is_none());
    }

    #[test]
    fn test_status_wire_name_roundtrip() {
        let json = serde_json::to_string(&PaymentStatus::Paid).unwrap();
        assert_eq!(json, "\"PAID\"");
        let parsed: PaymentStatus = serde_json::from_str("\"REFUNDED\"").unwrap();
        assert_eq!(parsed, PaymentStatus::Refunded);
    }
}
