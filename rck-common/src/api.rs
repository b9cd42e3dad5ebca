//! Check-in API wire types
//!
//! The remote API wraps every response in `{ success, data?, error? }`.
//! Field names on the wire are camelCase.

use serde::{Deserialize, Serialize};

/// Response envelope returned by every API route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

/// Body posted to the self check-in route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckinRequest {
    #[serde(rename = "qrPayload")]
    pub qr_payload: String,
    #[serde(rename = "_lineToken")]
    pub line_token: String,
}

/// Check-in record embedded in a successful response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinStamp {
    #[serde(default)]
    pub checkin_at: String,
}

/// `data` of a successful self check-in response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinResponseData {
    pub bib_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub checkin: CheckinStamp,
}

/// What the runner sees after a successful check-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinReceipt {
    pub bib_number: String,
    pub first_name: String,
    pub last_name: String,
    pub checkin_timestamp: String,
}

impl CheckinReceipt {
    /// "First Last" as shown under the BIB number
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

impl From<CheckinResponseData> for CheckinReceipt {
    fn from(data: CheckinResponseData) -> Self {
        Self {
            bib_number: data.bib_number,
            first_name: data.first_name,
            last_name: data.last_name,
            checkin_timestamp: data.checkin.checkin_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_parses() {
        let json = r#"{
            "success": true,
            "data": {
                "bibNumber": "BIB-0042",
                "firstName": "Somchai",
                "lastName": "Jaidee",
                "checkin": { "checkinAt": "2026-03-01T06:12:00Z" }
            }
        }"#;
        let response: ApiResponse<CheckinResponseData> = serde_json::from_str(json).unwrap();
        assert!(response.success);

        let receipt = CheckinReceipt::from(response.data.unwrap());
        assert_eq!(receipt.bib_number, "BIB-0042");
        assert_eq!(receipt.full_name(), "Somchai Jaidee");
        assert_eq!(receipt.checkin_timestamp, "2026-03-01T06:12:00Z");
    }

    #[test]
    fn test_failure_envelope_parses() {
        let json = r#"{ "success": false, "error": "already checked in" }"#;
        let response: ApiResponse<CheckinResponseData> = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.error.as_deref(), Some("already checked in"));
    }

    #[test]
    fn test_request_wire_names() {
        let body = CheckinRequest {
            qr_payload: "CHKPT:x".to_string(),
            line_token: "tok".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["qrPayload"], "CHKPT:x");
        assert_eq!(json["_lineToken"], "tok");
    }
}
