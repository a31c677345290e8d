use serde::{Deserialize, Serialize};

/// Browser family inferred from the user-agent string.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum Browser {
    Firefox,
    Chrome,
    Safari,
    Edge,
    Opera,
    #[serde(rename = "Apache HTTP Client (Tool)")]
    ApacheHttpClient,
    #[serde(rename = "Postman (Tool)")]
    Postman,
    Unknown,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Firefox => "Firefox",
            Browser::Chrome => "Chrome",
            Browser::Safari => "Safari",
            Browser::Edge => "Edge",
            Browser::Opera => "Opera",
            Browser::ApacheHttpClient => "Apache HTTP Client (Tool)",
            Browser::Postman => "Postman (Tool)",
            Browser::Unknown => "Unknown",
        }
    }

    /// Inverse of [`Browser::as_str`]. Unrecognised labels read back as `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Firefox" => Browser::Firefox,
            "Chrome" => Browser::Chrome,
            "Safari" => Browser::Safari,
            "Edge" => Browser::Edge,
            "Opera" => Browser::Opera,
            "Apache HTTP Client (Tool)" => Browser::ApacheHttpClient,
            "Postman (Tool)" => Browser::Postman,
            _ => Browser::Unknown,
        }
    }
}

impl std::fmt::Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Watch,
    #[serde(rename = "Automated Tool")]
    AutomatedTool,
    Desktop,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "Mobile",
            DeviceType::Tablet => "Tablet",
            DeviceType::Watch => "Watch",
            DeviceType::AutomatedTool => "Automated Tool",
            DeviceType::Desktop => "Desktop",
        }
    }

    /// Inverse of [`DeviceType::as_str`]. Unrecognised labels read back as `Desktop`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "Mobile" => DeviceType::Mobile,
            "Tablet" => DeviceType::Tablet,
            "Watch" => DeviceType::Watch,
            "Automated Tool" => DeviceType::AutomatedTool,
            _ => DeviceType::Desktop,
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything captured about a visit at page load, before it is stored.
#[derive(Debug, Clone, Serialize)]
pub struct NewVisit {
    pub ip_address: String,
    pub region: String,
    pub destination_port: u16,
    pub session_id: String,
    pub user_agent: String,
    pub device_type: DeviceType,
    pub browser: Browser,
    pub city: String,
    pub asn: String,
    pub isp: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A stored row of the `visitors` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VisitorRecord {
    pub id: i64,
    pub ip_address: String,
    pub region: String,
    pub destination_port: u16,
    pub session_id: String,
    pub user_agent: String,
    pub device_type: DeviceType,
    pub browser: Browser,
    pub city: String,
    pub asn: String,
    pub isp: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub total_time_spent: i64,
}

impl VisitorRecord {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `{"status": ..., "message": ...}` body shared by the JSON endpoints.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: Status,
    pub message: String,
}

impl StatusResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }
}

/// Query filters for listing visits.
#[derive(Debug, Default, Deserialize)]
pub struct VisitQueryParams {
    pub session_id: Option<String>,
    pub open: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl VisitQueryParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub db_ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_labels_match_json() {
        for b in [
            Browser::Firefox,
            Browser::Chrome,
            Browser::Safari,
            Browser::Edge,
            Browser::Opera,
            Browser::ApacheHttpClient,
            Browser::Postman,
            Browser::Unknown,
        ] {
            assert_eq!(Browser::from_label(b.as_str()), b);
            assert_eq!(serde_json::to_value(b).unwrap(), b.as_str());
        }
        for d in [
            DeviceType::Mobile,
            DeviceType::Tablet,
            DeviceType::Watch,
            DeviceType::AutomatedTool,
            DeviceType::Desktop,
        ] {
            assert_eq!(DeviceType::from_label(d.as_str()), d);
            assert_eq!(serde_json::to_value(d).unwrap(), d.as_str());
        }
    }

    #[test]
    fn test_status_response_shape() {
        let body = serde_json::to_value(StatusResponse::error("Invalid session ID.")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "error", "message": "Invalid session ID."})
        );
    }

    #[test]
    fn test_query_limits() {
        let p = VisitQueryParams {
            limit: Some(10_000),
            offset: Some(-3),
            ..Default::default()
        };
        assert_eq!(p.limit(), 200);
        assert_eq!(p.offset(), 0);
        assert_eq!(VisitQueryParams::default().limit(), 50);
    }
}
