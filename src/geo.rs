use crate::config::GeoConfig;
use crate::event_log::{EventLog, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub const UNKNOWN: &str = "Unknown";

static ASN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^AS(\d+)\s+(.*)$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("invalid geolocation base URL: {0}")]
    BaseUrl(String),

    #[error("geolocation request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("geolocation service returned HTTP {0}")]
    Status(u16),

    #[error("geolocation response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Raw body of an ip-api.com `/json/{ip}` lookup. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct IpApiResponse {
    #[serde(rename = "regionName")]
    pub region_name: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "as")]
    pub as_name: Option<String>,
    pub isp: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

/// Location attributes recorded for a visit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    pub region: String,
    pub city: String,
    pub asn: String,
    pub isp: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoInfo {
    /// Placeholder used when the lookup fails.
    pub fn unknown() -> Self {
        Self {
            region: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            asn: UNKNOWN.to_string(),
            isp: UNKNOWN.to_string(),
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    pub fn from_response(resp: IpApiResponse) -> Self {
        let or_unknown = |v: Option<String>| v.unwrap_or_else(|| UNKNOWN.to_string());
        let (asn, isp) = split_asn(or_unknown(resp.as_name), or_unknown(resp.isp));
        Self {
            region: or_unknown(resp.region_name),
            city: or_unknown(resp.city),
            asn,
            isp,
            latitude: resp.lat.unwrap_or(0.0),
            longitude: resp.lon.unwrap_or(0.0),
        }
    }
}

/// Split an `AS<digits> <org>` field into the bare number and, when no
/// ISP is known, use the org name as the ISP.
pub fn split_asn(asn: String, isp: String) -> (String, String) {
    let parsed = ASN_RE
        .captures(&asn)
        .map(|caps| (caps[1].to_string(), caps[2].to_string()));
    match parsed {
        Some((number, org)) => {
            let isp = if isp.is_empty() || isp == UNKNOWN { org } else { isp };
            (number, isp)
        }
        None => (asn, isp),
    }
}

/// HTTP client for an ip-api.com compatible geolocation service.
pub struct GeoClient {
    client: reqwest::Client,
    base_url: Url,
}

impl GeoClient {
    pub fn new(config: &GeoConfig) -> Result<Self, GeoError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| GeoError::BaseUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(GeoError::BaseUrl(config.base_url.clone()));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// `{base}/json/{ip}`, with the IP percent-encoded as a single path segment.
    pub fn lookup_url(&self, ip: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("json").push(ip);
        }
        url
    }

    pub async fn fetch(&self, ip: &str) -> Result<IpApiResponse, GeoError> {
        let resp = self.client.get(self.lookup_url(ip)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Look up `ip`, falling back to [`GeoInfo::unknown`] on any failure.
    pub async fn locate(&self, ip: &str, log: &dyn EventLog) -> GeoInfo {
        match self.fetch(ip).await {
            Ok(resp) => GeoInfo::from_response(resp),
            Err(e) => {
                log.log(
                    Severity::Warning,
                    &format!("Failed to fetch IP data for IP: {ip} ({e})"),
                );
                GeoInfo::unknown()
            }
        }
    }
}
