use crate::types::{Browser, DeviceType};
use once_cell::sync::Lazy;
use regex::Regex;

/// Classify the browser from a user-agent string.
///
/// Rules are tried in order and the first match wins. Tokens overlap
/// (Chrome UAs carry "Safari", Edge UAs carry "Chrome"), so the order
/// is significant.
pub fn classify_browser(user_agent: &str) -> Browser {
    let has = |token: &str| user_agent.contains(token);

    if has("Firefox") {
        Browser::Firefox
    } else if has("Chrome") && !has("Edg") {
        Browser::Chrome
    } else if has("Safari") && !has("Chrome") {
        Browser::Safari
    } else if has("Edg") {
        Browser::Edge
    } else if has("OPR") || has("Opera") {
        Browser::Opera
    } else if has("Apache-HttpClient") {
        Browser::ApacheHttpClient
    } else if has("Postman") {
        Browser::Postman
    } else {
        Browser::Unknown
    }
}

/// Form-factor detection capability.
pub trait DeviceDetector: Send + Sync {
    fn is_mobile(&self, user_agent: &str) -> bool;
    fn is_tablet(&self, user_agent: &str) -> bool;
    fn is_watch(&self, user_agent: &str) -> bool;
}

/// Classify the device: Mobile, then Tablet, then Watch, then automated tools, else Desktop.
pub fn classify_device(detector: &dyn DeviceDetector, user_agent: &str) -> DeviceType {
    if detector.is_mobile(user_agent) {
        DeviceType::Mobile
    } else if detector.is_tablet(user_agent) {
        DeviceType::Tablet
    } else if detector.is_watch(user_agent) {
        DeviceType::Watch
    } else if user_agent.contains("Apache-HttpClient") {
        DeviceType::AutomatedTool
    } else {
        DeviceType::Desktop
    }
}

static WATCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)watchos|watch os|apple watch|\(watch|wear ?os|\bSM-R\d{3}|\bgear s\d|fitbit")
        .unwrap()
});

static TABLET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)ipad|tablet|kindle|\bsilk/|playbook|xoom|\bnexus (7|9|10)\b|\bSM-[TX]\d{3}|\bGT-P\d{4}|\bKF[A-Z]{2,4}\b",
    )
    .unwrap()
});

static ANDROID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)android").unwrap());

static MOBILE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bmobile\b").unwrap());

static PHONE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)iphone|ipod|windows phone|iemobile|blackberry|\bBB10\b|opera mini|opera mobi|webos|\bmobile\b|\bphone\b",
    )
    .unwrap()
});

/// Regex-driven detector over the raw user-agent string.
///
/// Tablets and watches are never reported as mobile, so each device has
/// exactly one positive answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct UaDeviceDetector;

impl DeviceDetector for UaDeviceDetector {
    fn is_mobile(&self, user_agent: &str) -> bool {
        PHONE_RE.is_match(user_agent) && !self.is_tablet(user_agent) && !self.is_watch(user_agent)
    }

    fn is_tablet(&self, user_agent: &str) -> bool {
        if self.is_watch(user_agent) {
            return false;
        }
        if TABLET_RE.is_match(user_agent) {
            return true;
        }
        // Android tablets drop the "Mobile" token that phones carry
        ANDROID_RE.is_match(user_agent) && !MOBILE_TOKEN_RE.is_match(user_agent)
    }

    fn is_watch(&self, user_agent: &str) -> bool {
        WATCH_RE.is_match(user_agent)
    }
}
