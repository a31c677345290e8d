use crate::types::NewVisit;
use std::fmt::Write;

const HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Visitor Information</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
    <style>
        body { font-family: Arial, sans-serif; background-color: #f8f9fa; margin: 0; padding: 0; }
        .container { max-width: 800px; margin: 50px auto; padding: 20px; background: #ffffff;
                     box-shadow: 0 4px 8px rgba(0, 0, 0, 0.1); border-radius: 8px; }
        h1 { text-align: center; color: #333; }
        table { width: 100%; border-collapse: collapse; margin-top: 20px; }
        table, th, td { border: 1px solid #ddd; }
        th, td { padding: 10px; text-align: left; }
        th { background-color: #f2f2f2; }
        #map { height: 400px; margin-top: 20px; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Visitor Details</h1>
        <table>
            <thead>
                <tr><th>Field</th><th>Value</th></tr>
            </thead>
            <tbody>
"#;

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Quote `input` as a JS string literal that is safe inside a `<script>` block.
fn js_string(input: &str) -> String {
    serde_json::to_string(input)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

/// Table rows shown on the report, in display order.
pub fn report_fields(visit: &NewVisit) -> Vec<(&'static str, String)> {
    vec![
        ("IP Address", visit.ip_address.clone()),
        ("Region", visit.region.clone()),
        ("City", visit.city.clone()),
        ("ASN", visit.asn.clone()),
        ("ISP", visit.isp.clone()),
        ("Latitude", visit.latitude.to_string()),
        ("Longitude", visit.longitude.to_string()),
        ("Port", visit.destination_port.to_string()),
        ("Session ID", visit.session_id.clone()),
        ("User Agent", visit.user_agent.clone()),
        ("Device Type", visit.device_type.to_string()),
        ("Browser", visit.browser.to_string()),
    ]
}

/// Render the visit confirmation page: field table plus a map centred on the visitor.
pub fn render_report(visit: &NewVisit) -> String {
    let mut html = String::from(HEAD);

    for (key, value) in report_fields(visit) {
        let _ = writeln!(
            html,
            "                <tr><td>{key}</td><td>{}</td></tr>",
            escape_html(&value)
        );
    }

    // Leaflet treats popup content as HTML, so escape before quoting for JS
    let popup = format!(
        "Location: {}, {}",
        escape_html(&visit.city),
        escape_html(&visit.region)
    );
    let (lat, lon) = (visit.latitude, visit.longitude);

    let _ = write!(
        html,
        r#"            </tbody>
        </table>
        <div id="map"></div>
    </div>
    <script>
        var map = L.map("map").setView([{lat}, {lon}], 13);
        L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
            maxZoom: 19,
            attribution: "© OpenStreetMap contributors"
        }}).addTo(map);
        L.marker([{lat}, {lon}]).addTo(map)
            .bindPopup({popup})
            .openPopup();
    </script>
</body>
</html>
"#,
        popup = js_string(&popup),
    );

    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Browser, DeviceType};

    fn visit() -> NewVisit {
        NewVisit {
            ip_address: "8.8.8.8".to_string(),
            region: "Virginia".to_string(),
            destination_port: 8080,
            session_id: "sess-1".to_string(),
            user_agent: "Mozilla/5.0 <script>alert(1)</script>".to_string(),
            device_type: DeviceType::Desktop,
            browser: Browser::Unknown,
            city: "Ashburn".to_string(),
            asn: "15169".to_string(),
            isp: "Google LLC".to_string(),
            latitude: 39.03,
            longitude: -77.5,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_report_lists_every_field() {
        let html = render_report(&visit());
        for (key, _) in report_fields(&visit()) {
            assert!(html.contains(&format!("<td>{key}</td>")), "missing {key}");
        }
        assert!(html.contains("<tr><td>Session ID</td><td>sess-1</td></tr>"));
        assert!(html.contains("<tr><td>Port</td><td>8080</td></tr>"));
        assert!(html.contains("<tr><td>Device Type</td><td>Desktop</td></tr>"));
    }

    #[test]
    fn test_report_escapes_user_agent() {
        let html = render_report(&visit());
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_map_centre_and_popup() {
        let html = render_report(&visit());
        assert!(html.contains("setView([39.03, -77.5], 13)"));
        assert!(html.contains("L.marker([39.03, -77.5])"));
        assert!(html.contains(r#".bindPopup("Location: Ashburn, Virginia")"#));
        assert!(html.contains("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png"));
    }

    #[test]
    fn test_popup_cannot_break_out_of_script() {
        let mut v = visit();
        v.city = "</script><b>x".to_string();
        v.region = "\"quoted\"".to_string();
        let html = render_report(&v);
        assert!(html.contains(
            r#".bindPopup("Location: &lt;/script&gt;&lt;b&gt;x, &quot;quoted&quot;")"#
        ));
        assert_eq!(html.matches("</script>").count(), 2);
    }
}
