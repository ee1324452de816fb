//! Device, browser, OS and campaign detection from what a client can see
//! about itself. Substring matching only; no full user-agent parsing.

use kanda_core::event::DeviceType;
use kanda_core::event::UtmParams;

/// Viewport width buckets: below 768 is mobile, below 1024 tablet.
pub fn device_type(viewport_width: u32) -> DeviceType {
    if viewport_width < 768 {
        DeviceType::Mobile
    } else if viewport_width < 1024 {
        DeviceType::Tablet
    } else {
        DeviceType::Desktop
    }
}

// First match wins. Edge and Opera also advertise Chrome, and Chrome
// advertises Safari, so the order matters.
const BROWSERS: [(&str, &str); 5] = [
    ("Edg", "Edge"),
    ("OPR", "Opera"),
    ("Chrome", "Chrome"),
    ("Safari", "Safari"),
    ("Firefox", "Firefox"),
];

// iOS user agents say "like Mac OS X" and Android ones say "Linux", so the
// more specific platform is checked first in both cases.
const OPERATING_SYSTEMS: [(&[&str], &str); 5] = [
    (&["Windows"], "Windows"),
    (&["iPhone", "iPad"], "iOS"),
    (&["Mac OS"], "macOS"),
    (&["Android"], "Android"),
    (&["Linux"], "Linux"),
];

pub fn detect_browser(user_agent: &str) -> &'static str {
    BROWSERS
        .iter()
        .find(|(needle, _)| user_agent.contains(needle))
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
}

pub fn detect_os(user_agent: &str) -> &'static str {
    OPERATING_SYSTEMS
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| user_agent.contains(n)))
        .map(|(_, name)| *name)
        .unwrap_or("unknown")
}

/// Read the five `utm_*` parameters from a page URL. Anything unparseable
/// yields no parameters.
pub fn utm_params(page_url: &str) -> UtmParams {
    let Ok(parsed) = url::Url::parse(page_url) else {
        return UtmParams::default();
    };

    let mut utm = UtmParams::default();
    for (key, value) in parsed.query_pairs() {
        let slot = match key.as_ref() {
            "utm_source" => &mut utm.utm_source,
            "utm_medium" => &mut utm.utm_medium,
            "utm_campaign" => &mut utm.utm_campaign,
            "utm_term" => &mut utm.utm_term,
            "utm_content" => &mut utm.utm_content,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }
    utm.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDGE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const OPERA: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 OPR/106.0.0.0";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 \
        (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";
    const SAFARI_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 \
        (KHTML, like Gecko) Version/17.2 Safari/605.1.15";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_2 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Mobile/15E148 Safari/604.1";
    const FIREFOX_LINUX: &str = "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

    #[test]
    fn viewport_buckets() {
        assert_eq!(device_type(375), DeviceType::Mobile);
        assert_eq!(device_type(767), DeviceType::Mobile);
        assert_eq!(device_type(768), DeviceType::Tablet);
        assert_eq!(device_type(1023), DeviceType::Tablet);
        assert_eq!(device_type(1024), DeviceType::Desktop);
    }

    #[test]
    fn browser_order() {
        assert_eq!(detect_browser(EDGE), "Edge");
        assert_eq!(detect_browser(OPERA), "Opera");
        assert_eq!(detect_browser(CHROME_ANDROID), "Chrome");
        assert_eq!(detect_browser(SAFARI_MAC), "Safari");
        assert_eq!(detect_browser(FIREFOX_LINUX), "Firefox");
        assert_eq!(detect_browser("curl/8.4.0"), "unknown");
    }

    #[test]
    fn os_order() {
        assert_eq!(detect_os(EDGE), "Windows");
        assert_eq!(detect_os(SAFARI_MAC), "macOS");
        assert_eq!(detect_os(CHROME_ANDROID), "Android");
        assert_eq!(detect_os(FIREFOX_LINUX), "Linux");
        assert_eq!(detect_os("Mozilla/5.0 (iPad; CPU OS 17_2) Mobile/15E148"), "iOS");
        assert_eq!(detect_os(SAFARI_IPHONE), "iOS");
        assert_eq!(detect_browser(SAFARI_IPHONE), "Safari");
        assert_eq!(detect_os(""), "unknown");
    }

    #[test]
    fn utm_from_query_string() {
        let utm = utm_params(
            "https://kanda.test/interestform?utm_source=newsletter&utm_medium=email&utm_campaign=&ref=x",
        );
        assert_eq!(utm.utm_source.as_deref(), Some("newsletter"));
        assert_eq!(utm.utm_medium.as_deref(), Some("email"));
        assert_eq!(utm.utm_campaign, None);
        assert_eq!(utm.utm_term, None);
    }

    #[test]
    fn garbage_url_has_no_utm() {
        assert!(utm_params("not a url").is_empty());
    }
}
