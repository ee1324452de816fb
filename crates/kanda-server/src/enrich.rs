//! Request-header enrichment for the ingestion endpoint.

use axum::http::HeaderMap;

use kanda_core::event::DeviceType;

/// Client IP as reported by the proxy chain.
///
/// Headers are checked in order: `cf-connecting-ip`, `x-forwarded-for`
/// (first entry), `x-real-ip`, `x-client-ip`. Returns `None` when none is
/// present.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(ip) = header("cf-connecting-ip") {
        return Some(ip.to_string());
    }
    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next().map(str::trim) {
            if !first.is_empty() {
                return Some(first.to_string());
            }
        }
    }
    header("x-real-ip")
        .or_else(|| header("x-client-ip"))
        .map(str::to_string)
}

/// Device, browser and OS derived from a `User-Agent` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UaInfo {
    pub device: DeviceType,
    pub browser: Option<String>,
    pub os: Option<String>,
}

/// Parse a `User-Agent` with `woothee`. Used only when the tracker did not
/// report device, browser or OS itself.
pub fn parse_user_agent(user_agent: &str) -> Option<UaInfo> {
    if user_agent.trim().is_empty() {
        return None;
    }

    let result = woothee::parser::Parser::new().parse(user_agent)?;

    let device = match result.category {
        "smartphone" | "mobilephone" => DeviceType::Mobile,
        "tablet" => DeviceType::Tablet,
        _ => DeviceType::Desktop,
    };

    // woothee reports unknown values as "UNKNOWN".
    let known = |s: &str| (!s.is_empty() && s != "UNKNOWN").then(|| s.to_string());

    Some(UaInfo {
        device,
        browser: known(result.name),
        os: known(result.os),
    })
}
