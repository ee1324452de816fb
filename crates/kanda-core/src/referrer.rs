//! Referrer classification and search-keyword extraction.
//!
//! All functions are pure: an unparseable URL degrades to a best-effort
//! answer instead of an error.

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferrerCategory {
    Direct,
    Search,
    Social,
    Email,
    Referral,
    Campaign,
    Internal,
}

impl ReferrerCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ReferrerCategory::Direct => "direct",
            ReferrerCategory::Search => "search",
            ReferrerCategory::Social => "social",
            ReferrerCategory::Email => "email",
            ReferrerCategory::Referral => "referral",
            ReferrerCategory::Campaign => "campaign",
            ReferrerCategory::Internal => "internal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerInfo {
    pub category: ReferrerCategory,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl ReferrerInfo {
    fn new(category: ReferrerCategory, source: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            category,
            source: source.into(),
            domain,
        }
    }
}

/// Hostname fragments checked in order; the first match wins.
const SEARCH_ENGINES: &[(&str, &str)] = &[
    ("google.", "Google"),
    ("bing.", "Bing"),
    ("yahoo.", "Yahoo"),
    ("duckduckgo.", "DuckDuckGo"),
    ("baidu.", "Baidu"),
    ("yandex.", "Yandex"),
    ("ask.", "Ask"),
    ("ecosia.", "Ecosia"),
];

const SOCIAL_PLATFORMS: &[(&str, &str)] = &[
    ("facebook.", "Facebook"),
    ("fb.", "Facebook"),
    ("instagram.", "Instagram"),
    ("twitter.", "Twitter/X"),
    ("t.co", "Twitter/X"),
    ("x.com", "Twitter/X"),
    ("linkedin.", "LinkedIn"),
    ("lnkd.in", "LinkedIn"),
    ("pinterest.", "Pinterest"),
    ("reddit.", "Reddit"),
    ("tiktok.", "TikTok"),
    ("youtube.", "YouTube"),
    ("snapchat.", "Snapchat"),
    ("whatsapp.", "WhatsApp"),
    ("telegram.", "Telegram"),
    ("discord.", "Discord"),
    ("twitch.", "Twitch"),
];

const EMAIL_PROVIDERS: &[&str] = &["mail.", "gmail.", "outlook.", "protonmail."];

/// Classify where a visit came from.
///
/// Order of precedence: empty referrer → direct; a UTM source → campaign;
/// search engines, then social platforms, then email providers by hostname;
/// the site's own host (`site_host`) → internal; anything else → referral
/// labelled with the bare hostname.
pub fn categorize_referrer(
    referrer: &str,
    utm_source: Option<&str>,
    site_host: Option<&str>,
) -> ReferrerInfo {
    let referrer = referrer.trim();
    if referrer.is_empty() {
        return ReferrerInfo::new(ReferrerCategory::Direct, "Direct", None);
    }

    if let Some(source) = utm_source.filter(|s| !s.trim().is_empty()) {
        return ReferrerInfo::new(ReferrerCategory::Campaign, source, None);
    }

    let Some(host) = referrer_host(referrer) else {
        return ReferrerInfo::new(ReferrerCategory::Referral, referrer, None);
    };

    if let Some((_, name)) = SEARCH_ENGINES.iter().find(|(p, _)| host_matches(&host, p)) {
        return ReferrerInfo::new(ReferrerCategory::Search, *name, Some(host));
    }

    if let Some((_, name)) = SOCIAL_PLATFORMS.iter().find(|(p, _)| host_matches(&host, p)) {
        return ReferrerInfo::new(ReferrerCategory::Social, *name, Some(host));
    }

    if EMAIL_PROVIDERS.iter().any(|p| host_matches(&host, p))
        || (host.contains("yahoo") && host.contains("mail"))
    {
        return ReferrerInfo::new(ReferrerCategory::Email, "Email", Some(host));
    }

    if let Some(site) = site_host.map(strip_www) {
        if !site.is_empty() && host == site {
            return ReferrerInfo::new(ReferrerCategory::Internal, "Internal", Some(host));
        }
    }

    ReferrerInfo::new(ReferrerCategory::Referral, host.clone(), Some(host))
}

/// Pull the search query out of a known search engine's referrer URL.
///
/// Google, Bing and DuckDuckGo use `q`; Yahoo uses `p`. Unknown engines and
/// malformed URLs yield `None`.
pub fn extract_search_keywords(referrer: &str) -> Option<String> {
    let url = Url::parse(referrer.trim()).ok()?;
    let host = strip_www(url.host_str()?);
    let param = if ["google.", "bing.", "duckduckgo."]
        .iter()
        .any(|p| host_matches(&host, p))
    {
        "q"
    } else if host_matches(&host, "yahoo.") {
        "p"
    } else {
        return None;
    };

    url.query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Paid-social click identifiers carried on the referrer URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialCampaign {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
}

pub fn extract_social_campaign(referrer: &str) -> SocialCampaign {
    let Ok(url) = Url::parse(referrer.trim()) else {
        return SocialCampaign::default();
    };
    let Some(host) = url.host_str().map(strip_www) else {
        return SocialCampaign::default();
    };
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    let (platform, campaign_id) = if host_matches(&host, "instagram.") {
        ("Instagram", param("fbclid"))
    } else if host_matches(&host, "facebook.") {
        ("Facebook", param("fbclid"))
    } else if host_matches(&host, "linkedin.") {
        ("LinkedIn", param("li_fat_id"))
    } else if host_matches(&host, "twitter.") || host_matches(&host, "x.com") {
        ("Twitter/X", param("twclid"))
    } else {
        return SocialCampaign::default();
    };

    SocialCampaign {
        platform: Some(platform.to_string()),
        campaign_id,
    }
}

/// Display label for a referrer: the bare hostname, `"Direct"` when empty,
/// or the raw string when it does not parse.
pub fn format_referrer(referrer: &str) -> String {
    let referrer = referrer.trim();
    if referrer.is_empty() {
        return "Direct".to_string();
    }
    referrer_host(referrer).unwrap_or_else(|| referrer.to_string())
}

fn referrer_host(referrer: &str) -> Option<String> {
    let url = Url::parse(referrer).ok()?;
    let host = url.host_str()?;
    if host.is_empty() {
        return None;
    }
    Some(strip_www(host))
}

fn strip_www(host: &str) -> String {
    let lower = host.trim().to_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// A pattern matches when it occurs at the start of the host or right after a
/// dot, so `"x.com"` matches `x.com` and `m.x.com` but not `dropbox.com`.
fn host_matches(host: &str, pattern: &str) -> bool {
    host.match_indices(pattern)
        .any(|(idx, _)| idx == 0 || host.as_bytes()[idx - 1] == b'.')
}
