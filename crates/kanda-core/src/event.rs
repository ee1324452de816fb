use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::CoreError;
use crate::geo::GeoLocation;
use crate::referrer::{ReferrerCategory, SocialCampaign};

/// The raw body the client sends to POST /api/analytics/track.
///
/// `data` is decoded only after `eventType` has been matched against
/// [`EventKind`], so an unknown type is reported as such rather than as a
/// payload shape error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEnvelope {
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// The closed set of event types accepted by the ingestion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Pageview,
    PageExit,
    Scroll,
    Click,
    FormInteraction,
    FormSubmission,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::Pageview,
        EventKind::PageExit,
        EventKind::Scroll,
        EventKind::Click,
        EventKind::FormInteraction,
        EventKind::FormSubmission,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Pageview => "pageview",
            EventKind::PageExit => "page_exit",
            EventKind::Scroll => "scroll",
            EventKind::Click => "click",
            EventKind::FormInteraction => "form_interaction",
            EventKind::FormSubmission => "form_submission",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::UnknownEventType(s.to_string()))
    }
}

/// A decoded tracking event. Serializes to the same `{eventType, data}`
/// envelope the endpoint accepts, which is what the tracker sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "data", rename_all = "snake_case")]
pub enum TrackEvent {
    Pageview(PageviewData),
    PageExit(PageExitData),
    Scroll(ScrollData),
    Click(ClickData),
    FormInteraction(FormInteractionData),
    FormSubmission(FormSubmissionData),
}

impl TrackEvent {
    /// Decode an envelope into a typed event.
    ///
    /// Unknown `eventType` values yield [`CoreError::UnknownEventType`]; a
    /// `data` object that does not fit the variant, or that carries an empty
    /// session id or page, yields [`CoreError::InvalidPayload`].
    pub fn from_envelope(envelope: TrackEnvelope) -> Result<Self, CoreError> {
        let kind: EventKind = envelope.event_type.parse()?;
        let data = envelope.data;
        let event = match kind {
            EventKind::Pageview => TrackEvent::Pageview(decode(kind, data)?),
            EventKind::PageExit => TrackEvent::PageExit(decode(kind, data)?),
            EventKind::Scroll => TrackEvent::Scroll(decode(kind, data)?),
            EventKind::Click => TrackEvent::Click(decode(kind, data)?),
            EventKind::FormInteraction => TrackEvent::FormInteraction(decode(kind, data)?),
            EventKind::FormSubmission => TrackEvent::FormSubmission(decode(kind, data)?),
        };
        event.validate()?;
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self {
            TrackEvent::Pageview(_) => EventKind::Pageview,
            TrackEvent::PageExit(_) => EventKind::PageExit,
            TrackEvent::Scroll(_) => EventKind::Scroll,
            TrackEvent::Click(_) => EventKind::Click,
            TrackEvent::FormInteraction(_) => EventKind::FormInteraction,
            TrackEvent::FormSubmission(_) => EventKind::FormSubmission,
        }
    }

    pub fn session_id(&self) -> &str {
        match self {
            TrackEvent::Pageview(d) => &d.session_id,
            TrackEvent::PageExit(d) => &d.session_id,
            TrackEvent::Scroll(d) => &d.session_id,
            TrackEvent::Click(d) => &d.session_id,
            TrackEvent::FormInteraction(d) => &d.session_id,
            TrackEvent::FormSubmission(d) => &d.session_id,
        }
    }

    pub fn page(&self) -> &str {
        match self {
            TrackEvent::Pageview(d) => &d.page,
            TrackEvent::PageExit(d) => &d.page,
            TrackEvent::Scroll(d) => &d.page,
            TrackEvent::Click(d) => &d.page,
            TrackEvent::FormInteraction(d) => &d.page,
            TrackEvent::FormSubmission(d) => &d.page,
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        let invalid = |reason: &str| CoreError::InvalidPayload {
            kind: self.kind().as_str(),
            reason: reason.to_string(),
        };
        if self.session_id().trim().is_empty() {
            return Err(invalid("sessionId must not be empty"));
        }
        if self.page().trim().is_empty() {
            return Err(invalid("page must not be empty"));
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(kind: EventKind, data: serde_json::Value) -> Result<T, CoreError> {
    serde_json::from_value(data).map_err(|e| CoreError::InvalidPayload {
        kind: kind.as_str(),
        reason: e.to_string(),
    })
}

/// Viewport bucket reported by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
        }
    }
}

/// Campaign-tracking query-string fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtmParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
}

impl UtmParams {
    /// Drop empty strings so "present" always means "non-empty".
    pub fn normalized(self) -> Self {
        Self {
            utm_source: non_empty(self.utm_source),
            utm_medium: non_empty(self.utm_medium),
            utm_campaign: non_empty(self.utm_campaign),
            utm_term: non_empty(self.utm_term),
            utm_content: non_empty(self.utm_content),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.utm_source.is_none()
            && self.utm_medium.is_none()
            && self.utm_campaign.is_none()
            && self.utm_term.is_none()
            && self.utm_content.is_none()
    }
}

/// Map `Some("")` (and whitespace-only strings) to `None`.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageviewData {
    pub session_id: String,
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screen_resolution: Option<String>,
    #[serde(flatten)]
    pub utm: UtmParams,
    #[serde(default)]
    pub entry_page: bool,
    #[serde(default)]
    pub is_returning: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageExitData {
    pub session_id: String,
    pub page: String,
    /// Milliseconds between the page load and the exit signal.
    pub time_on_page: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollData {
    pub session_id: String,
    pub page: String,
    pub scroll_depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_scroll_depth: Option<u32>,
}

impl ScrollData {
    /// The depth to merge into the stored running maximum: the larger of the
    /// reported current and maximum depths, capped at 100.
    pub fn depth_candidate(&self) -> u32 {
        self.scroll_depth
            .max(self.max_scroll_depth.unwrap_or(0))
            .min(100)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickData {
    pub session_id: String,
    pub element_id: String,
    pub element_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_position: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormAction {
    Focus,
    Blur,
    Change,
    Error,
}

impl FormAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FormAction::Focus => "focus",
            FormAction::Blur => "blur",
            FormAction::Change => "change",
            FormAction::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInteractionData {
    pub session_id: String,
    pub form_id: String,
    pub field_name: String,
    pub action: FormAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u64>,
    pub page: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmissionData {
    pub session_id: String,
    pub form_type: String,
    pub page: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<Vec<String>>,
}

/// The enriched, stored version of a pageview. Mirrors the `page_views`
/// table columns. Built by the ingestion endpoint from [`PageviewData`] plus
/// geo and referrer enrichment.
#[derive(Debug, Clone, Serialize)]
pub struct PageViewRecord {
    pub id: String,
    pub session_id: String,
    pub page: String,
    pub timestamp: DateTime<Utc>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub referrer_category: ReferrerCategory,
    pub referrer_source: String,
    pub search_keywords: Option<String>,
    /// Paid-social click id found on the referrer, if any.
    pub social: SocialCampaign,
    pub geo: GeoLocation,
    pub device: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub screen_resolution: Option<String>,
    pub utm: UtmParams,
    pub entry_page: bool,
    pub is_returning: bool,
}
