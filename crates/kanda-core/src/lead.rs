use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;

/// Pipeline stage of a lead. New submissions always start at `New`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "converted" => Ok(LeadStatus::Converted),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

/// Wire names of the fields a lead must carry, checked in this order.
pub const REQUIRED_LEAD_FIELDS: [&str; 8] = [
    "fullName",
    "email",
    "phone",
    "businessName",
    "instagramHandle",
    "businessType",
    "budget",
    "biggestGoal",
];

/// A validated lead submission, ready to be stored with `status = new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLead {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub business_name: String,
    pub instagram_handle: String,
    pub services: Vec<String>,
    pub business_type: String,
    pub budget: String,
    pub biggest_goal: String,
}

impl NewLead {
    /// Validate a raw JSON body from the public intake form.
    ///
    /// The first missing (absent, non-string or blank) required field is
    /// reported by its wire name; then `services` must be a non-empty list.
    pub fn from_json(body: &Value) -> Result<Self, CoreError> {
        let mut values = Vec::with_capacity(REQUIRED_LEAD_FIELDS.len());
        for field in REQUIRED_LEAD_FIELDS {
            let value = body
                .get(field)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or(CoreError::MissingField(field))?;
            values.push(value.to_string());
        }

        let services: Vec<String> = body
            .get("services")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        if services.is_empty() {
            return Err(CoreError::NoServices);
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            full_name: next(),
            email: next(),
            phone: next(),
            business_name: next(),
            instagram_handle: next(),
            business_type: next(),
            budget: next(),
            biggest_goal: next(),
            services,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_body() -> Value {
        json!({
            "fullName": "Ada Lovelace",
            "email": "ada@example.com",
            "phone": "+44 20 7946 0000",
            "businessName": "Analytical Engines",
            "instagramHandle": "@engines",
            "businessType": "ecommerce",
            "budget": "1k-5k",
            "biggestGoal": "More qualified leads",
            "services": ["short-form video"]
        })
    }

    #[test]
    fn accepts_a_complete_submission() {
        let lead = NewLead::from_json(&complete_body()).expect("valid lead");
        assert_eq!(lead.email, "ada@example.com");
        assert_eq!(lead.business_type, "ecommerce");
        assert_eq!(lead.biggest_goal, "More qualified leads");
        assert_eq!(lead.services, vec!["short-form video".to_string()]);
    }

    #[test]
    fn names_the_first_missing_field() {
        let mut body = complete_body();
        body.as_object_mut().expect("object").remove("email");
        body["budget"] = json!("");
        let err = NewLead::from_json(&body).unwrap_err();
        assert_eq!(err.to_string(), "Missing required field: email");
    }

    #[test]
    fn rejects_empty_services() {
        let mut body = complete_body();
        body["services"] = json!([]);
        assert!(matches!(
            NewLead::from_json(&body),
            Err(CoreError::NoServices)
        ));
    }

    #[test]
    fn status_parsing() {
        assert_eq!("qualified".parse::<LeadStatus>().expect("parse"), LeadStatus::Qualified);
        assert!(matches!(
            "bogus".parse::<LeadStatus>(),
            Err(CoreError::InvalidStatus(_))
        ));
    }
}
