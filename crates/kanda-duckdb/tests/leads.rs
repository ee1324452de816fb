use chrono::{Duration, Utc};
use kanda_core::lead::{LeadStatus, NewLead};
use kanda_duckdb::DuckDbBackend;
use kanda_metadata::MetadataStore;

fn lead(name: &str) -> NewLead {
    NewLead {
        full_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: "+254700000000".to_string(),
        business_name: "Acme Bakery".to_string(),
        instagram_handle: "@acme".to_string(),
        services: vec!["social".to_string(), "ads".to_string()],
        business_type: "retail".to_string(),
        budget: "1k-5k".to_string(),
        biggest_goal: "More walk-ins".to_string(),
    }
}

#[tokio::test]
async fn leads_are_listed_newest_first() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let store: &dyn MetadataStore = &db;
    let now = Utc::now();
    let first = store
        .insert_lead(&lead("Amina"), now - Duration::hours(1))
        .await
        .expect("insert");
    let second = store.insert_lead(&lead("Brian"), now).await.expect("insert");

    let leads = store.list_leads().await.expect("list");
    assert_eq!(leads.len(), 2);
    assert_eq!(leads[0].id, second);
    assert_eq!(leads[1].id, first);
    assert_eq!(leads[0].status, LeadStatus::New);
    assert_eq!(leads[0].services, vec!["social", "ads"]);
    assert!(leads[0].updated_at.is_none());
}

#[tokio::test]
async fn status_update_touches_only_known_leads() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let now = Utc::now();
    let id = db.insert_lead(&lead("Amina"), now).await.expect("insert");

    assert!(db
        .update_lead_status(&id, LeadStatus::Qualified, now + Duration::minutes(5))
        .await
        .expect("update"));
    assert!(!db
        .update_lead_status("missing", LeadStatus::Contacted, now)
        .await
        .expect("update"));

    let leads = db.list_leads().await.expect("list");
    assert_eq!(leads[0].status, LeadStatus::Qualified);
    assert!(leads[0].updated_at.is_some());
}
