use chrono::{Duration, Utc};
use kanda_core::{
    analytics::{AnalyticsStore, ReportWindow},
    event::{ClickData, FormAction, FormInteractionData, FormSubmissionData, PageViewRecord, ScrollData, UtmParams},
    geo::GeoLocation,
    referrer::{ReferrerCategory, SocialCampaign},
};
use kanda_duckdb::DuckDbBackend;

fn pageview(session_id: &str, page: &str, at: chrono::DateTime<Utc>) -> PageViewRecord {
    PageViewRecord {
        id: uuid::Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        page: page.to_string(),
        timestamp: at,
        user_agent: None,
        referrer: None,
        referrer_category: ReferrerCategory::Direct,
        referrer_source: "Direct".to_string(),
        search_keywords: None,
        social: SocialCampaign::default(),
        geo: GeoLocation::default(),
        device: None,
        browser: None,
        os: None,
        screen_resolution: None,
        utm: UtmParams::default(),
        entry_page: false,
        is_returning: false,
    }
}

async fn record(db: &DuckDbBackend, pv: PageViewRecord) {
    db.insert_page_view(&pv).await.expect("page view");
    db.upsert_session(&pv).await.expect("session");
}

#[tokio::test]
async fn empty_store_reports_zeroes() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let report = db
        .report(&ReportWindow::last_days(7, Utc::now()))
        .await
        .expect("report");

    assert_eq!(report.period_days, 7);
    assert_eq!(report.summary.total_sessions, 0);
    assert_eq!(report.summary.conversion_rate, 0.0);
    assert_eq!(report.summary.bounce_rate, 0.0);
    assert_eq!(report.summary.avg_pages_per_session, 0.0);
    assert_eq!(report.summary.avg_session_duration, 0);
    assert!(report.page_views_by_page.is_empty());
    assert!(report.device_breakdown.is_empty());
    assert!(report.user_flows.is_empty());
}

#[tokio::test]
async fn summary_and_breakdowns_reflect_sessions() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let now = Utc::now();
    let earlier = now - Duration::hours(2);

    // Converting visitor from a campaign on mobile.
    let mut pv = pageview("a", "/", earlier);
    pv.device = Some("mobile".to_string());
    pv.browser = Some("Safari".to_string());
    pv.geo.country = Some("Kenya".to_string());
    pv.geo.city = Some("Nairobi".to_string());
    pv.utm.utm_source = Some("instagram".to_string());
    pv.utm.utm_campaign = Some("spring".to_string());
    pv.referrer = Some("https://l.instagram.com/".to_string());
    pv.referrer_category = ReferrerCategory::Campaign;
    pv.referrer_source = "instagram".to_string();
    record(&db, pv).await;
    record(&db, pageview("a", "/services", earlier + Duration::seconds(20))).await;
    record(&db, pageview("a", "/contact", earlier + Duration::seconds(40))).await;
    db.mark_page_exit("a", "/contact", 30_000).await.expect("exit");
    db.close_session("a", "/contact", earlier + Duration::seconds(70))
        .await
        .expect("close");
    db.insert_form_submission(
        &FormSubmissionData {
            session_id: "a".to_string(),
            form_type: "lead".to_string(),
            page: "/contact".to_string(),
            success: true,
            time_taken: Some(60_000),
            field_errors: None,
        },
        earlier + Duration::seconds(60),
    )
    .await
    .expect("submission");
    db.mark_converted("a").await.expect("convert");

    // Bouncing visitor with no device.
    record(&db, pageview("b", "/", earlier)).await;
    db.close_session("b", "/", earlier + Duration::seconds(10))
        .await
        .expect("close");

    // A visit outside the window is ignored.
    record(&db, pageview("old", "/", now - Duration::days(30))).await;

    let report = db
        .report(&ReportWindow::last_days(7, now))
        .await
        .expect("report");

    let s = &report.summary;
    assert_eq!(s.total_page_views, 4);
    assert_eq!(s.total_sessions, 2);
    assert_eq!(s.conversions, 1);
    assert_eq!(s.conversion_rate, 50.0);
    assert_eq!(s.bounce_rate, 50.0);
    assert_eq!(s.avg_pages_per_session, 2.0);
    assert_eq!(s.avg_session_duration, 40, "(70s + 10s) / 2");
    assert_eq!(s.total_form_submissions, 1);
    assert_eq!(s.new_visitors, 2);
    assert_eq!(s.active_visitors, 0);

    assert_eq!(report.page_views_by_page[0].page, "/");
    assert_eq!(report.page_views_by_page[0].views, 2);
    let contact = report
        .page_views_by_page
        .iter()
        .find(|p| p.page == "/contact")
        .expect("contact page");
    assert_eq!(contact.avg_time_on_page, 30);

    assert_eq!(report.device_breakdown.get("mobile"), Some(&1));
    assert_eq!(report.device_breakdown.get("unknown"), Some(&1));
    assert_eq!(report.entry_pages[0].page, "/");
    assert_eq!(report.entry_pages[0].count, 2);

    assert_eq!(report.utm_sources.len(), 1);
    assert_eq!(report.utm_sources[0].source, "instagram");
    assert_eq!(report.utm_sources[0].conversion_rate, 100.0);
    assert_eq!(report.city_breakdown[0].country.as_deref(), Some("Kenya"));

    assert_eq!(report.top_referrers.len(), 1);
    assert_eq!(report.top_referrers[0].conversions, 1);

    let flow = report
        .user_flows
        .iter()
        .find(|f| f.path.len() == 3)
        .expect("three-page flow");
    assert_eq!(flow.path, vec!["/", "/services", "/contact"]);

    assert_eq!(report.form_analytics.submissions[0].success_rate, 100.0);
    assert_eq!(report.form_analytics.submissions[0].avg_time_taken, 60);
    assert!(report.recent_conversions.is_empty(), "older than five minutes");
    assert_eq!(report.recent_activity.len(), 4);
    assert_eq!(report.recent_activity[0].page, "/contact");
}

#[tokio::test]
async fn realtime_sections_use_the_five_minute_window() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let now = Utc::now();
    record(&db, pageview("live", "/", now - Duration::minutes(1))).await;
    record(&db, pageview("idle", "/", now - Duration::minutes(20))).await;
    db.insert_form_submission(
        &FormSubmissionData {
            session_id: "live".to_string(),
            form_type: "lead".to_string(),
            page: "/".to_string(),
            success: true,
            time_taken: None,
            field_errors: None,
        },
        now - Duration::minutes(1),
    )
    .await
    .expect("submission");

    let report = db
        .report(&ReportWindow::last_days(1, now))
        .await
        .expect("report");
    assert_eq!(report.summary.active_visitors, 1);
    assert_eq!(report.recent_conversions.len(), 1);
    assert_eq!(report.recent_conversions[0].form_type, "lead");
}

#[tokio::test]
async fn engagement_sections_group_by_page_and_form() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let now = Utc::now();
    for (session, depth) in [("a", 40), ("b", 80)] {
        db.upsert_scroll(
            &ScrollData {
                session_id: session.to_string(),
                page: "/services".to_string(),
                scroll_depth: depth,
                max_scroll_depth: None,
            },
            now,
        )
        .await
        .expect("scroll");
    }
    for (session, field) in [("a", "email"), ("a", "phone"), ("b", "email")] {
        db.insert_form_interaction(
            &FormInteractionData {
                session_id: session.to_string(),
                form_id: "lead-form".to_string(),
                field_name: field.to_string(),
                action: FormAction::Focus,
                time_spent: None,
                page: "/contact".to_string(),
            },
            now,
        )
        .await
        .expect("interaction");
    }
    for _ in 0..3 {
        db.insert_click(
            &ClickData {
                session_id: "a".to_string(),
                element_id: "book-call".to_string(),
                element_type: "button".to_string(),
                element_text: Some("Book a call".to_string()),
                page: "/".to_string(),
                x_position: None,
                y_position: None,
            },
            now,
        )
        .await
        .expect("click");
    }

    let report = db
        .report(&ReportWindow::last_days(7, now))
        .await
        .expect("report");

    assert_eq!(report.scroll_depth[0].page, "/services");
    assert_eq!(report.scroll_depth[0].avg_max_scroll, 60);
    assert_eq!(report.scroll_depth[0].sessions, 2);

    let form = &report.form_analytics.abandonments[0];
    assert_eq!(form.form_id, "lead-form");
    assert_eq!(form.interactions, 3);
    assert_eq!(form.unique_sessions, 2);

    assert_eq!(report.summary.total_clicks, 3);
    assert_eq!(report.top_clicked_elements[0].clicks, 3);
    assert_eq!(
        report.top_clicked_elements[0].element_text.as_deref(),
        Some("Book a call")
    );
}

#[tokio::test]
async fn top_lists_are_capped_at_ten_and_sorted_by_count() {
    let db = DuckDbBackend::open_in_memory().expect("db");
    let now = Utc::now();
    let at = now - Duration::minutes(30);

    // Page `/p{i}` gets `i` views and element `el-{i}` gets `i` clicks, so
    // `/p1` and `el-1` are the ones that fall off.
    for i in 1..=11 {
        for n in 0..i {
            record(&db, pageview(&format!("s{i}-{n}"), &format!("/p{i}"), at)).await;
            db.insert_click(
                &ClickData {
                    session_id: format!("s{i}-{n}"),
                    element_id: format!("el-{i}"),
                    element_type: "button".to_string(),
                    element_text: None,
                    page: format!("/p{i}"),
                    x_position: None,
                    y_position: None,
                },
                at,
            )
            .await
            .expect("click");
        }
    }

    let report = db
        .report(&ReportWindow::last_days(7, now))
        .await
        .expect("report");

    let pages = &report.page_views_by_page;
    assert_eq!(pages.len(), 10);
    assert_eq!(pages[0].page, "/p11");
    assert_eq!(pages[0].views, 11);
    assert!(pages.windows(2).all(|w| w[0].views >= w[1].views));
    assert!(pages.iter().all(|p| p.page != "/p1"));

    let clicks = &report.top_clicked_elements;
    assert_eq!(clicks.len(), 10);
    assert_eq!(clicks[0].element_id, "el-11");
    assert!(clicks.windows(2).all(|w| w[0].clicks >= w[1].clicks));
    assert!(clicks.iter().all(|c| c.element_id != "el-1"));

    let entries = &report.entry_pages;
    assert_eq!(entries.len(), 10);
    assert!(entries.windows(2).all(|w| w[0].count >= w[1].count));
}
