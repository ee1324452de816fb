use anyhow::Result;
use chrono::{DateTime, Utc};
use duckdb::OptionalExt;

use kanda_core::analytics::SessionExit;
use kanda_core::event::PageViewRecord;
use kanda_core::session::is_bounce;

use crate::backend::ts;
use crate::DuckDbBackend;

/// Create the session on its first pageview, or fold a later pageview into
/// it.
///
/// On update: `page_views` is incremented, `last_seen` moves forward, the page
/// is set-added to `pages_visited`, and the referrer category and source are
/// overwritten with this pageview's classification. First-seen, entry page,
/// the raw referrer and `is_returning` are fixed at insert.
///
/// Device, browser, OS, country, city and region take the latest non-empty
/// value rather than the latest value: a pageview without them (a failed geo
/// lookup, a client that sent no UA) leaves the stored ones in place instead
/// of blanking them. UTM fields follow the same rule.
pub(crate) async fn upsert_session_inner(db: &DuckDbBackend, record: &PageViewRecord) -> Result<()> {
    let conn = db.conn.lock().await;
    let now_str = ts(record.timestamp);

    let existing: Option<String> = conn
        .prepare("SELECT pages_visited FROM user_sessions WHERE session_id = ?1")?
        .query_row(duckdb::params![record.session_id], |row| row.get(0))
        .optional()?;

    match existing {
        Some(pages_json) => {
            let pages = add_page(&pages_json, &record.page)?;
            conn.execute(
                "UPDATE user_sessions SET \
                     last_seen = ?1, \
                     page_views = page_views + 1, \
                     pages_visited = ?2, \
                     device = COALESCE(?3, device), \
                     browser = COALESCE(?4, browser), \
                     os = COALESCE(?5, os), \
                     country = COALESCE(?6, country), \
                     city = COALESCE(?7, city), \
                     region = COALESCE(?8, region), \
                     utm_source = COALESCE(?9, utm_source), \
                     utm_medium = COALESCE(?10, utm_medium), \
                     utm_campaign = COALESCE(?11, utm_campaign), \
                     referrer_category = ?12, \
                     referrer_source = ?13 \
                 WHERE session_id = ?14",
                duckdb::params![
                    now_str,
                    pages,
                    record.device,
                    record.browser,
                    record.os,
                    record.geo.country,
                    record.geo.city,
                    record.geo.region,
                    record.utm.utm_source,
                    record.utm.utm_medium,
                    record.utm.utm_campaign,
                    record.referrer_category.as_str(),
                    record.referrer_source,
                    record.session_id,
                ],
            )?;
        }
        None => {
            let pages = serde_json::to_string(&[record.page.as_str()])?;
            conn.execute(
                r#"INSERT INTO user_sessions (
                    session_id, first_seen, last_seen, page_views, pages_visited,
                    entry_page, referrer, referrer_category, referrer_source,
                    device, browser, os, country, city, region,
                    utm_source, utm_medium, utm_campaign, is_returning
                ) VALUES (
                    ?1, ?2, ?3, 1, ?4,
                    ?5, ?6, ?7, ?8,
                    ?9, ?10, ?11, ?12, ?13, ?14,
                    ?15, ?16, ?17, ?18
                )"#,
                duckdb::params![
                    record.session_id,
                    now_str,
                    now_str,
                    pages,
                    record.page,
                    record.referrer,
                    record.referrer_category.as_str(),
                    record.referrer_source,
                    record.device,
                    record.browser,
                    record.os,
                    record.geo.country,
                    record.geo.city,
                    record.geo.region,
                    record.utm.utm_source,
                    record.utm.utm_medium,
                    record.utm.utm_campaign,
                    record.is_returning,
                ],
            )?;
        }
    }

    Ok(())
}

/// Set-add `page` to a JSON array of pages, preserving first-visit order.
fn add_page(pages_json: &str, page: &str) -> Result<String> {
    let mut pages: Vec<String> = serde_json::from_str(pages_json).unwrap_or_default();
    if !pages.iter().any(|p| p == page) {
        pages.push(page.to_string());
    }
    Ok(serde_json::to_string(&pages)?)
}

/// Record the exit page, session duration and bounce flag.
///
/// The duration is measured from `first_seen` to `now`, and the bounce flag is
/// derived from the page-view count observed at this moment. A later exit
/// recomputes both.
pub(crate) async fn close_session_inner(
    db: &DuckDbBackend,
    session_id: &str,
    exit_page: &str,
    now: DateTime<Utc>,
) -> Result<Option<SessionExit>> {
    let conn = db.conn.lock().await;

    let row: Option<(i64, i64)> = conn
        .prepare("SELECT page_views, epoch_ms(first_seen) FROM user_sessions WHERE session_id = ?1")?
        .query_row(duckdb::params![session_id], |row| Ok((row.get(0)?, row.get(1)?)))
        .optional()?;

    let Some((page_views, first_seen_ms)) = row else {
        return Ok(None);
    };

    let session_duration_ms = (now.timestamp_millis() - first_seen_ms).max(0);
    let bounced = is_bounce(page_views, session_duration_ms);

    conn.execute(
        "UPDATE user_sessions SET \
             exit_page = ?1, session_duration = ?2, bounced = ?3 \
         WHERE session_id = ?4",
        duckdb::params![exit_page, session_duration_ms, bounced, session_id],
    )?;

    Ok(Some(SessionExit {
        session_duration_ms,
        page_views,
        bounced,
    }))
}

/// Flip `converted` to true. Re-applying is a no-op on the stored value.
pub(crate) async fn mark_converted_inner(db: &DuckDbBackend, session_id: &str) -> Result<bool> {
    let conn = db.conn.lock().await;
    let rows = conn.execute(
        "UPDATE user_sessions SET converted = true WHERE session_id = ?1",
        duckdb::params![session_id],
    )?;
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::add_page;

    #[test]
    fn add_page_suppresses_duplicates() {
        let once = add_page(r#"["/"]"#, "/pricing").expect("add");
        assert_eq!(once, r#"["/","/pricing"]"#);
        let twice = add_page(&once, "/").expect("add");
        assert_eq!(twice, once);
    }

    #[test]
    fn add_page_recovers_from_corrupt_json() {
        assert_eq!(add_page("not json", "/").expect("add"), r#"["/"]"#);
    }
}
