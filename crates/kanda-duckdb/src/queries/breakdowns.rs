use std::collections::BTreeMap;

use anyhow::Result;
use duckdb::Connection;

use kanda_core::analytics::{
    ms_to_seconds, percentage, BrowserCount, CityCount, ClickedElement, CountryCount,
    DailyViews, DailyVisitors, OsCount, PageCount, PageStat, ReferrerCategoryCount,
    ReferrerStat, UtmCampaignStat, UtmSourceStat, TOP_N,
};
use kanda_core::referrer::format_referrer;

fn top_n() -> i64 {
    TOP_N as i64
}

pub(crate) fn query_pages(conn: &Connection, start: &str) -> Result<Vec<PageStat>> {
    let mut stmt = conn.prepare(
        "SELECT page, COUNT(*) AS views, AVG(time_on_page) \
         FROM page_views \
         WHERE created_at >= ?1 \
         GROUP BY page \
         ORDER BY views DESC, page \
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        Ok(PageStat {
            page: row.get(0)?,
            views: row.get(1)?,
            avg_time_on_page: ms_to_seconds(row.get::<_, Option<f64>>(2)?),
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_entry_pages(conn: &Connection, start: &str) -> Result<Vec<PageCount>> {
    query_page_counts(
        conn,
        "SELECT entry_page, COUNT(*) AS c FROM user_sessions \
         WHERE first_seen >= ?1 \
         GROUP BY entry_page ORDER BY c DESC, entry_page LIMIT ?2",
        start,
    )
}

pub(crate) fn query_exit_pages(conn: &Connection, start: &str) -> Result<Vec<PageCount>> {
    query_page_counts(
        conn,
        "SELECT exit_page, COUNT(*) AS c FROM user_sessions \
         WHERE first_seen >= ?1 AND exit_page IS NOT NULL \
         GROUP BY exit_page ORDER BY c DESC, exit_page LIMIT ?2",
        start,
    )
}

fn query_page_counts(conn: &Connection, sql: &str, start: &str) -> Result<Vec<PageCount>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        Ok(PageCount {
            page: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_clicked_elements(
    conn: &Connection,
    start: &str,
) -> Result<Vec<ClickedElement>> {
    let mut stmt = conn.prepare(
        "SELECT element_id, element_type, ANY_VALUE(element_text), COUNT(*) AS clicks \
         FROM click_events \
         WHERE created_at >= ?1 \
         GROUP BY element_id, element_type \
         ORDER BY clicks DESC, element_id \
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        Ok(ClickedElement {
            element_id: row.get(0)?,
            element_type: row.get(1)?,
            element_text: row.get(2)?,
            clicks: row.get(3)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

/// Sessions per device; sessions without a device are counted as `unknown`.
pub(crate) fn query_devices(conn: &Connection, start: &str) -> Result<BTreeMap<String, i64>> {
    let mut stmt = conn.prepare(
        "SELECT COALESCE(device, 'unknown') AS d, COUNT(*) \
         FROM user_sessions \
         WHERE first_seen >= ?1 \
         GROUP BY d",
    )?;
    let rows = stmt.query_map(duckdb::params![start], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut devices = BTreeMap::new();
    for row in rows {
        let (device, count) = row?;
        devices.insert(device, count);
    }
    Ok(devices)
}

pub(crate) fn query_browsers(conn: &Connection, start: &str) -> Result<Vec<BrowserCount>> {
    let mut stmt = conn.prepare(
        "SELECT browser, COUNT(*) AS c FROM user_sessions \
         WHERE first_seen >= ?1 AND browser IS NOT NULL \
         GROUP BY browser ORDER BY c DESC, browser LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        Ok(BrowserCount {
            browser: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_os(conn: &Connection, start: &str) -> Result<Vec<OsCount>> {
    let mut stmt = conn.prepare(
        "SELECT os, COUNT(*) AS c FROM user_sessions \
         WHERE first_seen >= ?1 AND os IS NOT NULL \
         GROUP BY os ORDER BY c DESC, os LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        Ok(OsCount {
            os: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_countries(conn: &Connection, start: &str) -> Result<Vec<CountryCount>> {
    let mut stmt = conn.prepare(
        "SELECT country, COUNT(*) AS visitors FROM user_sessions \
         WHERE first_seen >= ?1 AND country IS NOT NULL \
         GROUP BY country ORDER BY visitors DESC, country LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        Ok(CountryCount {
            country: row.get(0)?,
            visitors: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_cities(conn: &Connection, start: &str) -> Result<Vec<CityCount>> {
    let mut stmt = conn.prepare(
        "SELECT city, country, COUNT(*) AS visitors FROM user_sessions \
         WHERE first_seen >= ?1 AND city IS NOT NULL \
         GROUP BY city, country ORDER BY visitors DESC, city LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        Ok(CityCount {
            city: row.get(0)?,
            country: row.get(1)?,
            visitors: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_utm_sources(conn: &Connection, start: &str) -> Result<Vec<UtmSourceStat>> {
    let mut stmt = conn.prepare(
        "SELECT utm_source, COUNT(*) AS visitors, COUNT(*) FILTER (WHERE converted) \
         FROM user_sessions \
         WHERE first_seen >= ?1 AND utm_source IS NOT NULL \
         GROUP BY utm_source ORDER BY visitors DESC, utm_source LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        let visitors: i64 = row.get(1)?;
        let conversions: i64 = row.get(2)?;
        Ok(UtmSourceStat {
            source: row.get(0)?,
            visitors,
            conversions,
            conversion_rate: percentage(conversions, visitors),
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_utm_campaigns(
    conn: &Connection,
    start: &str,
) -> Result<Vec<UtmCampaignStat>> {
    let mut stmt = conn.prepare(
        "SELECT utm_campaign, COUNT(*) AS visitors, COUNT(*) FILTER (WHERE converted) \
         FROM user_sessions \
         WHERE first_seen >= ?1 AND utm_campaign IS NOT NULL \
         GROUP BY utm_campaign ORDER BY visitors DESC, utm_campaign LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        let visitors: i64 = row.get(1)?;
        let conversions: i64 = row.get(2)?;
        Ok(UtmCampaignStat {
            campaign: row.get(0)?,
            visitors,
            conversions,
            conversion_rate: percentage(conversions, visitors),
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

/// Page views per UTC day, oldest first.
pub(crate) fn query_daily_views(conn: &Connection, start: &str) -> Result<Vec<DailyViews>> {
    let mut stmt = conn.prepare(
        "SELECT strftime(created_at, '%Y-%m-%d') AS day, COUNT(*) \
         FROM page_views \
         WHERE created_at >= ?1 \
         GROUP BY day ORDER BY day",
    )?;
    let rows = stmt.query_map(duckdb::params![start], |row| {
        Ok(DailyViews {
            date: row.get(0)?,
            views: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

/// New sessions (and how many converted) per UTC day, oldest first.
pub(crate) fn query_daily_visitors(conn: &Connection, start: &str) -> Result<Vec<DailyVisitors>> {
    let mut stmt = conn.prepare(
        "SELECT strftime(first_seen, '%Y-%m-%d') AS day, COUNT(*), \
                COUNT(*) FILTER (WHERE converted) \
         FROM user_sessions \
         WHERE first_seen >= ?1 \
         GROUP BY day ORDER BY day",
    )?;
    let rows = stmt.query_map(duckdb::params![start], |row| {
        Ok(DailyVisitors {
            date: row.get(0)?,
            visitors: row.get(1)?,
            conversions: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_referrers(conn: &Connection, start: &str) -> Result<Vec<ReferrerStat>> {
    let mut stmt = conn.prepare(
        "SELECT referrer, COUNT(*) AS c, COUNT(*) FILTER (WHERE converted) \
         FROM user_sessions \
         WHERE first_seen >= ?1 AND referrer IS NOT NULL AND referrer <> '' \
         GROUP BY referrer ORDER BY c DESC, referrer LIMIT ?2",
    )?;
    let rows = stmt.query_map(duckdb::params![start, top_n()], |row| {
        let referrer: String = row.get(0)?;
        Ok(ReferrerStat {
            label: format_referrer(&referrer),
            referrer,
            count: row.get(1)?,
            conversions: row.get(2)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}

pub(crate) fn query_referrer_categories(
    conn: &Connection,
    start: &str,
) -> Result<Vec<ReferrerCategoryCount>> {
    let mut stmt = conn.prepare(
        "SELECT referrer_category, COUNT(*) AS c FROM user_sessions \
         WHERE first_seen >= ?1 \
         GROUP BY referrer_category ORDER BY c DESC, referrer_category",
    )?;
    let rows = stmt.query_map(duckdb::params![start], |row| {
        Ok(ReferrerCategoryCount {
            category: row.get(0)?,
            count: row.get(1)?,
        })
    })?;
    Ok(rows.collect::<duckdb::Result<Vec<_>>>()?)
}
