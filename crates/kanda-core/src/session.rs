//! Session-level classification shared by the store and the reporting layer.

/// A session that exits in under this many milliseconds with at most one
/// pageview is a bounce.
pub const BOUNCE_THRESHOLD_MS: i64 = 30_000;

/// Pages kept per session when reporting user-flow prefixes.
pub const FLOW_PREFIX_LEN: usize = 5;

/// Classify a session at exit time.
///
/// `page_views` is the session counter as observed when the exit arrives;
/// a concurrent pageview for the same session may not be visible yet, so the
/// answer is best-effort.
pub fn is_bounce(page_views: i64, session_duration_ms: i64) -> bool {
    page_views <= 1 && session_duration_ms < BOUNCE_THRESHOLD_MS
}
