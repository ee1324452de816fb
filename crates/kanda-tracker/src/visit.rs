use tokio::time::Instant;

/// State owned by one navigation: when the page started, how far it has been
/// scrolled, and whether its exit was already reported. A fresh visit is
/// created per navigation, so nothing leaks from one page to the next.
#[derive(Debug, Clone)]
pub struct PageVisit {
    page: String,
    started: Instant,
    max_scroll: u32,
    exit_tracked: bool,
}

impl PageVisit {
    pub fn start(page: impl Into<String>) -> Self {
        Self {
            page: page.into(),
            started: Instant::now(),
            max_scroll: 0,
            exit_tracked: false,
        }
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn max_scroll(&self) -> u32 {
        self.max_scroll
    }

    pub fn exit_tracked(&self) -> bool {
        self.exit_tracked
    }

    /// Raise the running maximum. Returns `true` only on a strict increase.
    pub fn record_scroll(&mut self, depth: u32) -> bool {
        let depth = depth.min(100);
        if depth > self.max_scroll {
            self.max_scroll = depth;
            true
        } else {
            false
        }
    }

    /// Milliseconds on the page, the first time only. Later calls return
    /// `None`.
    pub fn exit(&mut self) -> Option<u64> {
        if self.exit_tracked {
            return None;
        }
        self.exit_tracked = true;
        let elapsed = Instant::now().saturating_duration_since(self.started);
        Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }
}

/// Percentage of the scrollable document height above the viewport bottom,
/// rounded and clamped to `0..=100`. A document that fits in the viewport
/// counts as fully seen.
pub fn scroll_percentage(scroll_top: f64, document_height: f64, viewport_height: f64) -> u32 {
    let scrollable = document_height - viewport_height;
    if !scrollable.is_finite() || scrollable <= 0.0 {
        return 100;
    }
    let pct = (scroll_top.max(0.0) / scrollable * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn scroll_only_moves_up() {
        let mut visit = PageVisit::start("/");
        assert!(visit.record_scroll(40));
        assert!(!visit.record_scroll(40));
        assert!(!visit.record_scroll(10));
        assert!(visit.record_scroll(75));
        // Over-reported depths are capped, so the first one still raises the max.
        assert!(visit.record_scroll(250));
        assert_eq!(visit.max_scroll(), 100);
        assert!(!visit.record_scroll(300));
        assert!(!visit.record_scroll(100));
    }

    #[tokio::test(start_paused = true)]
    async fn exit_is_reported_once() {
        let mut visit = PageVisit::start("/pricing");
        tokio::time::advance(Duration::from_millis(4_500)).await;
        assert_eq!(visit.exit(), Some(4_500));
        assert!(visit.exit_tracked());
        tokio::time::advance(Duration::from_millis(1_000)).await;
        assert_eq!(visit.exit(), None);
    }

    #[test]
    fn scroll_percentage_bounds() {
        assert_eq!(scroll_percentage(0.0, 3000.0, 1000.0), 0);
        assert_eq!(scroll_percentage(1000.0, 3000.0, 1000.0), 50);
        assert_eq!(scroll_percentage(2000.0, 3000.0, 1000.0), 100);
        assert_eq!(scroll_percentage(2600.0, 3000.0, 1000.0), 100);
        assert_eq!(scroll_percentage(0.0, 800.0, 1000.0), 100);
    }
}
