use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use kanda_core::event::{
    ClickData, FormAction, FormInteractionData, FormSubmissionData, PageExitData, PageviewData,
    ScrollData, TrackEvent, UtmParams,
};

use crate::detect::{detect_browser, detect_os, device_type, utm_params};
use crate::element::{closest_trackable, resolve_element_id, ElementDescriptor};
use crate::storage::ClientStorage;
use crate::transport::Transport;
use crate::visit::{scroll_percentage, PageVisit};

pub const SESSION_ID_KEY: &str = "kanda_session_id";
pub const ENTRY_TRACKED_KEY: &str = "kanda_entry_tracked";
pub const VISITED_KEY: &str = "kanda_visited";

/// Quiet period before a scroll depth is sent.
pub const SCROLL_DEBOUNCE: Duration = Duration::from_secs(1);

/// What the client knows about its own environment at load time.
#[derive(Debug, Clone, Default)]
pub struct ClientEnv {
    pub user_agent: String,
    pub referrer: String,
    /// Full URL of the landing page; UTM parameters are read from it once.
    pub url: String,
    pub viewport_width: u32,
    pub screen_width: u32,
    pub screen_height: u32,
}

struct ActiveVisit {
    visit: PageVisit,
    pending_scroll: Option<JoinHandle<()>>,
}

/// One browsing session's instrumentation.
pub struct Tracker {
    transport: Arc<dyn Transport>,
    session_storage: Arc<dyn ClientStorage>,
    local_storage: Arc<dyn ClientStorage>,
    env: ClientEnv,
    utm: UtmParams,
    current: Option<ActiveVisit>,
}

impl Tracker {
    pub fn new(
        transport: Arc<dyn Transport>,
        session_storage: Arc<dyn ClientStorage>,
        local_storage: Arc<dyn ClientStorage>,
        env: ClientEnv,
    ) -> Self {
        let utm = utm_params(&env.url);
        Self {
            transport,
            session_storage,
            local_storage,
            env,
            utm,
            current: None,
        }
    }

    /// The session id, created on first use and never replaced afterwards.
    pub fn session_id(&self) -> String {
        if let Some(id) = self
            .session_storage
            .get(SESSION_ID_KEY)
            .filter(|id| !id.is_empty())
        {
            return id;
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.session_storage.set(SESSION_ID_KEY, &id);
        id
    }

    pub fn current_page(&self) -> Option<&str> {
        self.current.as_ref().map(|active| active.visit.page())
    }

    /// Report a navigation to `page`.
    ///
    /// The previous page's exit fires first, then a new [`PageVisit`] takes
    /// over. Only the first page of a session is flagged as the entry page.
    pub async fn track_page_view(&mut self, page: &str) {
        self.track_page_exit();

        let session_id = self.session_id();
        let entry_page = self.session_storage.get(ENTRY_TRACKED_KEY).is_none();
        if entry_page {
            self.session_storage.set(ENTRY_TRACKED_KEY, "true");
        }
        let is_returning = self.local_storage.get(VISITED_KEY).is_some();
        if !is_returning {
            self.local_storage.set(VISITED_KEY, "true");
        }

        let data = PageviewData {
            session_id,
            page: page.to_string(),
            user_agent: Some(self.env.user_agent.clone()),
            referrer: Some(self.env.referrer.clone()),
            device: Some(device_type(self.env.viewport_width)),
            browser: Some(detect_browser(&self.env.user_agent).to_string()),
            os: Some(detect_os(&self.env.user_agent).to_string()),
            screen_resolution: Some(format!(
                "{}x{}",
                self.env.screen_width, self.env.screen_height
            )),
            utm: self.utm.clone(),
            entry_page,
            is_returning,
        };

        self.current = Some(ActiveVisit {
            visit: PageVisit::start(page),
            pending_scroll: None,
        });
        self.deliver(TrackEvent::Pageview(data)).await;
    }

    /// Page hide/unload, or a route change away from the current page.
    /// Reported once per visit through the transport's beacon path.
    pub fn track_page_exit(&mut self) {
        let Some(active) = self.current.as_mut() else {
            return;
        };
        let Some(time_on_page) = active.visit.exit() else {
            return;
        };
        let page = active.visit.page().to_string();
        let event = TrackEvent::PageExit(PageExitData {
            session_id: self.session_id(),
            page,
            time_on_page,
        });
        self.transport.beacon(event);
    }

    /// Scroll position update. A new maximum restarts the debounce timer;
    /// the depth is sent once scrolling has been quiet for
    /// [`SCROLL_DEBOUNCE`].
    pub fn record_scroll(&mut self, scroll_top: f64, document_height: f64, viewport_height: f64) {
        let depth = scroll_percentage(scroll_top, document_height, viewport_height);
        let session_id = self.session_id();
        let Some(active) = self.current.as_mut() else {
            return;
        };
        if !active.visit.record_scroll(depth) {
            return;
        }

        if let Some(pending) = active.pending_scroll.take() {
            pending.abort();
        }
        let max = active.visit.max_scroll();
        let event = TrackEvent::Scroll(ScrollData {
            session_id,
            page: active.visit.page().to_string(),
            scroll_depth: max,
            max_scroll_depth: Some(max),
        });
        let transport = Arc::clone(&self.transport);
        active.pending_scroll = Some(tokio::spawn(async move {
            tokio::time::sleep(SCROLL_DEBOUNCE).await;
            send_quietly(transport.as_ref(), event).await;
        }));
    }

    /// Delegated click handler. `path[0]` is the click target, followed by
    /// its ancestors; clicks that reach no trackable element are ignored.
    pub async fn track_click(&self, path: &[ElementDescriptor], x: i32, y: i32) {
        let Some(element) = closest_trackable(path) else {
            return;
        };
        let data = ClickData {
            session_id: self.session_id(),
            element_id: resolve_element_id(element),
            element_type: element.element_type(),
            element_text: element.element_text(),
            page: self.location(),
            x_position: Some(x),
            y_position: Some(y),
        };
        self.deliver(TrackEvent::Click(data)).await;
    }

    pub async fn track_form_interaction(
        &self,
        form_id: &str,
        field_name: &str,
        action: FormAction,
        time_spent: Option<u64>,
    ) {
        let data = FormInteractionData {
            session_id: self.session_id(),
            form_id: form_id.to_string(),
            field_name: field_name.to_string(),
            action,
            time_spent,
            page: self.location(),
        };
        self.deliver(TrackEvent::FormInteraction(data)).await;
    }

    pub async fn track_form_submission(
        &self,
        form_type: &str,
        success: bool,
        time_taken: Option<u64>,
        field_errors: Option<Vec<String>>,
    ) {
        let data = FormSubmissionData {
            session_id: self.session_id(),
            form_type: form_type.to_string(),
            page: self.location(),
            success,
            time_taken,
            field_errors,
        };
        self.deliver(TrackEvent::FormSubmission(data)).await;
    }

    fn location(&self) -> String {
        if let Some(page) = self.current_page() {
            return page.to_string();
        }
        url::Url::parse(&self.env.url)
            .map(|u| u.path().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    async fn deliver(&self, event: TrackEvent) {
        send_quietly(self.transport.as_ref(), event).await;
    }
}

async fn send_quietly(transport: &dyn Transport, event: TrackEvent) {
    if let Err(e) = transport.send(&event).await {
        tracing::debug!(event_type = %event.kind(), error = %e, "Tracking event not delivered");
    }
}
