use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use kanda_core::event::TrackEvent;

/// Delivery of tracking events to the ingestion endpoint.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver one event and report the outcome.
    async fn send(&self, event: &TrackEvent) -> Result<()>;

    /// Send and forget. Must return immediately and keep going while the
    /// page is being torn down. Failures are never reported.
    fn beacon(&self, event: TrackEvent);
}

/// `POST {endpoint}` with the event as its JSON body.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(concat!("kanda-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, event: &TrackEvent) -> Result<()> {
        self.client
            .post(&self.endpoint)
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn beacon(&self, event: TrackEvent) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(event_type = %event.kind(), "No runtime for beacon, event dropped");
            return;
        };
        let transport = self.clone();
        handle.spawn(async move {
            if let Err(e) = transport.send(&event).await {
                tracing::debug!(event_type = %event.kind(), error = %e, "Beacon failed");
            }
        });
    }
}
