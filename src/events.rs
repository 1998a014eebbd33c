//! Optional NATS publisher for domain events.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventBus { nats: Option<async_nats::Client> }

impl EventBus {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(url, "connected to event bus");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "event bus unavailable, events will only be logged");
                Self::disabled()
            }
        }
    }

    /// Fire-and-forget: a failed publish is logged and never fails the request.
    pub async fn publish(&self, event: DomainEvent) {
        let Some(client) = &self.nats else {
            tracing::debug!(?event, "event bus disabled");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => { tracing::warn!(error = %e, "could not encode event"); return; }
        };
        if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
            tracing::warn!(subject = event.subject(), error = %e, "event publish failed");
        }
    }
}
