//! Lifecycle event bus
//!
//! The vault SDK announces initialization progress with named events. The
//! names and payload fields (`chainId`, `percent`, `error`) are the only
//! coupling point with the SDK and serialize exactly as listed below.
//!
//! Delivery is fire-and-forget and at most once per listener. A
//! [`tokio::sync::broadcast`] channel keeps publishes in order for every
//! listener, which is stronger than the per-event-name ordering consumers
//! rely on.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::chain::ChainId;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum LifecycleEvent {
    SignatureRequested,
    InitStarted {
        #[serde(rename = "chainId")]
        chain_id: ChainId,
    },
    ScanStarted {
        #[serde(rename = "chainId")]
        chain_id: ChainId,
    },
    InitProgress,
    BootstrapProgress {
        #[serde(rename = "chainId")]
        chain_id: ChainId,
        percent: f64,
    },
    /// Without `chainId` the event applies to the network being initialized
    ScanComplete {
        #[serde(rename = "chainId", default, skip_serializing_if = "Option::is_none")]
        chain_id: Option<ChainId>,
    },
    InitCompleted,
    InitFailed {
        error: String,
    },
    WalletMetadataReady,
}

impl LifecycleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::SignatureRequested => "SignatureRequested",
            LifecycleEvent::InitStarted { .. } => "InitStarted",
            LifecycleEvent::ScanStarted { .. } => "ScanStarted",
            LifecycleEvent::InitProgress => "InitProgress",
            LifecycleEvent::BootstrapProgress { .. } => "BootstrapProgress",
            LifecycleEvent::ScanComplete { .. } => "ScanComplete",
            LifecycleEvent::InitCompleted => "InitCompleted",
            LifecycleEvent::InitFailed { .. } => "InitFailed",
            LifecycleEvent::WalletMetadataReady => "WalletMetadataReady",
        }
    }

    /// Network the event is scoped to, if it names one
    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            LifecycleEvent::InitStarted { chain_id }
            | LifecycleEvent::ScanStarted { chain_id }
            | LifecycleEvent::BootstrapProgress { chain_id, .. } => Some(*chain_id),
            LifecycleEvent::ScanComplete { chain_id } => *chain_id,
            _ => None,
        }
    }
}

/// Process-wide multi-producer / multi-consumer lifecycle channel
#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current listener, returns how many were reached
    pub fn publish(&self, event: LifecycleEvent) -> usize {
        log::debug!("lifecycle event: {}", event.name());
        match self.tx.send(event) {
            Ok(listeners) => listeners,
            Err(broadcast::error::SendError(event)) => {
                log::debug!("No listeners for {}", event.name());
                0
            }
        }
    }

    pub fn subscribe(&self) -> EventListener {
        EventListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

pub struct EventListener {
    rx: broadcast::Receiver<LifecycleEvent>,
}

impl EventListener {
    /// Next event, or `None` once every publisher is gone
    ///
    /// A listener that fell behind skips the overwritten events.
    pub async fn next(&mut self) -> Option<LifecycleEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Lifecycle listener lagged, {} event(s) dropped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        let json = serde_json::to_value(LifecycleEvent::BootstrapProgress {
            chain_id: ChainId(137),
            percent: 45.0,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"event": "BootstrapProgress", "chainId": 137, "percent": 45.0})
        );

        let parsed: LifecycleEvent =
            serde_json::from_str(r#"{"event":"InitFailed","error":"proof worker crashed"}"#).unwrap();
        assert_eq!(
            parsed,
            LifecycleEvent::InitFailed {
                error: "proof worker crashed".into()
            }
        );
    }

    #[test]
    fn test_scan_complete_chain_is_optional() {
        let bare: LifecycleEvent = serde_json::from_str(r#"{"event":"ScanComplete"}"#).unwrap();
        assert_eq!(bare, LifecycleEvent::ScanComplete { chain_id: None });
        assert_eq!(bare.chain_id(), None);
        assert_eq!(
            serde_json::to_string(&bare).unwrap(),
            r#"{"event":"ScanComplete"}"#
        );
    }

    #[tokio::test]
    async fn test_every_listener_receives_in_order() {
        let bus = EventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        assert_eq!(bus.publish(LifecycleEvent::SignatureRequested), 2);
        bus.publish(LifecycleEvent::InitStarted { chain_id: ChainId(1) });

        for listener in [&mut first, &mut second] {
            assert_eq!(listener.next().await, Some(LifecycleEvent::SignatureRequested));
            assert_eq!(
                listener.next().await,
                Some(LifecycleEvent::InitStarted { chain_id: ChainId(1) })
            );
        }
    }

    #[tokio::test]
    async fn test_publish_without_listeners() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(LifecycleEvent::InitCompleted), 0);
    }

    #[tokio::test]
    async fn test_lagged_listener_keeps_consuming() {
        let bus = EventBus::new(2);
        let mut listener = bus.subscribe();
        for percent in [10.0, 20.0, 30.0] {
            bus.publish(LifecycleEvent::BootstrapProgress {
                chain_id: ChainId(1),
                percent,
            });
        }

        assert_eq!(
            listener.next().await,
            Some(LifecycleEvent::BootstrapProgress {
                chain_id: ChainId(1),
                percent: 20.0
            })
        );
    }
}
