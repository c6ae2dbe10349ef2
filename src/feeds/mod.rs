pub mod events;

use crate::geo::Sentiment;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct FeedMessage {
    pub widget_id: String,
    /// Value of the poller's generation counter when the fetch started.
    pub generation: u64,
    pub data: FeedData,
}

#[derive(Debug, Clone)]
pub enum FeedData {
    Events(Vec<GlobalEvent>),
    /// A forced refresh is under way.
    Loading,
    Error(String),
}

/// Event identifier. The backend sends uuid strings; older builds sent
/// integers, so both are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventId {
    Text(String),
    Number(u64),
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventId::Text(id) => f.write_str(id),
            EventId::Number(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for EventId {
    fn from(id: &str) -> Self {
        EventId::Text(id.to_string())
    }
}

impl From<u64> for EventId {
    fn from(id: u64) -> Self {
        EventId::Number(id)
    }
}

/// A geolocated, sentiment-tagged message as served by `/api/events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalEvent {
    pub id: EventId,
    #[serde(default)]
    pub topic: String,
    pub lat: f64,
    pub lng: f64,
    pub sentiment: Sentiment,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub score: f64,
    /// Seconds since the Unix epoch, as a float.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Set on events injected through `/api/broadcast`.
    #[serde(default)]
    pub is_live: bool,
}

impl GlobalEvent {
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        let ts = self.timestamp?;
        if !ts.is_finite() {
            return None;
        }
        let secs = ts.floor();
        let nanos = ((ts - secs) * 1e9) as u32;
        DateTime::from_timestamp(secs as i64, nanos)
    }

    /// Confidence as a percentage with one decimal, e.g. `87.3%`.
    pub fn confidence_label(&self) -> String {
        format!("{:.1}%", self.score * 100.0)
    }
}

#[async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self) -> Result<FeedData>;
}

/// Poll `fetcher` in the background: once immediately, then on every
/// `interval` tick or whenever `refresh` is notified. A forced refresh is
/// announced with [`FeedData::Loading`] before fetching.
///
/// Every message carries the value `generation` had when its fetch began, so
/// the receiver can bump the counter and discard results that were already in
/// flight. Failed fetches are logged and forwarded as [`FeedData::Error`]; the next
/// tick simply tries again. The task exits once the receiving side of `tx`
/// is dropped. Abort the returned handle to stop it earlier.
pub fn spawn_poller(
    fetcher: Arc<dyn FeedFetcher>,
    widget_id: String,
    interval: Duration,
    tx: mpsc::UnboundedSender<FeedMessage>,
    refresh: Arc<Notify>,
    generation: Arc<AtomicU64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let forced = tokio::select! {
                _ = ticker.tick() => false,
                _ = refresh.notified() => {
                    tracing::debug!(widget = %widget_id, "refresh requested");
                    ticker.reset();
                    true
                }
            };

            let started = generation.load(Ordering::Acquire);
            if forced {
                let loading = FeedMessage {
                    widget_id: widget_id.clone(),
                    generation: started,
                    data: FeedData::Loading,
                };
                if tx.send(loading).is_err() {
                    break;
                }
            }

            let data = match fetcher.fetch().await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!(widget = %widget_id, "fetch failed: {:#}", e);
                    FeedData::Error(e.to_string())
                }
            };

            let message = FeedMessage {
                widget_id: widget_id.clone(),
                generation: started,
                data,
            };
            if tx.send(message).is_err() {
                tracing::debug!(widget = %widget_id, "receiver dropped, stopping poller");
                break;
            }
        }
    })
}
