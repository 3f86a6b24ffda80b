//! Fixed-period background fetching
//!
//! [`PollTask`] fetches once on activation and then once per period, pushing
//! every successful snapshot into a channel. Failures are logged and skipped,
//! so the receiver only ever sees good snapshots. Dropping the task aborts
//! it; there is no separate stop call to forget.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::models::NotificationItem;

/// Handle to a running poll loop. The loop stops when this is dropped.
#[derive(Debug)]
pub struct PollTask {
    handle: JoinHandle<()>,
}

impl PollTask {
    /// Start polling `fetch` every `period`, sending results to `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<T, E, F, Fut>(
        label: &'static str,
        period: Duration,
        fetch: F,
        sink: UnboundedSender<T>,
    ) -> Self
    where
        T: Send + 'static,
        E: Display + Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // The first tick completes immediately
                ticker.tick().await;

                match fetch().await {
                    Ok(snapshot) => {
                        if sink.send(snapshot).is_err() {
                            debug!("{} poller receiver gone, stopping", label);
                            break;
                        }
                    }
                    Err(e) => warn!("Failed to fetch {}: {}", label, e),
                }
            }
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for PollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Latest notification snapshot plus the "has unseen" flag
#[derive(Debug, Default)]
pub struct NotificationFeed {
    items: Vec<NotificationItem>,
    has_unseen: bool,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot. Raises the unseen flag when the collection grew.
    pub fn apply(&mut self, snapshot: Vec<NotificationItem>) {
        if snapshot.len() > self.items.len() {
            self.has_unseen = true;
        }
        self.items = snapshot;
    }

    /// User looked at the activity list
    pub fn acknowledge(&mut self) {
        self.has_unseen = false;
    }

    pub fn has_unseen(&self) -> bool {
        self.has_unseen
    }

    pub fn items(&self) -> &[NotificationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
