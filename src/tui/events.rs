//! Event handling for the PMS TUI
//!
//! Network calls run on spawned tasks and report back through an unbounded
//! channel. Each report carries a [`Liveness`] probe for the screen that
//! issued it; once that screen is torn down the probe goes dead and the
//! report is dropped instead of being applied to a screen that no longer
//! exists.

use std::future::Future;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::api::{ApiError, PmsApi};
use crate::models::{Expenditure, RiskIssueItem};

/// Owned by a mounted screen; dropping it marks the screen torn down
#[derive(Debug, Default)]
pub struct Lifetime(Arc<()>);

impl Lifetime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> Liveness {
        Liveness(Arc::downgrade(&self.0))
    }
}

/// Cheap handle answering "is the issuing screen still mounted?"
#[derive(Debug, Clone)]
pub struct Liveness(Weak<()>);

impl Liveness {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// Completed remote operations, routed to the screen that started them
#[derive(Debug)]
pub enum ScreenEvent {
    RiskIssuesLoaded(Result<Vec<RiskIssueItem>, ApiError>),
    RiskIssueCreated(Result<RiskIssueItem, ApiError>),
    RiskIssueStatusChanged(Result<(), ApiError>),
    ExpendituresLoaded(Result<Vec<Expenditure>, ApiError>),
    ExpenditureCreated(Result<(), ApiError>),
}

/// Application events delivered to the main loop
#[derive(Debug)]
pub enum AppEvent {
    Screen {
        origin: Liveness,
        event: ScreenEvent,
    },
}

/// Spawns API calls on behalf of screens and posts their results back
#[derive(Clone)]
pub struct Dispatcher {
    api: Arc<dyn PmsApi>,
    events: UnboundedSender<AppEvent>,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn PmsApi>, events: UnboundedSender<AppEvent>) -> Self {
        Self { api, events }
    }

    pub fn api(&self) -> Arc<dyn PmsApi> {
        self.api.clone()
    }

    /// Fire-and-forget: the call runs to completion even if the screen
    /// goes away, and its result is discarded in that case.
    pub fn spawn<F, Fut>(&self, origin: Liveness, call: F)
    where
        F: FnOnce(Arc<dyn PmsApi>) -> Fut,
        Fut: Future<Output = ScreenEvent> + Send + 'static,
    {
        let request = call(self.api.clone());
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = request.await;
            if !origin.is_alive() {
                debug!("Discarding {:?} for a torn-down screen", event);
                return;
            }
            let _ = events.send(AppEvent::Screen { origin, event });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_follows_lifetime() {
        let lifetime = Lifetime::new();
        let probe = lifetime.probe();
        let copy = probe.clone();
        assert!(probe.is_alive());
        drop(lifetime);
        assert!(!probe.is_alive());
        assert!(!copy.is_alive());
    }
}
