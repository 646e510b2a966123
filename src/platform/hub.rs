use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use super::{MarkerEvent, MessageRef};

const SUBSCRIPTION_BUFFER: usize = 64;

/// Routes incoming vote callbacks to whichever poll subscribed to a message.
///
/// The callback handler receives every button tap in every chat; the hub
/// forwards taps on subscribed messages and drops the rest. Routes for
/// closed subscriptions are pruned on the next dispatch.
#[derive(Default)]
pub struct MarkerHub {
    routes: Mutex<HashMap<String, mpsc::Sender<MarkerEvent>>>,
}

impl MarkerHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a subscription for `message`. A later subscription to the same
    /// message replaces the earlier route.
    pub fn subscribe(&self, message: &MessageRef) -> mpsc::Receiver<MarkerEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        self.lock_routes().insert(message.id_string(), tx);
        rx
    }

    /// Deliver an event to the subscriber of `message`, if any.
    /// Returns whether the event reached a live subscriber.
    pub fn dispatch(&self, message: &MessageRef, event: MarkerEvent) -> bool {
        let key = message.id_string();
        let mut routes = self.lock_routes();
        let Some(tx) = routes.get(&key) else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                routes.remove(&key);
                false
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(message = %key, "marker subscription buffer full, vote dropped");
                false
            }
        }
    }

    fn lock_routes(&self) -> std::sync::MutexGuard<'_, HashMap<String, mpsc::Sender<MarkerEvent>>> {
        match self.routes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
