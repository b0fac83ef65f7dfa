//! In-process event bus
//!
//! Subscribers register a callback per event name. `publish` delivers
//! synchronously, in subscription order, on the caller's thread. The
//! subscriber list is snapshotted first and callbacks run outside the lock,
//! so a callback may subscribe, unsubscribe or publish without deadlocking.
//! A failing or panicking subscriber is logged and skipped.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Error;
use crate::handle::Handle;

/// Published after a registry entry has been superseded by `reinit`
pub const HANDLE_UPDATED: &str = "handle_updated";

/// An event and its payload
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    /// Registry name of the logger the event concerns
    pub handle_name: String,
    /// The handle now active under `handle_name`
    pub new_handle: Handle,
}

impl Event {
    pub fn handle_updated(handle_name: impl Into<String>, new_handle: Handle) -> Self {
        Self {
            name: HANDLE_UPDATED.to_string(),
            handle_name: handle_name.into(),
            new_handle,
        }
    }
}

/// Identifies a subscription for `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&Event) -> anyhow::Result<()> + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    callback: Callback,
}

/// Publish/subscribe registry keyed by event name
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<&str, usize> = subscribers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("subscribers", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for events called `event`
    pub fn subscribe<F>(&self, event: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&Event) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push(Subscriber {
                id,
                callback: Arc::new(callback),
            });
        id
    }

    /// Remove a subscription; returns false if it was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut removed = false;
        subscribers.retain(|_, list| {
            let before = list.len();
            list.retain(|s| s.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });
        removed
    }

    /// Number of subscribers for `event`
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every subscriber of its name
    ///
    /// Returns how many subscribers completed without error.
    pub fn publish(&self, event: &Event) -> usize {
        let snapshot: Vec<Callback> = {
            let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            match subscribers.get(&event.name) {
                Some(list) => list.iter().map(|s| Arc::clone(&s.callback)).collect(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        for callback in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
            let failure = match outcome {
                Ok(Ok(())) => {
                    delivered += 1;
                    continue;
                }
                Ok(Err(e)) => Error::Subscriber {
                    event: event.name.clone(),
                    message: format!("{:#}", e),
                },
                Err(payload) => Error::Subscriber {
                    event: event.name.clone(),
                    message: panic_message(payload.as_ref()),
                },
            };
            tracing::error!(
                event = %event.name,
                logger = %event.handle_name,
                error = %failure,
                "Event subscriber failed"
            );
        }
        delivered
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
