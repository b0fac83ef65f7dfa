use std::sync::{Arc, OnceLock, PoisonError, RwLock, Weak};

use super::{ConcreteHandle, Emit, Handle};
use crate::events::{EventBus, SubscriptionId, HANDLE_UPDATED};
use crate::record::{Level, Record};

/// Stable reference to "whatever logger is registered under this name"
///
/// Cloning is cheap and every clone shares the same target. The proxy
/// listens for `handle_updated` events naming it and repoints itself; it
/// only moves forward in generation, so a late event carrying an older
/// handle is ignored.
#[derive(Clone)]
pub struct ProxyHandle {
    inner: Arc<ProxyInner>,
}

struct ProxyInner {
    name: String,
    target: RwLock<Arc<ConcreteHandle>>,
    bus: Weak<EventBus>,
    subscription: OnceLock<SubscriptionId>,
}

impl ProxyInner {
    /// Point at `candidate` unless it is older; returns the displaced target
    fn swap(&self, candidate: Arc<ConcreteHandle>) -> Option<Arc<ConcreteHandle>> {
        let mut target = self.target.write().unwrap_or_else(PoisonError::into_inner);
        if candidate.generation() < target.generation() || Arc::ptr_eq(&target, &candidate) {
            return None;
        }
        let previous = std::mem::replace(&mut *target, candidate);
        tracing::debug!(
            logger = %self.name,
            from = previous.generation(),
            to = target.generation(),
            "Proxy repointed"
        );
        Some(previous)
    }
}

impl Drop for ProxyInner {
    fn drop(&mut self) {
        if let (Some(bus), Some(id)) = (self.bus.upgrade(), self.subscription.get()) {
            bus.unsubscribe(*id);
        }
    }
}

impl std::fmt::Debug for ProxyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyHandle")
            .field("name", &self.inner.name)
            .field("target", &self.real_handle().id())
            .finish()
    }
}

impl ProxyHandle {
    /// Bind a proxy for `name` to `target` and subscribe it to `bus`
    pub fn new(name: impl Into<String>, target: Arc<ConcreteHandle>, bus: &Arc<EventBus>) -> Self {
        let inner = Arc::new(ProxyInner {
            name: name.into(),
            target: RwLock::new(target),
            bus: Arc::downgrade(bus),
            subscription: OnceLock::new(),
        });

        let weak = Arc::downgrade(&inner);
        let id = bus.subscribe(HANDLE_UPDATED, move |event| {
            if let Some(inner) = weak.upgrade() {
                if event.handle_name == inner.name {
                    inner.swap(event.new_handle.resolve());
                }
            }
            Ok(())
        });
        let _ = inner.subscription.set(id);

        Self { inner }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The concrete handle currently targeted
    pub fn real_handle(&self) -> Arc<ConcreteHandle> {
        Arc::clone(&self.inner.target.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Repoint to `new` (a proxy is unwrapped to its own target)
    ///
    /// Returns the handle that was displaced, or `None` if `new` is older
    /// than (or the same as) the current target. The displaced handle's
    /// sinks stay open until the caller drops it.
    pub fn update_target(&self, new: &Handle) -> Option<Arc<ConcreteHandle>> {
        self.inner.swap(new.resolve())
    }

    /// Check if both proxies share the same state
    pub fn same_as(&self, other: &ProxyHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Emit for ProxyHandle {
    fn log(&self, record: Record) {
        self.real_handle().log(record);
    }

    fn block(&self, title: &str, lines: &[String], style: &str, level: Level) {
        self.real_handle().block(title, lines, style, level);
    }
}
