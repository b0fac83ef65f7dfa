//! Logger handles
//!
//! A `ConcreteHandle` owns its sinks and writes records. A `ProxyHandle`
//! owns nothing and forwards every call to whichever concrete handle is
//! currently registered under its name. `Handle` is what the registry
//! stores and what the manager hands out; callers emit through the `Emit`
//! trait without caring which variant they hold.

mod concrete;
mod proxy;

use std::sync::Arc;

pub use concrete::ConcreteHandle;
pub use proxy::ProxyHandle;

use crate::record::{Context, Destination, Level, Record};

macro_rules! level_methods {
    ($($level:expr => $plain:ident, $console:ident, $file:ident, $dev:ident, $tagged:ident;)*) => {
        $(
            fn $plain(&self, message: impl Into<String>) {
                self.emit($level, message, None);
            }

            fn $console(&self, message: impl Into<String>) {
                self.dispatch(Destination::ConsoleOnly, $level, message, None, &[]);
            }

            fn $file(&self, message: impl Into<String>) {
                self.dispatch(Destination::FileOnly, $level, message, None, &[]);
            }

            fn $dev(&self, message: impl Into<String>) {
                self.$console(message);
            }

            fn $tagged(&self, message: impl Into<String>, tags: &[&str]) {
                self.dispatch(Destination::Everywhere, $level, message, None, tags);
            }
        )*
    };
}

/// Emission surface shared by every kind of handle
pub trait Emit {
    /// Hand a fully built record to the sinks
    fn log(&self, record: Record);

    /// Render a titled block through the renderer and write it at `level`
    fn block(&self, title: &str, lines: &[String], style: &str, level: Level);

    /// Log `message` at `level` with optional structured context
    fn emit(&self, level: Level, message: impl Into<String>, context: Option<Context>) {
        self.dispatch(Destination::Everywhere, level, message, context, &[]);
    }

    /// Build a record with every routing attribute and log it
    fn dispatch(
        &self,
        destination: Destination,
        level: Level,
        message: impl Into<String>,
        context: Option<Context>,
        tags: &[&str],
    ) {
        let mut record = Record::new(level, message)
            .with_destination(destination)
            .with_tags(tags.iter().copied());
        if let Some(context) = context {
            record = record.with_context(context);
        }
        self.log(record);
    }

    /// Log with structured context
    fn log_with(&self, level: Level, message: impl Into<String>, context: Context) {
        self.emit(level, message, Some(context));
    }

    /// Log to the console only
    fn console(&self, level: Level, message: impl Into<String>) {
        self.dispatch(Destination::ConsoleOnly, level, message, None, &[]);
    }

    /// Log to the file only
    fn file(&self, level: Level, message: impl Into<String>) {
        self.dispatch(Destination::FileOnly, level, message, None, &[]);
    }

    /// Development output: console only
    fn dev(&self, level: Level, message: impl Into<String>) {
        self.console(level, message);
    }

    /// Log with tags consulted by the destination filters
    fn tagged(&self, level: Level, message: impl Into<String>, tags: &[&str]) {
        self.dispatch(Destination::Everywhere, level, message, None, tags);
    }

    level_methods! {
        Level::Trace => trace, console_trace, file_trace, dev_trace, trace_t;
        Level::Debug => debug, console_debug, file_debug, dev_debug, debug_t;
        Level::Info => info, console_info, file_info, dev_info, info_t;
        Level::Success => success, console_success, file_success, dev_success, success_t;
        Level::Warning => warn, console_warn, file_warn, dev_warn, warn_t;
        Level::Error => error, console_error, file_error, dev_error, error_t;
        Level::Critical => critical, console_critical, file_critical, dev_critical, critical_t;
    }

    /// Attach context that is added to every record emitted through the result
    fn bind(&self, context: Context) -> Bound<Self>
    where
        Self: Clone + Sized,
    {
        Bound::new(self.clone(), context)
    }
}

/// A registry entry: a concrete handle or a proxy to one
#[derive(Clone)]
pub enum Handle {
    Concrete(Arc<ConcreteHandle>),
    Proxy(ProxyHandle),
}

impl std::fmt::Debug for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handle::Concrete(h) => f.debug_tuple("Concrete").field(h).finish(),
            Handle::Proxy(p) => f.debug_tuple("Proxy").field(p).finish(),
        }
    }
}

impl Handle {
    /// Registry name of the logger
    pub fn name(&self) -> String {
        match self {
            Handle::Concrete(h) => h.name().to_string(),
            Handle::Proxy(p) => p.name().to_string(),
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Handle::Proxy(_))
    }

    pub fn as_proxy(&self) -> Option<&ProxyHandle> {
        match self {
            Handle::Proxy(p) => Some(p),
            Handle::Concrete(_) => None,
        }
    }

    /// The concrete handle records currently go to
    pub fn resolve(&self) -> Arc<ConcreteHandle> {
        match self {
            Handle::Concrete(h) => Arc::clone(h),
            Handle::Proxy(p) => p.real_handle(),
        }
    }

    /// Check if both values are the same handle object
    pub fn same_as(&self, other: &Handle) -> bool {
        match (self, other) {
            (Handle::Concrete(a), Handle::Concrete(b)) => Arc::ptr_eq(a, b),
            (Handle::Proxy(a), Handle::Proxy(b)) => a.same_as(b),
            _ => false,
        }
    }
}

impl Emit for Handle {
    fn log(&self, record: Record) {
        match self {
            Handle::Concrete(h) => h.log(record),
            Handle::Proxy(p) => p.log(record),
        }
    }

    fn block(&self, title: &str, lines: &[String], style: &str, level: Level) {
        match self {
            Handle::Concrete(h) => h.block(title, lines, style, level),
            Handle::Proxy(p) => p.block(title, lines, style, level),
        }
    }
}

impl Emit for Arc<ConcreteHandle> {
    fn log(&self, record: Record) {
        (**self).log(record);
    }

    fn block(&self, title: &str, lines: &[String], style: &str, level: Level) {
        (**self).block(title, lines, style, level);
    }
}

/// A handle with context merged into every record
///
/// Binding a proxy keeps following reinitialization; the context travels
/// with the binding, not with the concrete handle.
#[derive(Debug, Clone)]
pub struct Bound<H> {
    inner: H,
    context: Context,
}

impl<H> Bound<H> {
    pub fn new(inner: H, context: Context) -> Self {
        Self { inner, context }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H: Emit> Emit for Bound<H> {
    fn log(&self, mut record: Record) {
        let mut merged = self.context.clone();
        merged.extend(std::mem::take(&mut record.context));
        record.context = merged;
        self.inner.log(record);
    }

    fn block(&self, title: &str, lines: &[String], style: &str, level: Level) {
        self.inner.block(title, lines, style, level);
    }
}
