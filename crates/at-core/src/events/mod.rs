use std::sync::Arc;
use parking_lot::Mutex;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session-wide event bus
pub struct EventBus {
    handlers: Arc<Mutex<AHashMap<std::any::TypeId, Vec<Box<dyn EventHandler>>>>>,
}

/// Event trait that all events must implement
pub trait Event: Send + Sync + 'static {
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Handler trait for event handlers
pub trait EventHandler: Send + Sync {
    fn handle(&mut self, event: &dyn Event);
}

/// Severity of a user-visible notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, message)
    }
}

/// Common session events
pub mod events {
    use super::Event;
    use crate::navigation::ViewMode;

    /// Bulk select progress changed
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ProgressChanged {
        pub percent: u8,
        /// False once the indicator should be hidden
        pub active: bool,
    }

    /// Selection size changed
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SelectionChanged {
        pub size: usize,
    }

    /// A page slice was handed to the grid
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PageRendered {
        pub mode: ViewMode,
        pub page: usize,
        pub rows: usize,
    }

    /// The table switched between browsing and reviewing
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ViewModeChanged {
        pub mode: ViewMode,
    }

    /// The dispatcher picked a population strategy
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct StrategyChosen {
        pub strategy: &'static str,
        pub remaining: usize,
    }

    // Implement Event trait for all event types
    macro_rules! impl_event {
        ($($t:ty),*) => {
            $(
                impl Event for $t {
                    fn as_any(&self) -> &dyn std::any::Any {
                        self
                    }
                }
            )*
        }
    }

    impl_event!(
        super::Notice,
        ProgressChanged,
        SelectionChanged,
        PageRendered,
        ViewModeChanged,
        StrategyChosen
    );
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe<E: Event>(&self, handler: Box<dyn EventHandler>) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();
        handlers.entry(type_id).or_insert_with(Vec::new).push(handler);
    }

    /// Subscribe a closure to events of a specific type
    pub fn subscribe_fn<E, F>(&self, mut f: F)
    where
        E: Event,
        F: FnMut(&E) + Send + Sync + 'static,
    {
        self.subscribe::<E>(handler_from_fn(move |event| {
            if let Some(event) = event.as_any().downcast_ref::<E>() {
                f(event);
            }
        }));
    }

    /// Publish an event
    pub fn publish<E: Event>(&self, event: E) {
        let type_id = std::any::TypeId::of::<E>();
        let mut handlers = self.handlers.lock();

        if let Some(event_handlers) = handlers.get_mut(&type_id) {
            for handler in event_handlers.iter_mut() {
                handler.handle(&event);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<F> EventHandler for ClosureEventHandler<F>
where
    F: FnMut(&dyn Event) + Send + Sync,
{
    fn handle(&mut self, event: &dyn Event) {
        (self.handler)(event);
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<F>(f: F) -> Box<dyn EventHandler>
where
    F: FnMut(&dyn Event) + Send + Sync + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::events::SelectionChanged;

    #[test]
    fn test_typed_subscription() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe_fn::<SelectionChanged, _>(move |event| sink.lock().push(event.size));

        bus.publish(SelectionChanged { size: 3 });
        bus.publish(Notice::info("ignored by this subscriber"));
        bus.publish(SelectionChanged { size: 5 });

        assert_eq!(*seen.lock(), vec![3, 5]);
    }

    #[test]
    fn test_notice_levels() {
        assert_eq!(Notice::warning("w").level, NoticeLevel::Warning);
        assert_ne!(Notice::info("a").id, Notice::info("a").id);
    }
}
