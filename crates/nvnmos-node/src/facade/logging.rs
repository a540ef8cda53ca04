//! Numeric log-level mapping and the `tracing` layer that forwards events to
//! the host's log callback (spec.md §6 "Exit codes & logging", §4.8).

use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::config::LogLevel;

/// `tracing::Level` → spec.md §6 numeric scale. `tracing` has no `fatal`
/// level of its own; `ERROR` events tagged with the `fatal` field (as the
/// internal-invariant error paths in `model`/`connection` do) map to 40
/// instead of 20.
pub fn level_to_numeric(level: &Level, is_fatal: bool) -> LogLevel {
    if is_fatal {
        return 40;
    }
    match *level {
        Level::ERROR => 20,
        Level::WARN => 10,
        Level::INFO => 0,
        Level::DEBUG => -10,
        Level::TRACE => -40,
    }
}

pub type LogCallback = Arc<dyn Fn(&str, LogLevel, &str) + Send + Sync>;

/// A `tracing_subscriber::Layer` that extracts the event's message and
/// forwards `(categories, level, message)` to the host callback, filtering
/// by `min_level`/`categories` the way spec.md §6's config describes.
pub struct HostCallbackLayer {
    callback: LogCallback,
    min_level: LogLevel,
    categories: Vec<String>,
}

impl HostCallbackLayer {
    pub fn new(callback: LogCallback, min_level: LogLevel, categories: Vec<String>) -> Self {
        Self {
            callback,
            min_level,
            categories,
        }
    }

    fn category_allowed(&self, target: &str) -> bool {
        self.categories.is_empty() || self.categories.iter().any(|c| c == target)
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fatal: bool,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else if field.name() == "fatal" {
            self.fatal = format!("{value:?}") == "true";
        }
    }
}

impl<S: Subscriber> Layer<S> for HostCallbackLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let numeric = level_to_numeric(metadata.level(), false);
        if numeric < self.min_level {
            return;
        }
        let target = metadata.target();
        if !self.category_allowed(target) {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let level = if visitor.fatal { 40 } else { numeric };
        (self.callback)(target, level, &visitor.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_levels_match_spec_scale() {
        assert_eq!(level_to_numeric(&Level::ERROR, true), 40);
        assert_eq!(level_to_numeric(&Level::ERROR, false), 20);
        assert_eq!(level_to_numeric(&Level::WARN, false), 10);
        assert_eq!(level_to_numeric(&Level::INFO, false), 0);
        assert_eq!(level_to_numeric(&Level::DEBUG, false), -10);
        assert_eq!(level_to_numeric(&Level::TRACE, false), -40);
    }

    #[test]
    fn empty_category_list_allows_everything() {
        let layer = HostCallbackLayer::new(Arc::new(|_, _, _| {}), -40, Vec::new());
        assert!(layer.category_allowed("nvnmos_node::model"));
    }

    #[test]
    fn non_empty_category_list_filters() {
        let layer = HostCallbackLayer::new(Arc::new(|_, _, _| {}), -40, vec!["nvnmos_node::model".to_string()]);
        assert!(layer.category_allowed("nvnmos_node::model"));
        assert!(!layer.category_allowed("nvnmos_node::discovery"));
    }
}
