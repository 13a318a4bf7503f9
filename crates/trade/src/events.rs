//! Status events for the display side
//!
//! The command server reports connection lifecycle and trades through an
//! [`EventSink`]; how the events are rendered is up to the sink.

use std::sync::Arc;
use tokio::sync::mpsc;

/// How prominently an event should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Routine progress (connections, accepted trades)
    Info,
    /// Something went wrong but was recovered
    Warning,
    /// A trade was blocked
    Alert,
}

/// One status message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub message: String,
    pub severity: Severity,
}

/// Consumer of status events
pub trait EventSink: Send + Sync {
    fn emit(&self, message: String, severity: Severity);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, message: String, severity: Severity) {
        (**self).emit(message, severity)
    }
}

/// Forwards events over an unbounded channel
#[derive(Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, message: String, severity: Severity) {
        // Receiver gone means nobody is displaying; drop the event.
        let _ = self.sender.send(StatusEvent { message, severity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit("one".to_string(), Severity::Info);
        sink.emit("two".to_string(), Severity::Alert);

        assert_eq!(rx.try_recv().unwrap().message, "one");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.message, "two");
        assert_eq!(second.severity, Severity::Alert);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_without_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit("dropped".to_string(), Severity::Warning);
    }
}
