//! Error types for natswire-client.

use thiserror::Error;

use crate::client::ConnectionStatus;
use crate::protocol::MessageType;

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum NatsError {
    /// Subject is empty or breaks the token/wildcard rules.
    #[error("Invalid subject: {0:?}")]
    InvalidSubject(String),

    /// Subscription id is empty or not alphanumeric.
    #[error("Invalid SID: {0:?}")]
    InvalidSid(String),

    /// Reply-to subject is not a valid subject.
    #[error("Invalid reply-to: {0:?}")]
    InvalidReplyTo(String),

    /// Queue group is empty or not alphanumeric.
    #[error("Invalid queue group: {0:?}")]
    InvalidQueueGroup(String),

    /// UNSUB max-messages must be greater than zero.
    #[error("Max messages should be greater than 0, got {0}")]
    InvalidMaxMessages(u64),

    /// HPUB/HMSG require a non-empty header block.
    #[error("Headers must not be empty")]
    EmptyHeaders,

    /// Header name contains a colon or non-printable byte.
    #[error("Invalid header name: {0:?}")]
    InvalidHeaderName(String),

    /// Header value is empty or not ASCII.
    #[error("Invalid header {name:?} value: {value:?}")]
    InvalidHeaderValue { name: String, value: String },

    /// Verb token does not name a protocol message.
    #[error("Unknown message type: {0:?}")]
    UnknownMessageType(String),

    /// Control line has the wrong number of fields for its kind.
    #[error("Malformed {0} message")]
    MalformedMessage(MessageType),

    /// A byte-count field is not a valid unsigned integer.
    #[error("Invalid size field {value:?} in {kind} message")]
    InvalidSize { kind: MessageType, value: String },

    /// Parser was cancelled or already failed.
    #[error("Parser is closed")]
    ParserClosed,

    /// INFO/CONNECT JSON payload could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport fault while opening or writing.
    #[error("Connection error: {context}: {source}")]
    Connection {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// `open` called on a connection that is already open.
    #[error("Connection is already open")]
    AlreadyOpen,

    /// Operation needs an open transport.
    #[error("Connection is not open")]
    NotConnected,

    /// A wait timed out or was cancelled.
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Client observed an unexpected status after waiting for a transition.
    #[error("Wrong connection status: expected {expected}, got {actual}")]
    State {
        expected: ConnectionStatus,
        actual: ConnectionStatus,
    },

    /// Caller passed an argument the operation cannot use.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error outside of open/send (e.g. on the read loop).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NatsError {
    /// Wrap a transport fault, keeping it as the source.
    pub(crate) fn connection(context: &'static str, source: std::io::Error) -> Self {
        Self::Connection { context, source }
    }

    /// Raised synchronously by message or header construction.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidSubject(_)
                | Self::InvalidSid(_)
                | Self::InvalidReplyTo(_)
                | Self::InvalidQueueGroup(_)
                | Self::InvalidMaxMessages(_)
                | Self::EmptyHeaders
                | Self::InvalidHeaderName(_)
                | Self::InvalidHeaderValue { .. }
        )
    }

    /// Terminal for the parser instance that produced it.
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            Self::UnknownMessageType(_)
                | Self::MalformedMessage(_)
                | Self::InvalidSize { .. }
                | Self::ParserClosed
        )
    }

    /// Transport open/send failures.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::AlreadyOpen | Self::NotConnected
        )
    }

    /// Timeouts and external cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

/// Result type alias using NatsError.
pub type Result<T> = std::result::Result<T, NatsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert!(NatsError::InvalidSubject("a..b".into()).is_validation());
        assert!(NatsError::EmptyHeaders.is_validation());
        assert!(NatsError::MalformedMessage(MessageType::Msg).is_parse());
        assert!(NatsError::AlreadyOpen.is_connection());
        assert!(NatsError::Cancelled("timeout".into()).is_cancellation());
        assert!(!NatsError::Cancelled("timeout".into()).is_connection());
    }

    #[test]
    fn test_connection_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe gone");
        let err = NatsError::connection("write failed", io);

        assert!(err.to_string().contains("write failed"));
        let source = err.source().expect("source is kept");
        assert!(source.to_string().contains("pipe gone"));
    }

    #[test]
    fn test_display_names_offending_value() {
        let err = NatsError::InvalidSid("a b".into());
        assert_eq!(err.to_string(), "Invalid SID: \"a b\"");

        let err = NatsError::MalformedMessage(MessageType::HMsg);
        assert_eq!(err.to_string(), "Malformed HMSG message");
    }
}
