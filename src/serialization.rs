//! Pluggable serialization for the normalized event stream and the trade
//! tape.
//!
//! Producers that record or replay event streams go through the
//! [`EventSerializer`] trait so the wire format is chosen at construction
//! time without changing downstream code. JSON is the built-in format.

use crate::dispatch::event::Event;
use crate::orderbook::trade::Trade;

/// Errors that can occur during event serialization or deserialization.
#[derive(Debug)]
pub struct SerializationError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl std::fmt::Display for SerializationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event serialization error: {}", self.message)
    }
}

impl std::error::Error for SerializationError {}

/// A pluggable serializer for simulator inputs and outputs.
///
/// Implementations must be `Send + Sync` so they can be shared via
/// `Arc<dyn EventSerializer>`.
pub trait EventSerializer: Send + Sync + std::fmt::Debug {
    /// Serialize an input [`Event`] into a byte buffer.
    ///
    /// # Errors
    /// Returns [`SerializationError`] if the event cannot be serialized.
    fn serialize_event(&self, event: &Event) -> Result<Vec<u8>, SerializationError>;

    /// Deserialize an input [`Event`] from a byte buffer.
    ///
    /// # Errors
    /// Returns [`SerializationError`] if the bytes are malformed.
    fn deserialize_event(&self, data: &[u8]) -> Result<Event, SerializationError>;

    /// Serialize a tape [`Trade`] into a byte buffer.
    ///
    /// # Errors
    /// Returns [`SerializationError`] if the trade cannot be serialized.
    fn serialize_trade(&self, trade: &Trade) -> Result<Vec<u8>, SerializationError>;

    /// Deserialize a tape [`Trade`] from a byte buffer.
    ///
    /// # Errors
    /// Returns [`SerializationError`] if the bytes are malformed.
    fn deserialize_trade(&self, data: &[u8]) -> Result<Trade, SerializationError>;

    /// MIME-like content type identifier for this format.
    #[must_use]
    fn content_type(&self) -> &'static str;
}

/// JSON serializer using `serde_json`; the default, human-readable
/// format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEventSerializer;

impl JsonEventSerializer {
    /// Create a new JSON event serializer.
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl EventSerializer for JsonEventSerializer {
    fn serialize_event(&self, event: &Event) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(event).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }

    fn deserialize_event(&self, data: &[u8]) -> Result<Event, SerializationError> {
        serde_json::from_slice(data).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }

    fn serialize_trade(&self, trade: &Trade) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(trade).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }

    fn deserialize_trade(&self, data: &[u8]) -> Result<Trade, SerializationError> {
        serde_json::from_slice(data).map_err(|e| SerializationError {
            message: e.to_string(),
        })
    }

    #[inline]
    fn content_type(&self) -> &'static str {
        "application/json"
    }
}
