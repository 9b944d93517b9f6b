//! Event model: immutable named payloads addressed by correlation id.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered field mapping carried by every event.
///
/// `serde_json`'s `preserve_order` feature keeps insertion order, so fields
/// reach the remote caller in the order the adapter wrote them.
pub type FieldMap = serde_json::Map<String, Value>;

/// Wire-stable field keys used in event payloads.
pub mod fields {
    pub const CALLBACK_NAME: &str = "callbackName";
    pub const REASON: &str = "reason";
    pub const ERROR_MESSAGE: &str = "errorMessage";
    pub const P2P_DEVICE: &str = "p2pDevice";
    pub const P2P_INFO: &str = "p2pInfo";
    pub const P2P_GROUP: &str = "p2pGroup";
    pub const P2P_STATE: &str = "p2pState";
    pub const PEER_LIST: &str = "peerList";
    pub const GROUP_LIST: &str = "groupList";
    pub const UNIQUE_SERVICE_NAMES: &str = "uniqueServiceNames";
    pub const INSTANCE_NAME: &str = "instanceName";
    pub const REGISTRATION_TYPE: &str = "registrationType";
    pub const FULL_DOMAIN_NAME: &str = "fullDomainName";
    pub const TXT_RECORD_MAP: &str = "txtRecordMap";
    pub const TIMESTAMP_MS: &str = "timestampMs";
    pub const IS_CONNECTED: &str = "isConnected";
}

/// Composite key addressing one FIFO queue in the registry.
///
/// Two events with an equal key are delivered to consumers of that key in
/// post order; keys differing in either part are fully independent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueKey {
    correlation_id: String,
    name: String,
}

impl QueueKey {
    pub fn new(correlation_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            name: name.into(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.correlation_id, self.name)
    }
}

/// An immutable record of one callback invocation.
///
/// Constructed by an adapter, posted once, then only read. The builder-style
/// [`with_field`](CallbackEvent::with_field) consumes `self`, so an event
/// cannot be mutated after it has been handed to the registry.
///
/// # Example
///
/// ```rust
/// use core_events::{fields, CallbackEvent};
///
/// let event = CallbackEvent::new("c1", "ActionListenerCallback")
///     .with_field(fields::CALLBACK_NAME, "onSuccess");
/// assert_eq!(event.correlation_id(), "c1");
/// assert_eq!(event.fields()[fields::CALLBACK_NAME], "onSuccess");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackEvent {
    correlation_id: String,
    name: String,
    fields: FieldMap,
}

impl CallbackEvent {
    pub fn new(correlation_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            name: name.into(),
            fields: FieldMap::new(),
        }
    }

    /// Append a field, keeping insertion order.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    pub fn queue_key(&self) -> QueueKey {
        QueueKey::new(&self.correlation_id, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_key_display_joins_both_parts() {
        let key = QueueKey::new("c1", "ActionListenerCallback");
        assert_eq!(key.to_string(), "c1|ActionListenerCallback");
    }

    #[test]
    fn equal_keys_hash_equal() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(QueueKey::new("a", "b"), 1);
        assert_eq!(map.get(&QueueKey::new("a", "b")), Some(&1));
        assert_eq!(map.get(&QueueKey::new("a", "c")), None);
    }

    #[test]
    fn fields_keep_insertion_order() {
        let event = CallbackEvent::new("c1", "evt")
            .with_field("zulu", 1)
            .with_field("alpha", 2)
            .with_field("mike", 3);
        let keys: Vec<&str> = event.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn event_round_trips_through_json() {
        let event = CallbackEvent::new("c1", "evt")
            .with_field(fields::IS_CONNECTED, true)
            .with_field(fields::REASON, 2);
        let json = serde_json::to_string(&event).unwrap();
        let back: CallbackEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
