//! Wait protocol: blocking read-with-timeout over the registry.
//!
//! These two entry points are all the RPC boundary needs. Every synchronous
//! operation in `core-service` is "invoke the platform with an adapter bound
//! to id X" followed by `verify_succeeded(X, ACTION_LISTENER_EVENT, timeout)`.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::event::FieldMap;
use crate::outcome::Outcome;
use crate::registry::EventRegistry;

/// Default bound for synchronous-style operations.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Wait for the next event on `(correlation_id, name)` and return its fields.
///
/// Raises [`Error::Timeout`] naming the correlation id and the bound when no
/// event arrives in time. The underlying platform operation is not cancelled;
/// a late event stays queued for the next waiter on the same key.
pub async fn wait_for_event(
    registry: &EventRegistry,
    correlation_id: &str,
    name: &str,
    timeout_ms: u64,
) -> Result<FieldMap> {
    match registry
        .poll(correlation_id, name, Duration::from_millis(timeout_ms))
        .await
    {
        Some(event) => Ok(event.into_fields()),
        None => Err(Error::Timeout {
            correlation_id: correlation_id.to_string(),
            name: name.to_string(),
            timeout_ms,
        }),
    }
}

/// Wait for the next event on `(correlation_id, name)` and require a success
/// outcome.
///
/// A failure outcome raises [`Error::PlatformAction`] with the platform
/// reason code and resolved message; an event that does not match the
/// outcome contract raises [`Error::Protocol`].
pub async fn verify_succeeded(
    registry: &EventRegistry,
    correlation_id: &str,
    name: &str,
    timeout_ms: u64,
) -> Result<()> {
    let fields = wait_for_event(registry, correlation_id, name, timeout_ms).await?;
    match Outcome::from_fields(&fields)? {
        Outcome::Success => Ok(()),
        Outcome::Failure { reason, message } => Err(Error::PlatformAction { reason, message }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ActionEventAdapter;
    use crate::event::{fields, CallbackEvent};
    use crate::outcome::{ACTION_LISTENER_EVENT, REASON_BUSY, REASON_GENERIC_ERROR};
    use bridge_traits::p2p::ActionListener;
    use std::sync::Arc;

    #[tokio::test]
    async fn wait_returns_fields_in_post_order() {
        let registry = EventRegistry::new();
        registry.post(CallbackEvent::new("c1", "evt").with_field("seq", 1));
        registry.post(CallbackEvent::new("c1", "evt").with_field("seq", 2));

        let first = wait_for_event(&registry, "c1", "evt", 1_000).await.unwrap();
        let second = wait_for_event(&registry, "c1", "evt", 1_000).await.unwrap();
        assert_eq!(first["seq"], 1);
        assert_eq!(second["seq"], 2);
    }

    #[tokio::test]
    async fn timeout_error_names_the_correlation_id_and_bound() {
        let registry = EventRegistry::new();
        let err = wait_for_event(&registry, "c-missing", "evt", 25)
            .await
            .unwrap_err();
        match err {
            Error::Timeout {
                correlation_id,
                name,
                timeout_ms,
            } => {
                assert_eq!(correlation_id, "c-missing");
                assert_eq!(name, "evt");
                assert_eq!(timeout_ms, 25);
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_passes_on_success_outcome() {
        let registry = Arc::new(EventRegistry::new());
        ActionEventAdapter::new(registry.clone(), "c1").on_success();

        verify_succeeded(&registry, "c1", ACTION_LISTENER_EVENT, 1_000)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_maps_busy_failure_to_platform_action_error() {
        let registry = Arc::new(EventRegistry::new());
        ActionEventAdapter::new(registry.clone(), "c1").on_failure(REASON_BUSY);

        let err = verify_succeeded(&registry, "c1", ACTION_LISTENER_EVENT, 1_000)
            .await
            .unwrap_err();
        match err {
            Error::PlatformAction { reason, message } => {
                assert_eq!(reason, REASON_BUSY);
                assert_eq!(message, "BUSY");
            }
            other => panic!("expected PlatformAction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_maps_generic_error_failure() {
        let registry = Arc::new(EventRegistry::new());
        ActionEventAdapter::new(registry.clone(), "c1").on_failure(REASON_GENERIC_ERROR);

        let err = verify_succeeded(&registry, "c1", ACTION_LISTENER_EVENT, 1_000)
            .await
            .unwrap_err();
        match err {
            Error::PlatformAction { reason, message } => {
                assert_eq!(reason, REASON_GENERIC_ERROR);
                assert_eq!(message, "GENERIC_ERROR");
            }
            other => panic!("expected PlatformAction, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_flags_malformed_events_as_protocol_errors() {
        let registry = EventRegistry::new();
        registry.post(
            CallbackEvent::new("c1", ACTION_LISTENER_EVENT)
                .with_field(fields::CALLBACK_NAME, "onSomethingElse"),
        );

        let err = verify_succeeded(&registry, "c1", ACTION_LISTENER_EVENT, 1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
