//! Outcome adapters: native callback interfaces to posted events.
//!
//! One adapter type per callback trait. Each instance is bound at
//! construction to a registry handle and a correlation id, and every callback
//! invocation synthesizes exactly one event (discovery adapters may discard
//! invocations from non-target devices, in which case nothing is posted).
//! Adapters share no mutable state with each other beyond the registry.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use bridge_traits::p2p::{
    ActionListener, BroadcastListener, ConnectionChange, DeviceInfoListener,
    DnsSdServiceResponseListener, DnsSdTxtRecordListener, P2pDevice, P2pGroup, PeerListListener,
    PersistentGroupInfoListener, UpnpServiceResponseListener,
};
use serde_json::Value;

use crate::event::{fields, CallbackEvent};
use crate::outcome::{
    reason_message, ACTION_LISTENER_EVENT, CALLBACK_ON_FAILURE, CALLBACK_ON_SUCCESS,
};
use crate::registry::EventRegistry;

/// Event name for device-info callbacks.
pub const DEVICE_INFO_EVENT: &str = "WifiP2pOnDeviceInfoAvailable";
/// Event name for peer-list callbacks.
pub const PEERS_AVAILABLE_EVENT: &str = "WifiP2pOnPeersAvailable";
/// Event name for persistent-group-list callbacks.
pub const PERSISTENT_GROUPS_EVENT: &str = "onPersistentGroupInfoAvailable";
/// Base event name for UPnP discovery responses; an index suffix is added.
pub const UPNP_RESPONSE_EVENT: &str = "setUpnpServiceResponseListener";
/// Event name shared by DNS-SD service and TXT record responses.
pub const DNS_SD_RESPONSE_EVENT: &str = "setDnsSdResponseListeners";

/// Ambient broadcast event names, bound to the session's initialize id.
pub const STATE_CHANGED_EVENT: &str = "WIFI_P2P_STATE_CHANGED";
pub const PEERS_CHANGED_EVENT: &str = "WIFI_P2P_PEERS_CHANGED";
pub const CONNECTION_CHANGED_EVENT: &str = "WIFI_P2P_CONNECTION_CHANGED";
pub const THIS_DEVICE_CHANGED_EVENT: &str = "WIFI_P2P_THIS_DEVICE_CHANGED";

fn encode<T: serde::Serialize>(what: &'static str, value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::error!(what, %err, "failed to encode callback payload");
            None
        }
    }
}

// ============================================================================
// Action outcomes
// ============================================================================

/// Translates the success/failure callback pair into outcome events.
///
/// The default event name is [`ACTION_LISTENER_EVENT`], used by the
/// wait-and-verify path; asynchronous operations bind their own operation
/// event name via [`with_event_name`](ActionEventAdapter::with_event_name).
pub struct ActionEventAdapter {
    registry: Arc<EventRegistry>,
    correlation_id: String,
    event_name: String,
}

impl ActionEventAdapter {
    pub fn new(registry: Arc<EventRegistry>, correlation_id: impl Into<String>) -> Self {
        Self::with_event_name(registry, correlation_id, ACTION_LISTENER_EVENT)
    }

    pub fn with_event_name(
        registry: Arc<EventRegistry>,
        correlation_id: impl Into<String>,
        event_name: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            correlation_id: correlation_id.into(),
            event_name: event_name.into(),
        }
    }
}

impl ActionListener for ActionEventAdapter {
    fn on_success(&self) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            event = %self.event_name,
            "action succeeded"
        );
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, &self.event_name)
                .with_field(fields::CALLBACK_NAME, CALLBACK_ON_SUCCESS),
        );
    }

    fn on_failure(&self, reason: i32) {
        let message = reason_message(reason);
        tracing::warn!(
            correlation_id = %self.correlation_id,
            event = %self.event_name,
            reason,
            message,
            "action failed"
        );
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, &self.event_name)
                .with_field(fields::CALLBACK_NAME, CALLBACK_ON_FAILURE)
                .with_field(fields::REASON, reason)
                .with_field(fields::ERROR_MESSAGE, message),
        );
    }
}

// ============================================================================
// Data-bearing one-shot callbacks
// ============================================================================

/// Posts the local device description when it becomes available.
pub struct DeviceInfoAdapter {
    registry: Arc<EventRegistry>,
    correlation_id: String,
}

impl DeviceInfoAdapter {
    pub fn new(registry: Arc<EventRegistry>, correlation_id: impl Into<String>) -> Self {
        Self {
            registry,
            correlation_id: correlation_id.into(),
        }
    }
}

impl DeviceInfoListener for DeviceInfoAdapter {
    fn on_device_info_available(&self, device: Option<P2pDevice>) {
        // The platform reports `None` while it has no device info yet; no
        // event is owed in that case.
        let Some(device) = device else { return };
        let Some(payload) = encode("device info", &device) else {
            return;
        };
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, DEVICE_INFO_EVENT)
                .with_field(fields::P2P_DEVICE, payload),
        );
    }
}

/// Posts the current peer list with a delivery timestamp.
pub struct PeerListAdapter {
    registry: Arc<EventRegistry>,
    correlation_id: String,
}

impl PeerListAdapter {
    pub fn new(registry: Arc<EventRegistry>, correlation_id: impl Into<String>) -> Self {
        Self {
            registry,
            correlation_id: correlation_id.into(),
        }
    }
}

impl PeerListListener for PeerListAdapter {
    fn on_peers_available(&self, peers: Vec<P2pDevice>) {
        let Some(payload) = encode("peer list", &peers) else {
            return;
        };
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, PEERS_AVAILABLE_EVENT)
                .with_field(fields::PEER_LIST, payload)
                .with_field(fields::TIMESTAMP_MS, chrono::Utc::now().timestamp_millis()),
        );
    }
}

/// Posts the list of groups the platform has persisted.
pub struct PersistentGroupAdapter {
    registry: Arc<EventRegistry>,
    correlation_id: String,
}

impl PersistentGroupAdapter {
    pub fn new(registry: Arc<EventRegistry>, correlation_id: impl Into<String>) -> Self {
        Self {
            registry,
            correlation_id: correlation_id.into(),
        }
    }
}

impl PersistentGroupInfoListener for PersistentGroupAdapter {
    fn on_persistent_group_info_available(&self, groups: Vec<P2pGroup>) {
        let Some(payload) = encode("group list", &groups) else {
            return;
        };
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, PERSISTENT_GROUPS_EVENT)
                .with_field(fields::GROUP_LIST, payload),
        );
    }
}

// ============================================================================
// Filtered discovery listeners
// ============================================================================

/// UPnP responses, filtered to one target device address.
///
/// Responses from any other device are silently discarded. Each posted event
/// gets an incrementing `_<index>` suffix on its name so that a sequence of
/// responses from the target maps to distinct queue keys.
pub struct UpnpResponseAdapter {
    registry: Arc<EventRegistry>,
    correlation_id: String,
    target_address: String,
    index: AtomicU32,
}

impl UpnpResponseAdapter {
    pub fn new(
        registry: Arc<EventRegistry>,
        correlation_id: impl Into<String>,
        target_address: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            correlation_id: correlation_id.into(),
            target_address: target_address.into(),
            index: AtomicU32::new(0),
        }
    }
}

impl UpnpServiceResponseListener for UpnpResponseAdapter {
    fn on_upnp_service_available(&self, unique_service_names: Vec<String>, src_device: &P2pDevice) {
        if !src_device
            .device_address
            .eq_ignore_ascii_case(&self.target_address)
        {
            tracing::trace!(
                src = %src_device.device_address,
                target = %self.target_address,
                "ignoring UPnP response from non-target device"
            );
            return;
        }
        let index = self.index.fetch_add(1, Ordering::Relaxed);
        self.registry.post(
            CallbackEvent::new(
                &self.correlation_id,
                format!("{UPNP_RESPONSE_EVENT}_{index}"),
            )
            .with_field(fields::UNIQUE_SERVICE_NAMES, unique_service_names),
        );
    }
}

/// DNS-SD service responses, filtered to one target device address.
pub struct DnsSdResponseAdapter {
    registry: Arc<EventRegistry>,
    correlation_id: String,
    target_address: String,
}

impl DnsSdResponseAdapter {
    pub fn new(
        registry: Arc<EventRegistry>,
        correlation_id: impl Into<String>,
        target_address: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            correlation_id: correlation_id.into(),
            target_address: target_address.into(),
        }
    }
}

impl DnsSdServiceResponseListener for DnsSdResponseAdapter {
    fn on_dns_sd_service_available(
        &self,
        instance_name: String,
        registration_type: String,
        src_device: &P2pDevice,
    ) {
        if !src_device
            .device_address
            .eq_ignore_ascii_case(&self.target_address)
        {
            return;
        }
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, DNS_SD_RESPONSE_EVENT)
                .with_field(fields::INSTANCE_NAME, instance_name)
                .with_field(fields::REGISTRATION_TYPE, registration_type),
        );
    }
}

/// DNS-SD TXT record responses, filtered to one target device address.
pub struct DnsSdTxtRecordAdapter {
    registry: Arc<EventRegistry>,
    correlation_id: String,
    target_address: String,
}

impl DnsSdTxtRecordAdapter {
    pub fn new(
        registry: Arc<EventRegistry>,
        correlation_id: impl Into<String>,
        target_address: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            correlation_id: correlation_id.into(),
            target_address: target_address.into(),
        }
    }
}

impl DnsSdTxtRecordListener for DnsSdTxtRecordAdapter {
    fn on_dns_sd_txt_record_available(
        &self,
        full_domain_name: String,
        txt_records: std::collections::HashMap<String, String>,
        src_device: &P2pDevice,
    ) {
        if !src_device
            .device_address
            .eq_ignore_ascii_case(&self.target_address)
        {
            return;
        }
        let Some(records) = encode("txt records", &txt_records) else {
            return;
        };
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, DNS_SD_RESPONSE_EVENT)
                .with_field(fields::FULL_DOMAIN_NAME, full_domain_name)
                .with_field(fields::TXT_RECORD_MAP, records),
        );
    }
}

// ============================================================================
// Ambient broadcasts
// ============================================================================

/// Posts ambient state transitions under the session's initialize id.
pub struct BroadcastAdapter {
    registry: Arc<EventRegistry>,
    correlation_id: String,
}

impl BroadcastAdapter {
    pub fn new(registry: Arc<EventRegistry>, correlation_id: impl Into<String>) -> Self {
        Self {
            registry,
            correlation_id: correlation_id.into(),
        }
    }
}

impl BroadcastListener for BroadcastAdapter {
    fn on_p2p_state_changed(&self, enabled: bool) {
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, STATE_CHANGED_EVENT)
                .with_field(fields::P2P_STATE, enabled),
        );
    }

    fn on_peers_changed(&self, peers: Vec<P2pDevice>) {
        let Some(payload) = encode("peer list", &peers) else {
            return;
        };
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, PEERS_CHANGED_EVENT)
                .with_field(fields::PEER_LIST, payload),
        );
    }

    fn on_connection_changed(&self, change: ConnectionChange) {
        let info = encode("p2p info", &change.p2p_info).unwrap_or(Value::Null);
        let group = encode("p2p group", &change.group).unwrap_or(Value::Null);
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, CONNECTION_CHANGED_EVENT)
                .with_field(fields::IS_CONNECTED, change.is_connected)
                .with_field(fields::P2P_INFO, info)
                .with_field(fields::P2P_GROUP, group),
        );
    }

    fn on_this_device_changed(&self, device: P2pDevice) {
        let Some(payload) = encode("device info", &device) else {
            return;
        };
        self.registry.post(
            CallbackEvent::new(&self.correlation_id, THIS_DEVICE_CHANGED_EVENT)
                .with_field(fields::P2P_DEVICE, payload),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Outcome, REASON_BUSY};
    use std::time::Duration;

    const TARGET: &str = "AA:BB:CC:DD:EE:FF";
    const OTHER: &str = "11:22:33:44:55:66";

    #[tokio::test]
    async fn action_success_posts_one_outcome_event() {
        let registry = Arc::new(EventRegistry::new());
        let adapter = ActionEventAdapter::new(registry.clone(), "c1");

        adapter.on_success();

        let event = registry
            .poll("c1", ACTION_LISTENER_EVENT, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            Outcome::from_fields(event.fields()).unwrap(),
            Outcome::Success
        );
    }

    #[tokio::test]
    async fn action_failure_carries_reason_and_message() {
        let registry = Arc::new(EventRegistry::new());
        let adapter = ActionEventAdapter::new(registry.clone(), "c1");

        adapter.on_failure(REASON_BUSY);

        let event = registry
            .poll("c1", ACTION_LISTENER_EVENT, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(event.fields()[fields::REASON], REASON_BUSY);
        assert_eq!(event.fields()[fields::ERROR_MESSAGE], "BUSY");
    }

    #[tokio::test]
    async fn adapters_with_distinct_ids_do_not_interfere() {
        let registry = Arc::new(EventRegistry::new());
        let a = ActionEventAdapter::new(registry.clone(), "a");
        let b = ActionEventAdapter::new(registry.clone(), "b");

        a.on_success();
        b.on_failure(REASON_BUSY);

        let event_b = registry
            .poll("b", ACTION_LISTENER_EVENT, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(event_b.fields()[fields::CALLBACK_NAME], CALLBACK_ON_FAILURE);
        let event_a = registry
            .poll("a", ACTION_LISTENER_EVENT, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(event_a.fields()[fields::CALLBACK_NAME], CALLBACK_ON_SUCCESS);
    }

    #[tokio::test]
    async fn device_info_none_posts_nothing() {
        let registry = Arc::new(EventRegistry::new());
        let adapter = DeviceInfoAdapter::new(registry.clone(), "c1");

        adapter.on_device_info_available(None);
        assert!(registry
            .poll("c1", DEVICE_INFO_EVENT, Duration::from_millis(20))
            .await
            .is_none());

        adapter.on_device_info_available(Some(P2pDevice::new("dut", TARGET)));
        let event = registry
            .poll("c1", DEVICE_INFO_EVENT, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(event.fields()[fields::P2P_DEVICE]["device_address"], TARGET);
    }

    #[tokio::test]
    async fn upnp_adapter_discards_non_target_responses() {
        let registry = Arc::new(EventRegistry::new());
        let adapter = UpnpResponseAdapter::new(registry.clone(), "c1", TARGET);

        adapter.on_upnp_service_available(
            vec!["uuid:1".to_string()],
            &P2pDevice::new("stranger", OTHER),
        );
        assert!(registry
            .poll("c1", &format!("{UPNP_RESPONSE_EVENT}_0"), Duration::from_millis(20))
            .await
            .is_none());

        adapter.on_upnp_service_available(
            vec!["uuid:2".to_string()],
            &P2pDevice::new("dut", TARGET),
        );
        let event = registry
            .poll("c1", &format!("{UPNP_RESPONSE_EVENT}_0"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(
            event.fields()[fields::UNIQUE_SERVICE_NAMES],
            serde_json::json!(["uuid:2"])
        );
    }

    #[tokio::test]
    async fn upnp_adapter_target_match_is_case_insensitive() {
        let registry = Arc::new(EventRegistry::new());
        let adapter = UpnpResponseAdapter::new(registry.clone(), "c1", TARGET);

        adapter.on_upnp_service_available(
            vec!["uuid:3".to_string()],
            &P2pDevice::new("dut", TARGET.to_ascii_lowercase()),
        );
        assert!(registry
            .poll("c1", &format!("{UPNP_RESPONSE_EVENT}_0"), Duration::from_secs(1))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn upnp_event_names_carry_an_incrementing_index() {
        let registry = Arc::new(EventRegistry::new());
        let adapter = UpnpResponseAdapter::new(registry.clone(), "c1", TARGET);
        let src = P2pDevice::new("dut", TARGET);

        adapter.on_upnp_service_available(vec!["uuid:0".to_string()], &src);
        adapter.on_upnp_service_available(vec!["uuid:1".to_string()], &src);

        for i in 0..2 {
            let event = registry
                .poll("c1", &format!("{UPNP_RESPONSE_EVENT}_{i}"), Duration::from_secs(1))
                .await
                .unwrap();
            assert_eq!(
                event.fields()[fields::UNIQUE_SERVICE_NAMES],
                serde_json::json!([format!("uuid:{i}")])
            );
        }
    }

    #[tokio::test]
    async fn dns_sd_adapters_share_one_event_name() {
        let registry = Arc::new(EventRegistry::new());
        let service = DnsSdResponseAdapter::new(registry.clone(), "c1", TARGET);
        let txt = DnsSdTxtRecordAdapter::new(registry.clone(), "c1", TARGET);
        let src = P2pDevice::new("dut", TARGET);

        service.on_dns_sd_service_available(
            "printer".to_string(),
            "_ipp._tcp".to_string(),
            &src,
        );
        txt.on_dns_sd_txt_record_available(
            "printer._ipp._tcp.local.".to_string(),
            [("paper".to_string(), "a4".to_string())].into(),
            &src,
        );

        let first = registry
            .poll("c1", DNS_SD_RESPONSE_EVENT, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(first.fields()[fields::INSTANCE_NAME], "printer");
        let second = registry
            .poll("c1", DNS_SD_RESPONSE_EVENT, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(second.fields()[fields::TXT_RECORD_MAP]["paper"], "a4");
    }

    #[tokio::test]
    async fn dns_sd_adapter_filters_by_target() {
        let registry = Arc::new(EventRegistry::new());
        let service = DnsSdResponseAdapter::new(registry.clone(), "c1", TARGET);

        service.on_dns_sd_service_available(
            "printer".to_string(),
            "_ipp._tcp".to_string(),
            &P2pDevice::new("stranger", OTHER),
        );
        assert!(registry
            .poll("c1", DNS_SD_RESPONSE_EVENT, Duration::from_millis(20))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn broadcast_adapter_posts_connection_changes() {
        let registry = Arc::new(EventRegistry::new());
        let adapter = BroadcastAdapter::new(registry.clone(), "init-1");

        adapter.on_connection_changed(ConnectionChange {
            is_connected: true,
            p2p_info: Some(bridge_traits::P2pInfo {
                group_formed: true,
                is_group_owner: true,
                group_owner_address: Some("192.168.49.1".to_string()),
            }),
            group: None,
        });

        let event = registry
            .poll("init-1", CONNECTION_CHANGED_EVENT, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(event.fields()[fields::IS_CONNECTED], true);
        assert_eq!(event.fields()[fields::P2P_INFO]["group_formed"], true);
        assert_eq!(event.fields()[fields::P2P_GROUP], Value::Null);
    }
}
