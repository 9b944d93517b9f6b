//! Operation facade exposed to the remote-control transport.
//!
//! One method per remotely invokable operation. Two calling conventions,
//! matching the transport's:
//!
//! - **Async-style** operations take a caller-supplied correlation id, bind
//!   the matching adapter, hand the request to the platform, and return
//!   immediately. The caller retrieves outcomes later through
//!   [`wait_for_event`](P2pService::wait_for_event) /
//!   [`verify_succeeded`](P2pService::verify_succeeded) under the same id.
//! - **Sync-style** operations generate an internal correlation id and await
//!   the action outcome before returning, bounded by
//!   [`DEFAULT_TIMEOUT_MS`](core_events::DEFAULT_TIMEOUT_MS).

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use uuid::Uuid;

use bridge_traits::p2p::WifiDirectStack;
use core_events::{
    verify_succeeded, wait_for_event, ActionEventAdapter, CallbackEvent, DeviceInfoAdapter,
    DnsSdResponseAdapter, DnsSdTxtRecordAdapter, EventRegistry, FieldMap, PeerListAdapter,
    PersistentGroupAdapter, Result, UpnpResponseAdapter, ACTION_LISTENER_EVENT,
    DEFAULT_TIMEOUT_MS,
};

use crate::config::{ConnectConfig, LocalServiceConfig, ServiceRequestConfig};
use crate::session::P2pSession;

/// The Wi-Fi Direct operation surface.
pub struct P2pService {
    stack: Arc<dyn WifiDirectStack>,
    registry: Arc<EventRegistry>,
    session: P2pSession,
}

impl P2pService {
    pub fn new(stack: Arc<dyn WifiDirectStack>, registry: Arc<EventRegistry>) -> Self {
        let session = P2pSession::new(stack.clone(), registry.clone());
        Self {
            stack,
            registry,
            session,
        }
    }

    pub fn registry(&self) -> &Arc<EventRegistry> {
        &self.registry
    }

    fn internal_id(op: &str) -> String {
        format!("{op}-{}", Uuid::new_v4())
    }

    async fn await_action(&self, correlation_id: &str) -> Result<()> {
        verify_succeeded(
            &self.registry,
            correlation_id,
            ACTION_LISTENER_EVENT,
            DEFAULT_TIMEOUT_MS,
        )
        .await
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Initialize the platform channel; ambient broadcasts are posted under
    /// `correlation_id` from here on.
    pub fn initialize(&self, correlation_id: &str) -> Result<()> {
        self.session.initialize(correlation_id)
    }

    /// Tear the session down. Idempotent, never raises.
    pub fn close(&self) {
        self.session.close();
    }

    // ========================================================================
    // Async-style operations (caller-supplied correlation id)
    // ========================================================================

    pub fn request_device_info(&self, correlation_id: &str) -> Result<()> {
        let channel = self.session.channel()?;
        tracing::debug!(correlation_id, "request_device_info");
        let adapter = Arc::new(DeviceInfoAdapter::new(self.registry.clone(), correlation_id));
        self.stack.request_device_info(channel, adapter)?;
        Ok(())
    }

    pub fn discover_peers(&self, correlation_id: &str) -> Result<()> {
        let channel = self.session.channel()?;
        tracing::debug!(correlation_id, "discover_peers");
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), correlation_id));
        self.stack.discover_peers(channel, adapter)?;
        Ok(())
    }

    pub fn request_peers(&self, correlation_id: &str) -> Result<()> {
        let channel = self.session.channel()?;
        tracing::debug!(correlation_id, "request_peers");
        let adapter = Arc::new(PeerListAdapter::new(self.registry.clone(), correlation_id));
        self.stack.request_peers(channel, adapter)?;
        Ok(())
    }

    /// Start connecting to a peer. The action outcome arrives under
    /// `correlation_id`; group formation itself is observed through the
    /// ambient connection-changed events.
    pub fn connect(&self, correlation_id: &str, config: Value) -> Result<()> {
        let channel = self.session.channel()?;
        let request = ConnectConfig::from_value(config)?.into_request()?;
        tracing::debug!(
            correlation_id,
            device_address = request.device_address.as_deref().unwrap_or("<none>"),
            "connect"
        );
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), correlation_id));
        self.stack.connect(channel, &request, adapter)?;
        Ok(())
    }

    /// Create a group with this device as owner; `config` of `None` lets the
    /// platform pick the parameters.
    pub fn create_group(&self, correlation_id: &str, config: Option<Value>) -> Result<()> {
        let channel = self.session.channel()?;
        let request = config
            .map(|value| ConnectConfig::from_value(value)?.into_request())
            .transpose()?;
        tracing::debug!(correlation_id, scripted = request.is_some(), "create_group");
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), correlation_id));
        self.stack.create_group(channel, request.as_ref(), adapter)?;
        Ok(())
    }

    pub fn add_local_service(&self, correlation_id: &str, config: Value) -> Result<()> {
        let channel = self.session.channel()?;
        let service = LocalServiceConfig::from_value(config)?.into_service();
        tracing::debug!(correlation_id, instance = %service.instance_name, "add_local_service");
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), correlation_id));
        self.stack.add_local_service(channel, &service, adapter)?;
        Ok(())
    }

    /// Register the UPnP response listener, scoped to responses from
    /// `target_address` (matched case-insensitively).
    pub fn set_upnp_service_response_listener(
        &self,
        correlation_id: &str,
        target_address: &str,
    ) -> Result<()> {
        let channel = self.session.channel()?;
        tracing::debug!(correlation_id, target_address, "set_upnp_service_response_listener");
        let adapter = Arc::new(UpnpResponseAdapter::new(
            self.registry.clone(),
            correlation_id,
            target_address,
        ));
        self.stack.set_upnp_service_response_listener(channel, adapter)?;
        Ok(())
    }

    /// Register both DNS-SD response listeners, scoped to `target_address`.
    pub fn set_dns_sd_response_listeners(
        &self,
        correlation_id: &str,
        target_address: &str,
    ) -> Result<()> {
        let channel = self.session.channel()?;
        tracing::debug!(correlation_id, target_address, "set_dns_sd_response_listeners");
        let service_adapter = Arc::new(DnsSdResponseAdapter::new(
            self.registry.clone(),
            correlation_id,
            target_address,
        ));
        let txt_adapter = Arc::new(DnsSdTxtRecordAdapter::new(
            self.registry.clone(),
            correlation_id,
            target_address,
        ));
        self.stack
            .set_dns_sd_response_listeners(channel, service_adapter, txt_adapter)?;
        Ok(())
    }

    pub fn request_persistent_group_info(&self, correlation_id: &str) -> Result<()> {
        let channel = self.session.channel()?;
        tracing::debug!(correlation_id, "request_persistent_group_info");
        let adapter = Arc::new(PersistentGroupAdapter::new(
            self.registry.clone(),
            correlation_id,
        ));
        self.stack.request_persistent_group_info(channel, adapter)?;
        Ok(())
    }

    // ========================================================================
    // Sync-style operations (outcome awaited internally)
    // ========================================================================

    pub async fn stop_peer_discovery(&self) -> Result<()> {
        let channel = self.session.channel()?;
        let id = Self::internal_id("stop_peer_discovery");
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), id.as_str()));
        self.stack.stop_peer_discovery(channel, adapter)?;
        self.await_action(&id).await
    }

    pub async fn cancel_connect(&self) -> Result<()> {
        let channel = self.session.channel()?;
        let id = Self::internal_id("cancel_connect");
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), id.as_str()));
        self.stack.cancel_connect(channel, adapter)?;
        self.await_action(&id).await
    }

    pub async fn remove_group(&self) -> Result<()> {
        let channel = self.session.channel()?;
        let id = Self::internal_id("remove_group");
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), id.as_str()));
        self.stack.remove_group(channel, adapter)?;
        self.await_action(&id).await
    }

    pub async fn delete_persistent_group(&self, network_id: i32) -> Result<()> {
        let channel = self.session.channel()?;
        let id = Self::internal_id("delete_persistent_group");
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), id.as_str()));
        self.stack.delete_persistent_group(channel, network_id, adapter)?;
        self.await_action(&id).await
    }

    /// Register a service discovery request and wait for the platform to
    /// acknowledge it under the caller's correlation id.
    pub async fn add_service_request(&self, correlation_id: &str, config: Value) -> Result<()> {
        let channel = self.session.channel()?;
        let request = ServiceRequestConfig::from_value(config)?.into_request()?;
        tracing::debug!(correlation_id, ?request, "add_service_request");
        let adapter = Arc::new(ActionEventAdapter::new(self.registry.clone(), correlation_id));
        self.stack.add_service_request(channel, &request, adapter)?;
        self.await_action(correlation_id).await
    }

    /// Connect and wait for the platform to accept the request.
    pub async fn connect_and_wait(&self, config: Value) -> Result<()> {
        let id = Self::internal_id("connect");
        self.connect(&id, config)?;
        self.await_action(&id).await
    }

    // ========================================================================
    // Event boundary passthroughs
    // ========================================================================

    /// Remove and return the next event for `(correlation_id, name)`, waiting
    /// up to `timeout_ms`.
    pub async fn poll_event(
        &self,
        correlation_id: &str,
        name: &str,
        timeout_ms: u64,
    ) -> Option<CallbackEvent> {
        self.registry
            .poll(correlation_id, name, Duration::from_millis(timeout_ms))
            .await
    }

    /// See [`core_events::wait_for_event`].
    pub async fn wait_for_event(
        &self,
        correlation_id: &str,
        name: &str,
        timeout_ms: u64,
    ) -> Result<FieldMap> {
        wait_for_event(&self.registry, correlation_id, name, timeout_ms).await
    }

    /// See [`core_events::verify_succeeded`].
    pub async fn verify_succeeded(
        &self,
        correlation_id: &str,
        name: &str,
        timeout_ms: u64,
    ) -> Result<()> {
        verify_succeeded(&self.registry, correlation_id, name, timeout_ms).await
    }

    /// Drop every queued event for a finished correlation id.
    pub fn clear_events(&self, correlation_id: &str) -> usize {
        self.registry.clear_correlation(correlation_id)
    }
}
