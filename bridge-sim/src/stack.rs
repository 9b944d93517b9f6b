//! Scriptable stack implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bridge_traits::error::{BridgeError, Result};
use bridge_traits::p2p::{
    ActionListener, BroadcastListener, ChannelHandle, ConnectRequest, ConnectionChange,
    DeviceInfoListener, DnsSdServiceResponseListener, DnsSdTxtRecordListener, LocalService,
    P2pDevice, P2pGroup, PeerListListener, PersistentGroupInfoListener, ServiceRequest,
    UpnpServiceResponseListener, WifiDirectStack,
};

/// Operations whose action outcome can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOp {
    DiscoverPeers,
    StopPeerDiscovery,
    Connect,
    CancelConnect,
    CreateGroup,
    RemoveGroup,
    AddLocalService,
    AddServiceRequest,
    DeletePersistentGroup,
}

/// Scripted platform behavior.
///
/// The default is a healthy platform: every action succeeds, the local device
/// is `sim-device` at `02:00:00:00:01:00`, and the peer and persistent-group
/// lists are empty.
#[derive(Debug, Clone)]
pub struct SimBehavior {
    failures: HashMap<SimOp, i32>,
    device_info: Option<P2pDevice>,
    peers: Vec<P2pDevice>,
    persistent_groups: Vec<P2pGroup>,
}

impl Default for SimBehavior {
    fn default() -> Self {
        Self {
            failures: HashMap::new(),
            device_info: Some(P2pDevice::new("sim-device", "02:00:00:00:01:00")),
            peers: Vec::new(),
            persistent_groups: Vec::new(),
        }
    }
}

impl SimBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `op` to report failure with the given platform reason code.
    pub fn fail_operation(mut self, op: SimOp, reason: i32) -> Self {
        self.failures.insert(op, reason);
        self
    }

    /// Script the local device description; `None` simulates a platform that
    /// has no device information yet.
    pub fn with_device_info(mut self, device: Option<P2pDevice>) -> Self {
        self.device_info = device;
        self
    }

    pub fn with_peers(mut self, peers: Vec<P2pDevice>) -> Self {
        self.peers = peers;
        self
    }

    pub fn with_persistent_groups(mut self, groups: Vec<P2pGroup>) -> Self {
        self.persistent_groups = groups;
        self
    }

    fn failure_for(&self, op: SimOp) -> Option<i32> {
        self.failures.get(&op).copied()
    }
}

struct ChannelState {
    broadcast: Arc<dyn BroadcastListener>,
    upnp: Option<Arc<dyn UpnpServiceResponseListener>>,
    dns_sd: Option<(
        Arc<dyn DnsSdServiceResponseListener>,
        Arc<dyn DnsSdTxtRecordListener>,
    )>,
}

/// Simulated [`WifiDirectStack`].
///
/// Thread-safe; operations may be invoked concurrently. Listener callbacks
/// always run on a spawned OS thread, never on the caller's.
pub struct SimStack {
    behavior: Mutex<SimBehavior>,
    next_channel: AtomicU64,
    channels: Mutex<HashMap<u64, Arc<ChannelState>>>,
}

impl SimStack {
    pub fn new(behavior: SimBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            next_channel: AtomicU64::new(1),
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the scripted behavior mid-test.
    pub fn set_behavior(&self, behavior: SimBehavior) {
        *self.behavior.lock().unwrap_or_else(|e| e.into_inner()) = behavior;
    }

    fn behavior(&self) -> SimBehavior {
        self.behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn channel_state(&self, channel: ChannelHandle) -> Result<Arc<ChannelState>> {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&channel.0)
            .cloned()
            .ok_or_else(|| BridgeError::InvalidChannel(format!("channel {} is closed", channel.0)))
    }

    fn dispatch_action(&self, op: SimOp, listener: Arc<dyn ActionListener>) {
        let failure = self.behavior().failure_for(op);
        std::thread::spawn(move || match failure {
            None => listener.on_success(),
            Some(reason) => listener.on_failure(reason),
        });
    }

    /// Whether `channel` has been initialized and not yet closed.
    pub fn is_channel_open(&self, channel: ChannelHandle) -> bool {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&channel.0)
    }

    // ========================================================================
    // Test hooks: injected discovery responses and broadcasts
    // ========================================================================

    /// Deliver a UPnP discovery response to the channel's registered listener.
    /// Returns `false` when no listener is registered.
    pub fn deliver_upnp_response(
        &self,
        channel: ChannelHandle,
        unique_service_names: Vec<String>,
        src_device: P2pDevice,
    ) -> bool {
        let Ok(state) = self.channel_state(channel) else {
            return false;
        };
        let Some(listener) = state.upnp.clone() else {
            tracing::warn!(channel = channel.0, "no upnp listener registered");
            return false;
        };
        std::thread::spawn(move || {
            listener.on_upnp_service_available(unique_service_names, &src_device);
        });
        true
    }

    /// Deliver a DNS-SD service response to the channel's registered listener.
    pub fn deliver_dns_sd_response(
        &self,
        channel: ChannelHandle,
        instance_name: String,
        registration_type: String,
        src_device: P2pDevice,
    ) -> bool {
        let Ok(state) = self.channel_state(channel) else {
            return false;
        };
        let Some((listener, _)) = state.dns_sd.clone() else {
            tracing::warn!(channel = channel.0, "no dns-sd listeners registered");
            return false;
        };
        std::thread::spawn(move || {
            listener.on_dns_sd_service_available(instance_name, registration_type, &src_device);
        });
        true
    }

    /// Deliver a DNS-SD TXT record response to the channel's registered
    /// listener.
    pub fn deliver_dns_sd_txt_record(
        &self,
        channel: ChannelHandle,
        full_domain_name: String,
        txt_records: HashMap<String, String>,
        src_device: P2pDevice,
    ) -> bool {
        let Ok(state) = self.channel_state(channel) else {
            return false;
        };
        let Some((_, listener)) = state.dns_sd.clone() else {
            tracing::warn!(channel = channel.0, "no dns-sd listeners registered");
            return false;
        };
        std::thread::spawn(move || {
            listener.on_dns_sd_txt_record_available(full_domain_name, txt_records, &src_device);
        });
        true
    }

    pub fn fire_state_changed(&self, channel: ChannelHandle, enabled: bool) -> bool {
        let Ok(state) = self.channel_state(channel) else {
            return false;
        };
        let broadcast = state.broadcast.clone();
        std::thread::spawn(move || broadcast.on_p2p_state_changed(enabled));
        true
    }

    pub fn fire_peers_changed(&self, channel: ChannelHandle, peers: Vec<P2pDevice>) -> bool {
        let Ok(state) = self.channel_state(channel) else {
            return false;
        };
        let broadcast = state.broadcast.clone();
        std::thread::spawn(move || broadcast.on_peers_changed(peers));
        true
    }

    pub fn fire_connection_changed(
        &self,
        channel: ChannelHandle,
        change: ConnectionChange,
    ) -> bool {
        let Ok(state) = self.channel_state(channel) else {
            return false;
        };
        let broadcast = state.broadcast.clone();
        std::thread::spawn(move || broadcast.on_connection_changed(change));
        true
    }

    pub fn fire_this_device_changed(&self, channel: ChannelHandle, device: P2pDevice) -> bool {
        let Ok(state) = self.channel_state(channel) else {
            return false;
        };
        let broadcast = state.broadcast.clone();
        std::thread::spawn(move || broadcast.on_this_device_changed(device));
        true
    }
}

impl WifiDirectStack for SimStack {
    fn initialize(&self, broadcast: Arc<dyn BroadcastListener>) -> Result<ChannelHandle> {
        let id = self.next_channel.fetch_add(1, Ordering::Relaxed);
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id,
                Arc::new(ChannelState {
                    broadcast,
                    upnp: None,
                    dns_sd: None,
                }),
            );
        tracing::debug!(channel = id, "sim channel opened");
        Ok(ChannelHandle(id))
    }

    fn close(&self, channel: ChannelHandle) -> Result<()> {
        let removed = self
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&channel.0);
        match removed {
            Some(_) => {
                tracing::debug!(channel = channel.0, "sim channel closed");
                Ok(())
            }
            None => Err(BridgeError::InvalidChannel(format!(
                "channel {} is closed",
                channel.0
            ))),
        }
    }

    fn request_device_info(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn DeviceInfoListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        let device = self.behavior().device_info;
        std::thread::spawn(move || listener.on_device_info_available(device));
        Ok(())
    }

    fn discover_peers(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::DiscoverPeers, listener);
        Ok(())
    }

    fn stop_peer_discovery(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::StopPeerDiscovery, listener);
        Ok(())
    }

    fn request_peers(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn PeerListListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        let peers = self.behavior().peers;
        std::thread::spawn(move || listener.on_peers_available(peers));
        Ok(())
    }

    fn connect(
        &self,
        channel: ChannelHandle,
        _request: &ConnectRequest,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::Connect, listener);
        Ok(())
    }

    fn cancel_connect(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::CancelConnect, listener);
        Ok(())
    }

    fn create_group(
        &self,
        channel: ChannelHandle,
        _request: Option<&ConnectRequest>,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::CreateGroup, listener);
        Ok(())
    }

    fn remove_group(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::RemoveGroup, listener);
        Ok(())
    }

    fn add_local_service(
        &self,
        channel: ChannelHandle,
        _service: &LocalService,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::AddLocalService, listener);
        Ok(())
    }

    fn add_service_request(
        &self,
        channel: ChannelHandle,
        _request: &ServiceRequest,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::AddServiceRequest, listener);
        Ok(())
    }

    fn set_upnp_service_response_listener(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn UpnpServiceResponseListener>,
    ) -> Result<()> {
        let mut map = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let state = map.get_mut(&channel.0).ok_or_else(|| {
            BridgeError::InvalidChannel(format!("channel {} is closed", channel.0))
        })?;
        *state = Arc::new(ChannelState {
            broadcast: state.broadcast.clone(),
            upnp: Some(listener),
            dns_sd: state.dns_sd.clone(),
        });
        Ok(())
    }

    fn set_dns_sd_response_listeners(
        &self,
        channel: ChannelHandle,
        service_listener: Arc<dyn DnsSdServiceResponseListener>,
        txt_listener: Arc<dyn DnsSdTxtRecordListener>,
    ) -> Result<()> {
        let mut map = self.channels.lock().unwrap_or_else(|e| e.into_inner());
        let state = map.get_mut(&channel.0).ok_or_else(|| {
            BridgeError::InvalidChannel(format!("channel {} is closed", channel.0))
        })?;
        *state = Arc::new(ChannelState {
            broadcast: state.broadcast.clone(),
            upnp: state.upnp.clone(),
            dns_sd: Some((service_listener, txt_listener)),
        });
        Ok(())
    }

    fn request_persistent_group_info(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn PersistentGroupInfoListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        let groups = self.behavior().persistent_groups;
        std::thread::spawn(move || listener.on_persistent_group_info_available(groups));
        Ok(())
    }

    fn delete_persistent_group(
        &self,
        channel: ChannelHandle,
        _network_id: i32,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()> {
        self.channel_state(channel)?;
        self.dispatch_action(SimOp::DeletePersistentGroup, listener);
        Ok(())
    }
}
