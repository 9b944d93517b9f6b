//! Native Wi-Fi Direct Abstraction
//!
//! Data types and callback interfaces mirroring the platform's Wi-Fi Direct
//! (P2P) surface. Every operation on [`WifiDirectStack`] is asynchronous in
//! the callback sense: the call returns as soon as the request is handed to
//! the platform, and the outcome arrives later on one of the listener traits,
//! invoked from a platform dispatch thread.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ============================================================================
// Data Types
// ============================================================================

/// Connection status of a peer device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerStatus {
    Connected,
    Invited,
    Failed,
    Available,
    Unavailable,
}

/// A peer device as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct P2pDevice {
    /// Human-readable device name.
    pub device_name: String,
    /// MAC address of the device, `AA:BB:CC:DD:EE:FF` form.
    pub device_address: String,
    pub status: PeerStatus,
    pub is_group_owner: bool,
}

impl P2pDevice {
    /// Convenience constructor for an available peer.
    pub fn new(device_name: impl Into<String>, device_address: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            device_address: device_address.into(),
            status: PeerStatus::Available,
            is_group_owner: false,
        }
    }
}

/// Negotiated connection details for a formed group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct P2pInfo {
    pub group_formed: bool,
    pub is_group_owner: bool,
    /// IP address of the group owner once the group is formed.
    pub group_owner_address: Option<String>,
}

/// A p2p group, either active or persisted by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct P2pGroup {
    pub network_name: String,
    /// Platform-assigned id for persistent groups, `-1` for temporary ones.
    pub network_id: i32,
    pub is_group_owner: bool,
    pub owner_address: String,
    pub passphrase: Option<String>,
}

/// Payload of a connection-changed broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionChange {
    pub is_connected: bool,
    pub p2p_info: Option<P2pInfo>,
    pub group: Option<P2pGroup>,
}

/// Opaque handle to an initialized platform channel.
///
/// Obtained from [`WifiDirectStack::initialize`] and required by every
/// dependent operation. The handle stays valid until passed to
/// [`WifiDirectStack::close`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelHandle(pub u64);

// ============================================================================
// Native Argument Types
// ============================================================================

/// Native connect / group-creation parameters.
///
/// Produced by the config decoding layer in `core-service`; by the time a
/// request reaches the stack it is already validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    pub device_address: Option<String>,
    /// Legacy WPS setup mode; `None` selects the builder-style config path.
    pub wps_setup: Option<i32>,
    pub persistent: bool,
    pub group_operating_band: Option<i32>,
    pub group_operating_frequency: Option<i32>,
    pub network_name: Option<String>,
    pub passphrase: Option<String>,
    pub group_client_ip_provisioning_mode: Option<i32>,
}

/// A service discovery request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceRequest {
    /// UPnP discovery, optionally scoped to a service type.
    Upnp { service_type: Option<String> },
    /// DNS-SD discovery, optionally scoped to a service type and instance.
    DnsSd {
        service_type: Option<String>,
        instance_name: Option<String>,
    },
    /// Raw request for a numeric protocol type.
    Raw { protocol_type: i32 },
}

/// A local DNS-SD service to advertise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalService {
    pub instance_name: String,
    pub service_type: String,
    pub txt_records: HashMap<String, String>,
}

// ============================================================================
// Callback Interfaces
// ============================================================================

/// Success/failure callback shared by most stack operations.
///
/// Exactly one of the two methods fires per operation. `reason` is a small
/// platform-defined code; see `core-events` for the code-to-message table.
pub trait ActionListener: Send + Sync {
    fn on_success(&self);
    fn on_failure(&self, reason: i32);
}

/// One-shot callback carrying the local device description.
pub trait DeviceInfoListener: Send + Sync {
    /// `None` means the platform has no device information yet.
    fn on_device_info_available(&self, device: Option<P2pDevice>);
}

/// One-shot callback carrying the current peer list.
pub trait PeerListListener: Send + Sync {
    fn on_peers_available(&self, peers: Vec<P2pDevice>);
}

/// One-shot callback carrying the persisted group list.
pub trait PersistentGroupInfoListener: Send + Sync {
    fn on_persistent_group_info_available(&self, groups: Vec<P2pGroup>);
}

/// UPnP discovery responses; fires once per responding device.
pub trait UpnpServiceResponseListener: Send + Sync {
    fn on_upnp_service_available(&self, unique_service_names: Vec<String>, src_device: &P2pDevice);
}

/// DNS-SD service discovery responses; fires once per responding device.
pub trait DnsSdServiceResponseListener: Send + Sync {
    fn on_dns_sd_service_available(
        &self,
        instance_name: String,
        registration_type: String,
        src_device: &P2pDevice,
    );
}

/// DNS-SD TXT record responses; fires once per responding device.
pub trait DnsSdTxtRecordListener: Send + Sync {
    fn on_dns_sd_txt_record_available(
        &self,
        full_domain_name: String,
        txt_records: HashMap<String, String>,
        src_device: &P2pDevice,
    );
}

/// Ambient state transitions, delivered for the lifetime of a channel.
///
/// Registered during [`WifiDirectStack::initialize`] and unregistered by
/// [`WifiDirectStack::close`].
pub trait BroadcastListener: Send + Sync {
    fn on_p2p_state_changed(&self, enabled: bool);
    fn on_peers_changed(&self, peers: Vec<P2pDevice>);
    fn on_connection_changed(&self, change: ConnectionChange);
    fn on_this_device_changed(&self, device: P2pDevice);
}

// ============================================================================
// Stack Operations
// ============================================================================

/// The native Wi-Fi Direct operation set.
///
/// Implementations hand each request to the platform and return immediately;
/// they must not invoke a listener synchronously from inside the operation
/// call (outcomes are dispatched from platform threads). All methods may be
/// called concurrently from multiple tasks.
///
/// # Example
///
/// ```ignore
/// let channel = stack.initialize(broadcast_listener)?;
/// stack.discover_peers(channel, action_listener)?;
/// // ... the listener fires later, on a dispatch thread.
/// stack.close(channel)?;
/// ```
pub trait WifiDirectStack: Send + Sync {
    /// Register with the platform and obtain a channel for further calls.
    /// The broadcast listener stays registered until the channel is closed.
    fn initialize(&self, broadcast: Arc<dyn BroadcastListener>) -> Result<ChannelHandle>;

    /// Close the channel and unregister its broadcast listener.
    fn close(&self, channel: ChannelHandle) -> Result<()>;

    fn request_device_info(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn DeviceInfoListener>,
    ) -> Result<()>;

    fn discover_peers(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()>;

    fn stop_peer_discovery(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()>;

    fn request_peers(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn PeerListListener>,
    ) -> Result<()>;

    fn connect(
        &self,
        channel: ChannelHandle,
        request: &ConnectRequest,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()>;

    fn cancel_connect(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()>;

    /// Create a group with this device as owner. `request` of `None` lets the
    /// platform pick the parameters.
    fn create_group(
        &self,
        channel: ChannelHandle,
        request: Option<&ConnectRequest>,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()>;

    fn remove_group(&self, channel: ChannelHandle, listener: Arc<dyn ActionListener>)
        -> Result<()>;

    fn add_local_service(
        &self,
        channel: ChannelHandle,
        service: &LocalService,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()>;

    fn add_service_request(
        &self,
        channel: ChannelHandle,
        request: &ServiceRequest,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()>;

    fn set_upnp_service_response_listener(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn UpnpServiceResponseListener>,
    ) -> Result<()>;

    fn set_dns_sd_response_listeners(
        &self,
        channel: ChannelHandle,
        service_listener: Arc<dyn DnsSdServiceResponseListener>,
        txt_listener: Arc<dyn DnsSdTxtRecordListener>,
    ) -> Result<()>;

    fn request_persistent_group_info(
        &self,
        channel: ChannelHandle,
        listener: Arc<dyn PersistentGroupInfoListener>,
    ) -> Result<()>;

    fn delete_persistent_group(
        &self,
        channel: ChannelHandle,
        network_id: i32,
        listener: Arc<dyn ActionListener>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p2p_device_serializes_with_screaming_status() {
        let device = P2pDevice::new("dut", "AA:BB:CC:DD:EE:FF");
        let json = serde_json::to_value(&device).unwrap();
        assert_eq!(json["status"], "AVAILABLE");
        assert_eq!(json["device_address"], "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn connection_change_round_trips() {
        let change = ConnectionChange {
            is_connected: true,
            p2p_info: Some(P2pInfo {
                group_formed: true,
                is_group_owner: false,
                group_owner_address: Some("192.168.49.1".to_string()),
            }),
            group: None,
        };
        let json = serde_json::to_string(&change).unwrap();
        let back: ConnectionChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
    }
}
