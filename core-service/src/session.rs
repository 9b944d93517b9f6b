//! Channel lifecycle state machine.
//!
//! A session moves strictly forward: uninitialized → initialized → closed.
//! Initialization registers the ambient broadcast adapter with the platform
//! and pins the channel handle; close releases both and clears the session's
//! ambient event queues. The state lock is a std mutex and is never held
//! across an await.

use std::sync::{Arc, Mutex};

use bridge_traits::p2p::{ChannelHandle, WifiDirectStack};
use core_events::{BroadcastAdapter, Error, EventRegistry, Result};

enum SessionPhase {
    Uninitialized,
    Initialized {
        channel: ChannelHandle,
        correlation_id: String,
    },
    Closed,
}

/// Lifecycle owner for one platform channel.
pub struct P2pSession {
    stack: Arc<dyn WifiDirectStack>,
    registry: Arc<EventRegistry>,
    phase: Mutex<SessionPhase>,
}

impl P2pSession {
    pub fn new(stack: Arc<dyn WifiDirectStack>, registry: Arc<EventRegistry>) -> Self {
        Self {
            stack,
            registry,
            phase: Mutex::new(SessionPhase::Uninitialized),
        }
    }

    /// Initialize the platform channel and register the broadcast adapter
    /// under `correlation_id`. Legal exactly once: a second call, or a call
    /// after [`close`](P2pSession::close), raises [`Error::State`].
    pub fn initialize(&self, correlation_id: &str) -> Result<()> {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        match *phase {
            SessionPhase::Uninitialized => {
                let adapter = Arc::new(BroadcastAdapter::new(
                    self.registry.clone(),
                    correlation_id,
                ));
                let channel = self.stack.initialize(adapter)?;
                tracing::info!(correlation_id, channel = channel.0, "session initialized");
                *phase = SessionPhase::Initialized {
                    channel,
                    correlation_id: correlation_id.to_string(),
                };
                Ok(())
            }
            SessionPhase::Initialized { .. } => {
                Err(Error::State("session is already initialized".to_string()))
            }
            SessionPhase::Closed => Err(Error::State(
                "session is closed and cannot be reinitialized".to_string(),
            )),
        }
    }

    /// The channel handle for dependent operations.
    ///
    /// Raises [`Error::State`] unless the session is initialized.
    pub fn channel(&self) -> Result<ChannelHandle> {
        match *self.phase.lock().unwrap_or_else(|e| e.into_inner()) {
            SessionPhase::Initialized { channel, .. } => Ok(channel),
            _ => Err(Error::State(
                "p2p session is not initialized, call initialize first".to_string(),
            )),
        }
    }

    /// Close the session. Legal from any state and idempotent: closing an
    /// uninitialized or already-closed session does nothing. Platform close
    /// failures are logged and swallowed; close never raises.
    pub fn close(&self) {
        let mut phase = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if let SessionPhase::Initialized {
            channel,
            ref correlation_id,
        } = *phase
        {
            if let Err(err) = self.stack.close(channel) {
                tracing::warn!(channel = channel.0, %err, "platform close failed");
            }
            let cleared = self.registry.clear_correlation(correlation_id);
            tracing::info!(
                correlation_id,
                channel = channel.0,
                cleared,
                "session closed"
            );
            *phase = SessionPhase::Closed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use bridge_traits::p2p::{
        ActionListener, BroadcastListener, ConnectRequest, DeviceInfoListener,
        DnsSdServiceResponseListener, DnsSdTxtRecordListener, LocalService, PeerListListener,
        PersistentGroupInfoListener, ServiceRequest, UpnpServiceResponseListener,
    };
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Stack {}

        impl WifiDirectStack for Stack {
            fn initialize(&self, broadcast: Arc<dyn BroadcastListener>) -> BridgeResult<ChannelHandle>;
            fn close(&self, channel: ChannelHandle) -> BridgeResult<()>;
            fn request_device_info(
                &self,
                channel: ChannelHandle,
                listener: Arc<dyn DeviceInfoListener>,
            ) -> BridgeResult<()>;
            fn discover_peers(
                &self,
                channel: ChannelHandle,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
            fn stop_peer_discovery(
                &self,
                channel: ChannelHandle,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
            fn request_peers(
                &self,
                channel: ChannelHandle,
                listener: Arc<dyn PeerListListener>,
            ) -> BridgeResult<()>;
            fn connect(
                &self,
                channel: ChannelHandle,
                request: &ConnectRequest,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
            fn cancel_connect(
                &self,
                channel: ChannelHandle,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
            fn create_group<'a>(
                &self,
                channel: ChannelHandle,
                request: Option<&'a ConnectRequest>,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
            fn remove_group(
                &self,
                channel: ChannelHandle,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
            fn add_local_service(
                &self,
                channel: ChannelHandle,
                service: &LocalService,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
            fn add_service_request(
                &self,
                channel: ChannelHandle,
                request: &ServiceRequest,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
            fn set_upnp_service_response_listener(
                &self,
                channel: ChannelHandle,
                listener: Arc<dyn UpnpServiceResponseListener>,
            ) -> BridgeResult<()>;
            fn set_dns_sd_response_listeners(
                &self,
                channel: ChannelHandle,
                service_listener: Arc<dyn DnsSdServiceResponseListener>,
                txt_listener: Arc<dyn DnsSdTxtRecordListener>,
            ) -> BridgeResult<()>;
            fn request_persistent_group_info(
                &self,
                channel: ChannelHandle,
                listener: Arc<dyn PersistentGroupInfoListener>,
            ) -> BridgeResult<()>;
            fn delete_persistent_group(
                &self,
                channel: ChannelHandle,
                network_id: i32,
                listener: Arc<dyn ActionListener>,
            ) -> BridgeResult<()>;
        }
    }

    fn session_with(stack: MockStack) -> P2pSession {
        P2pSession::new(Arc::new(stack), Arc::new(EventRegistry::new()))
    }

    #[test]
    fn initialize_acquires_the_channel() {
        let mut stack = MockStack::new();
        stack
            .expect_initialize()
            .times(1)
            .returning(|_| Ok(ChannelHandle(7)));
        let session = session_with(stack);

        session.initialize("c1").unwrap();
        assert_eq!(session.channel().unwrap(), ChannelHandle(7));
    }

    #[test]
    fn channel_before_initialize_is_a_state_error() {
        let session = session_with(MockStack::new());
        let err = session.channel().unwrap_err();
        assert!(matches!(err, Error::State(msg) if msg.contains("initialize first")));
    }

    #[test]
    fn double_initialize_is_a_state_error() {
        let mut stack = MockStack::new();
        stack
            .expect_initialize()
            .times(1)
            .returning(|_| Ok(ChannelHandle(1)));
        let session = session_with(stack);

        session.initialize("c1").unwrap();
        assert!(matches!(session.initialize("c2"), Err(Error::State(_))));
    }

    #[test]
    fn initialize_after_close_is_a_state_error() {
        let mut stack = MockStack::new();
        stack
            .expect_initialize()
            .times(1)
            .returning(|_| Ok(ChannelHandle(1)));
        stack
            .expect_close()
            .with(eq(ChannelHandle(1)))
            .times(1)
            .returning(|_| Ok(()));
        let session = session_with(stack);

        session.initialize("c1").unwrap();
        session.close();
        assert!(matches!(session.initialize("c2"), Err(Error::State(_))));
    }

    #[test]
    fn close_is_idempotent_and_closes_the_stack_once() {
        let mut stack = MockStack::new();
        stack
            .expect_initialize()
            .times(1)
            .returning(|_| Ok(ChannelHandle(3)));
        stack.expect_close().times(1).returning(|_| Ok(()));
        let session = session_with(stack);

        session.initialize("c1").unwrap();
        session.close();
        session.close();
        assert!(session.channel().is_err());
    }

    #[test]
    fn close_before_initialize_is_a_no_op() {
        // No expectations registered: any stack call would panic the mock.
        let session = session_with(MockStack::new());
        session.close();
        session.close();
    }

    #[test]
    fn close_swallows_platform_failures() {
        let mut stack = MockStack::new();
        stack
            .expect_initialize()
            .times(1)
            .returning(|_| Ok(ChannelHandle(1)));
        stack
            .expect_close()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("busy".to_string())));
        let session = session_with(stack);

        session.initialize("c1").unwrap();
        session.close();
        assert!(session.channel().is_err());
    }

    #[test]
    fn close_clears_the_session_event_queues() {
        let registry = Arc::new(EventRegistry::new());
        let mut stack = MockStack::new();
        stack
            .expect_initialize()
            .times(1)
            .returning(|_| Ok(ChannelHandle(1)));
        stack.expect_close().times(1).returning(|_| Ok(()));
        let session = P2pSession::new(Arc::new(stack), registry.clone());

        session.initialize("ambient").unwrap();
        registry.post(core_events::CallbackEvent::new("ambient", "WIFI_P2P_PEERS_CHANGED"));
        registry.post(core_events::CallbackEvent::new("other", "evt"));
        assert_eq!(registry.queue_count(), 2);

        session.close();
        assert_eq!(registry.queue_count(), 1);
    }
}
