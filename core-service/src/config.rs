//! Caller-supplied configuration decoding.
//!
//! The transport hands operation parameters over as loose JSON. Everything is
//! decoded and validated here, before any platform call; a violation raises
//! [`Error::Configuration`] and never reaches the stack. Field keys are
//! snake_case on the wire, and unknown keys are rejected so a caller speaking
//! a different vocabulary fails loudly instead of having fields silently
//! dropped.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use bridge_traits::p2p::{ConnectRequest, LocalService, ServiceRequest};
use core_events::{Error, Result};

/// `instance_create_type` value selecting a UPnP discovery request.
pub const UPNP_SERVICE_REQUEST_TYPE: &str = "WifiP2pUpnpServiceRequest";
/// `instance_create_type` value selecting a DNS-SD discovery request.
pub const DNS_SD_SERVICE_REQUEST_TYPE: &str = "WifiP2pDnsSdServiceRequest";

fn decode<T: for<'de> Deserialize<'de>>(what: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| Error::Configuration(format!("invalid {what} config: {e}")))
}

/// Parameters for `connect` and `create_group`.
///
/// Two construction paths exist on the platform side: the legacy path keyed
/// by `wps_setup` (which honors only the device address), and the builder
/// path keyed by the remaining fields.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectConfig {
    pub device_address: Option<String>,
    pub wps_setup: Option<i32>,
    pub persistent_mode: Option<bool>,
    pub group_operating_band: Option<i32>,
    pub group_operating_frequency: Option<i32>,
    pub network_name: Option<String>,
    pub passphrase: Option<String>,
    pub group_client_ip_provisioning_mode: Option<i32>,
}

impl ConnectConfig {
    pub fn from_value(value: Value) -> Result<Self> {
        decode("connect", value)
    }

    /// Validate and convert into the native request.
    pub fn into_request(self) -> Result<ConnectRequest> {
        if self.group_operating_band.is_some() && self.group_operating_frequency.is_some() {
            return Err(Error::Configuration(
                "group_operating_band and group_operating_frequency are mutually exclusive"
                    .to_string(),
            ));
        }
        if self.network_name.is_some() != self.passphrase.is_some() {
            return Err(Error::Configuration(
                "network_name and passphrase must be provided together".to_string(),
            ));
        }
        Ok(ConnectRequest {
            device_address: self.device_address,
            wps_setup: self.wps_setup,
            persistent: self.persistent_mode.unwrap_or(false),
            group_operating_band: self.group_operating_band,
            group_operating_frequency: self.group_operating_frequency,
            network_name: self.network_name,
            passphrase: self.passphrase,
            group_client_ip_provisioning_mode: self.group_client_ip_provisioning_mode,
        })
    }
}

/// Parameters for `add_service_request`.
///
/// Exactly one of `instance_create_type` (a named request kind) or
/// `protocol_type` (a raw numeric protocol) must be present.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceRequestConfig {
    pub instance_create_type: Option<String>,
    pub protocol_type: Option<i32>,
    pub service_type: Option<String>,
    pub instance_name: Option<String>,
}

impl ServiceRequestConfig {
    pub fn from_value(value: Value) -> Result<Self> {
        decode("service request", value)
    }

    pub fn into_request(self) -> Result<ServiceRequest> {
        match (self.instance_create_type, self.protocol_type) {
            (Some(_), Some(_)) => Err(Error::Configuration(
                "instance_create_type and protocol_type are mutually exclusive".to_string(),
            )),
            (None, None) => Err(Error::Configuration(
                "one of instance_create_type or protocol_type is required".to_string(),
            )),
            (None, Some(protocol_type)) => Ok(ServiceRequest::Raw { protocol_type }),
            (Some(create_type), None) => match create_type.as_str() {
                UPNP_SERVICE_REQUEST_TYPE => Ok(ServiceRequest::Upnp {
                    service_type: self.service_type,
                }),
                DNS_SD_SERVICE_REQUEST_TYPE => Ok(ServiceRequest::DnsSd {
                    service_type: self.service_type,
                    instance_name: self.instance_name,
                }),
                other => Err(Error::Configuration(format!(
                    "unknown instance_create_type '{other}'"
                ))),
            },
        }
    }
}

/// Parameters for `add_local_service`: a DNS-SD service to advertise.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LocalServiceConfig {
    pub instance_name: String,
    pub service_type: String,
    #[serde(default)]
    pub txt_record_map: HashMap<String, String>,
}

impl LocalServiceConfig {
    pub fn from_value(value: Value) -> Result<Self> {
        decode("local service", value)
    }

    pub fn into_service(self) -> LocalService {
        LocalService {
            instance_name: self.instance_name,
            service_type: self.service_type,
            txt_records: self.txt_record_map,
        }
    }
}
