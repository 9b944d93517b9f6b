//! Uniform outcome representation for success/failure callbacks.
//!
//! Every action-style operation reports through the same two-method callback
//! shape; this module fixes the wire vocabulary for it: the `callbackName`
//! field distinguishes `onSuccess` from `onFailure`, and failures carry the
//! platform reason code plus a message resolved from a fixed table.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::{fields, FieldMap};

/// Event name used by the synchronous wait-and-verify path.
pub const ACTION_LISTENER_EVENT: &str = "ActionListenerCallback";

/// `callbackName` value for a success callback.
pub const CALLBACK_ON_SUCCESS: &str = "onSuccess";
/// `callbackName` value for a failure callback.
pub const CALLBACK_ON_FAILURE: &str = "onFailure";

pub const REASON_UNSUPPORTED: i32 = 1;
pub const REASON_BUSY: i32 = 2;
pub const REASON_GENERIC_ERROR: i32 = 3;
pub const REASON_NO_PENDING_REQUEST: i32 = 4;

/// Resolve a platform reason code to its fixed message.
pub fn reason_message(reason: i32) -> &'static str {
    match reason {
        REASON_UNSUPPORTED => "UNSUPPORTED",
        REASON_BUSY => "BUSY",
        REASON_GENERIC_ERROR => "GENERIC_ERROR",
        REASON_NO_PENDING_REQUEST => "NO_PENDING_REQUEST",
        _ => "Unhandled error",
    }
}

/// Decoded outcome of an action-style callback event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure { reason: i32, message: String },
}

impl Outcome {
    /// Decode an outcome from event fields.
    ///
    /// Returns [`Error::Protocol`] when the fields do not match the outcome
    /// contract: a missing or unknown `callbackName`, or a failure without
    /// its reason code.
    pub fn from_fields(fields_map: &FieldMap) -> Result<Self> {
        match fields_map.get(fields::CALLBACK_NAME).and_then(Value::as_str) {
            Some(CALLBACK_ON_SUCCESS) => Ok(Self::Success),
            Some(CALLBACK_ON_FAILURE) => {
                let reason = fields_map
                    .get(fields::REASON)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        Error::Protocol("failure event is missing the reason code".to_string())
                    })? as i32;
                let message = fields_map
                    .get(fields::ERROR_MESSAGE)
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| reason_message(reason).to_owned());
                Ok(Self::Failure { reason, message })
            }
            Some(other) => Err(Error::Protocol(format!(
                "unexpected callbackName '{other}'"
            ))),
            None => Err(Error::Protocol(
                "event carries no callbackName field".to_string(),
            )),
        }
    }
}
