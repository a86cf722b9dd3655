//! Device query collaborator
//!
//! The poller only needs a single request/response primitive: read one
//! identifier from one device within a timeout. Everything about the wire
//! protocol (encoding, retries, sessions) lives behind `DeviceClient`.

use std::time::Duration;

use async_trait::async_trait;

#[cfg(feature = "device-snmp")]
pub mod snmp;

/// Value as returned by the device, before any vendor conversion
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Integer(i64),
    Unsigned(u64),
    Text(String),
    /// The device answered without a value, e.g. `noSuchInstance`
    Null,
}

impl RawValue {
    /// Numeric view of the value. Text is accepted when it parses as a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawValue::Integer(v) => Some(*v as f64),
            RawValue::Unsigned(v) => Some(*v as f64),
            RawValue::Text(s) => s.trim().parse().ok(),
            RawValue::Null => None,
        }
    }

    /// Non-negative integer view, used for octet counters.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RawValue::Integer(v) => u64::try_from(*v).ok(),
            RawValue::Unsigned(v) => Some(*v),
            RawValue::Text(s) => s.trim().parse().ok(),
            RawValue::Null => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("read timed out after {0:?}")]
    Timeout(Duration),

    #[error("device unreachable: {0}")]
    Unreachable(String),

    #[error("device returned error status {0}")]
    ErrorStatus(u32),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Single-shot read against a device.
///
/// Implementations must be safe to share across concurrently polled OLTs.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    async fn read(
        &self,
        address: &str,
        credential: &str,
        identifier: &str,
        timeout: Duration,
    ) -> Result<RawValue, DeviceError>;
}
