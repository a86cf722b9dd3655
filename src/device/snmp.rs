//! SNMPv2c device client
//!
//! Each read opens a short-lived UDP session on the blocking pool, issues a
//! single GET and converts the first varbind. There is no retry here: a
//! timed out read surfaces as `DeviceError::Timeout` and the caller decides.

use std::time::Duration;

use async_trait::async_trait;
use snmp::{SnmpError, SyncSession, Value};
use tracing::{instrument, trace};

use super::{DeviceClient, DeviceError, RawValue};

pub const DEFAULT_SNMP_PORT: u16 = 161;

#[derive(Debug, Clone)]
pub struct SnmpClient {
    port: u16,
}

impl SnmpClient {
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

impl Default for SnmpClient {
    fn default() -> Self {
        Self::new(DEFAULT_SNMP_PORT)
    }
}

fn parse_oid(identifier: &str) -> Result<Vec<u32>, DeviceError> {
    identifier
        .trim_start_matches('.')
        .split('.')
        .map(|arc| {
            arc.parse::<u32>()
                .map_err(|_| DeviceError::InvalidIdentifier(identifier.to_string()))
        })
        .collect()
}

fn convert(value: Value<'_>) -> RawValue {
    match value {
        Value::Integer(v) => RawValue::Integer(v),
        Value::Counter32(v) | Value::Unsigned32(v) | Value::Timeticks(v) => {
            RawValue::Unsigned(u64::from(v))
        }
        Value::Counter64(v) => RawValue::Unsigned(v),
        Value::OctetString(bytes) => RawValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        _ => RawValue::Null,
    }
}

fn map_error(err: SnmpError, timeout: Duration) -> DeviceError {
    match err {
        SnmpError::ReceiveError => DeviceError::Timeout(timeout),
        SnmpError::SendError => DeviceError::Unreachable("send failed".to_string()),
        other => DeviceError::Transport(format!("{other:?}")),
    }
}

#[async_trait]
impl DeviceClient for SnmpClient {
    #[instrument(skip(self, credential, timeout))]
    async fn read(
        &self,
        address: &str,
        credential: &str,
        identifier: &str,
        timeout: Duration,
    ) -> Result<RawValue, DeviceError> {
        let oid = parse_oid(identifier)?;
        let target = format!("{address}:{}", self.port);
        let community = credential.as_bytes().to_vec();

        let value = tokio::task::spawn_blocking(move || {
            let mut session = SyncSession::new(target.as_str(), &community, Some(timeout), 0)
                .map_err(|e| DeviceError::Unreachable(e.to_string()))?;

            let mut response = session.get(&oid).map_err(|e| map_error(e, timeout))?;

            if response.error_status != 0 {
                return Err(DeviceError::ErrorStatus(response.error_status));
            }

            Ok(response
                .varbinds
                .next()
                .map(|(_, value)| convert(value))
                .unwrap_or(RawValue::Null))
        })
        .await
        .map_err(|e| DeviceError::Transport(e.to_string()))??;

        trace!("read {value:?}");
        Ok(value)
    }
}
