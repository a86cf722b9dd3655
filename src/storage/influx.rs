//! Time-series sink writing InfluxDB line protocol over HTTP
//!
//! One line per snapshot:
//!
//! ```text
//! pon_port_metrics,pon_port_id=11,olt_id=3,port_name=PON\ 0/1 temperature=41.5,health_score=90i 1700000000000000000
//! ```
//!
//! Absent metrics are left out of the field set. `health_score` is always
//! written, so a line is never without fields.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use super::backend::TimeSeriesSink;
use super::error::{StorageError, StorageResult};
use super::schema::{FieldValue, PortSnapshot};
use crate::config::InfluxConfig;

pub const MEASUREMENT: &str = "pon_port_metrics";

pub struct InfluxSink {
    client: Client,
    write_url: String,
    token: String,
    org: String,
    bucket: String,
}

impl InfluxSink {
    pub fn new(config: &InfluxConfig) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            write_url: format!("{}/api/v2/write", config.url.trim_end_matches('/')),
            token: config.token.clone(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl TimeSeriesSink for InfluxSink {
    #[instrument(skip_all, fields(port = snapshot.port_id))]
    async fn append_point(&self, snapshot: &PortSnapshot) -> StorageResult<()> {
        let body = line_protocol(snapshot);
        debug!("writing point: {body}");

        let response = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::BackendError(format!(
                "influx write rejected with {status}: {text}"
            )));
        }

        Ok(())
    }
}

/// Encode a snapshot as a single line-protocol point.
pub fn line_protocol(snapshot: &PortSnapshot) -> String {
    let mut fields: Vec<String> = snapshot
        .present_fields()
        .into_iter()
        .map(|(name, value)| match value {
            FieldValue::Float(v) => format!("{name}={v}"),
            FieldValue::Unsigned(v) => format!("{name}={v}i"),
        })
        .collect();
    fields.push(format!("health_score={}i", snapshot.health_score.value()));

    let timestamp = snapshot.polled_at.timestamp_nanos_opt().unwrap_or_default();

    let mut tags = format!(
        "{MEASUREMENT},pon_port_id={},olt_id={}",
        snapshot.port_id, snapshot.olt_id
    );
    // influx rejects empty tag values, so a blank name drops the tag
    let port_name = escape_tag(&snapshot.port_name);
    if !port_name.is_empty() {
        tags.push_str(",port_name=");
        tags.push_str(&port_name);
    }

    format!("{tags} {} {timestamp}", fields.join(","))
}

/// Escape a tag value. Line breaks would split the point, so they become
/// escaped spaces; surrounding whitespace is trimmed.
fn escape_tag(value: &str) -> String {
    let value = value.trim();
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' | '\r' | '\t' => escaped.push_str("\\ "),
            ',' | '=' | ' ' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}
