//! Line-delimited JSON event ingestion.
//!
//! Each non-blank line is either a bare event or an envelope carrying the
//! caller's identity:
//!
//! ```json
//! {"user": "alice", "accounts": ["prod"], "event": {"details": {"type": "manual"}, "content": {}}}
//! ```

use relay_bus::EventDispatcher;
use relay_core::{Error, Event, RequestContext, Result};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct Envelope {
    event: Event,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    accounts: Vec<String>,
}

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub dispatched: u64,
    pub rejected: u64,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<(Event, RequestContext)>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line)?;
    if !value.is_object() {
        return Err(Error::InvalidEvent("expected a JSON object".to_string()));
    }

    if value.get("event").is_some() {
        let envelope: Envelope = serde_json::from_value(value)?;
        let ctx = match envelope.user {
            Some(user) => RequestContext::for_user(user),
            None => RequestContext::anonymous(),
        }
        .with_accounts(envelope.accounts);
        Ok(Some((envelope.event, ctx)))
    } else {
        let event: Event = serde_json::from_value(value)?;
        Ok(Some((event, RequestContext::anonymous())))
    }
}

/// Read `reader` to the end, dispatching every parsable line. Malformed
/// lines are logged and counted; only read errors abort the run.
pub async fn ingest<R>(reader: R, dispatcher: &EventDispatcher) -> std::io::Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = IngestStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        stats.lines += 1;
        match parse_line(&line) {
            Ok(Some((event, ctx))) => {
                debug!(request_id = %ctx.request_id, line = stats.lines, "Ingested event");
                dispatcher.dispatch(event, ctx);
                stats.dispatched += 1;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(line = stats.lines, error = %e, "Skipping malformed event line");
                stats.rejected += 1;
            }
        }
    }

    Ok(stats)
}
