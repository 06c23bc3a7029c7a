//! Notice Emitter - serializes notices and writes them to the current sink
//!
//! Notices are encoded as one JSON object per line:
//!
//! ```text
//! {"noticeType":"Info","showUser":false,"data":{"message":"shutdown operate tunnel"},"timestamp":"2015-01-28T17:35:13Z"}
//! ```
//!
//! - `noticeType`: the kind of notice, which fixes the shape of `data`
//! - `showUser`: whether the notice should be displayed to the user
//! - `data`: the kind-specific payload
//! - `timestamp`: UTC, RFC3339
//!
//! The sink lock is held across serialization and the write, so concurrent
//! producers never interleave bytes of two records and a sink swap never
//! splits a record. Records land in lock-acquisition order.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::types::{Notice, NoticeKind};

/// A destination for encoded notices
pub type NoticeSink = Box<dyn Write + Send>;

/// Written when even the fallback alert cannot be encoded
const LAST_RESORT_RECORD: &str =
    r#"{"noticeType":"Alert","showUser":false,"data":{"message":"notice serialization failed"},"timestamp":""}"#;

static GLOBAL_EMITTER: LazyLock<NoticeEmitter> = LazyLock::new(NoticeEmitter::stderr);

/// The process-wide emitter, writing to stderr until redirected
pub fn notice_emitter() -> &'static NoticeEmitter {
    &GLOBAL_EMITTER
}

/// Redirect the process-wide emitter to a new sink
pub fn set_notice_output(sink: impl Write + Send + 'static) {
    GLOBAL_EMITTER.set_output(sink);
}

/// Emit an `Info` notice on the process-wide emitter using `format!` syntax
#[macro_export]
macro_rules! notice_info {
    ($($arg:tt)*) => {
        $crate::notices::notice_emitter().info(format!($($arg)*))
    };
}

/// Emit an `Alert` notice on the process-wide emitter using `format!` syntax
#[macro_export]
macro_rules! notice_alert {
    ($($arg:tt)*) => {
        $crate::notices::notice_emitter().alert(format!($($arg)*))
    };
}

/// Emit an `Error` notice on the process-wide emitter using `format!` syntax
#[macro_export]
macro_rules! notice_error {
    ($($arg:tt)*) => {
        $crate::notices::notice_emitter().error(format!($($arg)*))
    };
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<'a, D> {
    notice_type: &'a str,
    show_user: bool,
    data: &'a D,
    timestamp: &'a str,
}

/// Handle for writing notices to a shared, swappable sink
///
/// Clones share the same sink; `set_output` on one is seen by all.
#[derive(Clone)]
pub struct NoticeEmitter {
    sink: Arc<Mutex<NoticeSink>>,
}

impl NoticeEmitter {
    /// Create an emitter writing to the given sink
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(sink))),
        }
    }

    /// Create an emitter writing to stderr
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Replace the sink; every later notice goes to the new one
    ///
    /// Output already written to the old sink is left where it is.
    pub fn set_output(&self, sink: impl Write + Send + 'static) {
        let mut current = self.lock();
        *current = Box::new(sink);
        debug!("NoticeEmitter::set_output: sink replaced");
    }

    /// Emit a typed notice
    pub fn emit(&self, notice: &Notice) {
        self.write_record(notice.kind().as_str(), notice.show_user(), &notice.payload());
    }

    /// Emit a notice from named fields
    pub fn emit_fields<N, I>(&self, kind: NoticeKind, show_user: bool, fields: I)
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Value)>,
    {
        let data: Map<String, Value> = fields.into_iter().map(|(name, value)| (name.into(), value)).collect();
        self.write_record(kind.as_str(), show_user, &data);
    }

    /// Emit a notice from an alternating name/value list
    ///
    /// A pair whose name is not a string is skipped, and a trailing value
    /// without a partner is ignored.
    pub fn emit_args(&self, kind: NoticeKind, show_user: bool, args: &[Value]) {
        let data: Map<String, Value> = args
            .chunks_exact(2)
            .filter_map(|pair| match &pair[0] {
                Value::String(name) => Some((name.clone(), pair[1].clone())),
                _ => None,
            })
            .collect();
        self.write_record(kind.as_str(), show_user, &data);
    }

    /// Emit a notice with an arbitrary serializable payload
    ///
    /// If the payload fails to serialize, an `Alert` describing the failure
    /// is written in its place.
    pub fn emit_data<T: Serialize + ?Sized>(&self, kind: NoticeKind, show_user: bool, data: &T) {
        self.write_record(kind.as_str(), show_user, &data);
    }

    // === Convenience methods ===

    /// Emit an informational message
    pub fn info(&self, message: impl Into<String>) {
        self.emit(&Notice::Info {
            message: message.into(),
        });
    }

    /// Emit an alert; typically a recoverable error condition
    pub fn alert(&self, message: impl Into<String>) {
        self.emit(&Notice::Alert {
            message: message.into(),
        });
    }

    /// Emit an error; typically an unrecoverable error condition
    pub fn error(&self, message: impl Into<String>) {
        self.emit(&Notice::Error {
            message: message.into(),
        });
    }

    /// Emit the core version
    pub fn core_version(&self, version: &str) {
        self.emit(&Notice::CoreVersion {
            version: version.to_string(),
        });
    }

    /// Emit how many servers are available for a region and protocol
    pub fn candidate_servers(&self, region: &str, protocol: &str, count: usize) {
        self.emit(&Notice::CandidateServers {
            region: region.to_string(),
            protocol: protocol.to_string(),
            count,
        });
    }

    /// Emit the details of a connection attempt
    pub fn connecting_server(&self, ip_address: &str, region: &str, protocol: &str, fronting_address: &str) {
        self.emit(&Notice::ConnectingServer {
            ip_address: ip_address.to_string(),
            region: region.to_string(),
            protocol: protocol.to_string(),
            fronting_address: fronting_address.to_string(),
        });
    }

    /// Emit a connection that became an active tunnel
    pub fn active_tunnel(&self, ip_address: &str) {
        self.emit(&Notice::ActiveTunnel {
            ip_address: ip_address.to_string(),
        });
    }

    /// Emit a failure to use the configured SOCKS proxy port
    pub fn socks_proxy_port_in_use(&self, port: u16) {
        self.emit(&Notice::SocksProxyPortInUse { port });
    }

    /// Emit the port the local SOCKS proxy listens on
    pub fn listening_socks_proxy_port(&self, port: u16) {
        self.emit(&Notice::ListeningSocksProxyPort { port });
    }

    /// Emit a failure to use the configured HTTP proxy port
    pub fn http_proxy_port_in_use(&self, port: u16) {
        self.emit(&Notice::HttpProxyPortInUse { port });
    }

    /// Emit the port the local HTTP proxy listens on
    pub fn listening_http_proxy_port(&self, port: u16) {
        self.emit(&Notice::ListeningHttpProxyPort { port });
    }

    /// Emit an available client upgrade
    pub fn client_upgrade_available(&self, version: &str) {
        self.emit(&Notice::ClientUpgradeAvailable {
            version: version.to_string(),
        });
    }

    /// Emit a sponsor homepage the client should display
    pub fn homepage(&self, url: &str) {
        self.emit(&Notice::Homepage { url: url.to_string() });
    }

    /// Emit the number of active tunnels
    pub fn tunnels(&self, count: usize) {
        self.emit(&Notice::Tunnels { count });
    }

    /// Emit an address that is being accessed without the tunnel
    pub fn untunneled(&self, address: &str) {
        self.emit(&Notice::Untunneled {
            address: address.to_string(),
        });
    }

    /// Emit that split tunnel is on for a region
    pub fn split_tunnel_region(&self, region: &str) {
        self.emit(&Notice::SplitTunnelRegion {
            region: region.to_string(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, NoticeSink> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_record<D: Serialize>(&self, notice_type: &str, show_user: bool, data: &D) {
        let mut sink = self.lock();
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let line = encode_record(notice_type, show_user, data, &timestamp);
        debug!(notice_type, show_user, "NoticeEmitter: writing notice");

        if let Err(e) = sink.write_all(line.as_bytes()).and_then(|_| sink.flush()) {
            warn!(notice_type, error = %e, "NoticeEmitter: failed to write notice");
        }
    }
}

impl fmt::Debug for NoticeEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoticeEmitter").finish_non_exhaustive()
    }
}

/// Encode one record, newline included
fn encode_record<D: Serialize>(notice_type: &str, show_user: bool, data: &D, timestamp: &str) -> String {
    let envelope = Envelope {
        notice_type,
        show_user,
        data,
        timestamp,
    };
    let mut line = match serde_json::to_string(&envelope) {
        Ok(json) => json,
        Err(e) => {
            warn!(notice_type, error = %e, "encode_record: serialization failed, writing alert instead");
            fallback_record(notice_type, &e, timestamp)
        }
    };
    line.push('\n');
    line
}

fn fallback_record(notice_type: &str, error: &serde_json::Error, timestamp: &str) -> String {
    let data = serde_json::json!({
        "message": format!("notice {notice_type} serialization failed: {error}"),
    });
    let envelope = Envelope {
        notice_type: NoticeKind::Alert.as_str(),
        show_user: false,
        data: &data,
        timestamp,
    };
    serde_json::to_string(&envelope).unwrap_or_else(|_| LAST_RESORT_RECORD.to_string())
}
