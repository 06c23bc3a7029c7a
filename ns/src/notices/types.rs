//! Notice taxonomy
//!
//! The closed catalog of notice kinds and the payload each one carries:
//! - Diagnostics: `Info`, `Alert`, `Error`, `CoreVersion`
//! - Server selection: `CandidateServers`, `ConnectingServer`, `ActiveTunnel`
//! - Local proxies: `SocksProxyPortInUse`, `ListeningSocksProxyPort`,
//!   `HttpProxyPortInUse`, `ListeningHttpProxyPort`
//! - Handshake results: `ClientUpgradeAvailable`, `Homepage`
//! - Connectivity: `Tunnels`, `Untunneled`, `SplitTunnelRegion`
//!
//! Kinds are only ever added. An existing kind never changes its fields, so
//! long-lived consumers can keep decoding old payloads.

use std::fmt;
use std::str::FromStr;

use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DecodeError, FieldError};

/// The kind of a notice, carried on the wire as `noticeType`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeKind {
    Info,
    Alert,
    Error,
    CoreVersion,
    CandidateServers,
    ConnectingServer,
    ActiveTunnel,
    SocksProxyPortInUse,
    ListeningSocksProxyPort,
    HttpProxyPortInUse,
    ListeningHttpProxyPort,
    ClientUpgradeAvailable,
    Homepage,
    Tunnels,
    Untunneled,
    SplitTunnelRegion,
}

impl NoticeKind {
    /// Every kind, in catalog order
    pub const ALL: [NoticeKind; 16] = [
        NoticeKind::Info,
        NoticeKind::Alert,
        NoticeKind::Error,
        NoticeKind::CoreVersion,
        NoticeKind::CandidateServers,
        NoticeKind::ConnectingServer,
        NoticeKind::ActiveTunnel,
        NoticeKind::SocksProxyPortInUse,
        NoticeKind::ListeningSocksProxyPort,
        NoticeKind::HttpProxyPortInUse,
        NoticeKind::ListeningHttpProxyPort,
        NoticeKind::ClientUpgradeAvailable,
        NoticeKind::Homepage,
        NoticeKind::Tunnels,
        NoticeKind::Untunneled,
        NoticeKind::SplitTunnelRegion,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Info => "Info",
            NoticeKind::Alert => "Alert",
            NoticeKind::Error => "Error",
            NoticeKind::CoreVersion => "CoreVersion",
            NoticeKind::CandidateServers => "CandidateServers",
            NoticeKind::ConnectingServer => "ConnectingServer",
            NoticeKind::ActiveTunnel => "ActiveTunnel",
            NoticeKind::SocksProxyPortInUse => "SocksProxyPortInUse",
            NoticeKind::ListeningSocksProxyPort => "ListeningSocksProxyPort",
            NoticeKind::HttpProxyPortInUse => "HttpProxyPortInUse",
            NoticeKind::ListeningHttpProxyPort => "ListeningHttpProxyPort",
            NoticeKind::ClientUpgradeAvailable => "ClientUpgradeAvailable",
            NoticeKind::Homepage => "Homepage",
            NoticeKind::Tunnels => "Tunnels",
            NoticeKind::Untunneled => "Untunneled",
            NoticeKind::SplitTunnelRegion => "SplitTunnelRegion",
        }
    }

    /// Whether notices of this kind are meant for the end user, not just diagnostics
    ///
    /// Clients should expect new `showUser` kinds over time and display at
    /// least the raw notice for ones they do not recognize.
    pub fn show_user(&self) -> bool {
        matches!(
            self,
            NoticeKind::Error
                | NoticeKind::SocksProxyPortInUse
                | NoticeKind::HttpProxyPortInUse
                | NoticeKind::Untunneled
                | NoticeKind::SplitTunnelRegion
        )
    }

    /// Payload field names, in the order producers supply them
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            NoticeKind::Info | NoticeKind::Alert | NoticeKind::Error => &["message"],
            NoticeKind::CoreVersion | NoticeKind::ClientUpgradeAvailable => &["version"],
            NoticeKind::CandidateServers => &["region", "protocol", "count"],
            NoticeKind::ConnectingServer => &["ipAddress", "region", "protocol", "frontingAddress"],
            NoticeKind::ActiveTunnel => &["ipAddress"],
            NoticeKind::SocksProxyPortInUse
            | NoticeKind::ListeningSocksProxyPort
            | NoticeKind::HttpProxyPortInUse
            | NoticeKind::ListeningHttpProxyPort => &["port"],
            NoticeKind::Homepage => &["url"],
            NoticeKind::Tunnels => &["count"],
            NoticeKind::Untunneled => &["address"],
            NoticeKind::SplitTunnelRegion => &["region"],
        }
    }

    /// Value type of a payload field, or `None` if this kind has no such field
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        if !self.fields().contains(&name) {
            return None;
        }
        Some(match name {
            "count" | "port" => FieldType::Integer,
            _ => FieldType::String,
        })
    }

    /// Whether the payload may hold private data that must stay out of diagnostic logs
    pub fn is_sensitive(&self) -> bool {
        matches!(self, NoticeKind::Untunneled)
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoticeKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoticeKind::ALL
            .iter()
            .find(|kind| kind.as_str() == s)
            .copied()
            .ok_or_else(|| DecodeError::UnknownKind(s.to_string()))
    }
}

/// Value type of a payload field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Integer,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "int",
        }
    }

    /// Convert a textual value to JSON of this type
    fn parse(&self, raw: &str) -> Option<Value> {
        match self {
            FieldType::String => Some(Value::from(raw)),
            FieldType::Integer => raw.parse::<i64>().ok().map(Value::from),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed notice - one variant per kind, holding exactly that kind's payload
///
/// Serialized adjacently tagged, which matches the `noticeType`/`data` pair of
/// the wire envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "noticeType", content = "data", rename_all_fields = "camelCase")]
pub enum Notice {
    /// Informational message
    Info { message: String },
    /// Recoverable error condition
    Alert { message: String },
    /// Unrecoverable error condition
    Error { message: String },
    /// Version string of the core
    CoreVersion { version: String },
    /// How many servers are available for the selected region and protocol
    CandidateServers {
        region: String,
        protocol: String,
        count: usize,
    },
    /// Details of a connection attempt
    ConnectingServer {
        ip_address: String,
        region: String,
        protocol: String,
        fronting_address: String,
    },
    /// A connection now used as an active tunnel for port forwarding
    ActiveTunnel { ip_address: String },
    /// The configured local SOCKS proxy port could not be used
    SocksProxyPortInUse { port: u16 },
    /// The port the local SOCKS proxy is listening on
    ListeningSocksProxyPort { port: u16 },
    /// The configured local HTTP proxy port could not be used
    HttpProxyPortInUse { port: u16 },
    /// The port the local HTTP proxy is listening on
    ListeningHttpProxyPort { port: u16 },
    /// The handshake offered a client upgrade
    ClientUpgradeAvailable { version: String },
    /// The handshake returned a sponsor homepage to display
    Homepage { url: String },
    /// Number of active tunnels; 0 means disconnected, 1 or more means connected
    Tunnels { count: usize },
    /// An address was classified as untunneled and is accessed directly.
    /// The address is private: alert users with it, keep it out of diagnostics.
    Untunneled { address: String },
    /// Split tunnel is enabled for the given region
    SplitTunnelRegion { region: String },
}

impl Notice {
    /// Build a notice of `kind` from textual `(name, value)` fields
    ///
    /// Every field of the kind must be given exactly as its schema types it;
    /// unknown names, unparsable values and missing fields are rejected.
    pub fn from_text_fields<I, N, V>(kind: NoticeKind, fields: I) -> Result<Notice, FieldError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: AsRef<str>,
        V: AsRef<str>,
    {
        let mut data = Map::new();
        for (name, raw) in fields {
            let (name, raw) = (name.as_ref(), raw.as_ref());
            let field_type = kind.field_type(name).ok_or_else(|| FieldError::UnknownField {
                kind,
                field: name.to_string(),
            })?;
            let value = field_type.parse(raw).ok_or_else(|| FieldError::InvalidValue {
                kind,
                field: name.to_string(),
                value: raw.to_string(),
                expected: field_type,
            })?;
            data.insert(name.to_string(), value);
        }

        if let Some(missing) = kind.fields().iter().find(|field| !data.contains_key(**field)) {
            return Err(FieldError::MissingField {
                kind,
                field: missing.to_string(),
            });
        }

        let tagged = serde_json::json!({
            "noticeType": kind.as_str(),
            "data": data,
        });
        Ok(serde_json::from_value(tagged)?)
    }

    /// Get the kind of this notice
    pub fn kind(&self) -> NoticeKind {
        match self {
            Notice::Info { .. } => NoticeKind::Info,
            Notice::Alert { .. } => NoticeKind::Alert,
            Notice::Error { .. } => NoticeKind::Error,
            Notice::CoreVersion { .. } => NoticeKind::CoreVersion,
            Notice::CandidateServers { .. } => NoticeKind::CandidateServers,
            Notice::ConnectingServer { .. } => NoticeKind::ConnectingServer,
            Notice::ActiveTunnel { .. } => NoticeKind::ActiveTunnel,
            Notice::SocksProxyPortInUse { .. } => NoticeKind::SocksProxyPortInUse,
            Notice::ListeningSocksProxyPort { .. } => NoticeKind::ListeningSocksProxyPort,
            Notice::HttpProxyPortInUse { .. } => NoticeKind::HttpProxyPortInUse,
            Notice::ListeningHttpProxyPort { .. } => NoticeKind::ListeningHttpProxyPort,
            Notice::ClientUpgradeAvailable { .. } => NoticeKind::ClientUpgradeAvailable,
            Notice::Homepage { .. } => NoticeKind::Homepage,
            Notice::Tunnels { .. } => NoticeKind::Tunnels,
            Notice::Untunneled { .. } => NoticeKind::Untunneled,
            Notice::SplitTunnelRegion { .. } => NoticeKind::SplitTunnelRegion,
        }
    }

    /// Get the `showUser` flag for this notice
    pub fn show_user(&self) -> bool {
        self.kind().show_user()
    }

    /// The `data` object of this notice, without the kind tag
    pub fn payload(&self) -> NoticePayload<'_> {
        NoticePayload(self)
    }
}

/// Serializes only the `data` half of a [`Notice`]
pub struct NoticePayload<'a>(&'a Notice);

impl Serialize for NoticePayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let tagged = serde_json::to_value(self.0).map_err(S::Error::custom)?;
        match tagged.get("data") {
            Some(data) => data.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }
}
