//! NoticeStream - structured notices over a line-delimited byte stream
//!
//! Producers (tunnel engine, local proxies, handshake logic) report status and
//! error conditions as typed notices. Each notice is written as one JSON line
//! to a swappable sink. Consumers reading that stream back (a pipe, captured
//! process output) reassemble the lines and decode them.
//!
//! # Architecture
//!
//! ```text
//!   producers                                          consumers
//!  ┌──────────┐  Notice   ┌───────────────┐  bytes   ┌────────────────┐
//!  │ tunnels  │ ────────▶ │ NoticeEmitter │ ───────▶ │ NoticeReceiver │
//!  │ proxies  │           │ (mutex+sink)  │  (pipe)  │ (line framing) │
//!  │ handshake│           └───────────────┘          └───────┬────────┘
//!  └──────────┘                                              │ record
//!                                   ┌────────────────────────┼──────────────┐
//!                                   ▼                        ▼              ▼
//!                           console_rewriter        extract_tunnel_count  TunnelTracker
//! ```
//!
//! # Example
//!
//! ```ignore
//! use noticestream::{NoticeEmitter, NoticeReceiver, extract_tunnel_count};
//!
//! let emitter = NoticeEmitter::stderr();
//! emitter.tunnels(1);
//!
//! let receiver = NoticeReceiver::new(|record: &[u8]| {
//!     if let Some(count) = extract_tunnel_count(record) {
//!         println!("tunnels: {count}");
//!     }
//! });
//! std::io::copy(&mut std::io::stdin(), &mut &receiver)?;
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod notices;

pub use error::{DecodeError, FieldError};
pub use notices::{
    FieldType, NOTICE_DELIMITER, Notice, NoticeEmitter, NoticeEnvelope, NoticeKind, NoticeReceiver, NoticeSink, RewriteOptions,
    TunnelTracker, TunnelTransition, console_rewriter, decode_envelope, extract_field, extract_tunnel_count,
    format_console_line, notice_emitter, recover_envelope, set_notice_output,
};
