//! Notices - typed status and error events on a line-delimited stream
//!
//! Producers emit notices through a [`NoticeEmitter`]; each becomes one JSON
//! line on the current sink. Consumers feed raw bytes from wherever that sink
//! leads into a [`NoticeReceiver`], which reassembles the lines and hands each
//! record to a callback.
//!
//! # Architecture
//!
//! ```text
//!  tunnel engine ─┐
//!  local proxies ─┼─▶ NoticeEmitter ──▶ sink (stderr by default, swappable)
//!  handshake     ─┘   (one lock for serialize + write + sink swap)
//!
//!  pipe / captured output ──▶ NoticeReceiver ──▶ callback(record)
//!                             (buffer until '\n')     │
//!                                                     ├─▶ console_rewriter
//!                                                     ├─▶ extract_tunnel_count
//!                                                     └─▶ TunnelTracker
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use noticestream::notices::{NoticeEmitter, NoticeReceiver, RewriteOptions, console_rewriter};
//!
//! // Producer side
//! let emitter = NoticeEmitter::stderr();
//! emitter.candidate_servers("CA", "OSSH", 12);
//! emitter.tunnels(1);
//!
//! // Consumer side
//! let mut rewriter = console_rewriter(std::io::stdout(), RewriteOptions::default());
//! std::io::copy(&mut child_stderr, &mut rewriter)?;
//! ```
//!
//! # Notice Kinds
//!
//! See [`NoticeKind`] for the catalog and [`Notice`] for each payload.

mod emitter;
mod envelope;
mod receiver;
mod rewriter;
mod tunnels;
mod types;

pub use emitter::{NoticeEmitter, NoticeSink, notice_emitter, set_notice_output};
pub use envelope::{NoticeEnvelope, decode_envelope, extract_field, extract_tunnel_count, recover_envelope};
pub use receiver::{NOTICE_DELIMITER, NoticeReceiver};
pub use rewriter::{RewriteOptions, console_rewriter, format_console_line};
pub use tunnels::{TunnelTracker, TunnelTransition};
pub use types::{FieldType, Notice, NoticeKind, NoticePayload};
