//! Console Rewriter - turns a notice stream into human-readable lines
//!
//! Each record becomes `timestamp kind data`, with `data` left exactly as it
//! appeared on the wire. Lines whose envelope fails to decode are still
//! written with whatever fields could be recovered, so nothing silently
//! disappears from an interactive console.

use std::io::Write;

use colored::*;
use tracing::{debug, warn};

use super::envelope::{NoticeEnvelope, decode_envelope, recover_envelope};
use super::receiver::NoticeReceiver;
use super::types::NoticeKind;

/// Presentation and filtering choices for the console rewriter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Style the kind with terminal colors
    pub colorize: bool,
    /// Drop decoded notices not flagged `showUser`
    pub user_only: bool,
    /// Drop decoded notices whose payload may hold private data
    pub exclude_sensitive: bool,
}

impl RewriteOptions {
    /// Whether a successfully decoded notice should be written
    fn admits(&self, envelope: &NoticeEnvelope) -> bool {
        if self.user_only && !envelope.show_user {
            return false;
        }
        if self.exclude_sensitive && envelope.kind().is_some_and(|kind| kind.is_sensitive()) {
            return false;
        }
        true
    }
}

/// Create a receiver that rewrites every record it reassembles onto `writer`
pub fn console_rewriter<W>(mut writer: W, options: RewriteOptions) -> NoticeReceiver<impl FnMut(&[u8]) + Send>
where
    W: Write + Send,
{
    NoticeReceiver::new(move |record: &[u8]| {
        let envelope = match decode_envelope(record) {
            Ok(envelope) if !options.admits(&envelope) => return,
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "console_rewriter: undecodable record, writing recovered fields");
                let envelope = recover_envelope(record);
                if options.exclude_sensitive && envelope.kind().is_some_and(|kind| kind.is_sensitive()) {
                    return;
                }
                envelope
            }
        };
        if let Err(e) = writeln!(writer, "{}", format_envelope(&envelope, options.colorize)) {
            warn!(error = %e, "console_rewriter: failed to write line");
        }
    })
}

/// Format one raw record as a console line (no trailing newline)
pub fn format_console_line(record: &[u8], colorize: bool) -> String {
    let envelope = recover_envelope(record);
    format_envelope(&envelope, colorize)
}

fn format_envelope(envelope: &NoticeEnvelope, colorize: bool) -> String {
    if !colorize {
        return format!(
            "{} {} {}",
            envelope.timestamp,
            envelope.notice_type,
            envelope.raw_payload()
        );
    }

    let kind = envelope.notice_type.as_str();
    let styled = match envelope.kind() {
        Some(NoticeKind::Error) => kind.red(),
        Some(NoticeKind::Alert) => kind.yellow(),
        Some(NoticeKind::Tunnels) | Some(NoticeKind::ActiveTunnel) => kind.green(),
        Some(_) => kind.cyan(),
        None => kind.normal(),
    };
    let styled = if envelope.show_user { styled.bold() } else { styled };

    format!(
        "{} {} {}",
        envelope.timestamp.dimmed(),
        styled,
        envelope.raw_payload()
    )
}
