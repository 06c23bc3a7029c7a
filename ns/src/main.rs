//! ns - notice stream tool
//!
//! CLI entry point for emitting notices and reading notice streams back.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use noticestream::cli::{Cli, Command};
use noticestream::config::Config;
use noticestream::notices::{
    Notice, NoticeKind, NoticeReceiver, RewriteOptions, TunnelTracker, TunnelTransition, console_rewriter, notice_emitter,
};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Notices default to stderr, so logs go to a file
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("noticestream")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("noticestream.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn Read>> {
    match path {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(io::stdin())),
    }
}

/// Copy a stream into a receiver; a final record missing its delimiter is still dispatched
fn pump<F: FnMut(&[u8])>(input: Option<&Path>, receiver: &NoticeReceiver<F>) -> Result<()> {
    let mut reader = open_input(input)?;
    let mut writer = receiver;
    let copied = io::copy(&mut reader, &mut writer).context("Failed to read notice stream")?;
    if receiver.pending() > 0 {
        debug!(pending = receiver.pending(), "pump: dispatching unterminated final record");
        receiver.receive(b"\n");
    }
    debug!(copied, "pump: stream finished");
    Ok(())
}

fn cmd_rewrite(input: Option<&Path>, options: RewriteOptions) -> Result<()> {
    debug!(?options, "cmd_rewrite: starting");
    let rewriter = console_rewriter(io::stdout(), options);
    pump(input, &rewriter)
}

fn cmd_tunnels(input: Option<&Path>) -> Result<()> {
    let mut tracker = TunnelTracker::new();
    let receiver = NoticeReceiver::new(|record: &[u8]| match tracker.observe(record) {
        Some(TunnelTransition::Connected { count }) => {
            println!("{} ({} tunnels)", "connected".green(), count);
        }
        Some(TunnelTransition::Disconnected) => {
            println!("{}", "disconnected".red());
        }
        None => {}
    });
    pump(input, &receiver)
}

fn cmd_emit(kind: &str, fields: Vec<(String, String)>, show_user: Option<bool>, output: Option<&Path>) -> Result<()> {
    let kind: NoticeKind = kind.parse()?;
    let notice = Notice::from_text_fields(kind, fields)
        .with_context(|| format!("Invalid {} notice (fields: {})", kind, kind.fields().join(", ")))?;

    let emitter = notice_emitter();
    if let Some(path) = output {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open notice output {}", path.display()))?;
        emitter.set_output(file);
    }

    let show_user = show_user.unwrap_or_else(|| kind.show_user());
    info!(%kind, show_user, "cmd_emit: emitting notice");
    emitter.emit_data(kind, show_user, &notice.payload());
    Ok(())
}

fn cmd_kinds() -> Result<()> {
    for kind in NoticeKind::ALL {
        let mut line = format!("{:<26} {}", kind.as_str().cyan(), kind.fields().join(", "));
        if kind.show_user() {
            line.push_str(&format!(" {}", "[showUser]".bold()));
        }
        if kind.is_sensitive() {
            line.push_str(&format!(" {}", "[sensitive]".yellow()));
        }
        println!("{}", line);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Rewrite {
            input,
            no_color,
            user_only,
            exclude_sensitive,
        } => {
            let defaults = config.rewrite_options();
            let options = RewriteOptions {
                colorize: defaults.colorize && !no_color,
                user_only: defaults.user_only || user_only,
                exclude_sensitive: defaults.exclude_sensitive || exclude_sensitive,
            };
            cmd_rewrite(input.as_deref(), options)
        }
        Command::Tunnels { input } => cmd_tunnels(input.as_deref()),
        Command::Emit {
            kind,
            fields,
            show_user,
            output,
        } => cmd_emit(&kind, fields, show_user, output.as_deref().or(config.output.as_deref())),
        Command::Kinds => cmd_kinds(),
    }
}
