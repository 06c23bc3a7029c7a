//! CLI argument parsing for noticestream

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ns")]
#[command(author, version, about = "Emit and read line-delimited notice streams", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Rewrite a notice stream into human-readable lines
    Rewrite {
        /// Read notices from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Only show notices flagged for the user
        #[arg(long)]
        user_only: bool,

        /// Hide notices that may carry private data
        #[arg(long)]
        exclude_sensitive: bool,
    },

    /// Report tunnel connect/disconnect transitions from a notice stream
    Tunnels {
        /// Read notices from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Emit a single notice
    Emit {
        /// Notice kind (e.g. Info, Tunnels, ListeningSocksProxyPort)
        #[arg(required = true)]
        kind: String,

        /// Payload fields as NAME=VALUE; every field of the kind is required
        #[arg(value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Override the kind's showUser flag
        #[arg(long)]
        show_user: Option<bool>,

        /// Append the notice to a file instead of stderr
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List notice kinds and their payload fields
    Kinds,
}

/// Split a `NAME=VALUE` payload field
///
/// Values stay textual; the notice kind's schema decides their type.
pub fn parse_field(arg: &str) -> Result<(String, String), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", arg))?;
    if name.is_empty() {
        return Err(format!("missing field name in '{}'", arg));
    }
    Ok((name.to_string(), raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_field_splits_on_first_equals() {
        assert_eq!(parse_field("count=2").unwrap(), ("count".to_string(), "2".to_string()));
        assert_eq!(
            parse_field("url=https://example.com/?a=b").unwrap(),
            ("url".to_string(), "https://example.com/?a=b".to_string())
        );
        assert_eq!(parse_field("message=").unwrap(), ("message".to_string(), String::new()));
    }

    #[test]
    fn test_parse_field_rejects_malformed() {
        assert!(parse_field("count").is_err());
        assert!(parse_field("=2").is_err());
    }

    #[test]
    fn test_parse_emit_command() {
        let cli = Cli::try_parse_from(["ns", "emit", "Tunnels", "count=1", "--show-user", "true"]).unwrap();
        match cli.command {
            Command::Emit {
                kind,
                fields,
                show_user,
                output,
            } => {
                assert_eq!(kind, "Tunnels");
                assert_eq!(fields, vec![("count".to_string(), "1".to_string())]);
                assert_eq!(show_user, Some(true));
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
