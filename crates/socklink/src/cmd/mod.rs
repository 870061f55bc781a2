use clap::{Args, Subcommand};

use socklink_transport::Endpoint;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod echo;
pub mod send;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an echo server for local testing.
    Echo(EchoArgs),
    /// Submit a payload to a channel.
    Send(SendArgs),
    /// Subscribe to a channel and print received messages.
    Watch(WatchArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub async fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args).await,
        Command::Send(args) => send::run(args, format).await,
        Command::Watch(args) => watch::run(args, format).await,
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Address to bind, e.g. 127.0.0.1:9001.
    #[arg(default_value = "127.0.0.1:9001")]
    pub bind: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Backend to connect to as host:port.
    pub target: String,
    /// Logical channel id.
    #[arg(long, short = 'i', default_value = "cli")]
    pub id: String,
    /// Use wss:// instead of ws://.
    #[arg(long)]
    pub secure: bool,
    /// Session token attached to outbound payloads.
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
    /// JSON payload.
    #[arg(long, conflicts_with = "data")]
    pub json: Option<String>,
    /// Raw string payload, sent as a JSON string.
    #[arg(long, conflicts_with = "json")]
    pub data: Option<String>,
    /// Wait for one inbound message and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a message when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Backend to connect to as host:port.
    pub target: String,
    /// Logical channel id.
    #[arg(long, short = 'i', default_value = "cli")]
    pub id: String,
    /// Use wss:// instead of ws://.
    #[arg(long)]
    pub secure: bool,
    /// Session token attached to outbound payloads.
    #[arg(long, value_name = "TOKEN")]
    pub token: Option<String>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a `host:port` target into an [`Endpoint`].
pub fn parse_target(target: &str, secure: bool) -> CliResult<Endpoint> {
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| CliError::new(USAGE, format!("target must be host:port, got {target}")))?;
    if host.is_empty() {
        return Err(CliError::new(USAGE, format!("target has no host: {target}")));
    }
    let port: u16 = port
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid port in target: {target}")))?;
    Ok(if secure {
        Endpoint::secure(host, port)
    } else {
        Endpoint::new(host, port)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_target() {
        let endpoint = parse_target("localhost:8501", false).expect("target should parse");
        assert_eq!(endpoint.host, "localhost");
        assert_eq!(endpoint.port, 8501);
        assert!(!endpoint.secure);
    }

    #[test]
    fn parses_secure_target() {
        let endpoint = parse_target("example.com:443", true).expect("target should parse");
        assert!(endpoint.secure);
        assert_eq!(endpoint.scheme(), "wss");
    }

    #[test]
    fn rejects_target_without_port() {
        let err = parse_target("localhost", false).expect_err("missing port should fail");
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn rejects_non_numeric_port() {
        let err = parse_target("localhost:ws", false).expect_err("bad port should fail");
        assert_eq!(err.code, USAGE);
    }
}
