use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use socklink_channel::{ChannelHandle, ChannelRegistry, ConnectionState, StaticTokenSource};
use socklink_transport::WebSocketTransport;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::cmd::{parse_target, SendArgs};
use crate::exit::{channel_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_message, OutputFormat};

pub async fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let endpoint = parse_target(&args.target, args.secure)?;
    let payload = resolve_payload(&args)?;

    let mut registry = ChannelRegistry::new(Arc::new(WebSocketTransport));
    if let Some(token) = args.token.clone() {
        registry = registry.with_token_source(Arc::new(StaticTokenSource::new(Some(token))));
    }
    let handle = registry.get_or_connect(endpoint, &args.id, false);

    let mut inbound = None;
    if args.wait {
        let (messages, receiver) = mpsc::unbounded_channel();
        handle
            .subscribe(move |message: &Value| {
                let _ = messages.send(message.clone());
            })
            .await
            .map_err(|err| channel_error("subscribe failed", err))?;
        inbound = Some(receiver);
    }

    handle
        .submit(payload)
        .map_err(|err| channel_error("send failed", err))?;
    wait_until_flushed(&handle, wait_timeout).await?;

    if let Some(mut receiver) = inbound {
        let channel = handle.key().to_string();
        match timeout(wait_timeout, receiver.recv()).await {
            Ok(Some(message)) => print_message(&message, &channel, format),
            Ok(None) => {
                return Err(CliError::new(
                    crate::exit::INTERNAL,
                    "channel instance stopped unexpectedly",
                ))
            }
            Err(_) => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no message received within {}", args.wait_timeout),
                ))
            }
        }
    }

    Ok(SUCCESS)
}

/// Block until the connection is open and the outbound queue has drained,
/// then give the writer a moment to put the payload on the wire.
async fn wait_until_flushed(handle: &ChannelHandle, deadline: Duration) -> CliResult<()> {
    let flushed = timeout(deadline, async {
        loop {
            let status = handle
                .status()
                .await
                .map_err(|err| channel_error("status failed", err))?;
            match status.state {
                ConnectionState::Open if status.queued == 0 => return Ok(()),
                ConnectionState::Failed => {
                    return Err(CliError::new(FAILURE, "connection failed after retries"))
                }
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match flushed {
        Ok(result) => result?,
        Err(_) => {
            return Err(CliError::new(
                TIMEOUT,
                "timed out waiting for the connection to open",
            ))
        }
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}

fn resolve_payload(args: &SendArgs) -> CliResult<Value> {
    if let Some(json) = &args.json {
        return serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")));
    }
    if let Some(data) = &args.data {
        return Ok(Value::String(data.clone()));
    }
    Err(CliError::new(USAGE, "one of --json or --data is required"))
}

pub(super) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
