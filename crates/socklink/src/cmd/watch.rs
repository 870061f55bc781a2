use std::sync::Arc;

use serde_json::Value;
use socklink_channel::{ChannelRegistry, StaticTokenSource};
use socklink_transport::WebSocketTransport;
use tokio::sync::mpsc;

use crate::cmd::{parse_target, WatchArgs};
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub async fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = parse_target(&args.target, args.secure)?;

    let mut registry = ChannelRegistry::new(Arc::new(WebSocketTransport));
    if let Some(token) = args.token.clone() {
        registry = registry.with_token_source(Arc::new(StaticTokenSource::new(Some(token))));
    }
    let handle = registry.get_or_connect(endpoint, &args.id, false);
    let channel = handle.key().to_string();

    let (messages, mut receiver) = mpsc::unbounded_channel();
    handle
        .subscribe(move |message: &Value| {
            let _ = messages.send(message.clone());
        })
        .await
        .map_err(|err| channel_error("subscribe failed", err))?;

    let mut printed = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            message = receiver.recv() => match message {
                Some(message) => {
                    print_message(&message, &channel, format);
                    printed = printed.saturating_add(1);
                    if let Some(count) = args.count {
                        if printed >= count {
                            break;
                        }
                    }
                }
                // The channel instance is gone; nothing more will arrive.
                None => break,
            },
        }
    }

    Ok(SUCCESS)
}
