//! Minimal terminal chat client: connects to a gateway, joins one
//! channel, and logs everything it hears until Ctrl-C.
//!
//! ```text
//! term-chat [gateway-url] [nick] [channel]
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use shoal::prelude::*;

struct Printer;

impl ChatListener for Printer {
    fn on_connect(&self) {
        tracing::info!("connected");
    }

    fn on_reconnect(&self) {
        tracing::info!("reconnected");
    }

    fn on_disconnect(&self, notice: &Disconnect) {
        tracing::info!(
            reason = %notice.reason,
            closed_by_server = notice.closed_by_server,
            "disconnected"
        );
    }

    fn on_topic(&self, event: &TopicEvent) {
        tracing::info!(channel = %event.channel, "topic: {}", event.topic);
    }

    fn on_userlist(&self, event: &UserlistEvent) {
        for (key, user) in &event.users {
            tracing::info!(
                user = %key,
                role = %user.role(),
                sessions = user.nicknames.len(),
                "present in {}", event.channel
            );
        }
    }

    fn on_other_user_join(&self, event: &ChannelEvent) {
        tracing::info!(nick = %event.nickname, "joined {}", event.channel);
    }

    fn on_other_user_leave(&self, event: &ChannelEvent) {
        tracing::info!(nick = %event.nickname, "left {}", event.channel);
    }

    fn on_message(&self, event: &MessageEvent) {
        tracing::info!(from = %event.nickname, target = %event.target, "{}", event.message);
    }

    fn on_banned(&self, channel: &str) {
        tracing::warn!(channel, "banned");
    }

    fn on_error(&self, reason: &str) {
        tracing::warn!(reason, "server error");
    }
}

#[tokio::main]
async fn main() -> Result<(), ShoalError> {
    shoal::init_tracing();

    let mut args = env::args().skip(1);
    let url = args
        .next()
        .unwrap_or_else(|| "ws://127.0.0.1:8067/chat".to_string());
    let nick = args.next().unwrap_or_else(|| "shoal-demo".to_string());
    let channel = args.next().unwrap_or_else(|| "#shoal".to_string());

    let client = ClientBuilder::new(url, "irc.example.net").build()?;
    client.register(Arc::new(Printer));
    client.connect(&nick, "", &channel).await?;

    tokio::signal::ctrl_c().await.ok();

    client.disconnect(Some("demo done"))?;
    // Give the quit frame a moment to flush.
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}
