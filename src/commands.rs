use std::time::Duration;

use anyhow::Result;
use tokio::time;
use tracing::{info, warn};

use crate::discord::{self, TextMessage};
use crate::game::Chat;

/// The most messages a single bulk delete can take.
const MAX_CLEAR: i64 = 100;

/// How long the `clear` confirmation stays up.
const CONFIRMATION_LIFETIME: Duration = Duration::from_secs(5);

/// Runs the command in `message`, if there is one. Anything else is dropped.
pub async fn dispatch(chat: &impl Chat, message: &TextMessage) -> Result<()> {
    if let Some(args) = discord::get_command("clear", &message.body) {
        return clear(chat, message, args).await;
    }

    Ok(())
}

async fn clear(chat: &impl Chat, message: &TextMessage, args: &str) -> Result<()> {
    if !message.can_manage_messages {
        warn!(channel = %message.channel, "clear: caller lacks the Manage Messages permission");
        return Ok(());
    }

    let Some(amount) = parse_amount(args) else {
        warn!(args, "clear: expected a number of messages");
        return Ok(());
    };

    if amount <= 0 {
        chat.say(message.channel, "Please specify a positive number of messages to delete.")
            .await?;
        return Ok(());
    }

    // the command message itself counts towards the amount
    let limit = amount.min(MAX_CLEAR) as u8;
    let messages = chat.recent_messages(message.channel, limit).await?;

    chat.delete_messages(message.channel, &messages).await?;

    info!(channel = %message.channel, "cleared {} message(s)", messages.len());

    let confirmation = chat
        .say(message.channel, &format!("Deleted {} message(s).", messages.len()))
        .await?;

    time::sleep(CONFIRMATION_LIFETIME).await;

    chat.delete_messages(message.channel, &[confirmation]).await
}

fn parse_amount(args: &str) -> Option<i64> {
    args.split_whitespace().next()?.parse().ok()
}
