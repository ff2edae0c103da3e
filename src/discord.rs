use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use serenity::async_trait;
use serenity::builder::{CreateAttachment, CreateEmbed, CreateMessage, GetMessages};
use serenity::client::{Client, Context, EventHandler};
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::id::{ChannelId, MessageId, UserId};
use serenity::model::permissions::Permissions;
use serenity::model::Colour;
use serenity::prelude::GatewayIntents;
use tracing::info;

use crate::game::Chat;

/// The parts of an inbound message the bot cares about.
#[derive(Clone, Debug)]
pub struct TextMessage {
    pub channel: ChannelId,
    pub body: String,
    pub can_manage_messages: bool,
}

/// Everything but the bot's own messages.
pub fn get_text_message(ctx: &Context, message: &Message) -> Option<TextMessage> {
    let bot = ctx.cache.current_user().id;

    text_message(
        bot,
        message.author.id,
        message.channel_id,
        &message.content,
        message.author_permissions(ctx),
    )
}

/// `permissions` is `None` outside guilds or when the guild isn't cached.
fn text_message(
    bot: UserId,
    sender: UserId,
    channel: ChannelId,
    body: &str,
    permissions: Option<Permissions>,
) -> Option<TextMessage> {
    if sender == bot {
        return None;
    }

    Some(TextMessage {
        channel,
        body: body.to_string(),
        can_manage_messages: permissions.map_or(false, |p| p.manage_messages()),
    })
}

/// Matches a command invoked by its bare name, returning its arguments.
pub fn get_command<'a>(name: &str, message: &'a str) -> Option<&'a str> {
    let rest = message.strip_prefix(name)?;

    if rest.is_empty() {
        return Some("");
    }

    if rest.starts_with(char::is_whitespace) {
        return Some(rest.trim());
    }

    None
}

pub async fn create_client<H: EventHandler + 'static>(token: &str, handler: H) -> Result<Client> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let client = Client::builder(token, intents).event_handler(handler).await?;

    info!("gateway client created");

    Ok(client)
}

pub fn guess_embed(window: Duration) -> CreateEmbed {
    CreateEmbed::new()
        .title("Guess the Country")
        .description(format!(
            "You have **{} seconds** to guess the country below.",
            window.as_secs()
        ))
        .colour(Colour::new(0x00FF00))
        .image("attachment://flag.png")
}

pub fn times_up_embed(answer: &str) -> CreateEmbed {
    CreateEmbed::new()
        .title("Time's up!")
        .description(format!("No one got it! The answer was **{}**.", answer))
        .colour(Colour::new(0xFF0000))
}

#[async_trait]
impl Chat for Http {
    async fn announce_flag(&self, channel: ChannelId, png: Bytes, window: Duration) -> Result<()> {
        let message = CreateMessage::new()
            .embed(guess_embed(window))
            .add_file(CreateAttachment::bytes(png.to_vec(), "flag.png"));

        channel.send_message(self, message).await?;
        Ok(())
    }

    async fn announce_timeout(&self, channel: ChannelId, answer: &str) -> Result<()> {
        let message = CreateMessage::new().embed(times_up_embed(answer));

        channel.send_message(self, message).await?;
        Ok(())
    }

    async fn say(&self, channel: ChannelId, text: &str) -> Result<MessageId> {
        let message = channel.say(self, text).await?;
        Ok(message.id)
    }

    async fn recent_messages(&self, channel: ChannelId, limit: u8) -> Result<Vec<MessageId>> {
        let messages = channel.messages(self, GetMessages::new().limit(limit)).await?;
        Ok(messages.into_iter().map(|message| message.id).collect())
    }

    async fn delete_messages(&self, channel: ChannelId, messages: &[MessageId]) -> Result<()> {
        // bulk delete takes between 2 and 100 messages
        match messages {
            [] => {}
            [message] => channel.delete_message(self, *message).await?,
            _ => channel.delete_messages(self, messages).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot() -> UserId {
        UserId::new(1)
    }

    fn member() -> UserId {
        UserId::new(2)
    }

    #[test]
    fn own_messages_are_ignored() {
        let message = text_message(bot(), bot(), ChannelId::new(7), "France", None);

        assert!(message.is_none());
    }

    #[test]
    fn member_messages_carry_their_permission() {
        let from_member = |permissions| {
            text_message(bot(), member(), ChannelId::new(7), "clear 3", permissions).unwrap()
        };

        let message = from_member(Some(Permissions::MANAGE_MESSAGES | Permissions::SEND_MESSAGES));
        assert_eq!(message.channel, ChannelId::new(7));
        assert_eq!(message.body, "clear 3");
        assert!(message.can_manage_messages);

        assert!(!from_member(Some(Permissions::SEND_MESSAGES)).can_manage_messages);
        assert!(!from_member(None).can_manage_messages);
    }

    #[test]
    fn commands_match_by_bare_name() {
        assert_eq!(get_command("clear", "clear 3"), Some("3"));
        assert_eq!(get_command("clear", "clear   12  "), Some("12"));
        assert_eq!(get_command("clear", "clear"), Some(""));
        assert_eq!(get_command("clear", "clear 3 more"), Some("3 more"));
    }

    #[test]
    fn commands_need_the_exact_name() {
        assert_eq!(get_command("clear", "clearance 3"), None);
        assert_eq!(get_command("clear", "Clear 3"), None);
        assert_eq!(get_command("clear", " clear 3"), None);
        assert_eq!(get_command("clear", "France"), None);
    }

    #[test]
    fn guess_embed_mentions_the_window() {
        let embed = serde_json::to_value(guess_embed(Duration::from_secs(10))).unwrap();

        assert_eq!(embed["title"], "Guess the Country");
        assert_eq!(embed["description"], "You have **10 seconds** to guess the country below.");
        assert_eq!(embed["color"], 0x00FF00);
        assert_eq!(embed["image"]["url"], "attachment://flag.png");
    }

    #[test]
    fn times_up_embed_reveals_the_answer() {
        let embed = serde_json::to_value(times_up_embed("France")).unwrap();

        assert_eq!(embed["title"], "Time's up!");
        assert_eq!(embed["description"], "No one got it! The answer was **France**.");
        assert_eq!(embed["color"], 0xFF0000);
    }
}
