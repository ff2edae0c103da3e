use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result};
use bytes::Bytes;
use serenity::async_trait;
use serenity::model::id::{ChannelId, MessageId};
use tokio::time;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, FlagEntry};
use crate::commands;
use crate::discord::TextMessage;

/// Everything the game needs to say on the chat platform.
#[async_trait]
pub trait Chat: Send + Sync {
    async fn announce_flag(&self, channel: ChannelId, png: Bytes, window: Duration) -> Result<()>;

    async fn announce_timeout(&self, channel: ChannelId, answer: &str) -> Result<()>;

    async fn say(&self, channel: ChannelId, text: &str) -> Result<MessageId>;

    /// Newest first.
    async fn recent_messages(&self, channel: ChannelId, limit: u8) -> Result<Vec<MessageId>>;

    async fn delete_messages(&self, channel: ChannelId, messages: &[MessageId]) -> Result<()>;
}

/// Turns a catalog image URL into a PNG ready to post.
#[async_trait]
pub trait FlagSource: Send + Sync {
    async fn fetch_png(&self, url: &str) -> Result<Bytes>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveRound {
    pub answer: String,
    pub channel: ChannelId,
}

/// Identifies one `begin`, so a tick only ever expires the round it started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundId(u64);

#[derive(Default)]
struct Slot {
    generation: u64,
    round: Option<ActiveRound>,
}

/// The round in progress, if any, shared by the timer and the message handler.
#[derive(Clone, Default)]
pub struct Rounds {
    slot: Arc<Mutex<Slot>>,
}

impl Rounds {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a round, handing back its id and the round it replaced.
    pub fn begin(&self, round: ActiveRound) -> (RoundId, Option<ActiveRound>) {
        let mut slot = self.lock();
        slot.generation += 1;

        (RoundId(slot.generation), slot.round.replace(round))
    }

    /// Resolves the round if `text` names the answer in the round's channel.
    pub fn guess(&self, channel: ChannelId, text: &str) -> Option<ActiveRound> {
        let mut slot = self.lock();

        let solved = matches!(
            slot.round.as_ref(),
            Some(round) if round.channel == channel && is_correct(&round.answer, text)
        );

        if solved {
            slot.round.take()
        } else {
            None
        }
    }

    /// Takes the round `id` started, unless it was guessed or replaced since.
    pub fn expire(&self, id: RoundId) -> Option<ActiveRound> {
        let mut slot = self.lock();

        if slot.generation == id.0 {
            slot.round.take()
        } else {
            None
        }
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<ActiveRound> {
        self.lock().round.clone()
    }
}

fn is_correct(answer: &str, guess: &str) -> bool {
    guess.to_lowercase() == answer.to_lowercase()
}

pub struct Game<F> {
    catalog: Catalog,
    flags: F,
    rounds: Rounds,
    channel: ChannelId,
    answer_window: Duration,
}

impl<F: FlagSource> Game<F> {
    pub fn new(catalog: Catalog, flags: F, channel: ChannelId, answer_window: Duration) -> Game<F> {
        Game { catalog, flags, rounds: Rounds::default(), channel, answer_window }
    }

    #[cfg(test)]
    pub fn rounds(&self) -> &Rounds {
        &self.rounds
    }

    fn pick(&self) -> Option<FlagEntry> {
        self.catalog.choose(&mut rand::rng()).cloned()
    }

    /// One tick of the round timer: post a random flag, wait out the answer
    /// window, then reveal the answer if nobody got it.
    pub async fn play_round(&self, chat: &impl Chat) -> Result<()> {
        let Some(flag) = self.pick() else {
            info!("no flags loaded");
            return Ok(());
        };

        debug!(url = %flag.image_url, "starting round");

        let png = self.flags.fetch_png(&flag.image_url).await?;

        chat.announce_flag(self.channel, png, self.answer_window)
            .await
            .with_context(|| format!("could not post flag to channel {}", self.channel))?;

        let round = ActiveRound { answer: flag.country, channel: self.channel };

        // a tick that overran its interval loses its round without a reveal
        let (id, previous) = self.rounds.begin(round);
        if let Some(previous) = previous {
            warn!(answer = %previous.answer, "overwrote an unresolved round");
        }

        time::sleep(self.answer_window).await;

        if let Some(round) = self.rounds.expire(id) {
            chat.announce_timeout(round.channel, &round.answer).await?;
        }

        Ok(())
    }

    /// Checks an incoming message against the active round; anything that
    /// doesn't resolve it goes on to the commands.
    pub async fn on_message(&self, chat: &impl Chat, message: &TextMessage) -> Result<()> {
        if let Some(round) = self.rounds.guess(message.channel, &message.body) {
            info!(answer = %round.answer, "round won");

            chat.say(round.channel, &format!("Correct! The answer is **{}**!", round.answer))
                .await?;

            return Ok(());
        }

        commands::dispatch(chat, message).await
    }
}
