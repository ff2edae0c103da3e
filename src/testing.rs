//! In-memory stand-ins for Discord and the flag server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use bytes::Bytes;
use serenity::async_trait;
use serenity::model::id::{ChannelId, MessageId};
use tokio::time::{self, Instant};

use crate::discord::TextMessage;
use crate::game::{Chat, FlagSource};

pub fn host() -> ChannelId {
    ChannelId::new(1272172313919488055)
}

pub fn elsewhere() -> ChannelId {
    ChannelId::new(99)
}

/// A message from a member allowed to manage messages.
pub fn text(channel: ChannelId, body: &str) -> TextMessage {
    TextMessage {
        channel,
        body: body.to_string(),
        can_manage_messages: true,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Post {
    Flag(ChannelId),
    Timeout(ChannelId, String),
    Say(ChannelId, String),
    Deleted(ChannelId, Vec<MessageId>),
}

#[derive(Default)]
pub struct FakeChat {
    /// Every post with the (paused) clock reading it was made at.
    pub posts: Mutex<Vec<(Instant, Post)>>,
    /// Messages of every channel, oldest first.
    pub history: Mutex<Vec<(ChannelId, MessageId)>>,
    pub next_id: AtomicU64,
    pub fail_posts: bool,
}

impl FakeChat {
    pub fn with_history(channel: ChannelId, count: usize) -> FakeChat {
        let chat = FakeChat::default();

        for _ in 0..count {
            chat.push(channel);
        }

        chat
    }

    pub fn posts(&self) -> Vec<Post> {
        self.timeline().into_iter().map(|(_, post)| post).collect()
    }

    pub fn timeline(&self) -> Vec<(Instant, Post)> {
        self.posts.lock().unwrap().clone()
    }

    pub fn history(&self, channel: ChannelId) -> Vec<MessageId> {
        self.history
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == channel)
            .map(|(_, id)| *id)
            .collect()
    }

    fn push(&self, channel: ChannelId) -> MessageId {
        let id = MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.history.lock().unwrap().push((channel, id));
        id
    }

    fn post(&self, channel: ChannelId, post: Post) -> Result<MessageId> {
        if self.fail_posts {
            bail!("Unknown Channel");
        }

        self.posts.lock().unwrap().push((Instant::now(), post));
        Ok(self.push(channel))
    }
}

#[async_trait]
impl Chat for FakeChat {
    async fn announce_flag(
        &self,
        channel: ChannelId,
        _png: Bytes,
        _window: Duration,
    ) -> Result<()> {
        self.post(channel, Post::Flag(channel))?;
        Ok(())
    }

    async fn announce_timeout(&self, channel: ChannelId, answer: &str) -> Result<()> {
        self.post(channel, Post::Timeout(channel, answer.to_string()))?;
        Ok(())
    }

    async fn say(&self, channel: ChannelId, text: &str) -> Result<MessageId> {
        self.post(channel, Post::Say(channel, text.to_string()))
    }

    async fn recent_messages(&self, channel: ChannelId, limit: u8) -> Result<Vec<MessageId>> {
        let mut messages = self.history(channel);
        messages.reverse();
        messages.truncate(limit as usize);

        Ok(messages)
    }

    async fn delete_messages(&self, channel: ChannelId, messages: &[MessageId]) -> Result<()> {
        self.history.lock().unwrap().retain(|(_, id)| !messages.contains(id));
        self.posts
            .lock()
            .unwrap()
            .push((Instant::now(), Post::Deleted(channel, messages.to_vec())));

        Ok(())
    }
}

#[derive(Default)]
pub struct FakeFlags {
    pub fail: bool,
    /// How long each successive fetch takes; instant once these run out.
    pub delays: Mutex<VecDeque<Duration>>,
}

impl FakeFlags {
    pub fn with_delays(delays: Vec<Duration>) -> FakeFlags {
        FakeFlags { delays: Mutex::new(delays.into()), ..FakeFlags::default() }
    }
}

#[async_trait]
impl FlagSource for FakeFlags {
    async fn fetch_png(&self, url: &str) -> Result<Bytes> {
        let delay = self.delays.lock().unwrap().pop_front();

        if let Some(delay) = delay {
            time::sleep(delay).await;
        }

        if self.fail {
            bail!("failed to fetch image from {}: status 404 Not Found", url);
        }

        Ok(Bytes::from_static(b"\x89PNG"))
    }
}
