//! In-memory stand-in for Discord used by the job tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::discord::{Channel, ChatError, ChatPlatform, DiscordUser, Message, TEXT_CHANNEL};

#[derive(Default)]
pub struct FakeDiscord {
    channels: Mutex<Vec<Channel>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    users: Mutex<HashMap<String, DiscordUser>>,
    broken: Mutex<HashSet<String>>,
}

pub fn user(id: &str, username: &str, bot: bool) -> DiscordUser {
    DiscordUser {
        id: id.into(),
        username: username.into(),
        discriminator: None,
        global_name: None,
        avatar: None,
        bot,
        email: None,
    }
}

/// Message whose timestamp follows its numeric id, so cursors and clocks agree.
pub fn message(id: u64, author: &DiscordUser, content: &str) -> Message {
    let base: DateTime<Utc> = Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap();
    Message {
        id: id.to_string(),
        content: content.into(),
        timestamp: base + Duration::seconds(id as i64),
        author: author.clone(),
    }
}

impl FakeDiscord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_text_channel(&self, id: &str, name: &str, parent_id: &str) {
        self.channels.lock().unwrap().push(Channel {
            id: id.into(),
            name: name.into(),
            kind: TEXT_CHANNEL,
            parent_id: Some(parent_id.into()),
        });
    }

    pub fn add_channel(&self, channel: Channel) {
        self.channels.lock().unwrap().push(channel);
    }

    pub fn rename_channel(&self, id: &str, name: &str) {
        if let Some(c) = self.channels.lock().unwrap().iter_mut().find(|c| c.id == id) {
            c.name = name.into();
        }
    }

    pub fn move_channel(&self, id: &str, parent_id: &str) {
        if let Some(c) = self.channels.lock().unwrap().iter_mut().find(|c| c.id == id) {
            c.parent_id = Some(parent_id.into());
        }
    }

    pub fn remove_channel(&self, id: &str) {
        self.channels.lock().unwrap().retain(|c| c.id != id);
    }

    pub fn post(&self, channel_id: &str, message: Message) {
        self.messages
            .lock()
            .unwrap()
            .entry(channel_id.into())
            .or_default()
            .push(message);
    }

    pub fn add_user(&self, user: DiscordUser) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    /// Makes message fetches for `channel_id` fail with a server error.
    pub fn break_messages(&self, channel_id: &str) {
        self.broken.lock().unwrap().insert(channel_id.into());
    }
}

fn snowflake(id: &str) -> u64 {
    id.parse().unwrap_or(0)
}

#[async_trait]
impl ChatPlatform for FakeDiscord {
    async fn list_guild_channels(&self, _guild_id: &str) -> Result<Vec<Channel>, ChatError> {
        Ok(self.channels.lock().unwrap().clone())
    }

    async fn get_channel(&self, channel_id: &str) -> Result<Channel, ChatError> {
        self.channels
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == channel_id)
            .cloned()
            .ok_or_else(|| ChatError::NotFound(format!("/channels/{channel_id}")))
    }

    async fn list_channel_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<Message>, ChatError> {
        if self.broken.lock().unwrap().contains(channel_id) {
            return Err(ChatError::Status {
                status: 500,
                path: format!("/channels/{channel_id}/messages"),
                body: "boom".into(),
            });
        }

        let mut page: Vec<Message> = self
            .messages
            .lock()
            .unwrap()
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|m| after.is_none_or(|a| snowflake(&m.id) > snowflake(a)))
            .collect();

        // Discord pages newest first.
        page.sort_by_key(|m| std::cmp::Reverse(snowflake(&m.id)));
        page.truncate(limit as usize);
        Ok(page)
    }

    async fn get_user(&self, user_id: &str) -> Result<DiscordUser, ChatError> {
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .ok_or_else(|| ChatError::NotFound(format!("/users/{user_id}")))
    }
}
