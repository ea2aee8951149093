//! Channel member lookup used for mention resolution.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A member the model may mention by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Name shown in the channel.
    pub display_name: String,
    /// Host member id.
    pub member_id: String,
}

impl Member {
    /// Create a member.
    pub fn new(display_name: impl Into<String>, member_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            member_id: member_id.into(),
        }
    }
}

/// Host-provided list of channel members.
///
/// Lookups are infallible from the pipeline's point of view: a directory
/// that cannot answer returns an empty list and mentions stay plain text.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Members of a channel.
    async fn members(&self, channel_id: &str) -> Vec<Member>;
}

/// Directory backed by a map, for hosts that push member lists.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    channels: RwLock<HashMap<String, Vec<Member>>>,
}

impl StaticDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the member list of a channel.
    pub async fn set_members(&self, channel_id: impl Into<String>, members: Vec<Member>) {
        self.channels.write().await.insert(channel_id.into(), members);
    }
}

#[async_trait]
impl MemberDirectory for StaticDirectory {
    async fn members(&self, channel_id: &str) -> Vec<Member> {
        self.channels
            .read()
            .await
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }
}
