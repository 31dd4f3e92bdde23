//! # Matrix Notifier
//!
//! Implements the `Notifier` trait on top of a logged-in `matrix_sdk` client.
//! Recipients are room ids; the bot must already be a member of the room.

use crate::domain::traits::Notifier;
use async_trait::async_trait;
use matrix_sdk::Client;
use matrix_sdk::ruma::RoomId;
use matrix_sdk::ruma::events::room::message::RoomMessageEventContent;
use std::convert::TryFrom;

#[derive(Clone)]
pub struct MatrixNotifier {
    client: Client,
}

impl MatrixNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for MatrixNotifier {
    async fn send(&self, recipient: &str, content: &str) -> Result<(), String> {
        let room_id = <&RoomId>::try_from(recipient).map_err(|e| e.to_string())?;
        let room = self
            .client
            .get_room(room_id)
            .ok_or_else(|| format!("Not a member of room {}", recipient))?;

        tracing::debug!("Sending notification to {}", recipient);
        room.send(RoomMessageEventContent::text_plain(content))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
