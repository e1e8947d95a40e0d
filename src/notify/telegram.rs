// Copyright (C) 2025 Category Labs, Inc.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Telegram notifier module.

use super::{NotificationError, Notifier};
use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{LinkPreviewOptions, ParseMode, Recipient};
use tracing::{error, info};

#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: &str) -> Self {
        let recipient = parse_recipient(chat_id);
        info!("📱 Initializing Telegram: chat={}", describe(&recipient));

        Self {
            bot: Bot::new(token),
            recipient,
        }
    }
}

/// Numeric ids address chats and groups, anything else is a channel username.
pub fn parse_recipient(chat_id: &str) -> Recipient {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(num) => Recipient::Id(ChatId(num)),
        Err(_) if chat_id.starts_with('@') => Recipient::ChannelUsername(chat_id.to_string()),
        Err(_) => Recipient::ChannelUsername(format!("@{}", chat_id)),
    }
}

/// Alerts end with a positions link; keep it from expanding into a card.
fn no_link_preview() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn describe(recipient: &Recipient) -> String {
    match recipient {
        Recipient::Id(id) => id.0.to_string(),
        Recipient::ChannelUsername(name) => name.clone(),
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &str) -> Result<(), NotificationError> {
        let result = self
            .bot
            .send_message(self.recipient.clone(), message)
            .parse_mode(ParseMode::Html)
            .link_preview_options(no_link_preview())
            .await;

        match result {
            Ok(_) => {
                info!("📤 Sent Telegram message");
                Ok(())
            }
            Err(e) => {
                error!("Failed to send Telegram message: {}", e);
                Err(NotificationError::Telegram(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_chat_id() {
        assert_eq!(
            parse_recipient("-1001234567890"),
            Recipient::Id(ChatId(-1001234567890))
        );
        assert_eq!(parse_recipient(" 42 "), Recipient::Id(ChatId(42)));
    }

    #[test]
    fn test_link_preview_disabled() {
        let options = no_link_preview();
        assert!(options.is_disabled);
        assert_eq!(options.url, None);
    }

    #[test]
    fn test_parse_channel_username() {
        assert_eq!(
            parse_recipient("@whale_alerts"),
            Recipient::ChannelUsername("@whale_alerts".to_string())
        );
        assert_eq!(
            parse_recipient("whale_alerts"),
            Recipient::ChannelUsername("@whale_alerts".to_string())
        );
    }
}
