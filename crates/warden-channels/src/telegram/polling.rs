//! Long-polling update loop and Channel trait implementation.

use super::convert::to_incoming;
use super::send::build_payloads;
use super::types::{TgResponse, TgUpdate, TgUser};
use super::TelegramChannel;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use warden_core::{
    error::WardenError,
    message::{IncomingMessage, OutgoingMessage},
    traits::Channel,
};

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, WardenError> {
        let me = self.get_me().await?;
        let username = me.username.unwrap_or_default();
        info!("Telegram bot identified as @{username}");
        let _ = self.username.set(username.clone());

        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let last_update_id = self.last_update_id.clone();
        let started_at = chrono::Utc::now().timestamp();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll -- reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let (msg, edited) = match (update.message, update.edited_message) {
                        (Some(m), _) => (m, false),
                        (None, Some(m)) => (m, true),
                        (None, None) => continue,
                    };

                    let Some(incoming) =
                        to_incoming(msg, edited, Some(username.as_str()), started_at)
                    else {
                        debug!("telegram: skipping update {} without text", update.update_id);
                        continue;
                    };

                    if tx.send(incoming).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), WardenError> {
        for payload in build_payloads(&message, self.username()) {
            self.post_message(payload).await?;
        }
        Ok(())
    }

    fn deep_link(&self, payload: &str) -> Option<String> {
        self.username()
            .filter(|u| !u.is_empty())
            .map(|u| format!("https://t.me/{u}?start={payload}"))
    }

    async fn stop(&self) -> Result<(), WardenError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

impl TelegramChannel {
    /// Identify the bot. Fails fast on a bad token.
    async fn get_me(&self) -> Result<TgUser, WardenError> {
        let url = format!("{}/getMe", self.base_url);
        let resp: TgResponse<TgUser> = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WardenError::Channel(format!("telegram getMe failed: {e}")))?
            .json()
            .await
            .map_err(|e| WardenError::Channel(format!("telegram getMe parse failed: {e}")))?;

        if !resp.ok {
            return Err(WardenError::Channel(format!(
                "telegram getMe rejected: {}",
                resp.description.unwrap_or_default()
            )));
        }
        resp.result
            .ok_or_else(|| WardenError::Channel("telegram getMe returned no bot".into()))
    }
}
