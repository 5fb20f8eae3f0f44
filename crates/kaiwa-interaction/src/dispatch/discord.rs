//! Discord webhook presentation.
//!
//! Each persona posts through its own `AI_Character_{id}` webhook in the
//! channel, so the message shows the persona's name and avatar.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use kaiwa_core::persona::PersonaIdentity;
use kaiwa_core::session::DestinationId;
use serenity::all::{
    ChannelId, CreateMessage, CreateWebhook, ExecuteWebhook, Http, Webhook, WebhookId,
};
use tokio::sync::Mutex;

use super::{DispatchError, DispatchOutcome, Dispatcher, fallback_text};

/// Prefix of the channel webhooks created per persona.
pub const WEBHOOK_NAME_PREFIX: &str = "AI_Character_";

pub fn webhook_name(persona_id: &str) -> String {
    format!("{WEBHOOK_NAME_PREFIX}{persona_id}")
}

/// Maps a persona webhook's name back to the persona id.
pub fn persona_id_from_webhook_name(name: &str) -> Option<&str> {
    name.strip_prefix(WEBHOOK_NAME_PREFIX)
        .filter(|id| !id.is_empty())
}

/// Posts through one channel webhook per persona.
///
/// Any webhook failure falls back to a plain bot message.
pub struct DiscordWebhookDispatcher {
    http: Arc<Http>,
    webhooks: Mutex<HashMap<(DestinationId, String), Webhook>>,
    /// Serializes webhook lookup and creation per channel.
    gates: Mutex<HashMap<DestinationId, Arc<Mutex<()>>>>,
}

impl DiscordWebhookDispatcher {
    pub fn new(http: Arc<Http>) -> Self {
        Self {
            http,
            webhooks: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_token(token: &str) -> Self {
        Self::new(Arc::new(Http::new(token)))
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }

    async fn webhook_for(
        &self,
        destination: DestinationId,
        persona_id: &str,
    ) -> serenity::Result<Webhook> {
        let key = (destination, persona_id.to_string());
        if let Some(webhook) = self.webhooks.lock().await.get(&key) {
            return Ok(webhook.clone());
        }

        let gate = self.channel_gate(destination).await;
        let _held = gate.lock().await;
        // Another task may have finished creating it while we waited.
        if let Some(webhook) = self.webhooks.lock().await.get(&key) {
            return Ok(webhook.clone());
        }

        let channel = ChannelId::new(destination.0);
        let name = webhook_name(persona_id);
        let existing = channel
            .webhooks(self.http.as_ref())
            .await?
            .into_iter()
            .find(|wh| wh.name.as_deref() == Some(name.as_str()) && wh.token.is_some());

        let webhook = match existing {
            Some(webhook) => webhook,
            None => {
                tracing::info!(%destination, persona_id, "Creating persona webhook");
                channel
                    .create_webhook(self.http.as_ref(), CreateWebhook::new(name))
                    .await?
            }
        };

        self.webhooks.lock().await.insert(key, webhook.clone());
        Ok(webhook)
    }

    async fn channel_gate(&self, destination: DestinationId) -> Arc<Mutex<()>> {
        self.gates
            .lock()
            .await
            .entry(destination)
            .or_default()
            .clone()
    }

    async fn execute_as(
        &self,
        destination: DestinationId,
        identity: &PersonaIdentity,
        text: &str,
    ) -> serenity::Result<()> {
        let webhook = self.webhook_for(destination, &identity.persona_id).await?;
        let mut builder = ExecuteWebhook::new()
            .content(text)
            .username(identity.display_name.as_str());
        if let Some(avatar_url) = &identity.avatar_url {
            builder = builder.avatar_url(avatar_url.as_str());
        }

        if let Err(err) = webhook.execute(self.http.as_ref(), false, builder).await {
            // A deleted webhook stays cached otherwise.
            self.webhooks
                .lock()
                .await
                .remove(&(destination, identity.persona_id.clone()));
            return Err(err);
        }
        Ok(())
    }

    /// Resolves which persona a webhook message was posted as.
    pub async fn persona_for_webhook(
        &self,
        destination: DestinationId,
        webhook_id: WebhookId,
    ) -> Option<String> {
        if let Some(((_, persona_id), _)) = self
            .webhooks
            .lock()
            .await
            .iter()
            .find(|((dest, _), wh)| *dest == destination && wh.id == webhook_id)
        {
            return Some(persona_id.clone());
        }

        let webhooks = match ChannelId::new(destination.0).webhooks(self.http.as_ref()).await {
            Ok(webhooks) => webhooks,
            Err(err) => {
                tracing::warn!(%destination, error = %err, "Failed to list channel webhooks");
                return None;
            }
        };
        webhooks
            .into_iter()
            .find(|wh| wh.id == webhook_id)
            .and_then(|wh| wh.name)
            .and_then(|name| persona_id_from_webhook_name(&name).map(str::to_string))
    }
}

#[async_trait]
impl Dispatcher for DiscordWebhookDispatcher {
    async fn present_as(
        &self,
        destination: DestinationId,
        identity: &PersonaIdentity,
        text: &str,
    ) -> Result<DispatchOutcome, DispatchError> {
        match self.execute_as(destination, identity, text).await {
            Ok(()) => Ok(DispatchOutcome::AsPersona),
            Err(err) => {
                tracing::warn!(
                    %destination,
                    persona_id = %identity.persona_id,
                    error = %err,
                    "Webhook dispatch failed, falling back to a plain message"
                );
                ChannelId::new(destination.0)
                    .send_message(
                        self.http.as_ref(),
                        CreateMessage::new().content(fallback_text(identity, text)),
                    )
                    .await
                    .map_err(|err| DispatchError::Send {
                        destination,
                        message: err.to_string(),
                    })?;
                Ok(DispatchOutcome::Fallback)
            }
        }
    }
}
