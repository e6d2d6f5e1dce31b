use crate::state::MessageStateStore;
use crate::telegram::{TelegramApi, TelegramError};

/// Keeps the destination chat's one status message aligned with the rendered
/// report. Edits in place while the tracked message is editable and falls
/// back to a fresh send when it is not.
pub struct Publisher {
    api: TelegramApi,
    store: MessageStateStore,
    chat_id: String,
}

impl Publisher {
    pub fn new(api: TelegramApi, store: MessageStateStore, chat_id: String) -> Self {
        Self {
            api,
            store,
            chat_id,
        }
    }

    /// Reconcile one tick's report. `None` is the quiet tick: no API call,
    /// stored identity untouched. Every failure mode is recovered here;
    /// nothing propagates.
    pub async fn publish(&self, report: Option<&str>) {
        let Some(text) = report else {
            tracing::info!("nothing on air, leaving previous message untouched");
            return;
        };

        match self.store.load() {
            Some(message_id) => self.edit_or_resend(message_id, text).await,
            None => self.send_fresh(text).await,
        }
    }

    async fn edit_or_resend(&self, message_id: i64, text: &str) {
        match self.api.edit_message(&self.chat_id, message_id, text).await {
            Ok(new_id) => {
                tracing::info!("edited status message {new_id}");
                self.store.store(new_id);
            }
            // A transport failure says nothing about whether the message
            // still exists; sending now could duplicate it. Retry the edit
            // against the same id next tick.
            Err(TelegramError::Network(e)) => {
                tracing::warn!("network error editing message {message_id}, deferring: {e}");
            }
            Err(e) => {
                tracing::warn!("cannot edit message {message_id} ({e}), sending a fresh one");
                self.send_fresh(text).await;
            }
        }
    }

    async fn send_fresh(&self, text: &str) {
        match self.api.send_message(&self.chat_id, text).await {
            Ok(new_id) => {
                tracing::info!("sent status message {new_id}");
                self.store.store(new_id);
            }
            Err(e) => {
                tracing::warn!("failed to send status message: {e}");
            }
        }
    }
}
