//! Inbound message pipeline: filter, parse, reconcile, notify.
//!
//! One message is handled end to end before the next. Nothing here posts
//! errors back to the chat; failures only reach the log.

use crate::error::StoreError;
use crate::leaderboard::reconcile::{reconcile, ReconcileOutcome};
use crate::leaderboard::standings::format_sale_notification;
use crate::notification::send_or_log;
use crate::parser::parse_sale_at;
use crate::state::AppState;
use crate::types::{InboundMessage, SenderKind};

/// What happened to one inbound message.
#[derive(Debug)]
pub enum MessageOutcome {
    /// Sent by a bot, ours or anyone else's.
    IgnoredBot,
    /// Not a sale announcement.
    NotASale,
    Recorded {
        outcome: ReconcileOutcome,
        notified: bool,
    },
}

/// Handle a single chat message.
///
/// Only store failures are returned as errors. Bots and chatter are
/// ignored, and a failed notification doesn't undo the recorded sale.
pub async fn handle_message(
    state: &AppState,
    message: &InboundMessage,
) -> Result<MessageOutcome, StoreError> {
    if message.sender_kind == SenderKind::Bot {
        log::debug!("Ignoring bot message from {}", message.sender_display_name);
        return Ok(MessageOutcome::IgnoredBot);
    }

    let now = state.now();
    let Some(event) = parse_sale_at(&message.text, &message.sender_display_name, now) else {
        log::debug!("Not a sale: message from {}", message.sender_display_name);
        return Ok(MessageOutcome::NotASale);
    };

    let outcome = {
        let _guard = state.write_lock.lock().await;
        reconcile(
            state.leaderboard.as_ref(),
            state.sales_log.as_ref(),
            &event,
            now,
        )
        .await?
    };

    let text = format_sale_notification(&outcome.record, &outcome.standings);
    let notified = send_or_log(state.notifier.as_ref(), &text).await;

    Ok(MessageOutcome::Recorded { outcome, notified })
}

/// Parse one line of newline-delimited JSON and handle it.
///
/// Malformed lines are logged and skipped. Store failures are logged at
/// error level; the line's sale is lost but the loop keeps going.
pub async fn handle_line(state: &AppState, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let message: InboundMessage = match serde_json::from_str(line) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("Skipping malformed message event: {}", e);
            return;
        }
    };

    if let Err(e) = handle_message(state, &message).await {
        log::error!(
            "Failed to record sale from {}: {}",
            message.sender_display_name,
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::notification::RecordingNotifier;
    use crate::store::rows::entries_from_rows;
    use crate::store::{LeaderboardStore, MemoryStore};
    use crate::types::{Config, Row};

    fn state_with(store: Arc<MemoryStore>, notifier: Arc<RecordingNotifier>) -> AppState {
        AppState::new(Config::default(), store.clone(), store, notifier).unwrap()
    }

    fn user(text: &str, sender: &str) -> InboundMessage {
        InboundMessage {
            text: text.to_string(),
            sender_display_name: sender.to_string(),
            sender_kind: SenderKind::User,
        }
    }

    #[tokio::test]
    async fn test_sale_is_recorded_and_announced() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let state = state_with(store.clone(), notifier.clone());

        let outcome = handle_message(&state, &user("🛜 +1 Jane Doe 11/25 Kinetic 1G", "Alice"))
            .await
            .unwrap();

        assert!(matches!(outcome, MessageOutcome::Recorded { notified: true, .. }));
        assert_eq!(store.sales_log_rows().len(), 1);
        assert_eq!(entries_from_rows(&store.leaderboard_rows())[0].today, 1);

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Alice closed a sale for Jane Doe"));
        assert!(sent[0].contains("1. Alice: 1"));
    }

    #[tokio::test]
    async fn test_bot_messages_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let state = state_with(store.clone(), notifier.clone());

        let mut message = user("+1 Jane Doe 11/25 Kinetic 1G", "Salesboard");
        message.sender_kind = SenderKind::Bot;
        let outcome = handle_message(&state, &message).await.unwrap();

        assert!(matches!(outcome, MessageOutcome::IgnoredBot));
        assert!(store.sales_log_rows().is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_chatter_is_not_a_sale() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let state = state_with(store.clone(), notifier.clone());

        let outcome = handle_message(&state, &user("hello team", "Bob")).await.unwrap();
        assert!(matches!(outcome, MessageOutcome::NotASale));
        assert!(store.leaderboard_rows().is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_notify_failure_keeps_sale() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::failing());
        let state = state_with(store.clone(), notifier);

        let outcome = handle_message(&state, &user("+2 Jane 11/25 Kinetic 1G", "Alice"))
            .await
            .unwrap();
        assert!(matches!(outcome, MessageOutcome::Recorded { notified: false, .. }));
        assert_eq!(store.sales_log_rows().len(), 1);
    }

    struct BrokenStore;

    #[async_trait]
    impl LeaderboardStore for BrokenStore {
        async fn read_all(&self) -> Result<Vec<Row>, StoreError> {
            Err(StoreError::Migration("table missing".to_string()))
        }

        async fn write_all(&self, _rows: Vec<Row>) -> Result<(), StoreError> {
            Err(StoreError::Migration("table missing".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates_without_notifying() {
        let log = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let state = AppState::new(
            Config::default(),
            Arc::new(BrokenStore),
            log.clone(),
            notifier.clone(),
        )
        .unwrap();

        let result = handle_message(&state, &user("+1 Jane 11/25 Kinetic 1G", "Alice")).await;
        assert!(result.is_err());
        assert!(log.sales_log_rows().is_empty());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_handle_line_parses_json_and_skips_garbage() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let state = state_with(store.clone(), notifier.clone());

        handle_line(&state, "not json").await;
        handle_line(&state, "").await;
        handle_line(
            &state,
            r#"{"text": "+1 Jane 11/25 Kinetic 1G", "senderDisplayName": "Alice", "senderKind": "user"}"#,
        )
        .await;
        handle_line(
            &state,
            r#"{"text": "+1 Jane 11/25 Kinetic 1G", "senderDisplayName": "Board", "senderKind": "bot"}"#,
        )
        .await;

        assert_eq!(store.sales_log_rows().len(), 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_successive_reports_accumulate() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let state = state_with(store.clone(), notifier);

        for text in [
            "+1 Jane 11/25 Kinetic 1G",
            "+2 Sam 11/26 Kinetic 2G",
            "+3 Lee 11/27 Kinetic 1G",
        ] {
            handle_message(&state, &user(text, "Alice")).await.unwrap();
        }
        handle_message(&state, &user("+1 Kim 11/27 Spectrum 500M", "bob"))
            .await
            .unwrap();

        let entries = entries_from_rows(&store.leaderboard_rows());
        assert_eq!(entries[0].rep_name, "Alice");
        assert_eq!((entries[0].today, entries[0].lifetime), (3, 3));
        assert_eq!(entries[1].rep_name, "bob");
        assert_eq!(store.sales_log_rows().len(), 4);
    }
}
