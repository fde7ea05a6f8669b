use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::warn;
use uuid::Uuid;

use rishta_db::Database;
use rishta_types::models::NotificationKind;

use crate::push::{PushMessage, PushProvider};

/// Delivers member notifications: an in-app record plus a push.
///
/// Delivery is a side channel. It runs on its own task, after the primary
/// operation has already committed, and every failure is logged and dropped.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    db: Arc<Database>,
    push: Arc<dyn PushProvider>,
}

impl Notifier {
    pub fn new(db: Arc<Database>, push: Arc<dyn PushProvider>) -> Self {
        Self {
            inner: Arc::new(NotifierInner { db, push }),
        }
    }

    /// Fire-and-forget: records the notification and pushes it. The handle is
    /// only useful to tests; handlers drop it.
    pub fn notify(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> JoinHandle<()> {
        let inner = self.inner.clone();
        let title = title.into();
        let body = body.into();

        tokio::spawn(async move {
            let db = inner.db.clone();
            let (t, b) = (title.clone(), body.clone());
            let recorded = tokio::task::spawn_blocking(move || {
                db.insert_notification(user_id, kind, &t, &b, Utc::now())
            })
            .await;
            match recorded {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Failed to record {} notification for {}: {}", kind, user_id, e),
                Err(e) => warn!("spawn_blocking join error: {}", e),
            }

            let message = PushMessage {
                to: user_id,
                title,
                body,
                data: serde_json::json!({ "kind": kind }),
            };
            if let Err(e) = inner.push.send(&message).await {
                warn!("Push delivery to {} failed: {}", user_id, e);
            }
        })
    }

    /// Push-only fan-out, for broadcasts whose in-app records were already
    /// written by the caller.
    pub fn push_many(
        &self,
        user_ids: Vec<Uuid>,
        kind: NotificationKind,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> JoinHandle<usize> {
        let inner = self.inner.clone();
        let title = title.into();
        let body = body.into();

        tokio::spawn(async move {
            let mut failed = 0;
            for user_id in user_ids {
                let message = PushMessage {
                    to: user_id,
                    title: title.clone(),
                    body: body.clone(),
                    data: serde_json::json!({ "kind": kind }),
                };
                if let Err(e) = inner.push.send(&message).await {
                    failed += 1;
                    warn!("Push delivery to {} failed: {}", user_id, e);
                }
            }
            failed
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rishta_types::models::Role;

    use super::*;
    use crate::push::DisabledPush;
    use rishta_db::models::NewUser;

    #[derive(Default)]
    struct RecordingPush {
        sent: Mutex<Vec<PushMessage>>,
    }

    #[async_trait]
    impl PushProvider for RecordingPush {
        async fn send(&self, message: &PushMessage) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    struct FailingPush;

    #[async_trait]
    impl PushProvider for FailingPush {
        async fn send(&self, _message: &PushMessage) -> anyhow::Result<()> {
            anyhow::bail!("provider unavailable")
        }
    }

    fn db_with_member() -> (Arc<Database>, Uuid) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = db
            .create_user(
                &NewUser {
                    name: "Kavya",
                    email: "kavya@example.com",
                    phone: "+919811111111",
                    password_hash: "hash",
                    role: Role::Bride,
                },
                Utc::now(),
            )
            .unwrap()
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn notify_records_and_pushes() {
        let (db, user_id) = db_with_member();
        let push = Arc::new(RecordingPush::default());
        let notifier = Notifier::new(db.clone(), push.clone());

        notifier
            .notify(user_id, NotificationKind::RequestAccepted, "Accepted", "Your request was accepted")
            .await
            .unwrap();

        let records = db.list_notifications(user_id, 10).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, NotificationKind::RequestAccepted);

        let sent = push.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, user_id);
        assert_eq!(sent[0].data["kind"], "request_accepted");
    }

    #[tokio::test]
    async fn push_failure_is_swallowed_and_record_kept() {
        let (db, user_id) = db_with_member();
        let notifier = Notifier::new(db.clone(), Arc::new(FailingPush));

        notifier
            .notify(user_id, NotificationKind::NewMessage, "New message", "hi")
            .await
            .unwrap();
        assert_eq!(db.unread_notification_count(user_id).unwrap(), 1);

        let failed = notifier
            .push_many(vec![user_id, Uuid::new_v4()], NotificationKind::Announcement, "t", "b")
            .await
            .unwrap();
        assert_eq!(failed, 2);
    }

    #[tokio::test]
    async fn record_failure_does_not_stop_push() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let push = Arc::new(RecordingPush::default());
        let notifier = Notifier::new(db, push.clone());

        // Unknown member: the foreign key rejects the in-app record.
        notifier
            .notify(Uuid::new_v4(), NotificationKind::NewMessage, "t", "b")
            .await
            .unwrap();
        assert_eq!(push.sent.lock().unwrap().len(), 1);

        let disabled = Notifier::new(
            Arc::new(Database::open_in_memory().unwrap()),
            Arc::new(DisabledPush),
        );
        assert_eq!(
            disabled
                .push_many(vec![Uuid::new_v4()], NotificationKind::Announcement, "t", "b")
                .await
                .unwrap(),
            0
        );
    }
}
