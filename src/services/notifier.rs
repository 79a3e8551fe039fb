use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rusqlite::Connection;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::{notifications, users};
use crate::domain::{Notification, NotificationKind};

/// Transport for device push messages.
pub trait PushSender: Send + Sync {
    fn send(&self, token: &str, title: &str, body: &str, data: &Value) -> Result<()>;
}

/// Default transport: no external delivery, just a log line.
pub struct LogPushSender;

impl PushSender for LogPushSender {
    fn send(&self, token: &str, title: &str, _body: &str, _data: &Value) -> Result<()> {
        debug!("Push to device {}: {}", token, title);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub data: Value,
}

impl NewNotification {
    fn into_record(self, now: DateTime<Utc>) -> Notification {
        Notification {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id,
            title: self.title,
            message: self.message,
            kind: self.kind,
            data: self.data,
            read: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Stored; the user has no device registered.
    Stored,
    Pushed,
    /// Stored, but the push transport failed.
    PushFailed,
}

#[derive(Clone)]
pub struct Notifier {
    push: Arc<dyn PushSender>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Arc::new(LogPushSender))
    }
}

impl Notifier {
    pub fn new(push: Arc<dyn PushSender>) -> Self {
        Self { push }
    }

    /// Stores the notification record only. Safe inside a transaction.
    pub fn record(
        conn: &Connection,
        notification: NewNotification,
        now: DateTime<Utc>,
    ) -> Result<Notification> {
        let record = notification.into_record(now);
        notifications::insert_notification(conn, &record)?;
        Ok(record)
    }

    /// Pushes an already stored notification to the user's device, if any.
    pub fn push(&self, conn: &Connection, notification: &Notification) -> Delivery {
        let token = match users::find_by_id(conn, &notification.user_id) {
            Ok(Some(user)) => user.fcm_token.filter(|t| !t.is_empty()),
            Ok(None) => None,
            Err(e) => {
                warn!("Could not look up device for user {}: {:#}", notification.user_id, e);
                return Delivery::PushFailed;
            }
        };

        let Some(token) = token else {
            return Delivery::Stored;
        };

        match self
            .push
            .send(&token, &notification.title, &notification.message, &notification.data)
        {
            Ok(()) => Delivery::Pushed,
            Err(e) => {
                warn!("Push to user {} failed: {:#}", notification.user_id, e);
                Delivery::PushFailed
            }
        }
    }
}
