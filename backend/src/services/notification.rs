//! Admin notifications
//!
//! Every admin event becomes one in-app notification per active administrator
//! and, when a webhook is configured, a signed JSON delivery. Delivery is best
//! effort: failures are logged and never fail the operation that raised the
//! event.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use shared::{AdminEvent, EventEnvelope};
use sqlx::{FromRow, PgPool};

use crate::config::NotificationConfig;
use crate::error::{AppError, AppResult};

/// Header carrying the base64 HMAC-SHA256 of the webhook body
pub const SIGNATURE_HEADER: &str = "X-Clinic-Signature";

type HmacSha256 = Hmac<Sha256>;

/// Notification service for admin events
#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
    http: reqwest::Client,
    config: NotificationConfig,
}

/// In-app notification
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InAppNotification {
    pub id: i64,
    pub user_id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Sign a webhook body with the shared secret
pub fn sign_payload(secret: &str, body: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Failed to create HMAC".to_string()))?;
    mac.update(body);
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

impl NotificationService {
    /// Create a new NotificationService instance
    pub fn new(db: PgPool, http: reqwest::Client, config: NotificationConfig) -> Self {
        Self { db, http, config }
    }

    /// Tell every active administrator about an event
    pub async fn notify_admins(&self, event: AdminEvent) {
        let now = Utc::now();

        match self.create_in_app(&event).await {
            Ok(count) => {
                tracing::debug!(kind = event.kind(), recipients = count, "Admin notifications created")
            }
            Err(e) => {
                tracing::warn!(kind = event.kind(), "Failed to create admin notifications: {}", e)
            }
        }

        if let Some(url) = self.config.webhook_url.as_deref() {
            let envelope = EventEnvelope::new(event, now);
            if let Err(e) = self.deliver_webhook(url, &envelope).await {
                tracing::warn!(
                    event_id = %envelope.event_id,
                    kind = envelope.event.kind(),
                    "Webhook delivery failed: {}",
                    e
                );
            }
        }
    }

    async fn create_in_app(&self, event: &AdminEvent) -> AppResult<u64> {
        let (entity_type, entity_id) = event.entity();

        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, entity_type, entity_id)
            SELECT id, $1, $2, $3, $4, $5
            FROM users
            WHERE role = 'admin' AND is_active = true
            "#,
        )
        .bind(event.kind())
        .bind(event.title())
        .bind(event.message())
        .bind(entity_type)
        .bind(entity_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    async fn deliver_webhook(&self, url: &str, envelope: &EventEnvelope) -> Result<(), String> {
        let body = serde_json::to_vec(envelope)
            .map_err(|e| format!("Failed to serialize event: {}", e))?;

        let mut request = self
            .http
            .post(url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .header("Content-Type", "application/json");

        if let Some(secret) = self.config.webhook_secret.as_deref() {
            let signature = sign_payload(secret, &body).map_err(|e| e.to_string())?;
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| format!("Failed to send webhook: {}", e))?;

        if response.status().is_success() {
            tracing::debug!(event_id = %envelope.event_id, "Webhook delivered");
            Ok(())
        } else {
            Err(format!("Webhook endpoint answered {}", response.status()))
        }
    }

    /// Notifications of one user, newest first
    pub async fn list_for_user(
        &self,
        user_id: i64,
        unread_only: bool,
        limit: i64,
    ) -> AppResult<Vec<InAppNotification>> {
        let notifications = sqlx::query_as::<_, InAppNotification>(
            r#"
            SELECT id, user_id, kind, title, message, entity_type, entity_id,
                   is_read, read_at, created_at
            FROM notifications
            WHERE user_id = $1 AND ($2 = false OR is_read = false)
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    /// Get unread notification count
    pub async fn unread_count(&self, user_id: i64) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    /// Mark notification as read
    pub async fn mark_read(&self, user_id: i64, notification_id: i64) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification".to_string()));
        }

        Ok(())
    }
}
