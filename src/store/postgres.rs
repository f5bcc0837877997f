use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::NotificationStore;
use crate::models::notification::Notification;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const NOTIFICATION_COLUMNS: &str = "id, owner, user_id, username, user_pic, user_bio, action, \
     resource_type, resource_id, excerpt, action_key, read_status, created_at";

#[async_trait]
impl NotificationStore for PgStore {
    async fn find_by_recipient_and_key(
        &self,
        recipient: &str,
        action_key: &str,
    ) -> anyhow::Result<Option<Notification>> {
        // served by idx_notifications_owner_created; action_key is a filter on that partition
        let row = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE owner = $1 AND action_key = $2 LIMIT 1"
        ))
        .bind(recipient)
        .bind(action_key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Notification::try_from).transpose()
    }

    async fn insert(&self, n: &Notification) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO notifications (id, owner, user_id, username, user_pic, user_bio, action, resource_type, resource_id, excerpt, action_key, read_status, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)"#,
        )
        .bind(n.id)
        .bind(&n.owner)
        .bind(&n.user_id)
        .bind(&n.username)
        .bind(&n.user_pic)
        .bind(&n.user_bio)
        .bind(n.action)
        .bind(n.resource_type.as_str())
        .bind(&n.resource_id)
        .bind(&n.excerpt)
        .bind(&n.action_key)
        .bind(n.read_status)
        .bind(n.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_recipient(
        &self,
        recipient: &str,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE owner = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(recipient)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_read(&self, recipient: &str, action_key: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"UPDATE notifications SET read_status = true WHERE owner = $1 AND action_key = $2"#,
        )
        .bind(recipient)
        .bind(action_key)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_unread(&self, recipient: &str) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM notifications WHERE owner = $1 AND read_status = false"#,
        )
        .bind(recipient)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

// -- Row types --

#[derive(Debug, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub owner: String,
    pub user_id: String,
    pub username: String,
    pub user_pic: String,
    pub user_bio: String,
    pub action: i32,
    pub resource_type: String,
    pub resource_id: String,
    pub excerpt: Option<String>,
    pub action_key: String,
    pub read_status: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let resource_type = row.resource_type.parse().map_err(|e| {
            anyhow::anyhow!("notification {} has bad resource_type: {}", row.id, e)
        })?;

        Ok(Notification {
            id: row.id,
            owner: row.owner,
            user_id: row.user_id,
            username: row.username,
            user_pic: row.user_pic,
            user_bio: row.user_bio,
            action: row.action,
            resource_type,
            resource_id: row.resource_id,
            excerpt: row.excerpt,
            action_key: row.action_key,
            read_status: row.read_status,
            created_at: row.created_at,
        })
    }
}
