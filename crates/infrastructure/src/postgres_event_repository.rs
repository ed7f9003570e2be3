use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eventable_application::{EventQuery, EventRepository, EventScope};
use eventable_core::{AppError, AppResult};
use eventable_domain::{AttributeSnapshot, Event, EventId, EventInput, UserId};
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres};
use tracing::debug;
use uuid::Uuid;

/// PostgreSQL-backed event log.
#[derive(Clone)]
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct EventRow {
    id: Uuid,
    action: String,
    eventable_type: String,
    eventable_id: Option<String>,
    eventable_attributes: Option<Value>,
    user_id: Uuid,
    batch_parent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

fn event_from_row(row: EventRow) -> AppResult<Event> {
    let event_id = row.id;
    let eventable_attributes = row
        .eventable_attributes
        .map(AttributeSnapshot::decode)
        .transpose()
        .map_err(|error| {
            AppError::Internal(format!(
                "stored event '{event_id}' has unreadable eventable attributes: {error}"
            ))
        })?;

    Event::restore(
        EventId::from_uuid(row.id),
        row.created_at,
        EventInput {
            action: row.action,
            eventable_type: row.eventable_type,
            eventable_id: row.eventable_id,
            eventable_attributes,
            user_id: Some(UserId::from_uuid(row.user_id)),
            batch_parent_id: row.batch_parent_id.map(EventId::from_uuid),
        },
    )
    .map_err(|error| {
        AppError::Internal(format!("stored event '{event_id}' is invalid: {error}"))
    })
}

async fn insert_event<'c, E>(executor: E, event: &Event) -> AppResult<()>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO events (
            id,
            action,
            eventable_type,
            eventable_id,
            eventable_attributes,
            user_id,
            batch_parent_id,
            created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(event.id().as_uuid())
    .bind(event.action().as_str())
    .bind(event.eventable_type().as_str())
    .bind(event.eventable_id().map(|id| id.as_str()))
    .bind(event.eventable_attributes().map(AttributeSnapshot::encode))
    .bind(event.user_id().as_uuid())
    .bind(event.batch_parent_id().map(|id| id.as_uuid()))
    .bind(event.created_at())
    .execute(executor)
    .await
    .map_err(|error| map_append_error(error, event))?;

    Ok(())
}

fn map_append_error(error: sqlx::Error, event: &Event) -> AppError {
    if let sqlx::Error::Database(database_error) = &error {
        match database_error.code().as_deref() {
            Some("23505") => {
                return AppError::Conflict(format!("event '{}' already exists", event.id()));
            }
            Some("23503") => {
                let parent_id = event
                    .batch_parent_id()
                    .map_or_else(|| "unknown".to_owned(), |parent_id| parent_id.to_string());
                return AppError::Validation(format!(
                    "batch parent event '{parent_id}' does not exist"
                ));
            }
            _ => {}
        }
    }

    AppError::Internal(format!("failed to append event '{}': {error}", event.id()))
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn append_event(&self, event: Event) -> AppResult<()> {
        insert_event(&self.pool, &event).await
    }

    async fn append_events(&self, events: Vec<Event>) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start event append transaction: {error}"))
        })?;

        for event in &events {
            insert_event(&mut *transaction, event).await?;
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit event append transaction: {error}"))
        })?;

        Ok(())
    }

    async fn find_event(&self, event_id: EventId) -> AppResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT
                id,
                action,
                eventable_type,
                eventable_id,
                eventable_attributes,
                user_id,
                batch_parent_id,
                created_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(event_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to find event '{event_id}': {error}"))
        })?;

        row.map(event_from_row).transpose()
    }

    async fn list_events(&self, query: EventQuery) -> AppResult<Vec<Event>> {
        let capped_limit = i64::try_from(query.capped_limit()).unwrap_or(i64::MAX);
        let offset = i64::try_from(query.offset).unwrap_or(i64::MAX);
        let (batched_only, batch_parent_id, user_id) = match query.scope {
            EventScope::All => (false, None, None),
            EventScope::Batched => (true, None, None),
            EventScope::ByBatch(parent_id) => (false, Some(parent_id.as_uuid()), None),
            EventScope::ByUser(user_id) => (false, None, Some(user_id.as_uuid())),
        };

        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT
                id,
                action,
                eventable_type,
                eventable_id,
                eventable_attributes,
                user_id,
                batch_parent_id,
                created_at
            FROM events
            WHERE ($1 = FALSE OR batch_parent_id IS NULL)
                AND ($2::UUID IS NULL OR batch_parent_id = $2)
                AND ($3::UUID IS NULL OR user_id = $3)
            ORDER BY seq ASC
            LIMIT $4
            OFFSET $5
            "#,
        )
        .bind(batched_only)
        .bind(batch_parent_id)
        .bind(user_id)
        .bind(capped_limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list events: {error}")))?;

        rows.into_iter().map(event_from_row).collect()
    }

    async fn delete_event(&self, event_id: EventId) -> AppResult<u64> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to start delete transaction for event '{event_id}': {error}"
            ))
        })?;

        let deleted = sqlx::query(
            r#"
            WITH RECURSIVE batch_tree AS (
                SELECT id FROM events WHERE id = $1
                UNION ALL
                SELECT child.id
                FROM events child
                INNER JOIN batch_tree ON child.batch_parent_id = batch_tree.id
            )
            DELETE FROM events
            WHERE id IN (SELECT id FROM batch_tree)
            "#,
        )
        .bind(event_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to delete event '{event_id}': {error}"))
        })?
        .rows_affected();

        if deleted == 0 {
            return Err(AppError::NotFound(format!("event '{event_id}' does not exist")));
        }

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!(
                "failed to commit delete transaction for event '{event_id}': {error}"
            ))
        })?;

        debug!(event_id = %event_id, deleted, "deleted event batch tree");
        Ok(deleted)
    }
}
