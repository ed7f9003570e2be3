use async_trait::async_trait;
use eventable_application::EventableStore;
use eventable_core::{AppError, AppResult};
use eventable_domain::{EventableId, EventableRecord, EventableType};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed subject store reading rows of one table as JSON objects.
///
/// Without a configured key type, ids are compared in their text form so any
/// key type works, but the key column is cast and its index goes unused. With
/// [`PostgresEventableStore::with_id_type`] the requested ids are cast to the
/// key type instead and lookups use the index. When a soft-delete column is
/// configured, rows where it is set are hidden from `find` and `find_many` but
/// still resolve for event history.
#[derive(Clone)]
pub struct PostgresEventableStore {
    pool: PgPool,
    eventable_type: EventableType,
    table: String,
    id_column: String,
    id_type: Option<String>,
    soft_delete_column: Option<String>,
}

#[derive(Debug, FromRow)]
struct SubjectRow {
    id: String,
    data: Value,
}

impl PostgresEventableStore {
    /// Creates a store for `eventable_type` backed by `table`, keyed by `id`.
    pub fn new(pool: PgPool, eventable_type: EventableType, table: &str) -> AppResult<Self> {
        Ok(Self {
            pool,
            eventable_type,
            table: quote_identifier(table)?,
            id_column: quote_identifier("id")?,
            id_type: None,
            soft_delete_column: None,
        })
    }

    /// Uses `column` instead of `id` as the subject key.
    pub fn with_id_column(mut self, column: &str) -> AppResult<Self> {
        self.id_column = quote_identifier(column)?;
        Ok(self)
    }

    /// Compares keys as `sql_type` (e.g. `BIGINT`, `UUID`). Requested ids
    /// that do not parse as that type fail the lookup.
    pub fn with_id_type(mut self, sql_type: &str) -> AppResult<Self> {
        self.id_type = Some(validate_type_name(sql_type)?);
        Ok(self)
    }

    /// Treats rows with a non-null `column` as soft-deleted.
    pub fn with_soft_delete_column(mut self, column: &str) -> AppResult<Self> {
        self.soft_delete_column = Some(quote_identifier(column)?);
        Ok(self)
    }

    fn select_sql(&self, include_soft_deleted: bool) -> String {
        subject_select_sql(
            self.table.as_str(),
            self.id_column.as_str(),
            self.id_type.as_deref(),
            self.soft_delete_column
                .as_deref()
                .filter(|_| !include_soft_deleted),
        )
    }

    async fn fetch(
        &self,
        ids: &[EventableId],
        include_soft_deleted: bool,
    ) -> AppResult<Vec<EventableRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = self.select_sql(include_soft_deleted);
        let id_values: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        let rows = sqlx::query_as::<_, SubjectRow>(sql.as_str())
            .bind(id_values)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to load {} eventables from {}: {error}",
                    self.eventable_type, self.table
                ))
            })?;

        rows.into_iter()
            .map(|row| {
                EventableRecord::new(
                    self.eventable_type.clone(),
                    EventableId::new(row.id)?,
                    row.data,
                )
            })
            .collect()
    }
}

#[async_trait]
impl EventableStore for PostgresEventableStore {
    async fn find(&self, id: &EventableId) -> AppResult<Option<EventableRecord>> {
        Ok(self.fetch(std::slice::from_ref(id), false).await?.pop())
    }

    async fn find_many(&self, ids: &[EventableId]) -> AppResult<Vec<EventableRecord>> {
        self.fetch(ids, false).await
    }

    async fn find_for_events(&self, id: &EventableId) -> AppResult<Option<EventableRecord>> {
        Ok(self.fetch(std::slice::from_ref(id), true).await?.pop())
    }

    async fn find_many_for_events(&self, ids: &[EventableId]) -> AppResult<Vec<EventableRecord>> {
        self.fetch(ids, true).await
    }
}

fn subject_select_sql(
    table: &str,
    id_column: &str,
    id_type: Option<&str>,
    soft_delete_column: Option<&str>,
) -> String {
    let key_filter = match id_type {
        Some(id_type) => format!("subject.{id_column} = ANY($1::{id_type}[])"),
        None => format!("subject.{id_column}::TEXT = ANY($1)"),
    };

    let mut sql = format!(
        "SELECT subject.{id_column}::TEXT AS id, to_jsonb(subject) AS data \
         FROM {table} AS subject \
         WHERE {key_filter}"
    );

    if let Some(column) = soft_delete_column {
        sql.push_str(&format!(" AND subject.{column} IS NULL"));
    }

    sql
}

/// Accepts a bare type name such as `BIGINT` or `uuid`.
fn validate_type_name(value: &str) -> AppResult<String> {
    let mut chars = value.chars();
    let valid = chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|next| next.is_ascii_alphanumeric() || next == '_');
    if !valid {
        return Err(AppError::Validation(format!(
            "key type '{value}' must be a plain SQL type name"
        )));
    }

    Ok(value.to_ascii_uppercase())
}

/// Validates a possibly schema-qualified SQL identifier and quotes each part.
fn quote_identifier(value: &str) -> AppResult<String> {
    let parts: Vec<&str> = value.split('.').collect();
    if parts.len() > 2 {
        return Err(AppError::Validation(format!(
            "identifier '{value}' has too many parts"
        )));
    }

    let mut quoted = Vec::with_capacity(parts.len());
    for part in parts {
        let mut chars = part.chars();
        let valid = chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
            && chars.all(|next| next.is_ascii_alphanumeric() || next == '_');
        if !valid {
            return Err(AppError::Validation(format!(
                "identifier '{value}' must contain only letters, digits and underscores"
            )));
        }
        quoted.push(format!("\"{part}\""));
    }

    Ok(quoted.join("."))
}
