use std::env;

use eventable_core::{AppError, AppResult};
use eventable_domain::EventableType;

/// One subject table registered with the eventable resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventableTableConfig {
    pub eventable_type: EventableType,
    pub table: String,
    pub soft_delete_column: Option<String>,
    pub id_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub eventable_tables: Vec<EventableTableConfig>,
}

impl AdminConfig {
    pub fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let max_connections = parse_env_u32("DATABASE_MAX_CONNECTIONS", 5)?;
        let eventable_tables =
            parse_eventable_tables(env::var("EVENTABLE_TABLES").unwrap_or_default().as_str())?;

        Ok(Self {
            database_url,
            max_connections,
            eventable_tables,
        })
    }
}

/// Parses `Type=table[:soft_delete_column][@key_type]` entries separated by commas.
pub fn parse_eventable_tables(value: &str) -> AppResult<Vec<EventableTableConfig>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (eventable_type, target) = entry.split_once('=').ok_or_else(|| {
                AppError::Validation(format!(
                    "EVENTABLE_TABLES entry '{entry}' must look like Type=table[:soft_delete_column][@key_type]"
                ))
            })?;
            let (target, id_type) = match target.split_once('@') {
                Some((target, id_type)) => (target, Some(id_type.trim().to_owned())),
                None => (target, None),
            };
            let (table, soft_delete_column) = match target.split_once(':') {
                Some((table, column)) => (table.trim(), Some(column.trim().to_owned())),
                None => (target.trim(), None),
            };
            if table.is_empty() {
                return Err(AppError::Validation(format!(
                    "EVENTABLE_TABLES entry '{entry}' is missing a table name"
                )));
            }

            Ok(EventableTableConfig {
                eventable_type: EventableType::new(eventable_type.trim())?,
                table: table.to_owned(),
                soft_delete_column: soft_delete_column.filter(|column| !column.is_empty()),
                id_type: id_type.filter(|id_type| !id_type.is_empty()),
            })
        })
        .collect()
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value
            .parse::<u32>()
            .ok()
            .filter(|parsed| *parsed > 0)
            .ok_or_else(|| AppError::Validation(format!("invalid {name} value '{value}'"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_eventable_tables;

    #[test]
    fn parses_tables_with_optional_soft_delete_column() {
        let parsed =
            parse_eventable_tables("Post=posts, Comment=blog.comments:deleted_at@bigint ,");
        assert!(parsed.is_ok());

        let parsed = parsed.unwrap_or_default();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].eventable_type.as_str(), "Post");
        assert_eq!(parsed[0].table, "posts");
        assert_eq!(parsed[0].soft_delete_column, None);
        assert_eq!(parsed[0].id_type, None);
        assert_eq!(parsed[1].table, "blog.comments");
        assert_eq!(parsed[1].soft_delete_column.as_deref(), Some("deleted_at"));
        assert_eq!(parsed[1].id_type.as_deref(), Some("bigint"));
    }

    #[test]
    fn empty_value_registers_nothing() {
        assert_eq!(parse_eventable_tables("").unwrap_or_default().len(), 0);
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert!(parse_eventable_tables("posts").is_err());
        assert!(parse_eventable_tables("Post=").is_err());
        assert!(parse_eventable_tables("=posts").is_err());
    }
}
