//! Eventable administrative command line.

#![forbid(unsafe_code)]

mod admin_command;
mod admin_config;

use std::env;
use std::sync::Arc;

use eventable_application::{
    EventQuery, EventService, EventableRegistry, EventableResolver, Resolution, ResolvedEvent,
};
use eventable_core::{AppError, AppResult};
use eventable_domain::EventId;
use eventable_infrastructure::{PostgresEventRepository, PostgresEventableStore};

use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::admin_command::AdminCommand;
use crate::admin_config::AdminConfig;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = AdminCommand::parse(&args)?;
    let config = AdminConfig::load()?;
    let pool = connect_pool(&config).await?;

    if command == AdminCommand::Migrate {
        sqlx::migrate!("../../crates/infrastructure/migrations")
            .run(&pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;
        info!("event migrations applied");
        return Ok(());
    }

    let event_service = build_event_service(pool, &config)?;

    match command {
        AdminCommand::Migrate => Ok(()),
        AdminCommand::List {
            scope,
            limit,
            offset,
        } => {
            let resolved = event_service
                .list_events_with_eventables(EventQuery {
                    limit,
                    offset,
                    scope,
                })
                .await?;
            for resolved_event in &resolved {
                print_line(&resolved_event_json(resolved_event))?;
            }
            Ok(())
        }
        AdminCommand::Show(event_id) => {
            let resolved = event_service
                .find_event_with_eventable(event_id)
                .await?
                .ok_or_else(|| missing_event(event_id))?;
            print_line(&resolved_event_json(&resolved))
        }
        AdminCommand::Delete(event_id) => {
            let deleted = event_service.delete_event(event_id).await?;
            print_line(&json!({ "deleted_event_id": event_id, "deleted_count": deleted }))
        }
    }
}

async fn connect_pool(config: &AdminConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

fn build_event_service(pool: PgPool, config: &AdminConfig) -> AppResult<EventService> {
    let mut registry = EventableRegistry::new();
    for table in &config.eventable_tables {
        let mut store =
            PostgresEventableStore::new(pool.clone(), table.eventable_type.clone(), &table.table)?;
        if let Some(column) = table.soft_delete_column.as_deref() {
            store = store.with_soft_delete_column(column)?;
        }
        if let Some(id_type) = table.id_type.as_deref() {
            store = store.with_id_type(id_type)?;
        }
        registry.register(table.eventable_type.clone(), Arc::new(store))?;
    }

    info!(
        eventable_types = ?registry.registered_types(),
        "eventable stores registered"
    );

    let resolver = EventableResolver::new(Arc::new(registry));
    let repository = Arc::new(PostgresEventRepository::new(pool));
    Ok(EventService::new(repository, resolver))
}

fn resolved_event_json(resolved: &ResolvedEvent) -> Value {
    let eventable = match &resolved.eventable {
        Resolution::Live(record) => json!({ "state": "live", "record": record.as_ref() }),
        Resolution::Reconstructed(record) => json!({ "state": "reconstructed", "record": record }),
        Resolution::Unresolved => json!({ "state": "unresolved" }),
    };

    json!({ "event": resolved.event, "eventable": eventable })
}

fn print_line(value: &Value) -> AppResult<()> {
    let line = serde_json::to_string(value)
        .map_err(|error| AppError::Internal(format!("failed to encode output: {error}")))?;
    println!("{line}");
    Ok(())
}

fn missing_event(event_id: EventId) -> AppError {
    AppError::NotFound(format!("event '{event_id}' does not exist"))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
