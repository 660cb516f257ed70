//! Example consumer: users and their nested things served over PostgreSQL.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Reads `MODELS_PATH` (default `models`) for `models.json`; tables must already exist.

use architect_actions::actions::{self, CreateOptions, UpdateOptions};
use architect_actions::{
    app, load_from_dir, resolve, AttributeSource, AttributeSpec, AxumAdapter, LoadOptions, PgEngine, Predicate,
    Resource, Settings, ShapeOptions, TimestampKind,
};
use axum::http::StatusCode;
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("architect_actions=info,example_consumer=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let registry = resolve(&load_from_dir(&settings.models_path).await?)?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await?;
    let adapter = AxumAdapter::new(Arc::new(PgEngine::new(pool)));

    let users = registry.require("users")?;
    let things = registry.require("things")?;

    let users_resource = Resource::new("/users", "user_id")
        .list(actions::list(users.clone(), LoadOptions::new()))
        .create(
            actions::create(
                users.clone(),
                CreateOptions::new(
                    AttributeSpec::payload(["email", "name", "admin"])
                        .field("user_id", AttributeSource::GeneratedId)
                        .field("created_at", AttributeSource::Timestamp(TimestampKind::Insert))
                        .field("updated_at", AttributeSource::Timestamp(TimestampKind::Update)),
                ),
            )
            .shaped(ShapeOptions::new().status(StatusCode::CREATED)),
        )
        .fetch(actions::fetch(users.clone(), LoadOptions::new()))
        .update(actions::update(
            users.clone(),
            UpdateOptions::new(
                AttributeSpec::payload(["name", "admin"])
                    .field("updated_at", AttributeSource::Timestamp(TimestampKind::Update)),
            ),
        ))
        .delete(
            actions::delete(users, LoadOptions::new())
                .shaped(ShapeOptions::new().status(StatusCode::NO_CONTENT)),
        );

    let things_resource = Resource::new("/users/:user_id/things", "thing_id")
        .list(
            actions::list(
                things.clone(),
                LoadOptions::new()
                    .scopes(["user_id"])
                    .filter(vec![Predicate::eq("active", true)]),
            )
            .shaped(ShapeOptions::new().omit(["user_id"])),
        )
        .create(
            actions::create(
                things.clone(),
                CreateOptions::new(
                    AttributeSpec::new()
                        .field("thing_id", AttributeSource::GeneratedId)
                        .field("user_id", AttributeSource::RouteParam)
                        .field("title", AttributeSource::Payload)
                        .field("active", AttributeSource::Default)
                        .field("created_at", AttributeSource::Timestamp(TimestampKind::Insert))
                        .field("updated_at", AttributeSource::Timestamp(TimestampKind::Update)),
                ),
            )
            .shaped(ShapeOptions::new().status(StatusCode::CREATED)),
        )
        .fetch(actions::fetch(things.clone(), LoadOptions::new()))
        .update(actions::update(
            things.clone(),
            UpdateOptions::new(
                AttributeSpec::payload(["title", "active"])
                    .field("updated_at", AttributeSource::Timestamp(TimestampKind::Update)),
            ),
        ))
        .delete(
            actions::delete(things, LoadOptions::new())
                .shaped(ShapeOptions::new().status(StatusCode::NO_CONTENT)),
        );

    let router = app([users_resource, things_resource], adapter, settings.body_limit);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, models = registry.models.len(), "example consumer listening");
    axum::serve(listener, router).await?;
    Ok(())
}
