mod common;

use architect_actions::actions::{self, ActionOutput, CreateOptions, UpdateOptions};
use architect_actions::attributes::Arguments;
use architect_actions::query::Direction;
use architect_actions::{AppError, AttributeSource, AttributeSpec, LoadOptions, OnConflict, Operator, Predicate, TimestampKind};
use common::Fixture;
use serde_json::{json, Value};

fn record(output: ActionOutput) -> Value {
    match output {
        ActionOutput::Record(v) => v,
        other => panic!("expected a record, got {:?}", other),
    }
}

fn collection(output: ActionOutput) -> Vec<Value> {
    match output {
        ActionOutput::Collection(rows) => rows,
        other => panic!("expected a collection, got {:?}", other),
    }
}

fn ids(rows: &[Value]) -> Vec<&str> {
    rows.iter().filter_map(|r| r["thing_id"].as_str()).collect()
}

#[tokio::test]
async fn create_takes_only_declared_payload_fields() {
    let fx = Fixture::new();
    let create = actions::create(
        fx.users.clone(),
        CreateOptions::new(
            AttributeSpec::new()
                .field("user_id", AttributeSource::GeneratedId)
                .field("name", AttributeSource::Payload),
        ),
    );
    let ctx = fx.ctx(&[], Some(json!({ "name": "Ann", "extra": "ignored", "admin": true })));
    let row = record(create.run(&ctx).await.unwrap());

    let id = row["user_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
    assert_eq!(row["name"], "Ann");
    assert_eq!(row["admin"], false, "admin keeps its column default");
    assert!(row.get("extra").is_none());
    assert_eq!(fx.store.rows(&fx.users).len(), 1);
}

#[tokio::test]
async fn booleans_are_written_as_one_or_zero() {
    let fx = Fixture::new();
    let create = actions::create(
        fx.users.clone(),
        CreateOptions::new(AttributeSpec::payload(["user_id", "name", "admin"])),
    );
    let ctx = fx.ctx(
        &[],
        Some(json!({ "user_id": "6f1c1c3e-0d5c-4f57-9d8e-2b0f3f6c9a11", "name": "Bo", "admin": true })),
    );
    let row = record(create.run(&ctx).await.unwrap());
    assert_eq!(row["admin"], true);
    assert_eq!(fx.store.rows(&fx.users)[0]["admin"], "1", "stored encoded");

    let update = actions::update(fx.users.clone(), UpdateOptions::new(AttributeSpec::payload(["admin"])));
    let ctx = fx.ctx(
        &[("user_id", "6f1c1c3e-0d5c-4f57-9d8e-2b0f3f6c9a11")],
        Some(json!({ "admin": false })),
    );
    let row = record(update.run(&ctx).await.unwrap());
    assert_eq!(row["admin"], false);
}

#[tokio::test]
async fn create_with_timestamps_and_arguments() {
    let fx = Fixture::new();
    let create = actions::create(
        fx.users.clone(),
        CreateOptions::new(
            AttributeSpec::payload(["name"])
                .field("user_id", AttributeSource::GeneratedId)
                .field("invited_by", AttributeSource::Argument)
                .field("created_at", AttributeSource::Timestamp(TimestampKind::Insert))
                .field("updated_at", AttributeSource::Timestamp(TimestampKind::Update)),
        ),
    );
    let ctx = fx.ctx(&[], Some(json!({ "name": "Cy" })));

    let err = create.run(&ctx).await.unwrap_err();
    assert!(matches!(err, AppError::MissingArgument(_)));
    assert!(fx.store.rows(&fx.users).is_empty());

    let mut args = Arguments::new();
    args.insert("invited_by".into(), json!("admin-1"));
    let row = record(create.run_with(&ctx, Some(&args)).await.unwrap());
    assert_eq!(row["invited_by"], "admin-1");
    let created = row["created_at"].as_str().unwrap();
    assert!(created.ends_with('Z'));
    assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok());
}

#[tokio::test]
async fn create_never_raises_not_found() {
    let fx = Fixture::new().with_things();
    let create = actions::create(
        fx.things.clone(),
        CreateOptions::new(AttributeSpec::payload(["thing_id", "user_id", "title"]))
            .on_conflict(OnConflict::on_primary_key().ignore()),
    );
    let ctx = fx.ctx(&[], Some(json!({ "thing_id": "t1", "user_id": "u9", "title": "dup" })));
    assert_eq!(create.run(&ctx).await.unwrap(), ActionOutput::Record(Value::Null));
    assert_eq!(fx.store.rows(&fx.things).len(), 4);

    let merge = actions::create(
        fx.things.clone(),
        CreateOptions::new(AttributeSpec::payload(["thing_id", "user_id", "title"]))
            .on_conflict(OnConflict::on_primary_key().merge_fields(["title"])),
    );
    let row = record(merge.run(&ctx).await.unwrap());
    assert_eq!(row["title"], "dup");
    assert_eq!(row["user_id"], "u1");
}

#[tokio::test]
async fn route_scopes_can_be_restricted() {
    let fx = Fixture::new().with_things();
    let ctx = fx.ctx(&[("user_id", "u1"), ("thing_id", "t1")], None);

    let scoped = actions::list(fx.things.clone(), LoadOptions::new().scopes(["user_id"]));
    let rows = collection(scoped.run(&ctx).await.unwrap());
    assert_eq!(ids(&rows), vec!["t1", "t2", "t3"]);

    let all_params = actions::list(fx.things.clone(), LoadOptions::new());
    let rows = collection(all_params.run(&ctx).await.unwrap());
    assert_eq!(ids(&rows), vec!["t1"]);
}

#[tokio::test]
async fn list_applies_where_then_query_hook() {
    let fx = Fixture::new().with_things();
    let ctx = fx.ctx(&[("user_id", "u1")], None);
    let list = actions::list(
        fx.things.clone(),
        LoadOptions::new()
            .filter(vec![Predicate::eq("active", true)])
            .query(|_ctx, q| async move { Ok(q.order_by("rank", Direction::Asc).limit(5)) }),
    );
    let rows = collection(list.run(&ctx).await.unwrap());
    assert_eq!(ids(&rows), vec!["t2", "t1"]);

    let dynamic = actions::list(
        fx.things.clone(),
        LoadOptions::new().scopes(Vec::<String>::new()).filter_with(|ctx| async move {
            let owner = ctx.route_param("user_id").unwrap_or_default().to_string();
            Ok(vec![Predicate::new("user_id", Operator::Ne, owner)])
        }),
    );
    let rows = collection(dynamic.run(&ctx).await.unwrap());
    assert_eq!(ids(&rows), vec!["t4"]);
}

#[tokio::test]
async fn fetch_prefers_the_cached_record() {
    let fx = Fixture::new().with_things();
    let fetch = actions::fetch(fx.things.clone(), LoadOptions::new());

    let direct_ctx = fx.ctx(&[("thing_id", "t2")], None);
    let direct = record(fetch.run(&direct_ctx).await.unwrap());
    assert_eq!(direct["title"], "second");

    let load = actions::load(fx.things.clone(), LoadOptions::new());
    let cached_ctx = fx.ctx(&[("thing_id", "t2")], None);
    let loaded = record(load.run(&cached_ctx).await.unwrap());
    assert_eq!(cached_ctx.get("thing"), Some(loaded.clone()));
    assert_eq!(record(fetch.run(&cached_ctx).await.unwrap()), direct);

    let stale_ctx = fx.ctx(&[("thing_id", "t2")], None);
    stale_ctx.set("thing", json!({ "thing_id": "cached" }));
    assert_eq!(record(fetch.run(&stale_ctx).await.unwrap()), json!({ "thing_id": "cached" }));
}

#[tokio::test]
async fn fetch_uses_the_as_name_and_raises_not_found() {
    let fx = Fixture::new().with_things();
    let fetch = actions::fetch(fx.things.clone(), LoadOptions::new().as_name("item"));
    let ctx = fx.ctx(&[("thing_id", "missing")], None);
    assert!(matches!(fetch.run(&ctx).await, Err(AppError::NotFound(_))));

    ctx.set("item", json!({ "thing_id": "from-context" }));
    assert_eq!(record(fetch.run(&ctx).await.unwrap())["thing_id"], "from-context");
}

#[tokio::test]
async fn update_on_no_matching_rows_is_not_found() {
    let fx = Fixture::new().with_things();
    let update = actions::update(
        fx.things.clone(),
        UpdateOptions::new(AttributeSpec::payload(["title"]))
            .load(LoadOptions::new().filter(vec![Predicate::eq("active", true)])),
    );
    let ctx = fx.ctx(&[("thing_id", "t3")], Some(json!({ "title": "renamed" })));
    assert!(matches!(update.run(&ctx).await, Err(AppError::NotFound(_))));
    let t3 = fx.store.rows(&fx.things).into_iter().find(|r| r["thing_id"] == "t3").unwrap();
    assert_eq!(t3["title"], "third");

    let ctx = fx.ctx(&[("thing_id", "t1")], Some(json!({ "title": "renamed" })));
    let row = record(update.run(&ctx).await.unwrap());
    assert_eq!(row["title"], "renamed");
    assert_eq!(row["rank"], 2);
}

#[tokio::test]
async fn invalid_update_payload_writes_nothing() {
    let fx = Fixture::new().with_things();
    let update = actions::update(fx.things.clone(), UpdateOptions::new(AttributeSpec::payload(["title", "rank"])));
    let ctx = fx.ctx(&[("thing_id", "t1")], Some(json!({ "title": 5, "rank": "high" })));
    match update.run(&ctx).await {
        Err(AppError::Validation(fields)) => {
            let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, vec!["title", "rank"]);
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    let t1 = fx.store.rows(&fx.things).into_iter().find(|r| r["thing_id"] == "t1").unwrap();
    assert_eq!(t1["title"], "first");
}

#[tokio::test]
async fn delete_removes_the_scoped_row_once() {
    let fx = Fixture::new().with_things();
    let delete = actions::delete(fx.things.clone(), LoadOptions::new());
    let ctx = fx.ctx(&[("user_id", "u1"), ("thing_id", "t2")], None);
    assert_eq!(delete.run(&ctx).await.unwrap(), ActionOutput::Empty);
    assert_eq!(fx.store.rows(&fx.things).len(), 3);

    let again = fx.ctx(&[("user_id", "u1"), ("thing_id", "t2")], None);
    assert!(matches!(delete.run(&again).await, Err(AppError::NotFound(_))));

    let other_owner = fx.ctx(&[("user_id", "u2"), ("thing_id", "t1")], None);
    assert!(matches!(delete.run(&other_owner).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn delete_with_cached_record_but_no_row_is_not_found() {
    let fx = Fixture::new().with_things();
    let delete = actions::delete(fx.things.clone(), LoadOptions::new());
    let ctx = fx.ctx(&[("thing_id", "gone")], None);
    ctx.set("thing", json!({ "thing_id": "gone" }));
    assert!(matches!(delete.run(&ctx).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn hook_errors_reach_the_caller_unchanged() {
    let fx = Fixture::new().with_things();
    let list = actions::list(
        fx.things.clone(),
        LoadOptions::new().query(|_ctx, _q| async { Err(AppError::Unauthorized("no token".into())) }),
    );
    let err = list.run(&fx.ctx(&[], None)).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(m) if m == "no token"));
}

#[tokio::test]
async fn malformed_member_id_is_not_found() {
    let fx = Fixture::new();
    fx.store
        .seed(&fx.users, [json!({ "user_id": "6f1c1c3e-0d5c-4f57-9d8e-2b0f3f6c9a11", "name": "Ann" })])
        .unwrap();
    let ctx = || fx.ctx(&[("user_id", "not-a-uuid")], Some(json!({ "name": "Bea" })));

    let fetch = actions::fetch(fx.users.clone(), LoadOptions::new());
    assert!(matches!(fetch.run(&ctx()).await, Err(AppError::NotFound(_))));

    let update = actions::update(fx.users.clone(), UpdateOptions::new(AttributeSpec::payload(["name"])));
    assert!(matches!(update.run(&ctx()).await, Err(AppError::NotFound(_))));

    let delete = actions::delete(fx.users.clone(), LoadOptions::new());
    assert!(matches!(delete.run(&ctx()).await, Err(AppError::NotFound(_))));
    assert_eq!(fx.store.rows(&fx.users)[0]["name"], "Ann");
}

#[tokio::test]
async fn malformed_route_param_attribute_is_a_validation_error() {
    let fx = Fixture::new();
    let create = actions::create(
        fx.users.clone(),
        CreateOptions::new(AttributeSpec::payload(["name"]).field("user_id", AttributeSource::RouteParam)),
    );
    let ctx = fx.ctx(&[("user_id", "not-a-uuid")], Some(json!({ "name": "Cy" })));
    match create.run(&ctx).await {
        Err(AppError::Validation(fields)) => {
            assert_eq!(fields.len(), 1);
            assert_eq!(fields[0].field, "user_id");
            assert_eq!(fields[0].message, "must be a valid UUID");
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(fx.store.rows(&fx.users).is_empty());
}
