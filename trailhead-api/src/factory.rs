/// Generic CRUD handlers
///
/// Every resource exposes the same five operations, written once against the
/// [`Entity`] trait and instantiated per route (`get_one::<Tour>`). Entity
/// specifics come from the trait: the repository, the list columns, the
/// parent scope of nested routes, the relations populated on single reads,
/// and the `after_write` side effect.
///
/// # Response envelope
///
/// ```json
/// { "status": "success", "results": 2, "data": { "data": [ ... ] } }
/// ```
///
/// `results` appears on lists only.

use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use trailhead_shared::models::user::User;
use trailhead_shared::models::{Entity, Populate, WriteContext};
use trailhead_shared::query::{ApiFeatures, ListQuery};
use trailhead_shared::store::Stores;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{JsonBody, MaybeUser, ValidatedJson},
};

/// Internal bookkeeping field never shown to clients
const VERSION_FIELD: &str = "version";

type PathParams = HashMap<String, String>;

/// `{status, data: {data}}`
pub fn envelope(data: Value) -> Value {
    json!({
        "status": "success",
        "data": { "data": data },
    })
}

/// `{status, results, data: {data}}`
pub fn list_envelope(records: Vec<Value>) -> Value {
    json!({
        "status": "success",
        "results": records.len(),
        "data": { "data": records },
    })
}

/// Serializes a record for output, without its version counter
pub fn public_value<T: Serialize>(record: &T) -> ApiResult<Value> {
    let mut value = serde_json::to_value(record)
        .map_err(|e| ApiError::InternalError(format!("Failed to encode record: {}", e)))?;

    match &mut value {
        Value::Object(map) => {
            map.remove(VERSION_FIELD);
        }
        Value::Array(items) => {
            for item in items {
                if let Value::Object(map) = item {
                    map.remove(VERSION_FIELD);
                }
            }
        }
        _ => {}
    }

    Ok(value)
}

/// Parses a path id, rejecting malformed values with a 400
pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid id: {}.", raw)))
}

fn record_id(params: &PathParams) -> ApiResult<Uuid> {
    let raw = params
        .get("id")
        .ok_or_else(|| ApiError::BadRequest("Missing id in path".to_string()))?;
    parse_id(raw)
}

/// Parent id of a nested route, if the entity has one and the route carries it
fn parent_id<E: Entity>(params: Option<&PathParams>) -> ApiResult<Option<Uuid>> {
    let Some(scope) = E::PARENT else {
        return Ok(None);
    };

    params
        .and_then(|p| p.get(scope.param))
        .map(|raw| parse_id(raw))
        .transpose()
}

pub async fn create_one<E: Entity>(
    State(state): State<AppState>,
    params: Option<Path<PathParams>>,
    MaybeUser(user): MaybeUser,
    JsonBody(mut input): JsonBody<E::Create>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let ctx = WriteContext {
        parent_id: parent_id::<E>(params.as_ref().map(|p| &p.0))?,
        user_id: user.map(|u| u.id),
    };
    E::apply_context(&mut input, &ctx);
    input.validate()?;

    let record = E::repository(&state.stores).create(input).await?;
    record.after_write(&state.stores).await?;

    tracing::info!(entity = E::NAME, id = %record.id(), "Record created");

    Ok((StatusCode::CREATED, Json(envelope(public_value(&record)?))))
}

pub async fn get_one<E: Entity>(
    State(state): State<AppState>,
    Path(params): Path<PathParams>,
) -> ApiResult<Json<Value>> {
    let id = record_id(&params)?;
    let record = E::repository(&state.stores)
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found(E::NAME))?;

    let mut value = public_value(&record)?;
    populate(&state.stores, E::POPULATE, id, &mut value).await?;

    Ok(Json(envelope(value)))
}

pub async fn get_all<E: Entity>(
    State(state): State<AppState>,
    params: Option<Path<PathParams>>,
    Query(query): Query<BTreeMap<String, String>>,
) -> ApiResult<Json<Value>> {
    let base = match (E::PARENT, parent_id::<E>(params.as_ref().map(|p| &p.0))?) {
        (Some(scope), Some(parent)) => ListQuery::scoped(scope.field, parent.to_string()),
        _ => ListQuery::default(),
    };

    list_records::<E>(&state, base, query).await.map(Json)
}

/// Runs the full modifier chain over `base` and renders the list envelope
pub async fn list_records<E: Entity>(
    state: &AppState,
    base: ListQuery,
    params: BTreeMap<String, String>,
) -> ApiResult<Value> {
    let query = ApiFeatures::new(base, params)
        .filter()
        .sort()
        .limit_fields()
        .paginate()
        .into_query();
    query.validate(E::COLUMNS)?;

    let records = E::repository(&state.stores).list(&query).await?;

    let mut data = Vec::with_capacity(records.len());
    for record in &records {
        let mut value = serde_json::to_value(record)
            .map_err(|e| ApiError::InternalError(format!("Failed to encode record: {}", e)))?;
        query.projection.apply(&mut value);
        data.push(value);
    }

    Ok(list_envelope(data))
}

pub async fn update_one<E: Entity>(
    State(state): State<AppState>,
    Path(params): Path<PathParams>,
    ValidatedJson(patch): ValidatedJson<E::Patch>,
) -> ApiResult<Json<Value>> {
    let id = record_id(&params)?;
    let record = E::repository(&state.stores)
        .update(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found(E::NAME))?;
    record.after_write(&state.stores).await?;

    tracing::info!(entity = E::NAME, %id, "Record updated");

    Ok(Json(envelope(public_value(&record)?)))
}

pub async fn delete_one<E: Entity>(
    State(state): State<AppState>,
    Path(params): Path<PathParams>,
) -> ApiResult<StatusCode> {
    let id = record_id(&params)?;
    let removed = E::repository(&state.stores)
        .delete(id)
        .await?
        .ok_or_else(|| ApiError::not_found(E::NAME))?;
    removed.after_write(&state.stores).await?;

    tracing::info!(entity = E::NAME, %id, "Record deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Attaches related records to a serialized single record
pub(crate) async fn populate(
    stores: &Stores,
    relations: &[Populate],
    id: Uuid,
    value: &mut Value,
) -> ApiResult<()> {
    for relation in relations {
        match relation {
            Populate::Reviews => {
                let reviews = stores.reviews.list_for_tour(id).await?;
                value["reviews"] = public_value(&reviews)?;
            }
            Populate::Guides => {
                let ids: Vec<Uuid> = value
                    .get("guides")
                    .and_then(Value::as_array)
                    .map(|guides| {
                        guides
                            .iter()
                            .filter_map(|g| g.as_str()?.parse().ok())
                            .collect()
                    })
                    .unwrap_or_default();

                let guides = stores.users.find_many(&ids).await?;
                value["guides"] = Value::Array(guides.iter().map(User::public_profile).collect());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelopes() {
        let single = envelope(json!({"name": "The Sea Explorer"}));
        assert_eq!(single["status"], "success");
        assert_eq!(single["data"]["data"]["name"], "The Sea Explorer");

        let list = list_envelope(vec![json!({}), json!({})]);
        assert_eq!(list["results"], 2);
        assert_eq!(list["data"]["data"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_public_value_strips_version() {
        let value = public_value(&json!({"id": "a", "version": 3})).unwrap();
        assert_eq!(value, json!({"id": "a"}));

        let value = public_value(&json!([{"version": 1, "rating": 4}])).unwrap();
        assert_eq!(value, json!([{"rating": 4}]));
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        assert!(parse_id("5c88fa8cf4afda39709c2955").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
    }
}
