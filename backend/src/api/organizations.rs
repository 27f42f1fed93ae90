use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::WithRejection;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    auth::Identity,
    error::{AppError, Result},
    models::organization::{
        from_rows, CreateOrganizationRequest, Organization, UpdateOrganizationRequest, TABLE,
    },
    store::{DynStore, Query, Row, StoreError},
};

const FETCH_ALL_FAILED: &str = "Failed to fetch organizations";
const CREATE_FAILED: &str = "Failed to create organization";
const FETCH_FAILED: &str = "Failed to fetch organization";
const UPDATE_FAILED: &str = "Failed to update organization";
const DELETE_FAILED: &str = "Failed to delete organization";
const SEARCH_FAILED: &str = "Failed to search organizations";

fn not_found() -> AppError {
    AppError::NotFound("Organization not found".into())
}

/// Maps the first row, if any.
fn first(rows: Vec<Row>) -> std::result::Result<Option<Organization>, StoreError> {
    rows.into_iter().next().map(Organization::try_from).transpose()
}

pub async fn list(
    State(store): State<DynStore>,
    identity: Identity,
) -> Result<Json<Vec<Organization>>> {
    let rows = store
        .execute(
            Query::select(TABLE)
                .eq("user_id", identity.user_id)
                .order("created_at", true),
        )
        .await
        .map_err(AppError::store(FETCH_ALL_FAILED))?;

    let orgs = from_rows(rows).map_err(AppError::store(FETCH_ALL_FAILED))?;
    Ok(Json(orgs))
}

pub async fn create(
    State(store): State<DynStore>,
    identity: Identity,
    WithRejection(Json(req), _): WithRejection<Json<CreateOrganizationRequest>, AppError>,
) -> Result<Json<Organization>> {
    req.validate()?;

    let rows = store
        .execute(Query::insert(TABLE, req.into_row(&identity.user_id)))
        .await
        .map_err(AppError::store(CREATE_FAILED))?;

    let org = first(rows)
        .map_err(AppError::store(CREATE_FAILED))?
        .ok_or_else(|| AppError::BadRequest(CREATE_FAILED.into()))?;

    tracing::info!(org_id = org.id, user_id = %org.user_id, "Organization created");
    Ok(Json(org))
}

pub async fn get(
    State(store): State<DynStore>,
    identity: Identity,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Json<Organization>> {
    let rows = store
        .execute(
            Query::select(TABLE)
                .eq("id", id)
                .eq("user_id", identity.user_id),
        )
        .await
        .map_err(AppError::store(FETCH_FAILED))?;

    let org = first(rows)
        .map_err(AppError::store(FETCH_FAILED))?
        .ok_or_else(not_found)?;

    Ok(Json(org))
}

pub async fn update(
    State(store): State<DynStore>,
    identity: Identity,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateOrganizationRequest>, AppError>,
) -> Result<Json<Organization>> {
    let changes = req.changes();
    if changes.is_empty() {
        return Err(AppError::BadRequest("No fields to update".into()));
    }

    let rows = store
        .execute(
            Query::update(TABLE, changes)
                .eq("id", id)
                .eq("user_id", identity.user_id),
        )
        .await
        .map_err(AppError::store(UPDATE_FAILED))?;

    let org = first(rows)
        .map_err(AppError::store(UPDATE_FAILED))?
        .ok_or_else(not_found)?;

    Ok(Json(org))
}

pub async fn delete(
    State(store): State<DynStore>,
    identity: Identity,
    WithRejection(Path(id), _): WithRejection<Path<i64>, AppError>,
) -> Result<Json<Value>> {
    let rows = store
        .execute(
            Query::delete(TABLE)
                .eq("id", id)
                .eq("user_id", identity.user_id.as_str()),
        )
        .await
        .map_err(AppError::store(DELETE_FAILED))?;

    if rows.is_empty() {
        return Err(not_found());
    }

    tracing::info!(org_id = id, user_id = %identity.user_id, "Organization deleted");
    Ok(Json(json!({ "message": "Organization deleted successfully" })))
}

pub async fn search(
    State(store): State<DynStore>,
    identity: Identity,
    WithRejection(Path(query), _): WithRejection<Path<String>, AppError>,
) -> Result<Json<Vec<Organization>>> {
    let rows = store
        .execute(
            Query::select(TABLE)
                .eq("user_id", identity.user_id)
                .ilike("name", &format!("%{}%", query))
                .order("created_at", true),
        )
        .await
        .map_err(AppError::store(SEARCH_FAILED))?;

    let orgs = from_rows(rows).map_err(AppError::store(SEARCH_FAILED))?;
    Ok(Json(orgs))
}
