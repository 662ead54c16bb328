//! Section route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use ma_furniture_core::catalog::parse_flag;
use ma_furniture_core::{Section, SectionId, SectionInput};

use crate::db::{RepositoryError, SectionRepository};
use crate::error::{AppError, Result};
use crate::extract::{JsonBody, QueryParams};
use crate::state::AppState;

const SECTION_NOT_FOUND: &str = "Section not found";

/// Query parameters for the section list.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub active: Option<String>,
}

/// List sections ordered by name.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<Section>>> {
    let sections = SectionRepository::new(state.pool())
        .list(query.active.as_deref().map(parse_flag))
        .await?;
    Ok(Json(sections))
}

/// Create a section.
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<SectionInput>,
) -> Result<(StatusCode, Json<Section>)> {
    let record = input.into_record()?;
    let section = SectionRepository::new(state.pool()).create(&record).await?;
    state.invalidate_catalog().await;

    tracing::info!(section_id = %section.id, code = %section.code, "Section created");
    Ok((StatusCode::CREATED, Json(section)))
}

/// Update a section.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<SectionInput>,
) -> Result<Json<Section>> {
    let id = parse_section_id(&id)?;
    let record = input.into_record()?;

    let section = SectionRepository::new(state.pool())
        .update(id, &record)
        .await
        .map_err(not_found_as_section)?;
    state.invalidate_catalog().await;

    Ok(Json(section))
}

/// Delete a section, taking its products out of it.
#[instrument(skip(state))]
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>> {
    let id = parse_section_id(&id)?;

    let (section, affected) = SectionRepository::new(state.pool())
        .delete(id)
        .await
        .map_err(not_found_as_section)?;
    state.invalidate_catalog().await;

    tracing::info!(code = %section.code, affected, "Section deleted");
    Ok(Json(json!({
        "message": "Section deleted successfully",
        "affectedProducts": affected,
        "deletedSection": section,
    })))
}

fn parse_section_id(raw: &str) -> Result<SectionId> {
    SectionId::parse_positive(raw).ok_or_else(|| AppError::BadRequest("Invalid section ID".to_string()))
}

fn not_found_as_section(e: RepositoryError) -> AppError {
    match e {
        RepositoryError::NotFound => AppError::NotFound(SECTION_NOT_FOUND.to_string()),
        e => e.into(),
    }
}
