//! Provider catalog endpoints (admin only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::provider::{CreateProvider, Provider, ProviderQuery, UpdateProvider},
};

use super::AuthenticatedUser;

pub async fn list_providers(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ProviderQuery>,
) -> AppResult<Json<Vec<Provider>>> {
    claims.require_admin()?;
    Ok(Json(state.services.providers.list(&query).await?))
}

pub async fn create_provider(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateProvider>,
) -> AppResult<(StatusCode, Json<Provider>)> {
    claims.require_admin()?;
    let provider = state.services.providers.create(&request).await?;
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn get_provider(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Provider>> {
    claims.require_admin()?;
    Ok(Json(state.services.providers.get(id).await?))
}

pub async fn update_provider(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateProvider>,
) -> AppResult<Json<Provider>> {
    claims.require_admin()?;
    Ok(Json(state.services.providers.update(id, &request).await?))
}

pub async fn delete_provider(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.providers.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
