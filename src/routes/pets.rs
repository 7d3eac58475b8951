//! Pet routes
//!
//! Create, edit and delete pets owned by the caller.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{current_profile, owned_pet, remove_files, today, Deleted};
use crate::api::{DataResponse, JsonBody, SeeOther};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{Pet, PetForm, PetResponse};
use crate::error::ApiError;

/// GET /pet/add
pub async fn create_pet_form(_auth: RequireAuth) -> impl IntoResponse {
    DataResponse::new(PetForm::default())
}

/// POST /pet/add
pub async fn create_pet(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    JsonBody(form): JsonBody<PetForm>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = current_profile(&state, &auth).await?;

    let form = form.normalized();
    let pet_type = form.validate_for_create().map_err(ApiError::Validation)?;

    let pet = Pet::new(profile.id, form, pet_type);
    state.store.insert_pet(&pet).await?;

    tracing::info!(profile_id = %profile.id, pet_id = %pet.id, name = %pet.name, "Pet created");

    Ok(SeeOther::new("/profile", PetResponse::from(pet)))
}

/// GET /pet/edit/:pet_id
pub async fn edit_pet_form(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(pet_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pet = owned_pet(&state, &auth, pet_id).await?;
    Ok(DataResponse::new(PetForm::initial(&pet)))
}

/// POST /pet/edit/:pet_id
///
/// Everything but the owner is editable.
pub async fn edit_pet(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(pet_id): Path<Uuid>,
    JsonBody(form): JsonBody<PetForm>,
) -> Result<impl IntoResponse, ApiError> {
    let mut pet = owned_pet(&state, &auth, pet_id).await?;

    let form = form.normalized();
    let pet_type = form.validate_for_edit(today()).map_err(ApiError::Validation)?;
    pet.apply(form, pet_type);

    if !state.store.update_pet(&pet).await? {
        return Err(ApiError::not_found("Pet not found"));
    }

    tracing::info!(pet_id = %pet.id, "Pet updated");

    Ok(SeeOther::new("/profile", PetResponse::from(pet)))
}

/// GET /pet/delete/:pet_id
///
/// The pet as it stands, read-only, before confirming deletion.
pub async fn delete_pet_preview(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(pet_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pet = owned_pet(&state, &auth, pet_id).await?;
    Ok(DataResponse::new(PetResponse::from(pet)))
}

/// POST /pet/delete/:pet_id
pub async fn delete_pet(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(pet_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pet = owned_pet(&state, &auth, pet_id).await?;

    let orphaned = state
        .store
        .delete_pet(pet.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet not found"))?;

    remove_files(&state.media, &orphaned).await;

    tracing::info!(pet_id = %pet.id, photos_removed = orphaned.len(), "Pet deleted");

    Ok(SeeOther::new(
        "/profile",
        Deleted {
            id: pet.id,
            pets_removed: None,
            photos_removed: orphaned.len(),
        },
    ))
}
