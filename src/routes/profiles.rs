//! Profile routes
//!
//! Signup, the profile page aggregates, edit and delete.

use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use validator::Validate;

use super::{current_profile, pet_responses, remove_files, Deleted};
use crate::api::{DataResponse, JsonBody, SeeOther};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{
    CreateProfileRequest, EditProfileRequest, Profile, ProfileCreated, ProfileDashboard,
    ProfileDeletePreview,
};
use crate::error::ApiError;

/// GET /profile
///
/// The caller's profile with pets, photo count and total likes.
pub async fn show_profile(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = current_profile(&state, &auth).await?;
    let pets = state.store.list_pets_by_profile(profile.id).await?;
    let pet_ids: Vec<_> = pets.iter().map(|p| p.id).collect();
    let photos = state.store.photos_tagging_any(&pet_ids).await?;

    Ok(DataResponse::new(ProfileDashboard::build(
        profile,
        pet_responses(pets),
        &photos,
    )))
}

/// GET /profile/create
pub async fn create_profile_form() -> impl IntoResponse {
    DataResponse::new(CreateProfileRequest::default())
}

/// POST /profile/create
///
/// Signup. Responds with the new profile and a token for it.
pub async fn create_profile(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let form = req.normalized();
    form.validate()?;

    let profile = Profile::new(form);
    state.store.insert_profile(&profile).await?;
    let token = state.tokens.issue(profile.id)?;

    tracing::info!(profile_id = %profile.id, name = %profile.full_name(), "Profile created");

    Ok(SeeOther::new("/", ProfileCreated { profile, token }))
}

/// GET /profile/edit
pub async fn edit_profile_form(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = current_profile(&state, &auth).await?;
    Ok(DataResponse::new(EditProfileRequest::initial(&profile)))
}

/// POST /profile/edit
pub async fn edit_profile(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    JsonBody(req): JsonBody<EditProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut profile = current_profile(&state, &auth).await?;

    let form = req.normalized();
    form.validate()?;
    profile.apply(form);

    if !state.store.update_profile(&profile).await? {
        return Err(ApiError::not_found("Profile not found"));
    }

    tracing::info!(profile_id = %profile.id, "Profile updated");

    Ok(SeeOther::new("/profile", profile))
}

/// GET /profile/delete
///
/// Read-only summary of what deleting the profile removes.
pub async fn delete_profile_preview(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = current_profile(&state, &auth).await?;
    let pets = state.store.list_pets_by_profile(profile.id).await?;
    let pet_ids: Vec<_> = pets.iter().map(|p| p.id).collect();
    let photos = state.store.photos_tagging_any(&pet_ids).await?;

    Ok(DataResponse::new(ProfileDeletePreview {
        profile,
        pets: pet_responses(pets),
        photos_to_delete: photos.len(),
    }))
}

/// POST /profile/delete
///
/// Removes the profile, its pets and every photo tagging any of them,
/// including photos shared with other owners' pets.
pub async fn delete_profile(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
) -> Result<impl IntoResponse, ApiError> {
    let removal = state
        .store
        .delete_profile(auth.profile_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Profile no longer exists"))?;

    remove_files(&state.media, &removal.photos_removed).await;

    tracing::info!(
        profile_id = %auth.profile_id,
        pets_removed = removal.pets_removed,
        photos_removed = removal.photos_removed.len(),
        "Profile deleted"
    );

    Ok(SeeOther::new(
        "/",
        Deleted {
            id: auth.profile_id,
            pets_removed: Some(removal.pets_removed),
            photos_removed: removal.photos_removed.len(),
        },
    ))
}
