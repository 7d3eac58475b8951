pub mod health;
pub mod pets;
pub mod photos;
pub mod profiles;

use axum::{extract::DefaultBodyLimit, routing::get, routing::post, Router};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::app::AppState;
use crate::auth::AuthContext;
use crate::config::Settings;
use crate::domain::{Pet, PetResponse, Profile};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::services::media::MediaStorage;
use crate::store::RemovedPhoto;

/// Room for multipart framing and the text fields on top of the file itself.
const UPLOAD_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Build the API router with all routes
pub fn api_router(settings: &Settings) -> Router<Arc<AppState>> {
    let upload_limit = usize::try_from(
        settings
            .photo_max_bytes()
            .saturating_add(UPLOAD_OVERHEAD_BYTES),
    )
    .unwrap_or(usize::MAX);

    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        .route("/", get(photos::list_photos))
        .route("/dashboard", get(photos::list_photos))
        .route("/photo/details/:photo_id", get(photos::photo_details))
        .route("/photo/like/:photo_id", post(photos::like_photo))
        // Profiles
        .route(
            "/profile/create",
            get(profiles::create_profile_form).post(profiles::create_profile),
        )
        .route("/profile", get(profiles::show_profile))
        .route(
            "/profile/edit",
            get(profiles::edit_profile_form).post(profiles::edit_profile),
        )
        .route(
            "/profile/delete",
            get(profiles::delete_profile_preview).post(profiles::delete_profile),
        )
        // Pets
        .route("/pet/add", get(pets::create_pet_form).post(pets::create_pet))
        .route(
            "/pet/edit/:pet_id",
            get(pets::edit_pet_form).post(pets::edit_pet),
        )
        .route(
            "/pet/delete/:pet_id",
            get(pets::delete_pet_preview).post(pets::delete_pet),
        )
        // Photos
        .route(
            "/photo/add",
            get(photos::create_photo_form)
                .post(photos::create_photo)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/photo/edit/:photo_id",
            get(photos::edit_photo_form).post(photos::edit_photo),
        )
        .route("/photo/delete/:photo_id", post(photos::delete_photo))
}

/// Result body of a delete command
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pets_removed: Option<u64>,
    pub photos_removed: usize,
}

/// Profile the caller acts as. A token outliving its profile is rejected.
async fn current_profile(state: &AppState, auth: &AuthContext) -> ApiResult<Profile> {
    state
        .store
        .get_profile(auth.profile_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Profile no longer exists"))
}

/// Loads a pet the caller owns.
async fn owned_pet(state: &AppState, auth: &AuthContext, pet_id: Uuid) -> ApiResult<Pet> {
    let pet = state
        .store
        .get_pet(pet_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet not found"))?;

    if pet.profile_id != auth.profile_id {
        return Err(ApiError::forbidden("You can only change your own pets"));
    }
    Ok(pet)
}

/// Records a field error for every id in `tagged` that does not name a pet.
async fn check_tagged_pets(
    state: &AppState,
    tagged: &[Uuid],
    errors: &mut FieldErrors,
) -> ApiResult<Vec<Pet>> {
    let pets = state.store.get_pets(tagged).await?;
    for id in tagged {
        if !pets.iter().any(|p| p.id == *id) {
            errors.add(
                "tagged_pets",
                format!("Select a valid choice. {id} is not one of the available choices."),
            );
        }
    }
    Ok(pets)
}

async fn remove_files(media: &MediaStorage, photos: &[RemovedPhoto]) {
    for photo in photos {
        if let Some(path) = &photo.photo {
            media.remove(path).await;
        }
    }
}

fn pet_responses(pets: Vec<Pet>) -> Vec<PetResponse> {
    pets.into_iter().map(Into::into).collect()
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}
