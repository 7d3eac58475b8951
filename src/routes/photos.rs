//! Pet photo routes
//!
//! Feed, upload, details, edit, delete and likes.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::{check_tagged_pets, current_profile, pet_responses, Deleted};
use crate::api::{DataResponse, JsonBody, Paginated, PaginationParams, SeeOther};
use crate::app::AppState;
use crate::auth::{AuthContext, RequireAuth};
use crate::domain::{
    CreatePetPhotoForm, EditPetPhotoForm, LikeResponse, PetPhoto, PetPhotoDetails, PetResponse,
    PhotoUploadForm, UploadedFile,
};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::services::media::{MediaStorage, PHOTO_NAMESPACE};
use crate::validators::file_too_large;

async fn details(state: &AppState, photo: PetPhoto) -> ApiResult<PetPhotoDetails> {
    let pets = state.store.get_pets(&photo.tagged_pets).await?;
    let url = photo.photo.as_deref().map(MediaStorage::url_for);
    Ok(PetPhotoDetails::new(photo, pet_responses(pets), url))
}

async fn load_photo(state: &AppState, photo_id: Uuid) -> ApiResult<PetPhoto> {
    state
        .store
        .get_photo(photo_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Photo not found"))
}

/// Loads a photo the caller may change: one of its tagged pets must be theirs.
async fn editable_photo(state: &AppState, auth: &AuthContext, photo_id: Uuid) -> ApiResult<PetPhoto> {
    let photo = load_photo(state, photo_id).await?;
    let pets = state.store.get_pets(&photo.tagged_pets).await?;
    if !pets.iter().any(|p| p.profile_id == auth.profile_id) {
        return Err(ApiError::forbidden(
            "Only owners of a tagged pet can change this photo",
        ));
    }
    Ok(photo)
}

/// GET / and GET /dashboard
///
/// All photos, newest first, with their tagged pets.
pub async fn list_photos(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (photos, total) = state
        .store
        .list_photos(pagination.limit(), pagination.offset())
        .await?;

    // Resolve every tagged pet on the page with a single lookup
    let mut pet_ids: Vec<Uuid> = photos.iter().flat_map(|p| p.tagged_pets.iter().copied()).collect();
    pet_ids.sort_unstable();
    pet_ids.dedup();
    let pets: HashMap<Uuid, PetResponse> = state
        .store
        .get_pets(&pet_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, PetResponse::from(p)))
        .collect();

    let data = photos
        .into_iter()
        .map(|photo| {
            let tagged = photo
                .tagged_pets
                .iter()
                .filter_map(|id| pets.get(id).cloned())
                .collect();
            let url = photo.photo.as_deref().map(MediaStorage::url_for);
            PetPhotoDetails::new(photo, tagged, url)
        })
        .collect();

    Ok(Paginated::new(data, &pagination, total))
}

/// GET /photo/details/:photo_id
pub async fn photo_details(
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = load_photo(&state, photo_id).await?;
    Ok(DataResponse::new(details(&state, photo).await?))
}

/// POST /photo/like/:photo_id
///
/// Anyone may like, any number of times.
pub async fn like_photo(
    State(state): State<Arc<AppState>>,
    Path(photo_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let likes = state
        .store
        .increment_likes(photo_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;

    tracing::debug!(photo_id = %photo_id, likes, "Photo liked");

    Ok(SeeOther::new(
        format!("/photo/details/{photo_id}"),
        LikeResponse { id: photo_id, likes },
    ))
}

/// GET /photo/add
pub async fn create_photo_form(
    State(state): State<Arc<AppState>>,
    _auth: RequireAuth,
) -> impl IntoResponse {
    DataResponse::new(PhotoUploadForm {
        description: None,
        tagged_pets: Vec::new(),
        max_size_mb: state.settings.photo_max_size_mb,
    })
}

/// A body cut off by the upload limit is reported as an oversized photo.
fn upload_error(err: MultipartError, max_size_mb: u64) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let mut errors = FieldErrors::new();
        errors.add_error("photo", &file_too_large(max_size_mb));
        return ApiError::Validation(errors);
    }
    err.into()
}

/// Reads the upload form out of a multipart body.
/// Unparseable pet ids become field errors rather than a rejected request.
async fn read_upload(
    mut multipart: Multipart,
    max_size_mb: u64,
) -> ApiResult<(CreatePetPhotoForm, FieldErrors)> {
    let mut form = CreatePetPhotoForm::default();
    let mut errors = FieldErrors::new();
    let fail = |e: MultipartError| upload_error(e, max_size_mb);

    while let Some(field) = multipart.next_field().await.map_err(fail)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("photo") => {
                let file_name = field.file_name().filter(|n| !n.is_empty()).map(str::to_string);
                let content = field.bytes().await.map_err(fail)?.to_vec();
                if file_name.is_some() || !content.is_empty() {
                    form.photo = Some(UploadedFile { file_name, content });
                }
            }
            Some("description") => form.description = Some(field.text().await.map_err(fail)?),
            Some("tagged_pets") => {
                let raw = field.text().await.map_err(fail)?;
                match Uuid::parse_str(raw.trim()) {
                    Ok(id) => form.tagged_pets.push(id),
                    Err(_) => errors.add("tagged_pets", format!("\"{raw}\" is not a valid value.")),
                }
            }
            _ => {}
        }
    }

    Ok((form, errors))
}

/// POST /photo/add (multipart: `photo`, `description`, repeated `tagged_pets`)
pub async fn create_photo(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let profile = current_profile(&state, &auth).await?;

    let (form, mut errors) = read_upload(multipart, state.settings.photo_max_size_mb).await?;
    let validated = match form.validate(state.settings.photo_max_size_mb) {
        Ok(validated) => Some(validated),
        Err(form_errors) => {
            errors.merge(form_errors);
            None
        }
    };
    if let Some((_, _, tagged)) = &validated {
        check_tagged_pets(&state, tagged, &mut errors).await?;
    }
    errors.into_result()?;
    let Some((file, description, tagged_pets)) = validated else {
        return Err(ApiError::bad_request("Invalid upload"));
    };

    let path = state
        .media
        .save(PHOTO_NAMESPACE, file.file_name.as_deref(), &file.content)
        .await?;

    let photo = PetPhoto::new(path, description, tagged_pets);
    if let Err(e) = state.store.insert_photo(&photo).await {
        if let Some(path) = &photo.photo {
            state.media.remove(path).await;
        }
        return Err(e.into());
    }

    tracing::info!(
        profile_id = %profile.id,
        photo_id = %photo.id,
        tagged = photo.tagged_pets.len(),
        "Photo uploaded"
    );

    Ok(SeeOther::new("/dashboard", details(&state, photo).await?))
}

/// GET /photo/edit/:photo_id
pub async fn edit_photo_form(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(photo_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let photo = editable_photo(&state, &auth, photo_id).await?;
    Ok(DataResponse::new(EditPetPhotoForm::initial(&photo)))
}

/// POST /photo/edit/:photo_id
///
/// Description and tags only; the image cannot be replaced.
pub async fn edit_photo(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(photo_id): Path<Uuid>,
    JsonBody(form): JsonBody<EditPetPhotoForm>,
) -> Result<impl IntoResponse, ApiError> {
    let mut photo = editable_photo(&state, &auth, photo_id).await?;

    let form = form.validate().map_err(ApiError::Validation)?;
    let mut errors = FieldErrors::new();
    check_tagged_pets(&state, &form.tagged_pets, &mut errors).await?;
    errors.into_result()?;

    photo.description = form.description;
    photo.tagged_pets = form.tagged_pets;
    if !state.store.update_photo(&photo).await? {
        return Err(ApiError::not_found("Photo not found"));
    }

    tracing::info!(photo_id = %photo.id, "Photo updated");

    // Re-read so the likes count reflects concurrent likes
    let photo = load_photo(&state, photo_id).await?;
    Ok(SeeOther::new("/dashboard", details(&state, photo).await?))
}

/// POST /photo/delete/:photo_id
pub async fn delete_photo(
    State(state): State<Arc<AppState>>,
    auth: RequireAuth,
    Path(photo_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    editable_photo(&state, &auth, photo_id).await?;

    let photo = state
        .store
        .delete_photo(photo_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;
    if let Some(path) = &photo.photo {
        state.media.remove(path).await;
    }

    tracing::info!(photo_id = %photo_id, "Photo deleted");

    Ok(SeeOther::new(
        "/dashboard",
        Deleted {
            id: photo_id,
            pets_removed: None,
            photos_removed: 1,
        },
    ))
}
