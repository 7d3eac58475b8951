//! Pet photo domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::blank_to_none;
use super::pets::PetResponse;
use crate::error::FieldErrors;
use crate::validators::{at_least_one_pet, max_file_size};

/// Pet photo entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PetPhoto {
    pub id: Uuid,
    /// Path of the stored file, relative to the media root.
    pub photo: Option<String>,
    pub description: Option<String>,
    pub publication_date: DateTime<Utc>,
    pub likes: i64,
    pub tagged_pets: Vec<Uuid>,
}

impl PetPhoto {
    pub fn new(photo: String, description: Option<String>, tagged_pets: Vec<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            photo: Some(photo),
            description,
            publication_date: Utc::now(),
            likes: 0,
            tagged_pets,
        }
    }

    pub fn is_tagged(&self, pet_id: Uuid) -> bool {
        self.tagged_pets.contains(&pet_id)
    }
}

/// An uploaded photo file as received from a multipart body
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content: Vec<u8>,
}

/// Photo upload form, assembled from multipart fields
#[derive(Debug, Clone, Default)]
pub struct CreatePetPhotoForm {
    pub photo: Option<UploadedFile>,
    pub description: Option<String>,
    pub tagged_pets: Vec<Uuid>,
}

impl CreatePetPhotoForm {
    /// Validates the upload; returns the file on success.
    pub fn validate(self, max_size_mb: u64) -> Result<(UploadedFile, Option<String>, Vec<Uuid>), FieldErrors> {
        let mut errors = FieldErrors::new();

        match &self.photo {
            Some(file) if !file.content.is_empty() => {
                if let Err(e) = max_file_size(max_size_mb)(&file.content) {
                    errors.add_error("photo", &e);
                }
            }
            Some(_) => errors.add("photo", "The submitted file is empty."),
            None => errors.add("photo", "This field is required."),
        }

        let tagged_pets = dedup(self.tagged_pets);
        if let Err(e) = at_least_one_pet(&tagged_pets) {
            errors.add_error("tagged_pets", &e);
        }

        match self.photo {
            Some(file) if errors.is_empty() => Ok((file, blank_to_none(self.description), tagged_pets)),
            _ => Err(errors),
        }
    }
}

/// Photo edit form; the image itself cannot be replaced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditPetPhotoForm {
    pub description: Option<String>,
    pub tagged_pets: Vec<Uuid>,
}

impl EditPetPhotoForm {
    pub fn initial(photo: &PetPhoto) -> Self {
        Self {
            description: photo.description.clone(),
            tagged_pets: photo.tagged_pets.clone(),
        }
    }

    pub fn validate(self) -> Result<Self, FieldErrors> {
        let tagged_pets = dedup(self.tagged_pets);
        if let Err(e) = at_least_one_pet(&tagged_pets) {
            let mut errors = FieldErrors::new();
            errors.add_error("tagged_pets", &e);
            return Err(errors);
        }
        Ok(Self {
            description: blank_to_none(self.description),
            tagged_pets,
        })
    }
}

/// Empty upload form
#[derive(Debug, Clone, Serialize)]
pub struct PhotoUploadForm {
    pub description: Option<String>,
    pub tagged_pets: Vec<Uuid>,
    pub max_size_mb: u64,
}

/// Photo with its tagged pets resolved
#[derive(Debug, Clone, Serialize)]
pub struct PetPhotoDetails {
    pub id: Uuid,
    pub photo: Option<String>,
    pub photo_url: Option<String>,
    pub description: Option<String>,
    pub publication_date: DateTime<Utc>,
    pub likes: i64,
    pub tagged_pets: Vec<PetResponse>,
}

impl PetPhotoDetails {
    pub fn new(photo: PetPhoto, tagged_pets: Vec<PetResponse>, photo_url: Option<String>) -> Self {
        Self {
            id: photo.id,
            photo: photo.photo,
            photo_url,
            description: photo.description,
            publication_date: photo.publication_date,
            likes: photo.likes,
            tagged_pets,
        }
    }
}

/// Result of the like action
#[derive(Debug, Clone, Serialize)]
pub struct LikeResponse {
    pub id: Uuid,
    pub likes: i64,
}

/// Keeps the first occurrence of each id, in submission order.
fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(size: usize, tags: Vec<Uuid>) -> CreatePetPhotoForm {
        CreatePetPhotoForm {
            photo: Some(UploadedFile {
                file_name: Some("rex.png".into()),
                content: vec![1u8; size],
            }),
            description: Some("".into()),
            tagged_pets: tags,
        }
    }

    #[test]
    fn upload_requires_file_and_a_tag() {
        let errors = CreatePetPhotoForm::default().validate(5).unwrap_err();
        assert_eq!(errors.get("photo"), Some(&["This field is required.".to_string()][..]));
        assert!(errors.get("tagged_pets").is_some());
    }

    #[test]
    fn upload_rejects_files_over_the_limit() {
        let errors = upload(1024 * 1024 + 1, vec![Uuid::new_v4()]).validate(1).unwrap_err();
        assert_eq!(errors.get("photo"), Some(&["Max file size is 1MB".to_string()][..]));
    }

    #[test]
    fn upload_dedups_tags_and_blanks_description() {
        let rex = Uuid::new_v4();
        let (file, description, tags) = upload(10, vec![rex, rex]).validate(1).unwrap();
        assert_eq!(file.content.len(), 10);
        assert_eq!(description, None);
        assert_eq!(tags, vec![rex]);
    }

    #[test]
    fn edit_keeps_at_least_one_tag() {
        assert!(EditPetPhotoForm::default().validate().is_err());
        let form = EditPetPhotoForm {
            description: Some("sunny".into()),
            tagged_pets: vec![Uuid::new_v4()],
        };
        assert_eq!(form.validate().unwrap().description.as_deref(), Some("sunny"));
    }
}
