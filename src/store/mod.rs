//! Persistence boundary
//!
//! Handlers talk to a [`Store`]; [`PgStore`] backs it with PostgreSQL and
//! [`MemoryStore`] keeps everything in process with the same cascade and
//! uniqueness rules.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{Pet, PetPhoto, Profile};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("referenced row does not exist: {0}")]
    MissingReference(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A photo removed as a side effect of deleting its owner(s).
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedPhoto {
    pub id: Uuid,
    pub photo: Option<String>,
}

/// Everything a profile deletion took with it.
#[derive(Debug, Clone, Default)]
pub struct ProfileRemoval {
    pub pets_removed: u64,
    pub photos_removed: Vec<RemovedPhoto>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Lightweight connectivity probe
    async fn health_check(&self) -> bool;

    // Profiles

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()>;

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>>;

    /// Returns `false` when the profile does not exist.
    async fn update_profile(&self, profile: &Profile) -> StoreResult<bool>;

    /// Deletes the profile, its pets, and every photo tagging any of those
    /// pets, even photos that also tag other owners' pets.
    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<ProfileRemoval>>;

    // Pets

    /// Fails with [`StoreError::UniqueViolation`] when the owner already has
    /// a pet with the same name.
    async fn insert_pet(&self, pet: &Pet) -> StoreResult<()>;

    async fn get_pet(&self, id: Uuid) -> StoreResult<Option<Pet>>;

    /// Pets matching `ids`; unknown ids are skipped.
    async fn get_pets(&self, ids: &[Uuid]) -> StoreResult<Vec<Pet>>;

    /// Pets owned by a profile, ordered by name.
    async fn list_pets_by_profile(&self, profile_id: Uuid) -> StoreResult<Vec<Pet>>;

    /// Updates name, type and date of birth. Same uniqueness rule as insert.
    async fn update_pet(&self, pet: &Pet) -> StoreResult<bool>;

    /// Deletes the pet and its photo tags. Photos left without any tagged pet
    /// are deleted too and returned.
    async fn delete_pet(&self, id: Uuid) -> StoreResult<Option<Vec<RemovedPhoto>>>;

    // Photos

    /// Fails with [`StoreError::MissingReference`] when a tagged pet is gone.
    async fn insert_photo(&self, photo: &PetPhoto) -> StoreResult<()>;

    async fn get_photo(&self, id: Uuid) -> StoreResult<Option<PetPhoto>>;

    /// Newest first, with the total number of photos.
    async fn list_photos(&self, limit: u32, offset: u32) -> StoreResult<(Vec<PetPhoto>, u64)>;

    /// Distinct photos tagging at least one of `pet_ids`, newest first.
    async fn photos_tagging_any(&self, pet_ids: &[Uuid]) -> StoreResult<Vec<PetPhoto>>;

    /// Replaces description and tags. The file, publication date and likes
    /// are left untouched.
    async fn update_photo(&self, photo: &PetPhoto) -> StoreResult<bool>;

    /// Atomically adds one like; returns the new count.
    async fn increment_likes(&self, id: Uuid) -> StoreResult<Option<i64>>;

    async fn delete_photo(&self, id: Uuid) -> StoreResult<Option<PetPhoto>>;
}
