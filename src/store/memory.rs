//! In-process store
//!
//! Used when no database is configured and by the test suite. All tables sit
//! behind one lock so every operation is atomic, like a single transaction.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use super::{ProfileRemoval, RemovedPhoto, Store, StoreError, StoreResult};
use crate::domain::{Pet, PetPhoto, Profile, DUPLICATE_PET_NAME};

#[derive(Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    pets: HashMap<Uuid, Pet>,
    photos: HashMap<Uuid, PetPhoto>,
}

impl Tables {
    fn name_taken(&self, pet: &Pet) -> bool {
        self.pets
            .values()
            .any(|p| p.id != pet.id && p.profile_id == pet.profile_id && p.name == pet.name)
    }

    fn remove_photos(&mut self, ids: impl IntoIterator<Item = Uuid>) -> Vec<RemovedPhoto> {
        ids.into_iter()
            .filter_map(|id| self.photos.remove(&id))
            .map(|p| RemovedPhoto { id: p.id, photo: p.photo })
            .collect()
    }

    fn check_tags(&self, photo: &PetPhoto) -> StoreResult<()> {
        match photo.tagged_pets.iter().find(|id| !self.pets.contains_key(id)) {
            Some(missing) => Err(StoreError::MissingReference(format!("pet {missing}"))),
            None => Ok(()),
        }
    }
}

fn newest_first(mut photos: Vec<PetPhoto>) -> Vec<PetPhoto> {
    photos.sort_by(|a, b| b.publication_date.cmp(&a.publication_date).then(a.id.cmp(&b.id)));
    photos
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> bool {
        true
    }

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.profiles.contains_key(&profile.id) {
            return Err(StoreError::UniqueViolation(format!("profile {}", profile.id)));
        }
        tables.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().profiles.get(&id).cloned())
    }

    async fn update_profile(&self, profile: &Profile) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.profiles.get_mut(&profile.id) {
            Some(stored) => {
                *stored = profile.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<ProfileRemoval>> {
        let mut tables = self.tables.write();
        if tables.profiles.remove(&id).is_none() {
            return Ok(None);
        }

        let pet_ids: HashSet<Uuid> = tables
            .pets
            .values()
            .filter(|p| p.profile_id == id)
            .map(|p| p.id)
            .collect();

        let doomed: Vec<Uuid> = tables
            .photos
            .values()
            .filter(|photo| photo.tagged_pets.iter().any(|pet| pet_ids.contains(pet)))
            .map(|photo| photo.id)
            .collect();
        let photos_removed = tables.remove_photos(doomed);

        tables.pets.retain(|_, p| p.profile_id != id);

        Ok(Some(ProfileRemoval {
            pets_removed: pet_ids.len() as u64,
            photos_removed,
        }))
    }

    async fn insert_pet(&self, pet: &Pet) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if !tables.profiles.contains_key(&pet.profile_id) {
            return Err(StoreError::MissingReference(format!("profile {}", pet.profile_id)));
        }
        if tables.name_taken(pet) {
            return Err(StoreError::UniqueViolation(DUPLICATE_PET_NAME.to_string()));
        }
        tables.pets.insert(pet.id, pet.clone());
        Ok(())
    }

    async fn get_pet(&self, id: Uuid) -> StoreResult<Option<Pet>> {
        Ok(self.tables.read().pets.get(&id).cloned())
    }

    async fn get_pets(&self, ids: &[Uuid]) -> StoreResult<Vec<Pet>> {
        let tables = self.tables.read();
        Ok(ids.iter().filter_map(|id| tables.pets.get(id).cloned()).collect())
    }

    async fn list_pets_by_profile(&self, profile_id: Uuid) -> StoreResult<Vec<Pet>> {
        let mut pets: Vec<Pet> = self
            .tables
            .read()
            .pets
            .values()
            .filter(|p| p.profile_id == profile_id)
            .cloned()
            .collect();
        pets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(pets)
    }

    async fn update_pet(&self, pet: &Pet) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if !tables.pets.contains_key(&pet.id) {
            return Ok(false);
        }
        if tables.name_taken(pet) {
            return Err(StoreError::UniqueViolation(DUPLICATE_PET_NAME.to_string()));
        }
        if let Some(stored) = tables.pets.get_mut(&pet.id) {
            stored.name = pet.name.clone();
            stored.pet_type = pet.pet_type;
            stored.date_of_birth = pet.date_of_birth;
        }
        Ok(true)
    }

    async fn delete_pet(&self, id: Uuid) -> StoreResult<Option<Vec<RemovedPhoto>>> {
        let mut tables = self.tables.write();
        if tables.pets.remove(&id).is_none() {
            return Ok(None);
        }

        let mut orphaned = Vec::new();
        for photo in tables.photos.values_mut().filter(|p| p.is_tagged(id)) {
            photo.tagged_pets.retain(|pet| *pet != id);
            if photo.tagged_pets.is_empty() {
                orphaned.push(photo.id);
            }
        }
        Ok(Some(tables.remove_photos(orphaned)))
    }

    async fn insert_photo(&self, photo: &PetPhoto) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.check_tags(photo)?;
        tables.photos.insert(photo.id, photo.clone());
        Ok(())
    }

    async fn get_photo(&self, id: Uuid) -> StoreResult<Option<PetPhoto>> {
        Ok(self.tables.read().photos.get(&id).cloned())
    }

    async fn list_photos(&self, limit: u32, offset: u32) -> StoreResult<(Vec<PetPhoto>, u64)> {
        let all = newest_first(self.tables.read().photos.values().cloned().collect());
        let total = all.len() as u64;
        let page = all
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn photos_tagging_any(&self, pet_ids: &[Uuid]) -> StoreResult<Vec<PetPhoto>> {
        let photos = self
            .tables
            .read()
            .photos
            .values()
            .filter(|photo| pet_ids.iter().any(|id| photo.is_tagged(*id)))
            .cloned()
            .collect();
        Ok(newest_first(photos))
    }

    async fn update_photo(&self, photo: &PetPhoto) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if !tables.photos.contains_key(&photo.id) {
            return Ok(false);
        }
        tables.check_tags(photo)?;
        if let Some(stored) = tables.photos.get_mut(&photo.id) {
            stored.description = photo.description.clone();
            stored.tagged_pets = photo.tagged_pets.clone();
        }
        Ok(true)
    }

    async fn increment_likes(&self, id: Uuid) -> StoreResult<Option<i64>> {
        let mut tables = self.tables.write();
        Ok(tables.photos.get_mut(&id).map(|photo| {
            photo.likes += 1;
            photo.likes
        }))
    }

    async fn delete_photo(&self, id: Uuid) -> StoreResult<Option<PetPhoto>> {
        Ok(self.tables.write().photos.remove(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateProfileRequest, PetForm, PetType};

    fn profile(first: &str) -> Profile {
        Profile::new(CreateProfileRequest {
            first_name: first.into(),
            last_name: "Owner".into(),
            picture: "http://x/y.png".into(),
        })
    }

    fn pet(owner: &Profile, name: &str) -> Pet {
        let form = PetForm {
            name: name.into(),
            pet_type: Some(PetType::Dog.as_str().to_string()),
            date_of_birth: None,
        };
        Pet::new(owner.id, form, PetType::Dog)
    }

    fn photo(tags: &[&Pet]) -> PetPhoto {
        PetPhoto::new(
            format!("profiles/{}.png", Uuid::new_v4()),
            None,
            tags.iter().map(|p| p.id).collect(),
        )
    }

    #[tokio::test]
    async fn pet_names_are_unique_per_owner_only() {
        let store = MemoryStore::new();
        let p = profile("Pat");
        let q = profile("Quinn");
        store.insert_profile(&p).await.unwrap();
        store.insert_profile(&q).await.unwrap();

        store.insert_pet(&pet(&p, "Rex")).await.unwrap();
        let err = store.insert_pet(&pet(&p, "Rex")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));
        store.insert_pet(&pet(&q, "Rex")).await.unwrap();
    }

    #[tokio::test]
    async fn renaming_into_a_sibling_name_is_rejected() {
        let store = MemoryStore::new();
        let p = profile("Pat");
        store.insert_profile(&p).await.unwrap();
        store.insert_pet(&pet(&p, "Rex")).await.unwrap();
        let mut milo = pet(&p, "Milo");
        store.insert_pet(&milo).await.unwrap();

        milo.name = "Rex".into();
        assert!(matches!(
            store.update_pet(&milo).await,
            Err(StoreError::UniqueViolation(_))
        ));

        milo.name = "Milo".into();
        milo.pet_type = PetType::Cat;
        assert!(store.update_pet(&milo).await.unwrap());
        assert_eq!(store.get_pet(milo.id).await.unwrap().unwrap().pet_type, PetType::Cat);
    }

    #[tokio::test]
    async fn profile_delete_over_deletes_shared_photos() {
        let store = MemoryStore::new();
        let p = profile("Pat");
        let q = profile("Quinn");
        store.insert_profile(&p).await.unwrap();
        store.insert_profile(&q).await.unwrap();
        let rex = pet(&p, "Rex");
        let milo = pet(&q, "Milo");
        store.insert_pet(&rex).await.unwrap();
        store.insert_pet(&milo).await.unwrap();

        let shared = photo(&[&rex, &milo]);
        let milo_only = photo(&[&milo]);
        store.insert_photo(&shared).await.unwrap();
        store.insert_photo(&milo_only).await.unwrap();

        let removal = store.delete_profile(p.id).await.unwrap().unwrap();
        assert_eq!(removal.pets_removed, 1);
        assert_eq!(removal.photos_removed.len(), 1);
        assert_eq!(removal.photos_removed[0].id, shared.id);

        assert!(store.get_profile(p.id).await.unwrap().is_none());
        assert!(store.get_pet(rex.id).await.unwrap().is_none());
        assert!(store.get_photo(shared.id).await.unwrap().is_none());
        assert_eq!(store.get_pet(milo.id).await.unwrap().unwrap().profile_id, q.id);
        let remaining = store.photos_tagging_any(&[milo.id]).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, milo_only.id);

        assert!(store.delete_profile(p.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pet_delete_removes_only_orphaned_photos() {
        let store = MemoryStore::new();
        let p = profile("Pat");
        store.insert_profile(&p).await.unwrap();
        let rex = pet(&p, "Rex");
        let milo = pet(&p, "Milo");
        store.insert_pet(&rex).await.unwrap();
        store.insert_pet(&milo).await.unwrap();

        let both = photo(&[&rex, &milo]);
        let rex_only = photo(&[&rex]);
        store.insert_photo(&both).await.unwrap();
        store.insert_photo(&rex_only).await.unwrap();

        let removed = store.delete_pet(rex.id).await.unwrap().unwrap();
        assert_eq!(removed, vec![RemovedPhoto { id: rex_only.id, photo: rex_only.photo.clone() }]);

        let kept = store.get_photo(both.id).await.unwrap().unwrap();
        assert_eq!(kept.tagged_pets, vec![milo.id]);
        assert!(store.delete_pet(rex.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn likes_increment_by_one_and_photo_edit_keeps_them() {
        let store = MemoryStore::new();
        let p = profile("Pat");
        store.insert_profile(&p).await.unwrap();
        let rex = pet(&p, "Rex");
        store.insert_pet(&rex).await.unwrap();
        let mut shot = photo(&[&rex]);
        shot.likes = 3;
        store.insert_photo(&shot).await.unwrap();

        assert_eq!(store.increment_likes(shot.id).await.unwrap(), Some(4));
        assert_eq!(store.increment_likes(Uuid::new_v4()).await.unwrap(), None);

        shot.description = Some("edited".into());
        assert!(store.update_photo(&shot).await.unwrap());
        let stored = store.get_photo(shot.id).await.unwrap().unwrap();
        assert_eq!(stored.likes, 4);
        assert_eq!(stored.description.as_deref(), Some("edited"));
    }

    #[tokio::test]
    async fn photos_must_tag_existing_pets() {
        let store = MemoryStore::new();
        let ghost = pet(&profile("Ghost"), "Casper");
        let err = store.insert_photo(&photo(&[&ghost])).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }

    #[tokio::test]
    async fn listing_is_paginated_newest_first() {
        let store = MemoryStore::new();
        let p = profile("Pat");
        store.insert_profile(&p).await.unwrap();
        let rex = pet(&p, "Rex");
        store.insert_pet(&rex).await.unwrap();

        let mut older = photo(&[&rex]);
        older.publication_date -= chrono::Duration::hours(1);
        let newer = photo(&[&rex]);
        store.insert_photo(&older).await.unwrap();
        store.insert_photo(&newer).await.unwrap();

        let (page, total) = store.list_photos(1, 0).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(page[0].id, newer.id);
        let (page, _) = store.list_photos(1, 1).await.unwrap();
        assert_eq!(page[0].id, older.id);
    }
}
