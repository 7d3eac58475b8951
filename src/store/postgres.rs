//! PostgreSQL-backed store

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{ProfileRemoval, RemovedPhoto, Store, StoreError, StoreResult};
use crate::domain::{Gender, Pet, PetPhoto, PetType, Profile, DUPLICATE_PET_NAME};

/// Database row for profile
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: Uuid,
    first_name: String,
    last_name: String,
    picture: String,
    date_of_birth: Option<NaiveDate>,
    description: Option<String>,
    email: Option<String>,
    gender: String,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            picture: row.picture,
            date_of_birth: row.date_of_birth,
            description: row.description,
            email: row.email,
            gender: Gender::from_db(&row.gender),
        }
    }
}

/// Database row for pet
#[derive(Debug, sqlx::FromRow)]
struct PetRow {
    id: Uuid,
    profile_id: Uuid,
    name: String,
    #[sqlx(rename = "type")]
    pet_type: String,
    date_of_birth: Option<NaiveDate>,
}

impl From<PetRow> for Pet {
    fn from(row: PetRow) -> Self {
        Self {
            id: row.id,
            profile_id: row.profile_id,
            name: row.name,
            pet_type: PetType::from_db(&row.pet_type),
            date_of_birth: row.date_of_birth,
        }
    }
}

/// Database row for pet photo, without its tags
#[derive(Debug, sqlx::FromRow)]
struct PhotoRow {
    id: Uuid,
    photo: Option<String>,
    description: Option<String>,
    publication_date: DateTime<Utc>,
    likes: i64,
}

impl PhotoRow {
    fn with_tags(self, tagged_pets: Vec<Uuid>) -> PetPhoto {
        PetPhoto {
            id: self.id,
            photo: self.photo,
            description: self.description,
            publication_date: self.publication_date,
            likes: self.likes,
            tagged_pets,
        }
    }
}

const PROFILE_COLUMNS: &str =
    "id, first_name, last_name, picture, date_of_birth, description, email, gender";
const PET_COLUMNS: &str = "id, profile_id, name, type, date_of_birth";
const PHOTO_COLUMNS: &str = "id, photo, description, publication_date, likes";

/// Maps constraint violations to their store error; anything else stays a database error.
fn classify(err: sqlx::Error, unique_message: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation(unique_message.to_string());
        }
        if db_err.is_foreign_key_violation() {
            let constraint = db_err.constraint().unwrap_or("foreign key").to_string();
            return StoreError::MissingReference(constraint);
        }
    }
    StoreError::Database(err)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the tag lists for a batch of photo rows in one query.
    async fn attach_tags(&self, rows: Vec<PhotoRow>) -> StoreResult<Vec<PetPhoto>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let tags: Vec<(Uuid, Uuid)> = sqlx::query_as(
            "SELECT photo_id, pet_id FROM pet_photo_tags WHERE photo_id = ANY($1) ORDER BY pet_id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_photo: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (photo_id, pet_id) in tags {
            by_photo.entry(photo_id).or_default().push(pet_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = by_photo.remove(&row.id).unwrap_or_default();
                row.with_tags(tags)
            })
            .collect())
    }

    async fn write_tags(
        tx: &mut Transaction<'_, Postgres>,
        photo_id: Uuid,
        tagged_pets: &[Uuid],
    ) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO pet_photo_tags (photo_id, pet_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(photo_id)
        .bind(tagged_pets)
        .execute(&mut **tx)
        .await
        .map_err(|e| classify(e, "duplicate photo tag"))?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }

    async fn insert_profile(&self, profile: &Profile) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles (id, first_name, last_name, picture, date_of_birth,
                                  description, email, gender)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.picture)
        .bind(profile.date_of_birth)
        .bind(&profile.description)
        .bind(&profile.email)
        .bind(profile.gender.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, "profile already exists"))?;
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> StoreResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn update_profile(&self, profile: &Profile) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET
                first_name = $2,
                last_name = $3,
                picture = $4,
                date_of_birth = $5,
                description = $6,
                email = $7,
                gender = $8
            WHERE id = $1
            "#,
        )
        .bind(profile.id)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.picture)
        .bind(profile.date_of_birth)
        .bind(&profile.description)
        .bind(&profile.email)
        .bind(profile.gender.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_profile(&self, id: Uuid) -> StoreResult<Option<ProfileRemoval>> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM profiles WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        // Any photo tagging one of these pets goes, shared or not.
        let photos_removed: Vec<(Uuid, Option<String>)> = sqlx::query_as(
            r#"
            DELETE FROM pet_photos
            WHERE id IN (
                SELECT t.photo_id
                FROM pet_photo_tags t
                JOIN pets p ON p.id = t.pet_id
                WHERE p.profile_id = $1
            )
            RETURNING id, photo
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let pets_removed = sqlx::query("DELETE FROM pets WHERE profile_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(ProfileRemoval {
            pets_removed,
            photos_removed: photos_removed
                .into_iter()
                .map(|(id, photo)| RemovedPhoto { id, photo })
                .collect(),
        }))
    }

    async fn insert_pet(&self, pet: &Pet) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO pets (id, profile_id, name, type, date_of_birth) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(pet.id)
        .bind(pet.profile_id)
        .bind(&pet.name)
        .bind(pet.pet_type.as_str())
        .bind(pet.date_of_birth)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, DUPLICATE_PET_NAME))?;
        Ok(())
    }

    async fn get_pet(&self, id: Uuid) -> StoreResult<Option<Pet>> {
        let row = sqlx::query_as::<_, PetRow>(&format!("SELECT {PET_COLUMNS} FROM pets WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    async fn get_pets(&self, ids: &[Uuid]) -> StoreResult<Vec<Pet>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, PetRow>(&format!(
            "SELECT {PET_COLUMNS} FROM pets WHERE id = ANY($1) ORDER BY name"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_pets_by_profile(&self, profile_id: Uuid) -> StoreResult<Vec<Pet>> {
        let rows = sqlx::query_as::<_, PetRow>(&format!(
            "SELECT {PET_COLUMNS} FROM pets WHERE profile_id = $1 ORDER BY name"
        ))
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_pet(&self, pet: &Pet) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE pets SET name = $2, type = $3, date_of_birth = $4 WHERE id = $1",
        )
        .bind(pet.id)
        .bind(&pet.name)
        .bind(pet.pet_type.as_str())
        .bind(pet.date_of_birth)
        .execute(&self.pool)
        .await
        .map_err(|e| classify(e, DUPLICATE_PET_NAME))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_pet(&self, id: Uuid) -> StoreResult<Option<Vec<RemovedPhoto>>> {
        let mut tx = self.pool.begin().await?;

        let tagged_in: Vec<Uuid> =
            sqlx::query_scalar("SELECT photo_id FROM pet_photo_tags WHERE pet_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let deleted = sqlx::query("DELETE FROM pets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Ok(None);
        }

        let orphaned: Vec<(Uuid, Option<String>)> = sqlx::query_as(
            r#"
            DELETE FROM pet_photos p
            WHERE p.id = ANY($1)
              AND NOT EXISTS (SELECT 1 FROM pet_photo_tags t WHERE t.photo_id = p.id)
            RETURNING p.id, p.photo
            "#,
        )
        .bind(&tagged_in)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(
            orphaned
                .into_iter()
                .map(|(id, photo)| RemovedPhoto { id, photo })
                .collect(),
        ))
    }

    async fn insert_photo(&self, photo: &PetPhoto) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO pet_photos (id, photo, description, publication_date, likes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(photo.id)
        .bind(&photo.photo)
        .bind(&photo.description)
        .bind(photo.publication_date)
        .bind(photo.likes)
        .execute(&mut *tx)
        .await?;

        Self::write_tags(&mut tx, photo.id, &photo.tagged_pets).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_photo(&self, id: Uuid) -> StoreResult<Option<PetPhoto>> {
        let row = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM pet_photos WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_tags(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_photos(&self, limit: u32, offset: u32) -> StoreResult<(Vec<PetPhoto>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pet_photos")
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, PhotoRow>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM pet_photos ORDER BY publication_date DESC, id LIMIT $1 OFFSET $2"
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok((self.attach_tags(rows).await?, total as u64))
    }

    async fn photos_tagging_any(&self, pet_ids: &[Uuid]) -> StoreResult<Vec<PetPhoto>> {
        if pet_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, PhotoRow>(&format!(
            r#"
            SELECT {PHOTO_COLUMNS} FROM pet_photos
            WHERE id IN (SELECT photo_id FROM pet_photo_tags WHERE pet_id = ANY($1))
            ORDER BY publication_date DESC, id
            "#
        ))
        .bind(pet_ids)
        .fetch_all(&self.pool)
        .await?;

        self.attach_tags(rows).await
    }

    async fn update_photo(&self, photo: &PetPhoto) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE pet_photos SET description = $2 WHERE id = $1")
            .bind(photo.id)
            .bind(&photo.description)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if updated == 0 {
            return Ok(false);
        }

        sqlx::query("DELETE FROM pet_photo_tags WHERE photo_id = $1")
            .bind(photo.id)
            .execute(&mut *tx)
            .await?;
        Self::write_tags(&mut tx, photo.id, &photo.tagged_pets).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn increment_likes(&self, id: Uuid) -> StoreResult<Option<i64>> {
        let likes = sqlx::query_scalar(
            "UPDATE pet_photos SET likes = likes + 1 WHERE id = $1 RETURNING likes",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(likes)
    }

    async fn delete_photo(&self, id: Uuid) -> StoreResult<Option<PetPhoto>> {
        let Some(photo) = self.get_photo(id).await? else {
            return Ok(None);
        };
        let deleted = sqlx::query("DELETE FROM pet_photos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok((deleted > 0).then_some(photo))
    }
}
