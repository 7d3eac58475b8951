//! Pet domain types

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::FieldErrors;
use crate::validators::date_of_birth_in_range;

/// Message returned when an owner already has a pet with the submitted name.
pub const DUPLICATE_PET_NAME: &str = "Pet with this name already exists for this profile";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PetType {
    Cat,
    Dog,
    Bunny,
    Parrot,
    Fish,
    Other,
}

impl PetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cat => "Cat",
            Self::Dog => "Dog",
            Self::Bunny => "Bunny",
            Self::Parrot => "Parrot",
            Self::Fish => "Fish",
            Self::Other => "Other",
        }
    }

    /// Parses a submitted choice; `None` for anything outside the list.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Cat" => Some(Self::Cat),
            "Dog" => Some(Self::Dog),
            "Bunny" => Some(Self::Bunny),
            "Parrot" => Some(Self::Parrot),
            "Fish" => Some(Self::Fish),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn from_db(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::Other)
    }
}

/// Pet entity, owned by exactly one profile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pet {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: PetType,
    pub date_of_birth: Option<NaiveDate>,
}

impl Pet {
    /// Builds a new pet from a validated form.
    pub fn new(profile_id: Uuid, form: PetForm, pet_type: PetType) -> Self {
        Self {
            id: Uuid::new_v4(),
            profile_id,
            name: form.name,
            pet_type,
            date_of_birth: form.date_of_birth,
        }
    }

    /// Age in whole calendar years: `today.year - birth.year`, no day adjustment.
    pub fn age_on(&self, today: NaiveDate) -> Option<i32> {
        self.date_of_birth.map(|dob| today.year() - dob.year())
    }

    pub fn age(&self) -> Option<i32> {
        self.age_on(Utc::now().date_naive())
    }

    /// Applies an edit; the owner is never changed.
    pub fn apply(&mut self, form: PetForm, pet_type: PetType) {
        self.name = form.name;
        self.pet_type = pet_type;
        self.date_of_birth = form.date_of_birth;
    }
}

/// Pet create/edit form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PetForm {
    #[validate(length(min = 1, max = 30, message = "Ensure this value has between 1 and 30 characters"))]
    pub name: String,

    /// Kept as text so an unknown choice becomes a field error.
    #[serde(rename = "type")]
    pub pet_type: Option<String>,

    pub date_of_birth: Option<NaiveDate>,
}

impl PetForm {
    pub fn initial(pet: &Pet) -> Self {
        Self {
            name: pet.name.clone(),
            pet_type: Some(pet.pet_type.as_str().to_string()),
            date_of_birth: pet.date_of_birth,
        }
    }

    /// Checks shared by create and edit; returns the selected type.
    fn validate_fields(&self) -> (FieldErrors, Option<PetType>) {
        let mut errors: FieldErrors = match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => e.into(),
        };
        let pet_type = match self.pet_type.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("type", "This field is required.");
                None
            }
            Some(raw) => {
                let parsed = PetType::parse(raw);
                if parsed.is_none() {
                    errors.add(
                        "type",
                        format!("Select a valid choice. {raw} is not one of the available choices."),
                    );
                }
                parsed
            }
        };
        (errors, pet_type)
    }

    pub fn validate_for_create(&self) -> Result<PetType, FieldErrors> {
        match self.validate_fields() {
            (errors, Some(pet_type)) if errors.is_empty() => Ok(pet_type),
            (errors, _) => Err(errors),
        }
    }

    /// Edit additionally bounds a present date of birth to `[1920-01-01, today]`.
    /// A cleared date is accepted as-is.
    pub fn validate_for_edit(&self, today: NaiveDate) -> Result<PetType, FieldErrors> {
        let (mut errors, pet_type) = self.validate_fields();
        if let Some(dob) = self.date_of_birth {
            if let Err(e) = date_of_birth_in_range(dob, today) {
                errors.add_error("date_of_birth", &e);
            }
        }
        match pet_type {
            Some(pet_type) if errors.is_empty() => Ok(pet_type),
            _ => Err(errors),
        }
    }

    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

/// Response DTO for pet, with the derived age
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PetResponse {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub pet_type: PetType,
    pub date_of_birth: Option<NaiveDate>,
    pub age: Option<i32>,
}

impl From<Pet> for PetResponse {
    fn from(p: Pet) -> Self {
        let age = p.age();
        Self {
            id: p.id,
            profile_id: p.profile_id,
            name: p.name,
            pet_type: p.pet_type,
            date_of_birth: p.date_of_birth,
            age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(name: &str, dob: Option<NaiveDate>) -> PetForm {
        PetForm {
            name: name.into(),
            pet_type: Some("Dog".into()),
            date_of_birth: dob,
        }
    }

    #[test]
    fn age_ignores_month_and_day() {
        let pet = Pet::new(Uuid::new_v4(), form("Rex", Some(date(2020, 12, 31))), PetType::Dog);
        assert_eq!(pet.age_on(date(2021, 1, 1)), Some(1));
        assert_eq!(pet.age_on(date(2020, 12, 31)), Some(0));

        let unborn = Pet::new(Uuid::new_v4(), form("Milo", None), PetType::Cat);
        assert_eq!(unborn.age_on(date(2021, 1, 1)), None);
    }

    #[test]
    fn create_requires_name_and_type() {
        let empty = PetForm::default();
        let errors = empty.validate_for_create().unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("type").is_some());

        let long = form(&"x".repeat(31), None);
        assert!(long.validate_for_create().unwrap_err().get("name").is_some());
        assert_eq!(form(&"x".repeat(30), None).validate_for_create(), Ok(PetType::Dog));
    }

    #[test]
    fn create_does_not_bound_date_of_birth() {
        let ancient = form("Rex", Some(date(1900, 1, 1)));
        assert!(ancient.validate_for_create().is_ok());
    }

    #[test]
    fn edit_bounds_date_of_birth_when_present() {
        let today = date(2024, 6, 1);
        assert!(form("Rex", Some(date(1920, 1, 1))).validate_for_edit(today).is_ok());
        assert!(form("Rex", Some(today)).validate_for_edit(today).is_ok());
        assert!(form("Rex", None).validate_for_edit(today).is_ok());

        let errors = form("Rex", Some(date(1919, 12, 31))).validate_for_edit(today).unwrap_err();
        assert!(errors.get("date_of_birth").is_some());
        let errors = form("Rex", Some(date(2024, 6, 2))).validate_for_edit(today).unwrap_err();
        assert!(errors.get("date_of_birth").is_some());
    }

    #[test]
    fn type_serializes_under_its_wire_name() {
        let json = serde_json::json!({ "name": "Rex", "type": "Parrot" });
        let parsed: PetForm = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.validate_for_create(), Ok(PetType::Parrot));
        assert_eq!(PetType::from_db("Lizard"), PetType::Other);
    }

    #[test]
    fn unknown_type_is_a_field_error() {
        let mut lizard = form("Rex", None);
        lizard.pet_type = Some("Lizard".into());
        let errors = lizard.validate_for_create().unwrap_err();
        assert_eq!(
            errors.get("type"),
            Some(&["Select a valid choice. Lizard is not one of the available choices.".to_string()][..])
        );
        assert!(errors.get("name").is_none());
    }
}
