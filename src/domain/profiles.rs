//! Profile domain types
//!
//! One profile per user, plus the signup/edit forms and the read-only
//! aggregates shown on the profile page.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::pets::PetResponse;
use super::photos::PetPhoto;
use super::blank_to_none;
use crate::validators::only_letters;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    #[default]
    #[serde(rename = "Do not show")]
    DoNotShow,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::DoNotShow => "Do not show",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Male" => Some(Self::Male),
            "Female" => Some(Self::Female),
            "Do not show" => Some(Self::DoNotShow),
            _ => None,
        }
    }

    /// Parses a stored value; anything unknown reads as `DoNotShow`.
    pub fn from_db(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }
}

fn gender_choice(value: &str) -> Result<(), ValidationError> {
    match Gender::parse(value) {
        Some(_) => Ok(()),
        None => Err(ValidationError::new("choice").with_message(
            format!("Select a valid choice. {value} is not one of the available choices.").into(),
        )),
    }
}

/// User profile entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub picture: String,
    pub date_of_birth: Option<NaiveDate>,
    pub description: Option<String>,
    pub email: Option<String>,
    pub gender: Gender,
}

impl Profile {
    pub fn new(form: CreateProfileRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: form.first_name,
            last_name: form.last_name,
            picture: form.picture,
            date_of_birth: None,
            description: None,
            email: None,
            gender: Gender::default(),
        }
    }

    /// Applies a validated edit. An absent gender keeps the stored one.
    pub fn apply(&mut self, form: EditProfileRequest) {
        self.first_name = form.first_name;
        self.last_name = form.last_name;
        self.picture = form.picture;
        self.date_of_birth = form.date_of_birth;
        self.description = form.description;
        self.email = form.email;
        if let Some(gender) = form.gender.as_deref().and_then(Gender::parse) {
            self.gender = gender;
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Signup form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CreateProfileRequest {
    #[validate(
        length(min = 2, max = 30, message = "Ensure this value has between 2 and 30 characters"),
        custom(function = "only_letters")
    )]
    pub first_name: String,

    #[validate(
        length(min = 2, max = 30, message = "Ensure this value has between 2 and 30 characters"),
        custom(function = "only_letters")
    )]
    pub last_name: String,

    #[validate(url(message = "Enter a valid URL"))]
    pub picture: String,
}

impl CreateProfileRequest {
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.picture = self.picture.trim().to_string();
        self
    }
}

/// Full profile edit form
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EditProfileRequest {
    #[validate(
        length(min = 2, max = 30, message = "Ensure this value has between 2 and 30 characters"),
        custom(function = "only_letters")
    )]
    pub first_name: String,

    #[validate(
        length(min = 2, max = 30, message = "Ensure this value has between 2 and 30 characters"),
        custom(function = "only_letters")
    )]
    pub last_name: String,

    #[validate(url(message = "Enter a valid URL"))]
    pub picture: String,

    pub date_of_birth: Option<NaiveDate>,

    pub description: Option<String>,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,

    #[validate(custom(function = "gender_choice"))]
    pub gender: Option<String>,
}

impl EditProfileRequest {
    /// Initial values for the edit form.
    ///
    /// The gender shown always starts at "Do not show"; the stored value is
    /// only replaced when the form is submitted with a gender.
    pub fn initial(profile: &Profile) -> Self {
        Self {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            picture: profile.picture.clone(),
            date_of_birth: profile.date_of_birth,
            description: profile.description.clone(),
            email: profile.email.clone(),
            gender: Some(Gender::DoNotShow.as_str().to_string()),
        }
    }

    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.picture = self.picture.trim().to_string();
        self.description = blank_to_none(self.description);
        self.email = blank_to_none(self.email.map(|e| e.trim().to_string()));
        self.gender = blank_to_none(self.gender);
        self
    }
}

/// Response for a successful signup: the profile plus a bearer token for it.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileCreated {
    pub profile: Profile,
    pub token: String,
}

/// Profile page aggregates, recomputed on every request
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDashboard {
    pub profile: Profile,
    pub pets: Vec<PetResponse>,
    pub total_pet_photos_count: usize,
    pub total_likes_count: i64,
}

impl ProfileDashboard {
    /// Counts each photo once even when it tags several of the pets.
    pub fn build(profile: Profile, pets: Vec<PetResponse>, photos: &[PetPhoto]) -> Self {
        let mut seen = HashSet::new();
        let distinct: Vec<&PetPhoto> = photos.iter().filter(|p| seen.insert(p.id)).collect();

        Self {
            profile,
            pets,
            total_pet_photos_count: distinct.len(),
            total_likes_count: distinct.iter().map(|p| p.likes).sum(),
        }
    }
}

/// What a profile deletion will remove, shown before confirming.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileDeletePreview {
    pub profile: Profile,
    pub pets: Vec<PetResponse>,
    pub photos_to_delete: usize,
}
