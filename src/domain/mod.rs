//! Domain types and forms
//!
//! Entities for profiles, pets and pet photos, with the input forms that
//! validate them before anything reaches the store.

pub mod pets;
pub mod photos;
pub mod profiles;

pub use pets::*;
pub use photos::*;
pub use profiles::*;

/// Treats blank optional text as absent.
pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
