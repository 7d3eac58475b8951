//! Service layer modules for collaborators outside the store.
//!
//! Currently only local media storage for uploaded photos.

pub mod media;

pub use media::MediaStorage;
