//! Petstagram: profiles, pets and tagged pet photos over HTTP.

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod logging;
pub mod routes;
pub mod services;
pub mod store;
pub mod validators;
