//! Media upload and gallery service.
//!
//! Uploaded files live in a storage directory, their metadata in a SQL table;
//! [`service::GalleryService`] keeps the two in step.

pub mod config;
pub mod errors;
pub mod metadata;
pub mod routes;
pub mod service;
pub mod storage;

pub use errors::{GalleryError, Result};
