//! Tauri command handlers. Each one runs a single pipeline and returns
//! its result, or an [`AppError`] the page shows inline.

pub mod audiobook;
pub mod chat;
pub mod files;
pub mod settings;
pub mod slides;
pub mod study;
pub mod summary;

use crate::artifacts::ArtifactStore;
use crate::config::Settings;
use crate::doc_processor::Upload;
use crate::error::AppError;
use crate::session::SessionStore;
use std::path::Path;

pub struct AppState {
    pub settings: Settings,
    pub session: SessionStore,
    pub artifacts: ArtifactStore,
}

/// Read the files the page picked, in the order given.
pub(crate) fn read_uploads(paths: &[String]) -> Result<Vec<Upload>, AppError> {
    paths
        .iter()
        .map(|p| Upload::from_path(Path::new(p)).map_err(AppError::from))
        .collect()
}
