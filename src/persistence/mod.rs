pub mod file;

use crate::project::Project;
use serde_json::Error as SerdeJsonError;
use std::io;
use thiserror::Error;

pub use file::{
    JsonFileStore, load_project_from_json, load_project_from_str, save_project_to_json,
    save_project_to_string,
};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] SerdeJsonError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Somewhere a project snapshot can be kept between solves.
pub trait ProjectStore {
    fn save_project(&self, project: &Project) -> PersistenceResult<()>;
    fn load_project(&self) -> PersistenceResult<Option<Project>>;
}
