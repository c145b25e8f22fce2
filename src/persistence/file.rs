use super::{PersistenceError, PersistenceResult, ProjectStore};
use crate::project::Project;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

const SNAPSHOT_VERSION: u32 = 1;

fn snapshot_version() -> u32 {
    SNAPSHOT_VERSION
}

#[derive(Serialize, Deserialize)]
struct ProjectSnapshot {
    #[serde(default = "snapshot_version")]
    version: u32,
    project: Project,
}

impl ProjectSnapshot {
    fn from_project(project: &Project) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            project: project.clone(),
        }
    }

    fn into_project(self) -> PersistenceResult<Project> {
        if self.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::InvalidData(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        if let Some(fact_date) = self.project.fact_date {
            if fact_date < self.project.start {
                return Err(PersistenceError::InvalidData(format!(
                    "fact date {fact_date} is before project start {}",
                    self.project.start
                )));
            }
        }
        Ok(self.project)
    }
}

pub fn save_project_to_json<P: AsRef<Path>>(project: &Project, path: P) -> PersistenceResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &ProjectSnapshot::from_project(project))?;
    Ok(())
}

pub fn load_project_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Project> {
    let file = File::open(path)?;
    let snapshot: ProjectSnapshot = serde_json::from_reader(BufReader::new(file))?;
    snapshot.into_project()
}

pub fn save_project_to_string(project: &Project) -> PersistenceResult<String> {
    Ok(serde_json::to_string_pretty(&ProjectSnapshot::from_project(project))?)
}

pub fn load_project_from_str(raw: &str) -> PersistenceResult<Project> {
    let snapshot: ProjectSnapshot = serde_json::from_str(raw)?;
    snapshot.into_project()
}

/// Keeps a single project snapshot in one JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProjectStore for JsonFileStore {
    fn save_project(&self, project: &Project) -> PersistenceResult<()> {
        save_project_to_json(project, &self.path)
    }

    fn load_project(&self) -> PersistenceResult<Option<Project>> {
        match load_project_from_json(&self.path) {
            Ok(project) => Ok(Some(project)),
            Err(PersistenceError::Io(err)) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}
