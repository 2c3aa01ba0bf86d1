use serde_json::Value;
use std::path::{Path, PathBuf};

use super::{HolidayError, HolidaySource};

/// Reads the holiday list from a local JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct FileHolidaySource {
    path: PathBuf,
}

impl FileHolidaySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HolidaySource for FileHolidaySource {
    async fn fetch(&self) -> Result<Value, HolidayError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|err| {
            HolidayError::Unknown(format!("read {}: {err}", self.path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|err| {
            HolidayError::Parse(format!("{} is not valid JSON: {err}", self.path.display()))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
