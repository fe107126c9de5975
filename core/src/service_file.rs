//! libpq-style connection service files.
//!
//! Format: `[service]` headers followed by `key=value` lines. Leading
//! whitespace is ignored, as are blank lines and lines starting with `#`.
//! The benchmark reads `dbname` as the database path.

use crate::error::{BenchError, BenchResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const SERVICE_FILE_ENV: &str = "PGSERVICEFILE";
pub const DEFAULT_SERVICE_FILE: &str = ".pg_service.conf";

pub type ServiceSection = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct ServiceFile {
    sections: HashMap<String, ServiceSection>,
}

impl ServiceFile {
    pub fn parse(content: &str) -> BenchResult<Self> {
        let mut sections: HashMap<String, ServiceSection> = HashMap::new();
        let mut current: Option<String> = None;

        for (idx, raw) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_start();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| BenchError::ServiceFile {
                    line:    line_no,
                    message: "missing ]".into(),
                })?;
                sections.insert(name.to_string(), ServiceSection::new());
                current = Some(name.to_string());
                continue;
            }
            let section = current
                .as_ref()
                .and_then(|name| sections.get_mut(name))
                .ok_or_else(|| BenchError::ServiceFile {
                    line:    line_no,
                    message: "not in section".into(),
                })?;
            let (key, value) = line.split_once('=').ok_or_else(|| BenchError::ServiceFile {
                line:    line_no,
                message: "bad syntax".into(),
            })?;
            section.insert(key.to_string(), value.to_string());
        }
        Ok(Self { sections })
    }

    pub fn load_from(path: &Path) -> BenchResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Load the file named by `PGSERVICEFILE`, else `~/.pg_service.conf`.
    pub fn load() -> BenchResult<Self> {
        let path = Self::locate().ok_or_else(|| {
            BenchError::InvalidConfig(format!(
                "no service file: set {SERVICE_FILE_ENV} or HOME"
            ))
        })?;
        log::debug!("reading service file {}", path.display());
        Self::load_from(&path)
    }

    pub fn locate() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(SERVICE_FILE_ENV) {
            return Some(PathBuf::from(path));
        }
        std::env::var_os("HOME").map(|home| Path::new(&home).join(DEFAULT_SERVICE_FILE))
    }

    pub fn sections(&self) -> &HashMap<String, ServiceSection> {
        &self.sections
    }

    pub fn service(&self, name: &str) -> BenchResult<&ServiceSection> {
        self.sections.get(name).ok_or_else(|| BenchError::UnknownService {
            name: name.to_string(),
        })
    }

    /// The database a service points at (its `dbname` key).
    pub fn database(&self, name: &str) -> BenchResult<String> {
        let service = self.service(name)?;
        service.get("dbname").cloned().ok_or_else(|| {
            BenchError::InvalidConfig(format!("service {name} has no dbname"))
        })
    }
}
