//! Configuration types and parsing for `keel.yml` and schema files

use crate::error::{CoreError, CoreResult};
use crate::schema::{Change, Schema};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Advisory lock key shared by every Keel applier.
///
/// Must be identical across all processes targeting one database, otherwise
/// concurrent appliers are no longer serialized.
pub const DEFAULT_LOCK_KEY: i64 = 1_616_476_926_335_464_400;

/// Project configuration from `keel.yml`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Database URL (`postgres://...`, `duckdb:<path>`, `:memory:`)
    #[serde(default)]
    pub database_url: Option<String>,

    /// Path to the schema file, relative to the config file
    #[serde(default = "default_schema_path")]
    pub schema: PathBuf,

    /// Advisory lock key
    #[serde(default = "default_lock_key")]
    pub lock_key: i64,
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("schema.yml")
}

fn default_lock_key() -> i64 {
    DEFAULT_LOCK_KEY
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            schema: default_schema_path(),
            lock_key: DEFAULT_LOCK_KEY,
        }
    }
}

impl ProjectConfig {
    /// Load configuration from a file path
    ///
    /// A relative `schema` path is resolved against the config file's directory.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = read_file(path)?;
        let mut config: ProjectConfig =
            serde_yaml::from_str(&content).map_err(|source| CoreError::YamlParse {
                path: path.display().to_string(),
                source,
            })?;
        if config.schema.is_relative() {
            if let Some(dir) = path.parent() {
                config.schema = dir.join(&config.schema);
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Load `keel.yml` or `keel.yaml` from `dir`, falling back to defaults
    /// when neither exists.
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("keel.yml");
        let yaml_path = dir.join("keel.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            log::debug!("No keel.yml in {}, using defaults", dir.display());
            Ok(Self {
                schema: dir.join(default_schema_path()),
                ..Self::default()
            })
        }
    }

    fn validate(&self) -> CoreResult<()> {
        if let Some(url) = &self.database_url {
            if url.trim().is_empty() {
                return Err(CoreError::ConfigInvalid {
                    message: "database_url cannot be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// One change as written in a schema file: inline SQL or a path to a `.sql` file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChangeEntry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    statement: Option<String>,
    #[serde(default)]
    file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaFile {
    #[serde(default)]
    name: String,
    #[serde(default)]
    changes: Vec<ChangeEntry>,
}

/// Load a [`Schema`] from a YAML schema file.
///
/// `file:` entries are read relative to the schema file. Structural problems
/// such as an empty name or duplicate ids are left for
/// [`crate::validate_schema`] to report.
pub fn load_schema(path: &Path) -> CoreResult<Schema> {
    let content = read_file(path)?;
    let file: SchemaFile =
        serde_yaml::from_str(&content).map_err(|source| CoreError::YamlParse {
            path: path.display().to_string(),
            source,
        })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut schema = Schema::new(file.name);
    for entry in file.changes {
        let statement = match (entry.statement, entry.file) {
            (Some(sql), None) => sql,
            (None, Some(rel)) => read_file(&base.join(rel))?,
            (Some(_), Some(_)) => {
                return Err(CoreError::InvalidChange {
                    path: path.display().to_string(),
                    id: entry.id,
                    message: "set either 'statement' or 'file', not both".to_string(),
                })
            }
            (None, None) => {
                return Err(CoreError::InvalidChange {
                    path: path.display().to_string(),
                    id: entry.id,
                    message: "missing 'statement' or 'file'".to_string(),
                })
            }
        };
        schema.push(Change::new(entry.id, statement));
    }
    log::debug!(
        "Loaded schema '{}' with {} changes from {}",
        schema.name,
        schema.changes.len(),
        path.display()
    );
    Ok(schema)
}

fn read_file(path: &Path) -> CoreResult<String> {
    if !path.exists() {
        return Err(CoreError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
