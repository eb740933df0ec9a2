use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FactError;

static PROCESS_AGENT_ID: OnceLock<String> = OnceLock::new();

#[derive(Debug, Default, Serialize, Deserialize)]
struct AgentInfoFile {
    #[serde(default)]
    agent: AgentSection,
    #[serde(flatten)]
    other: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AgentSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(flatten)]
    other: BTreeMap<String, serde_yaml::Value>,
}

/// Release version of this build.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Agent id read from `path`, generated and written back when absent.
/// Without a path, an id is generated once per process.
pub fn agent_id(path: Option<&Path>) -> Result<String, FactError> {
    match path {
        Some(path) => load_or_create(path),
        None => Ok(PROCESS_AGENT_ID
            .get_or_init(|| Uuid::new_v4().to_string())
            .clone()),
    }
}

fn load_or_create(path: &Path) -> Result<String, FactError> {
    let mut info = match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => AgentInfoFile::default(),
        Ok(text) => serde_yaml::from_str(&text).map_err(|source| FactError::AgentInfo {
            path: path.to_path_buf(),
            source,
        })?,
        Err(e) if e.kind() == ErrorKind::NotFound => AgentInfoFile::default(),
        Err(source) => {
            return Err(FactError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if let Some(id) = info.agent.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }

    let id = Uuid::new_v4().to_string();
    info.agent.id = Some(id.clone());
    let text = serde_yaml::to_string(&info).map_err(|source| FactError::AgentInfo {
        path: path.to_path_buf(),
        source,
    })?;
    let write_err = |source| FactError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    fs::write(path, text).map_err(write_err)?;
    tracing::info!(path = %path.display(), agent_id = %id, "generated agent id");
    Ok(id)
}
