//! Runtime facts exposed to constraints as variables.

use std::path::PathBuf;

use serde::Deserialize;

use crate::context::VariableStore;
use crate::errors::FactError;

pub mod agent;
pub mod os;

/// `agent.id`: generated (standalone) or assigned (fleet) agent identifier.
pub const AGENT_ID: &str = "agent.id";
/// `agent.version`: release version of the running agent.
pub const AGENT_VERSION: &str = "agent.version";
/// `host.architecture`: e.g. x86_64, aarch64.
pub const HOST_ARCHITECTURE: &str = "host.architecture";
/// `os.family`: e.g. linux, windows, darwin.
pub const OS_FAMILY: &str = "os.family";
/// `os.kernel`: kernel release.
pub const OS_KERNEL: &str = "os.kernel";
/// `os.platform`: e.g. debian, redhat, windows.
pub const OS_PLATFORM: &str = "os.platform";
/// `os.version`: version of the operating system, e.g. 22.04.
pub const OS_VERSION: &str = "os.version";

pub const VARIABLE_NAMES: [&str; 7] = [
    AGENT_ID,
    AGENT_VERSION,
    HOST_ARCHITECTURE,
    OS_FAMILY,
    OS_KERNEL,
    OS_PLATFORM,
    OS_VERSION,
];

/// Source of the variable store.
pub trait FactProvider {
    fn gather(&self) -> Result<VariableStore, FactError>;
}

/// A fixed snapshot of facts. Also usable as a provider that always returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostFacts {
    pub agent_id: String,
    pub agent_version: String,
    pub architecture: String,
    pub os_family: String,
    pub os_kernel: String,
    pub os_platform: String,
    pub os_version: String,
}

impl FactProvider for HostFacts {
    fn gather(&self) -> Result<VariableStore, FactError> {
        Ok(VariableStore::from(self.clone()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FactsConfig {
    /// YAML file persisting the agent id. Without it the id lives for the process only.
    pub agent_info_path: Option<PathBuf>,
}

/// Queries the running host.
#[derive(Debug, Clone, Default)]
pub struct SystemFacts {
    config: FactsConfig,
}

impl SystemFacts {
    pub fn new(config: FactsConfig) -> Self {
        Self { config }
    }

    pub fn host_facts(&self) -> Result<HostFacts, FactError> {
        let os = os::OsInfo::detect()?;
        let agent_id = agent::agent_id(self.config.agent_info_path.as_deref())?;
        Ok(HostFacts {
            agent_id,
            agent_version: agent::version().to_string(),
            architecture: std::env::consts::ARCH.to_string(),
            os_family: os.family,
            os_kernel: os.kernel,
            os_platform: os.platform,
            os_version: os.version,
        })
    }
}

impl FactProvider for SystemFacts {
    fn gather(&self) -> Result<VariableStore, FactError> {
        let facts = self.host_facts()?;
        tracing::debug!(?facts, "gathered host facts");
        Ok(VariableStore::from(facts))
    }
}
