use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::errors::{ContextError, Result};
use crate::expression::{self, Variables};
use crate::facts::{self, FactProvider, HostFacts, SystemFacts};
use crate::functions::Registry;

/// The fixed set of variables constraints can reference. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct VariableStore {
    vars: BTreeMap<&'static str, String>,
}

impl VariableStore {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.vars.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl From<HostFacts> for VariableStore {
    fn from(f: HostFacts) -> Self {
        let vars = BTreeMap::from([
            (facts::AGENT_ID, f.agent_id),
            (facts::AGENT_VERSION, f.agent_version),
            (facts::HOST_ARCHITECTURE, f.architecture),
            (facts::OS_FAMILY, f.os_family),
            (facts::OS_KERNEL, f.os_kernel),
            (facts::OS_PLATFORM, f.os_platform),
            (facts::OS_VERSION, f.os_version),
        ]);
        Self { vars }
    }
}

impl Variables for VariableStore {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.get(name).map(|v| Value::String(v.to_string()))
    }
}

/// Variables plus the functions constraint expressions may call.
#[derive(Debug, Clone)]
pub struct EvalContext {
    vars: VariableStore,
    registry: Registry,
}

impl EvalContext {
    pub fn new(vars: VariableStore, registry: Registry) -> Self {
        Self { vars, registry }
    }

    /// Built-in functions plus facts from `provider`.
    pub fn from_provider(provider: &dyn FactProvider) -> std::result::Result<Self, ContextError> {
        let registry = Registry::with_builtins()?;
        let vars = provider.gather()?;
        Ok(Self::new(vars, registry))
    }

    pub fn vars(&self) -> &VariableStore {
        &self.vars
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn evaluate(&self, constraint: &str) -> Result<bool> {
        expression::eval(constraint, &self.registry, &self.vars)
    }
}

static SHARED: OnceLock<Arc<EvalContext>> = OnceLock::new();
static BUILD: Mutex<()> = Mutex::new(());

/// Process-wide context built from the running host on first use.
pub fn shared_context() -> std::result::Result<Arc<EvalContext>, ContextError> {
    shared_context_with(&SystemFacts::default())
}

/// Like [`shared_context`], but the first successful call decides the facts.
/// Later calls return the cached context and ignore `provider`. Failures are not cached.
pub fn shared_context_with(
    provider: &dyn FactProvider,
) -> std::result::Result<Arc<EvalContext>, ContextError> {
    if let Some(ctx) = SHARED.get() {
        return Ok(Arc::clone(ctx));
    }

    let _guard = BUILD.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(ctx) = SHARED.get() {
        return Ok(Arc::clone(ctx));
    }
    let ctx = Arc::new(EvalContext::from_provider(provider)?);
    tracing::debug!(
        variables = ctx.vars().len(),
        functions = ctx.registry().len(),
        "built constraint evaluation context"
    );
    Ok(Arc::clone(SHARED.get_or_init(|| ctx)))
}
