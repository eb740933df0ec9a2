use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use itertools::Itertools;

use crate::errors::{EvalError, Result};

pub mod version;

/// Trait for host functions callable from constraint expressions.
pub trait Function: Send + Sync {
    fn name(&self) -> &str;
    fn arity(&self) -> RangeInclusive<usize>;
    fn call(&self, args: &[Value]) -> Result<Value>;
}

/// Adapts a closure into a [`Function`].
pub struct FnFunction<F> {
    name: String,
    arity: RangeInclusive<usize>,
    f: F,
}

impl<F> FnFunction<F>
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync,
{
    pub fn new(name: impl Into<String>, arity: RangeInclusive<usize>, f: F) -> Self {
        Self {
            name: name.into(),
            arity,
            f,
        }
    }
}

impl<F> Function for FnFunction<F>
where
    F: Fn(&[Value]) -> Result<Value> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> RangeInclusive<usize> {
        self.arity.clone()
    }

    fn call(&self, args: &[Value]) -> Result<Value> {
        (self.f)(args)
    }
}

pub(crate) fn describe_arity(arity: &RangeInclusive<usize>) -> String {
    if arity.start() == arity.end() {
        arity.start().to_string()
    } else {
        format!("{} to {}", arity.start(), arity.end())
    }
}

/// Thread-safe function registry. Clones share the same table until one of them registers.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<String, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with `validate_version`.
    pub fn with_builtins() -> Result<Self> {
        let mut reg = Self::new();
        reg.register(builtins::ValidateVersion)?;
        Ok(reg)
    }

    /// Fails with [`EvalError::DuplicateFunction`] when the name is already bound.
    pub fn register<F: Function + 'static>(&mut self, f: F) -> Result<()> {
        if self.inner.contains_key(f.name()) {
            return Err(EvalError::DuplicateFunction(f.name().to_string()));
        }
        let map = Arc::make_mut(&mut self.inner);
        map.insert(f.name().to_string(), Arc::new(f));
        Ok(())
    }

    pub fn register_fn<F>(&mut self, name: &str, arity: RangeInclusive<usize>, f: F) -> Result<()>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.register(FnFunction::new(name, arity, f))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str).sorted()
    }

    /// Looks up `name`, checks the argument count against its arity and invokes it.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let f = self
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        let arity = f.arity();
        if !arity.contains(&args.len()) {
            return Err(EvalError::Arity {
                function: name.to_string(),
                expected: describe_arity(&arity),
            });
        }
        f.call(args)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

pub mod builtins {
    use super::*;
    use crate::functions::version::{parse_version, VersionRange};

    pub const VALIDATE_VERSION: &str = "validate_version";

    /// `validate_version(version, constraint)`: whether `version` satisfies the range `constraint`.
    pub struct ValidateVersion;

    impl ValidateVersion {
        fn fail(message: impl Into<String>) -> EvalError {
            EvalError::Function {
                function: VALIDATE_VERSION.to_string(),
                message: message.into(),
            }
        }
    }

    impl Function for ValidateVersion {
        fn name(&self) -> &str {
            VALIDATE_VERSION
        }

        fn arity(&self) -> RangeInclusive<usize> {
            2..=2
        }

        fn call(&self, args: &[Value]) -> Result<Value> {
            let [version, constraint] = args else {
                return Err(EvalError::Arity {
                    function: VALIDATE_VERSION.to_string(),
                    expected: "2".to_string(),
                });
            };
            let Value::String(version) = version else {
                return Err(Self::fail("version should be a string"));
            };
            let Value::String(constraint) = constraint else {
                return Err(Self::fail("version constraint should be a string"));
            };

            let range = VersionRange::parse(constraint).map_err(|e| {
                tracing::debug!(%constraint, error = %e, "rejected version constraint");
                Self::fail(format!("constraint '{constraint}' is invalid"))
            })?;
            let version = parse_version(version).map_err(|e| {
                tracing::debug!(%version, error = %e, "rejected version");
                Self::fail(format!("version '{version}' is invalid"))
            })?;

            Ok(Value::Bool(range.matches(&version)))
        }
    }
}
