use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while parsing or evaluating a constraint expression.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function}: invalid number of arguments, expecting {expected}")]
    Arity { function: String, expected: String },

    // Raised by a registered function itself.
    #[error("{function}: {message}")]
    Function { function: String, message: String },

    #[error("type error: {0}")]
    Type(String),

    #[error("function '{0}' is already registered")]
    DuplicateFunction(String),
}

pub type Result<T> = std::result::Result<T, EvalError>;

/// Failure to query the hosting environment.
#[derive(Debug, Error)]
pub enum FactError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run '{command}': {source}")]
    Command {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}")]
    CommandStatus { command: String, status: String },

    #[error("invalid agent info in {path}: {source}")]
    AgentInfo {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("host fact '{0}' is unavailable")]
    Missing(&'static str),
}

/// Failure to build the evaluation context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("gathering host facts: {0}")]
    Facts(#[from] FactError),

    #[error("registering functions: {0}")]
    Registry(#[from] EvalError),
}

/// Failure to mutate the configuration tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("'{path}' is not an object")]
    NotAnObject { path: String },
}

/// Errors aborting a datasource filter pass.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("constraints not a list for datasource '{datasource}'")]
    ConstraintsNotList { datasource: String },

    #[error("constraints is not a string for datasource '{datasource}'")]
    ConstraintNotString { datasource: String },

    #[error("constraint '{constraint}' failed for datasource '{datasource}': {source}")]
    Constraint {
        constraint: String,
        datasource: String,
        #[source]
        source: EvalError,
    },

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("rewriting datasources: {0}")]
    Tree(#[from] TreeError),
}
