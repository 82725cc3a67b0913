use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// One workflow per lifecycle action, pre-registered at controller startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Provision,
    Update,
    Delete,
    Archive,
}

impl WorkflowAction {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowAction::Provision => "provision",
            WorkflowAction::Update => "update",
            WorkflowAction::Delete => "delete",
            WorkflowAction::Archive => "archive",
        }
    }

    /// The workflow ID a fixed one-per-action registration uses.
    pub fn workflow_id(self) -> String {
        self.as_str().to_string()
    }
}

impl std::fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata tag on a workflow execution input, for observability only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Api,
    Controller,
}

impl TriggerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Api => "api",
            TriggerSource::Controller => "controller",
        }
    }
}

/// Structural shape of a workflow definition, validated by
/// [`crate::manager::WorkflowManager`] before it ever reaches a provider.
#[derive(Debug, Clone)]
pub struct WorkflowSpec {
    pub workflow_id: String,
    pub name: String,
    pub definition: Vec<u8>,
    pub timeout: Option<Duration>,
}

/// `^[a-z0-9-]{1,128}$`, checked byte-by-byte to avoid pulling in `regex`
/// for a single anchored character class.
pub fn validate_workflow_id(id: &str) -> Result<(), WorkflowError> {
    let len_ok = !id.is_empty() && id.len() <= 128;
    let chars_ok = id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
    if len_ok && chars_ok {
        Ok(())
    } else {
        Err(WorkflowError::InvalidSpec(format!(
            "workflow_id {id:?} must match ^[a-z0-9-]{{1,128}}$"
        )))
    }
}

/// Structural validation the manager performs before routing to a provider:
/// WorkflowID regex, non-empty Name, non-empty Definition, Timeout ≥ 0 if set.
pub fn validate_spec(spec: &WorkflowSpec) -> Result<(), WorkflowError> {
    validate_workflow_id(&spec.workflow_id)?;
    if spec.name.trim().is_empty() {
        return Err(WorkflowError::InvalidSpec("name must not be empty".into()));
    }
    if spec.definition.is_empty() {
        return Err(WorkflowError::InvalidSpec("definition must not be empty".into()));
    }
    // Duration is unsigned — "Timeout >= 0 if set" is always true once it
    // parses, but a zero timeout is still rejected as unusable.
    if let Some(timeout) = spec.timeout {
        if timeout.is_zero() {
            return Err(WorkflowError::InvalidSpec("timeout must be greater than zero if set".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_spec() -> WorkflowSpec {
        WorkflowSpec {
            workflow_id: "provision".into(),
            name: "Provision tenant".into(),
            definition: b"noop".to_vec(),
            timeout: None,
        }
    }

    #[test]
    fn accepts_valid_spec() {
        assert!(validate_spec(&valid_spec()).is_ok());
    }

    #[test]
    fn rejects_uppercase_workflow_id() {
        let mut s = valid_spec();
        s.workflow_id = "Provision".into();
        assert!(matches!(validate_spec(&s), Err(WorkflowError::InvalidSpec(_))));
    }

    #[test]
    fn rejects_empty_name() {
        let mut s = valid_spec();
        s.name = "".into();
        assert!(validate_spec(&s).is_err());
    }

    #[test]
    fn rejects_empty_definition() {
        let mut s = valid_spec();
        s.definition = vec![];
        assert!(validate_spec(&s).is_err());
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut s = valid_spec();
        s.timeout = Some(Duration::ZERO);
        assert!(validate_spec(&s).is_err());
    }
}
