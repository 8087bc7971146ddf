//! Error types for the evaluation core.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// A context was consulted while no event was bound to it.
    #[error("No event bound to evaluation context")]
    NoEventBound,
    #[error("Field not found: {0}")]
    FieldNotFound(String),
    #[error("Field '{field}' is not applicable to '{event_type}' events")]
    FieldNotApplicable { field: String, event_type: String },
    #[error("Field '{field}' has type {found}, expected {expected}")]
    FieldTypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("Resolver error: {0}")]
    Resolver(String),
    /// An element operand referenced a register no iteration node has bound.
    #[error("Register {0} is not bound")]
    RegisterNotBound(u32),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Configuration IO error: {0}")]
    ConfigIo(String),
    #[error("Configuration parsing error: {0}")]
    ConfigParse(String),
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl EvalError {
    /// Whether the error only means "this field has no value for this event".
    ///
    /// The evaluator folds these into a false comparison instead of failing the rule.
    pub fn is_field_absent(&self) -> bool {
        matches!(
            self,
            EvalError::FieldNotFound(_)
                | EvalError::FieldNotApplicable { .. }
                | EvalError::FieldTypeMismatch { .. }
                | EvalError::Resolver(_)
        )
    }
}

impl From<std::io::Error> for EvalError {
    fn from(err: std::io::Error) -> Self {
        EvalError::ConfigIo(err.to_string())
    }
}

impl From<serde_yaml::Error> for EvalError {
    fn from(err: serde_yaml::Error) -> Self {
        EvalError::ConfigParse(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::Snapshot(err.to_string())
    }
}

impl From<regex::Error> for EvalError {
    fn from(err: regex::Error) -> Self {
        EvalError::InvalidPattern(err.to_string())
    }
}

impl From<ipnet::AddrParseError> for EvalError {
    fn from(err: ipnet::AddrParseError) -> Self {
        EvalError::InvalidCidr(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_no_event_bound() {
        let error = EvalError::NoEventBound;
        assert_eq!(error.to_string(), "No event bound to evaluation context");
        assert!(error.source().is_none());
        assert!(!error.is_field_absent());
    }

    #[test]
    fn test_field_not_applicable() {
        let error = EvalError::FieldNotApplicable {
            field: "exec.file.path".to_string(),
            event_type: "open".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Field 'exec.file.path' is not applicable to 'open' events"
        );
        assert!(error.is_field_absent());
    }

    #[test]
    fn test_type_mismatch_display() {
        let error = EvalError::FieldTypeMismatch {
            field: "process.pid".to_string(),
            expected: "string",
            found: "int",
        };
        assert_eq!(
            error.to_string(),
            "Field 'process.pid' has type int, expected string"
        );
    }

    #[test]
    fn test_field_absent_classification() {
        assert!(EvalError::FieldNotFound("a".into()).is_field_absent());
        assert!(EvalError::Resolver("lookup failed".into()).is_field_absent());
        assert!(!EvalError::InvalidPattern("[".into()).is_field_absent());
        assert!(!EvalError::InvalidConfig("max_idle".into()).is_field_absent());
        assert!(!EvalError::RegisterNotBound(3).is_field_absent());
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EvalError = io_error.into();
        match err {
            EvalError::ConfigIo(msg) => assert!(msg.contains("file not found")),
            _ => panic!("Expected ConfigIo variant"),
        }
    }

    #[test]
    fn test_from_yaml_error() {
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>("invalid: yaml: [").unwrap_err();
        let err: EvalError = yaml_err.into();
        assert!(matches!(err, EvalError::ConfigParse(_)));
    }

    #[test]
    fn test_from_regex_and_cidr_errors() {
        let regex_err = regex::Regex::new("(unclosed").unwrap_err();
        assert!(matches!(
            EvalError::from(regex_err),
            EvalError::InvalidPattern(_)
        ));

        let cidr_err = "10.0.0.0/33".parse::<ipnet::IpNet>().unwrap_err();
        assert!(matches!(EvalError::from(cidr_err), EvalError::InvalidCidr(_)));
    }

    #[test]
    fn test_error_clone_and_equality() {
        let error = EvalError::FieldNotFound("open.file.path".to_string());
        assert_eq!(error.clone(), error);
        assert_ne!(error, EvalError::NoEventBound);
    }
}
