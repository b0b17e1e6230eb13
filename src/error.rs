//! Error taxonomy
//!
//! Resource-scoped failures (`TransportError`, `MalformedEvent`) never leave
//! the resource they belong to. Release-level failures (`ReleaseFetchError`)
//! tear the whole view down. `ParseError` rejects one manifest snapshot.

/// The manifest text could not be tokenized at all
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to parse manifest: {message}")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the offending token, when known
    pub line: Option<usize>,
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        Self {
            line: err.location().map(|l| l.line()),
            message: err.to_string(),
        }
    }
}

/// Failure of one resource's live connection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to open watch: {0}")]
    Open(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Watch stopped after {0} consecutive errors")]
    Exhausted(u32),

    #[error("Failed to fetch resource: {0}")]
    Fetch(String),
}

/// Failure to load the release that owns the manifest
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReleaseFetchError {
    #[error("Release {name} not found in namespace {namespace}")]
    NotFound { name: String, namespace: String },

    #[error("Kubernetes API error: {0}")]
    Api(String),

    #[error("Failed to decode release: {0}")]
    Decode(String),
}

/// Inbound watch payload that cannot be routed to a resource
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedEvent {
    #[error("payload is not an object")]
    NotAnObject,

    #[error("payload has no kind")]
    MissingKind,

    #[error("payload has no metadata.name")]
    MissingName,

    #[error("payload {found} does not match watched resource {expected}")]
    TargetMismatch { expected: String, found: String },
}

/// Failure of a release refresh: either the release could not be loaded or
/// its manifest could not be parsed
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] ReleaseFetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_from_yaml() {
        let err = serde_yaml::from_str::<serde_yaml::Value>("a: [b").unwrap_err();
        let parse: ParseError = err.into();
        assert!(parse.message.len() > 0);
        assert!(parse.to_string().starts_with("Failed to parse manifest"));
    }

    #[test]
    fn test_error_messages() {
        let err = ReleaseFetchError::NotFound {
            name: "blog".to_string(),
            namespace: "web".to_string(),
        };
        assert_eq!(err.to_string(), "Release blog not found in namespace web");
        assert_eq!(
            TransportError::Exhausted(5).to_string(),
            "Watch stopped after 5 consecutive errors"
        );
        assert_eq!(
            MalformedEvent::TargetMismatch {
                expected: "Service/a".to_string(),
                found: "Service/b".to_string(),
            }
            .to_string(),
            "payload Service/b does not match watched resource Service/a"
        );
        let refresh: RefreshError = ReleaseFetchError::Api("timeout".to_string()).into();
        assert_eq!(refresh.to_string(), "Kubernetes API error: timeout");
    }
}
