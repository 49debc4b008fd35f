//! Object validation
//!
//! Validators collect every problem they find instead of stopping at the
//! first one, so a client sees all of them in one response.

use crate::types::{Container, ContainerManifest, Minion, Pod};
use crate::SUPPORTED_MANIFEST_VERSIONS;
use std::collections::HashSet;
use std::fmt;

const DNS_LABEL_MAX_LEN: usize = 63;
const DNS_SUBDOMAIN_MAX_LEN: usize = 253;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    Required,
    Invalid,
    NotSupported,
    Duplicate,
}

impl ValidationErrorKind {
    fn describe(self) -> &'static str {
        match self {
            ValidationErrorKind::Required => "required value",
            ValidationErrorKind::Invalid => "invalid value",
            ValidationErrorKind::NotSupported => "unsupported value",
            ValidationErrorKind::Duplicate => "duplicate value",
        }
    }
}

/// One problem with one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field
    pub field: String,
    pub kind: ValidationErrorKind,
    /// The offending value, empty for `Required`
    pub value: String,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind,
            value: value.into(),
        }
    }

    fn prefixed(mut self, prefix: &str) -> Self {
        self.field = format!("{prefix}.{}", self.field);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value.is_empty() {
            write!(f, "{}: {}", self.field, self.kind.describe())
        } else {
            write!(f, "{}: {} {:?}", self.field, self.kind.describe(), self.value)
        }
    }
}

/// All problems found in one object. Empty means valid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList(pub Vec<ValidationError>);

impl ErrorList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// `Ok` when no problem was recorded.
    pub fn into_result(self) -> Result<(), ErrorList> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    fn extend_prefixed(&mut self, prefix: &str, other: ErrorList) {
        self.0.extend(other.0.into_iter().map(|e| e.prefixed(prefix)));
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

/// True if `value` is a lowercase RFC 1123 label.
pub fn is_dns_label(value: &str) -> bool {
    if value.is_empty() || value.len() > DNS_LABEL_MAX_LEN {
        return false;
    }
    let bytes = value.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    edge_ok(bytes[0])
        && edge_ok(bytes[bytes.len() - 1])
        && bytes
            .iter()
            .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// True if `value` is a dot-separated sequence of DNS labels.
pub fn is_dns_subdomain(value: &str) -> bool {
    !value.is_empty() && value.len() <= DNS_SUBDOMAIN_MAX_LEN && value.split('.').all(is_dns_label)
}

fn validate_containers(containers: &[Container]) -> ErrorList {
    let mut errors = ErrorList::default();
    let mut seen = HashSet::new();
    for (i, container) in containers.iter().enumerate() {
        let field = format!("containers[{i}]");
        if container.name.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::Required,
                format!("{field}.name"),
                "",
            ));
        } else if !is_dns_label(&container.name) {
            errors.push(ValidationError::new(
                ValidationErrorKind::Invalid,
                format!("{field}.name"),
                container.name.as_str(),
            ));
        } else if !seen.insert(container.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::Duplicate,
                format!("{field}.name"),
                container.name.as_str(),
            ));
        }
        if container.image.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::Required,
                format!("{field}.image"),
                "",
            ));
        }
    }
    errors
}

/// Validates a container manifest.
pub fn validate_manifest(manifest: &ContainerManifest) -> ErrorList {
    let mut errors = ErrorList::default();
    if manifest.version.is_empty() {
        errors.push(ValidationError::new(ValidationErrorKind::Required, "version", ""));
    } else if !SUPPORTED_MANIFEST_VERSIONS.contains(&manifest.version.as_str()) {
        errors.push(ValidationError::new(
            ValidationErrorKind::NotSupported,
            "version",
            manifest.version.as_str(),
        ));
    }
    if !manifest.id.is_empty() && !is_dns_subdomain(&manifest.id) {
        errors.push(ValidationError::new(
            ValidationErrorKind::Invalid,
            "id",
            manifest.id.as_str(),
        ));
    }
    for error in validate_containers(&manifest.containers).0 {
        errors.push(error);
    }
    errors
}

/// Validates a pod as submitted for create or update.
pub fn validate_pod(pod: &Pod) -> ErrorList {
    let mut errors = ErrorList::default();
    if pod.id.is_empty() {
        errors.push(ValidationError::new(ValidationErrorKind::Required, "id", ""));
    } else if !is_dns_subdomain(&pod.id) {
        errors.push(ValidationError::new(ValidationErrorKind::Invalid, "id", pod.id.as_str()));
    }
    errors.extend_prefixed(
        "desiredState.manifest",
        validate_manifest(&pod.desired_state.manifest),
    );
    errors
}

/// Validates a minion.
pub fn validate_minion(minion: &Minion) -> ErrorList {
    let mut errors = ErrorList::default();
    if minion.id.is_empty() {
        errors.push(ValidationError::new(ValidationErrorKind::Required, "id", ""));
    }
    errors
}
