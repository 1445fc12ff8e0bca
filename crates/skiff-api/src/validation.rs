//! Pre-flight validation of payloads and identifiers.
//!
//! Checks run before any request is sent. All violations are collected in
//! field declaration order into one [`ValidationError`]; its message names
//! the first violation and counts the rest.
//!
//! ```
//! use skiff_api::{App, validation::{validate_app, Mode}};
//!
//! let app = App::new("node", "mikemichel/lets-chat").with_port(5000).with_port(5000);
//! let err = validate_app(&app, Mode::Create).unwrap_err();
//! assert_eq!(err.violations().len(), 1);
//! ```

use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::types::{App, Project, ResourceKind};

/// Unit-suffixed volume size such as `8GB` or `512MB`.
static VOLUME_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+)?(B|KB|MB|GB|TB)$").unwrap_or_else(|_| unreachable!())
});

/// What was wrong with a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    /// A required value was absent.
    Missing,
    /// A value was present but empty.
    Empty,
    /// A numeric value was outside the allowed range.
    OutOfRange {
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
        /// Value provided.
        actual: u64,
    },
    /// A value that must be unique appeared more than once.
    Duplicate {
        /// The repeated value.
        value: String,
    },
    /// A value did not match the expected format.
    InvalidFormat {
        /// Expected format description.
        expected: &'static str,
        /// Value provided.
        actual: String,
    },
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "is required"),
            Self::Empty => write!(f, "cannot be empty"),
            Self::OutOfRange { min, max, actual } => {
                write!(f, "value {actual} out of range [{min}, {max}]")
            }
            Self::Duplicate { value } => write!(f, "duplicate value '{value}'"),
            Self::InvalidFormat { expected, actual } => {
                write!(f, "expected {expected}, got '{actual}'")
            }
        }
    }
}

/// A single failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path of the offending field, e.g. `services[0].apps[1].image`.
    pub field: String,
    /// What was wrong.
    pub kind: ViolationKind,
}

impl Violation {
    /// Creates a violation.
    #[must_use]
    pub fn new(field: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            field: field.into(),
            kind,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' {}", self.field, self.kind)
    }
}

/// One or more violations found while validating a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    subject: String,
    violations: Vec<Violation>,
}

impl ValidationError {
    /// Creates a validation error for `subject`.
    ///
    /// `violations` should not be empty; an empty list renders as a generic
    /// message.
    #[must_use]
    pub fn new(subject: impl Into<String>, violations: Vec<Violation>) -> Self {
        Self {
            subject: subject.into(),
            violations,
        }
    }

    /// What was being validated, e.g. `app` or `project`.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// All violations in field declaration order.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// The first violation encountered.
    #[must_use]
    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.split_first() {
            None => write!(f, "invalid {}", self.subject),
            Some((first, [])) => write!(f, "invalid {}: {first}", self.subject),
            Some((first, rest)) => write!(
                f,
                "invalid {}: {first} (and {} more)",
                self.subject,
                rest.len()
            ),
        }
    }
}

/// Collects violations across several checks.
#[derive(Debug)]
pub struct ValidationBuilder {
    subject: String,
    violations: Vec<Violation>,
}

impl ValidationBuilder {
    /// Creates a builder for `subject`.
    #[must_use]
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            violations: Vec::new(),
        }
    }

    /// Records a violation.
    pub fn push(&mut self, field: impl Into<String>, kind: ViolationKind) {
        self.violations.push(Violation::new(field, kind));
    }

    /// Checks that a string is not blank.
    pub fn not_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, ViolationKind::Empty);
        }
    }

    /// Checks that an optional string is present and not blank.
    pub fn required(&mut self, field: &str, value: Option<&str>) {
        match value {
            None => self.push(field, ViolationKind::Missing),
            Some(v) => self.not_empty(field, v),
        }
    }

    /// Checks that a number lies within `[min, max]`.
    pub fn in_range(&mut self, field: &str, value: u64, min: u64, max: u64) {
        if value < min || value > max {
            self.push(field, ViolationKind::OutOfRange { min, max, actual: value });
        }
    }

    /// Records a duplicate if `value` was already inserted into `seen`.
    pub fn unique(&mut self, field: &str, value: &str, seen: &mut HashSet<String>) {
        if !seen.insert(value.to_string()) {
            self.push(
                field,
                ViolationKind::Duplicate {
                    value: value.to_string(),
                },
            );
        }
    }

    /// Checks a string against a format predicate.
    pub fn format(
        &mut self,
        field: &str,
        value: &str,
        expected: &'static str,
        valid: impl FnOnce(&str) -> bool,
    ) {
        if !valid(value) {
            self.push(
                field,
                ViolationKind::InvalidFormat {
                    expected,
                    actual: value.to_string(),
                },
            );
        }
    }

    /// Returns true if any violation was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Finishes validation.
    pub fn finish(self) -> Result<(), ValidationError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(self.subject, self.violations))
        }
    }
}

/// Whether a payload creates a resource or patches an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// All required fields must be present.
    Create,
    /// Absent fields keep their current value; present ones must be valid.
    Update,
}

/// Validates an app payload.
pub fn validate_app(app: &App, mode: Mode) -> Result<(), ValidationError> {
    let mut builder = ValidationBuilder::new("app");
    check_app(&mut builder, "", app, mode);
    builder.finish()
}

/// Validates a project payload including every service and app it owns.
pub fn validate_project(project: &Project) -> Result<(), ValidationError> {
    let mut builder = ValidationBuilder::new("project");
    builder.not_empty("project", &project.name);

    let mut service_ids = HashSet::new();
    for (si, service) in project.services.iter().enumerate() {
        let prefix = format!("services[{si}]");
        let field = format!("{prefix}.id");
        builder.not_empty(&field, &service.id);
        builder.unique(&field, &service.id, &mut service_ids);

        let mut app_ids = HashSet::new();
        for (ai, app) in service.apps.iter().enumerate() {
            let app_prefix = format!("{prefix}.apps[{ai}].");
            if !app.id.trim().is_empty() {
                builder.unique(&format!("{app_prefix}id"), &app.id, &mut app_ids);
            }
            check_app(&mut builder, &app_prefix, app, Mode::Create);
        }
    }

    builder.finish()
}

/// Validates the identifying path of a call. Every supplied segment must be
/// non-empty.
pub fn validate_path(segments: &[(ResourceKind, &str)]) -> Result<(), ValidationError> {
    let mut builder = ValidationBuilder::new("resource path");
    for (kind, id) in segments {
        builder.not_empty(&kind.as_str().to_lowercase(), id);
    }
    builder.finish()
}

/// Validates a rollback target version.
pub fn validate_version(version: &str) -> Result<(), ValidationError> {
    let mut builder = ValidationBuilder::new("rollback");
    builder.not_empty("version", version);
    builder.finish()
}

fn check_app(builder: &mut ValidationBuilder, prefix: &str, app: &App, mode: Mode) {
    let field = |name: &str| format!("{prefix}{name}");

    match mode {
        Mode::Create => {
            builder.not_empty(&field("id"), &app.id);
            builder.required(&field("image"), app.image.as_deref());
        }
        Mode::Update => {
            if let Some(image) = &app.image {
                builder.not_empty(&field("image"), image);
            }
        }
    }

    if let Some(command) = &app.command {
        builder.not_empty(&field("cmd"), command);
    }

    let mut ports = HashSet::new();
    for (i, mapping) in app.port_mappings.iter().enumerate() {
        let name = field(&format!("port_mappings[{i}].port"));
        builder.in_range(&name, u64::from(mapping.port), 1, u64::from(u16::MAX));
        builder.unique(&name, &mapping.port.to_string(), &mut ports);
    }

    let mut paths = HashSet::new();
    for (i, volume) in app.volumes.iter().enumerate() {
        let path_field = field(&format!("volumes[{i}].path"));
        if volume.path.trim().is_empty() {
            builder.push(&path_field, ViolationKind::Empty);
        } else {
            builder.format(&path_field, &volume.path, "an absolute path", |p| {
                p.starts_with('/')
            });
            builder.unique(&path_field, &volume.path, &mut paths);
        }
        builder.format(
            &field(&format!("volumes[{i}].size")),
            &volume.size,
            "a size like 8GB",
            |s| VOLUME_SIZE.is_match(s),
        );
    }

    if let Some(domain) = &app.domain {
        builder.not_empty(&field("domain.uri"), &domain.uri);
    }

    for key in app.env.keys() {
        if key.trim().is_empty() {
            builder.push(field("env"), ViolationKind::Empty);
        }
    }

    for (i, dependency) in app.dependencies.iter().enumerate() {
        builder.not_empty(&field(&format!("dependencies[{i}]")), dependency);
    }
}
