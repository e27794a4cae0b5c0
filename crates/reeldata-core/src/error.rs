// SPDX-FileCopyrightText: 2026 Reeldata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Reeldata data-access layer.

use std::time::Duration;

use strum::Display;
use thiserror::Error;

/// The error type returned by every schema, query and storage operation.
///
/// Validation errors (filter shape, type mismatch, aggregate and group-by
/// misuse, projection conflicts) are raised while compiling a query, before
/// any statement reaches the store. Constraint errors are mapped from the
/// store's own signals. Anything else the store raises is carried opaquely in
/// [`DataError::Storage`].
#[derive(Debug, Error)]
pub enum DataError {
    /// The entity name is not one of the registered entities.
    #[error("unknown entity `{name}`")]
    UnknownEntity { name: String },

    /// A required lookup (`*OrThrow`, `update`, `delete`) matched no rows.
    #[error("no {entity} record found for {operation}")]
    NotFound { entity: String, operation: String },

    /// The write would duplicate a value of a unique field.
    #[error("unique constraint failed on {entity}({})", fields.join(", "))]
    UniqueConstraintViolation { entity: String, fields: Vec<String> },

    /// A referenced relation id does not exist.
    #[error("foreign key constraint failed on {entity}.{field}")]
    ForeignKeyViolation { entity: String, field: String },

    /// The filter, ordering or argument object is structurally invalid.
    #[error("invalid query shape for {entity}: {reason}")]
    InvalidFilterShape { entity: String, reason: String },

    /// An operator or value does not fit the field's type.
    #[error("type mismatch on {entity}.{field}: expected {expected}, found {found}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: String,
        found: String,
    },

    /// An aggregate was requested on a field it cannot apply to.
    #[error("cannot compute {aggregate} over {entity}.{field}")]
    InvalidAggregateField {
        entity: String,
        field: String,
        aggregate: String,
    },

    /// `having` referenced a field that is neither grouped nor aggregated.
    #[error("having references {entity}.{field}, which is not in `by` and not aggregated")]
    InvalidHavingField { entity: String, field: String },

    /// `groupBy` was called without any key fields.
    #[error("groupBy on {entity} requires at least one field in `by`")]
    EmptyGroupByKey { entity: String },

    /// `select` and `omit` (or `include` and `omit` on one field) were combined.
    #[error("conflicting select/omit on {entity}: {detail}")]
    ConflictingSelectOmit { entity: String, detail: String },

    /// `select` and `include` were both given for the same projection.
    #[error("select and include cannot be combined on {entity}")]
    ConflictingSelectInclude { entity: String },

    /// A create did not supply a value for a required field without default.
    #[error("missing required field {entity}.{field}")]
    MissingRequiredField { entity: String, field: String },

    /// A written row breaks a data-model invariant.
    #[error("invariant violated on {entity}: {rule}")]
    InvariantViolation { entity: String, rule: String },

    /// A transaction could not start within its `max_wait`.
    #[error("transaction did not start within {max_wait:?} (waited {waited:?})")]
    TransactionStartTimeout { max_wait: Duration, waited: Duration },

    /// A transaction ran past its `timeout` and was rolled back.
    #[error("transaction exceeded its timeout of {timeout:?} (ran {elapsed:?})")]
    TransactionExpired { timeout: Duration, elapsed: Duration },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (connection, statement, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Discriminant of [`DataError`] for callers that branch on the kind only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    UnknownEntity,
    NotFound,
    UniqueConstraintViolation,
    ForeignKeyViolation,
    InvalidFilterShape,
    TypeMismatch,
    InvalidAggregateField,
    InvalidHavingField,
    EmptyGroupByKey,
    ConflictingSelectOmit,
    ConflictingSelectInclude,
    MissingRequiredField,
    InvariantViolation,
    TransactionStartTimeout,
    TransactionExpired,
    Config,
    Storage,
    Internal,
}

impl DataError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownEntity { .. } => ErrorKind::UnknownEntity,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::UniqueConstraintViolation { .. } => ErrorKind::UniqueConstraintViolation,
            Self::ForeignKeyViolation { .. } => ErrorKind::ForeignKeyViolation,
            Self::InvalidFilterShape { .. } => ErrorKind::InvalidFilterShape,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::InvalidAggregateField { .. } => ErrorKind::InvalidAggregateField,
            Self::InvalidHavingField { .. } => ErrorKind::InvalidHavingField,
            Self::EmptyGroupByKey { .. } => ErrorKind::EmptyGroupByKey,
            Self::ConflictingSelectOmit { .. } => ErrorKind::ConflictingSelectOmit,
            Self::ConflictingSelectInclude { .. } => ErrorKind::ConflictingSelectInclude,
            Self::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            Self::InvariantViolation { .. } => ErrorKind::InvariantViolation,
            Self::TransactionStartTimeout { .. } => ErrorKind::TransactionStartTimeout,
            Self::TransactionExpired { .. } => ErrorKind::TransactionExpired,
            Self::Config(_) => ErrorKind::Config,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for an [`DataError::InvalidFilterShape`].
    pub fn shape(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFilterShape {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`DataError::TypeMismatch`].
    pub fn mismatch(
        entity: impl Into<String>,
        field: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            entity: entity.into(),
            field: field.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Wraps any backend error as [`DataError::Storage`].
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }
}
