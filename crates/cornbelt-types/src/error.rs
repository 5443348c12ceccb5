//! Error types for input validation in cornbelt-types.

use thiserror::Error;

/// Errors raised when constructing locations, registries, or request inputs.
///
/// These are construction-time failures and are never swallowed. Data quality
/// problems inside a batch are not errors; they are reported through
/// [`QualityReport`](crate::QualityReport).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// Latitude outside [-90, 90].
    #[error("Invalid latitude: {0}. Must be between -90 and 90")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0}. Must be between -180 and 180")]
    InvalidLongitude(f64),

    /// Location name is blank.
    #[error("Location name cannot be empty")]
    EmptyName,

    /// Two locations share a name.
    #[error("Duplicate location name: {0}")]
    DuplicateLocation(String),

    /// A registry needs at least one location.
    #[error("At least one location must be configured")]
    NoLocations,

    /// A required request parameter was not supplied.
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    /// A date string could not be parsed.
    #[error("Invalid date: '{0}'")]
    InvalidDate(String),

    /// Unknown daily variable name.
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// Unknown data type name.
    #[error("Unknown data type: {0} (expected 'historical' or 'forecast')")]
    UnknownDataType(String),
}

/// Result type alias using [`ValidationError`].
pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
