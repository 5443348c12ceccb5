//! Geographic locations and the fixed location registry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// A named geographic point.
///
/// Coordinates are checked on construction and the value is immutable
/// afterwards, so every `Location` in the program holds valid coordinates.
/// Deserialization goes through the same check.
///
/// # Examples
///
/// ```
/// use cornbelt_types::Location;
///
/// let iowa = Location::new("iowa_center", 41.6005, -93.6091).unwrap();
/// assert_eq!(iowa.name(), "iowa_center");
///
/// assert!(Location::new("nowhere", 91.0, 0.0).is_err());
/// assert!(Location::new("nowhere", 0.0, -180.5).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLocation", into = "RawLocation")]
pub struct Location {
    name: String,
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Create a location, validating its coordinates.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> ValidationResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        // NaN fails both range checks
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::InvalidLatitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::InvalidLongitude(longitude));
        }
        Ok(Self {
            name,
            latitude,
            longitude,
        })
    }

    /// Location name (unique key).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Serialized shape of a [`Location`] (config files accept `lat`/`lon` too).
#[derive(Serialize, Deserialize)]
struct RawLocation {
    name: String,
    #[serde(alias = "lat")]
    latitude: f64,
    #[serde(alias = "lon")]
    longitude: f64,
}

impl TryFrom<RawLocation> for Location {
    type Error = ValidationError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        Location::new(raw.name, raw.latitude, raw.longitude)
    }
}

impl From<Location> for RawLocation {
    fn from(location: Location) -> Self {
        Self {
            name: location.name,
            latitude: location.latitude,
            longitude: location.longitude,
        }
    }
}

/// The two Corn Belt reference points the pipeline ships with.
pub fn default_locations() -> Vec<Location> {
    vec![
        Location {
            name: "iowa_center".to_string(),
            latitude: 41.6005,
            longitude: -93.6091,
        },
        Location {
            name: "illinois_center".to_string(),
            latitude: 40.6331,
            longitude: -89.3985,
        },
    ]
}

/// Ordered, read-only set of known locations.
///
/// Built once from configuration. Names are unique and the registry is never
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRegistry {
    locations: Vec<Location>,
}

impl LocationRegistry {
    /// Build a registry, rejecting an empty list and duplicate names.
    pub fn new(locations: Vec<Location>) -> ValidationResult<Self> {
        if locations.is_empty() {
            return Err(ValidationError::NoLocations);
        }

        let mut seen = HashSet::new();
        for location in &locations {
            if !seen.insert(location.name()) {
                return Err(ValidationError::DuplicateLocation(location.name().to_string()));
            }
        }

        Ok(Self { locations })
    }

    /// Look up a location by name.
    pub fn get(&self, name: &str) -> Option<&Location> {
        self.locations.iter().find(|l| l.name() == name)
    }

    /// Whether a location with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate locations in registration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Location> {
        self.locations.iter()
    }

    /// Location names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.locations.iter().map(Location::name)
    }

    /// Number of registered locations.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Restrict to the named locations, keeping registry order.
    ///
    /// Unknown names are ignored. An empty `names` slice selects everything.
    pub fn select(&self, names: &[String]) -> Vec<&Location> {
        if names.is_empty() {
            return self.locations.iter().collect();
        }
        self.locations
            .iter()
            .filter(|l| names.iter().any(|n| n == l.name()))
            .collect()
    }
}

impl Default for LocationRegistry {
    fn default() -> Self {
        Self {
            locations: default_locations(),
        }
    }
}

impl<'a> IntoIterator for &'a LocationRegistry {
    type Item = &'a Location;
    type IntoIter = std::slice::Iter<'a, Location>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
