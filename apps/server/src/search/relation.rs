//! Spatial relation whitelist
//!
//! Relation names arrive as untrusted request input and, on the remote
//! backend, end up inside string-built SQL. Resolution against this closed
//! set is therefore the injection-prevention boundary: a name that does not
//! resolve never reaches query construction.

use crate::{Error, Result};
use serde::Serialize;

/// A named geometric predicate between a query geometry and a stored
/// geometry or point column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpatialRelation {
    Within,
    Intersects,
    Touches,
    Contains,
    Crosses,
    Overlaps,
}

impl SpatialRelation {
    /// Resolve a relation name, case-sensitively, against the whitelist.
    /// Absent names default to `within`.
    pub fn resolve(name: Option<&str>) -> Result<Self> {
        match name {
            None => Ok(Self::Within),
            Some("within") => Ok(Self::Within),
            Some("intersects") => Ok(Self::Intersects),
            Some("touches") => Ok(Self::Touches),
            Some("contains") => Ok(Self::Contains),
            Some("crosses") => Ok(Self::Crosses),
            Some("overlaps") => Ok(Self::Overlaps),
            Some(other) => Err(Error::UnsupportedRelation {
                relation: other.to_string(),
            }),
        }
    }

    /// PostGIS function name for the typed backend.
    pub fn postgis_function(&self) -> &'static str {
        match self {
            Self::Within => "ST_Within",
            Self::Intersects => "ST_Intersects",
            Self::Touches => "ST_Touches",
            Self::Contains => "ST_Contains",
            Self::Crosses => "ST_Crosses",
            Self::Overlaps => "ST_Overlaps",
        }
    }

    /// Function name understood by the remote SQL service.
    pub fn remote_function(&self) -> &'static str {
        match self {
            Self::Within => "Within",
            Self::Intersects => "Intersects",
            Self::Touches => "Touches",
            Self::Contains => "Contains",
            Self::Crosses => "Crosses",
            Self::Overlaps => "Overlaps",
        }
    }
}
