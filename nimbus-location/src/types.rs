//! Location model.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Location id → ISO 3166 codes.
pub type Iso3166Codes = BTreeMap<String, BTreeSet<String>>;

/// Location id → endpoint.
pub type UriMap = BTreeMap<String, Url>;

/// Region id → zone ids.
pub type ZoneIdsByRegion = BTreeMap<String, BTreeSet<String>>;

/// Granularity of a location.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationScope {
    /// The cloud as a whole.
    Provider,
    /// A region with its own compute endpoint.
    Region,
    /// An availability zone inside a region.
    Zone,
}

impl fmt::Display for LocationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LocationScope::Provider => "provider",
            LocationScope::Region => "region",
            LocationScope::Zone => "zone",
        };
        f.write_str(s)
    }
}

/// A provider, region or zone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Granularity
    pub scope: LocationScope,
    /// Identifier, unique within its scope
    pub id: String,
    /// Human-readable description
    pub description: String,
    /// Enclosing location (zone → region → provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<Box<Location>>,
    /// ISO 3166 codes where the location resides
    #[serde(default)]
    pub iso3166_codes: BTreeSet<String>,
}

impl Location {
    /// Creates the provider location.
    pub fn provider(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            scope: LocationScope::Provider,
            id: id.into(),
            description: description.into(),
            parent: None,
            iso3166_codes: BTreeSet::new(),
        }
    }

    /// Creates a region inside `parent`.
    pub fn region(id: impl Into<String>, parent: Location) -> Self {
        let id = id.into();
        Self {
            scope: LocationScope::Region,
            description: id.clone(),
            id,
            parent: Some(Box::new(parent)),
            iso3166_codes: BTreeSet::new(),
        }
    }

    /// Creates a zone inside `parent`.
    pub fn zone(id: impl Into<String>, parent: Location) -> Self {
        let id = id.into();
        Self {
            scope: LocationScope::Zone,
            description: id.clone(),
            id,
            parent: Some(Box::new(parent)),
            iso3166_codes: BTreeSet::new(),
        }
    }

    /// Sets the ISO 3166 codes.
    pub fn with_iso3166_codes(mut self, codes: BTreeSet<String>) -> Self {
        self.iso3166_codes = codes;
        self
    }

    /// Walks up the parent chain to the first location of `scope`.
    pub fn ancestor(&self, scope: LocationScope) -> Option<&Location> {
        let mut current = Some(self);
        while let Some(location) = current {
            if location.scope == scope {
                return Some(location);
            }
            current = location.parent.as_deref();
        }
        None
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestor_walk() {
        let provider = Location::provider("openstack-nova", "OpenStack Nova");
        let region = Location::region("RegionOne", provider.clone());
        let zone = Location::zone("nova", region.clone());

        assert_eq!(zone.ancestor(LocationScope::Zone), Some(&zone));
        assert_eq!(zone.ancestor(LocationScope::Region), Some(&region));
        assert_eq!(zone.ancestor(LocationScope::Provider), Some(&provider));
        assert!(provider.ancestor(LocationScope::Region).is_none());
    }

    #[test]
    fn test_display() {
        let region = Location::region("RegionOne", Location::provider("p", "p"));
        assert_eq!(region.to_string(), "region:RegionOne");
    }

    #[test]
    fn test_scope_serializes_lowercase() {
        let json = serde_json::to_string(&LocationScope::Zone).unwrap();
        assert_eq!(json, "\"zone\"");
    }
}
