//! Static location configuration.
//!
//! Describes the provider endpoint and the regions and zones it exposes.
//! Loaded from JSON:
//!
//! ```json
//! {
//!   "provider": "openstack-nova",
//!   "endpoint": "https://identity.example.com/v2.0/",
//!   "iso3166_codes": ["US"],
//!   "default_region": "RegionOne",
//!   "regions": {
//!     "RegionOne": {
//!       "endpoint": "https://compute.example.com/v2/3456/",
//!       "zones": { "nova": {} }
//!     }
//!   }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use nimbus_core::error::{NimbusError, Result};

/// Default provider id.
pub const DEFAULT_PROVIDER: &str = "openstack-nova";

/// Location configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Provider id
    pub provider: String,
    /// Provider endpoint
    pub endpoint: Option<String>,
    /// Provider ISO 3166 codes
    pub iso3166_codes: BTreeSet<String>,
    /// Region used when the caller does not name one
    pub default_region: Option<String>,
    /// Regions by id
    pub regions: BTreeMap<String, RegionConfig>,
}

/// Region configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Compute endpoint; falls back to the provider endpoint
    pub endpoint: Option<String>,
    /// ISO 3166 codes; inherit the provider's when empty
    pub iso3166_codes: BTreeSet<String>,
    /// Zones by id
    pub zones: BTreeMap<String, ZoneConfig>,
}

/// Zone configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Endpoint; falls back to the region endpoint
    pub endpoint: Option<String>,
    /// ISO 3166 codes; inherit the region's when empty
    pub iso3166_codes: BTreeSet<String>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.into(),
            endpoint: None,
            iso3166_codes: BTreeSet::new(),
            default_region: None,
            regions: BTreeMap::new(),
        }
    }
}

impl LocationConfig {
    /// Creates a config with one region served by `endpoint`.
    pub fn single_region(region: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let region = region.into();
        let endpoint = endpoint.into();
        let mut regions = BTreeMap::new();
        regions.insert(
            region.clone(),
            RegionConfig {
                endpoint: Some(endpoint.clone()),
                ..Default::default()
            },
        );

        Self {
            endpoint: Some(endpoint),
            default_region: Some(region),
            regions,
            ..Default::default()
        }
    }

    /// Parses a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Checks ids and endpoint syntax, and that every region resolves to an endpoint.
    pub fn validate(&self) -> Result<()> {
        if self.provider.trim().is_empty() {
            return Err(NimbusError::ConfigError("provider id cannot be empty".into()));
        }

        if let Some(default_region) = &self.default_region {
            if !self.regions.contains_key(default_region) {
                return Err(NimbusError::ConfigError(format!(
                    "default region '{}' is not configured",
                    default_region
                )));
            }
        }

        let mut seen_zones = BTreeSet::new();
        for (region_id, region) in &self.regions {
            if region_id.trim().is_empty() {
                return Err(NimbusError::ConfigError("region id cannot be empty".into()));
            }
            let region_has_endpoint = region.endpoint.is_some() || self.endpoint.is_some();
            if !region_has_endpoint {
                return Err(NimbusError::ConfigError(format!(
                    "region '{}' has no endpoint and no provider endpoint is configured",
                    region_id
                )));
            }
            for zone_id in region.zones.keys() {
                if !seen_zones.insert(zone_id) {
                    return Err(NimbusError::ConfigError(format!(
                        "zone '{}' is configured in more than one region",
                        zone_id
                    )));
                }
            }
        }

        // Surface unparsable endpoints at load time rather than on first lookup.
        let endpoints = self.endpoint.iter().chain(self.regions.values().flat_map(|r| {
            r.endpoint
                .iter()
                .chain(r.zones.values().filter_map(|z| z.endpoint.as_ref()))
        }));
        for endpoint in endpoints {
            parse_endpoint(endpoint)?;
        }

        Ok(())
    }

    /// Provider endpoint.
    pub fn provider_uri(&self) -> Result<Url> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| NimbusError::ConfigError("provider endpoint is not configured".into()))?;
        parse_endpoint(endpoint)
    }

    /// Endpoint of `region_id`, falling back to the provider endpoint.
    pub fn region_uri(&self, region_id: &str) -> Result<Url> {
        let region = self
            .regions
            .get(region_id)
            .ok_or_else(|| NimbusError::LocationNotFound(format!("region '{}'", region_id)))?;
        match &region.endpoint {
            Some(endpoint) => parse_endpoint(endpoint),
            None => self.provider_uri(),
        }
    }

    /// Region containing `zone_id`.
    pub fn region_of_zone(&self, zone_id: &str) -> Option<&str> {
        self.regions
            .iter()
            .find(|(_, r)| r.zones.contains_key(zone_id))
            .map(|(id, _)| id.as_str())
    }

    /// Endpoint of `zone_id`, falling back to its region's endpoint.
    pub fn zone_uri(&self, zone_id: &str) -> Result<Url> {
        let region_id = self
            .region_of_zone(zone_id)
            .ok_or_else(|| NimbusError::LocationNotFound(format!("zone '{}'", zone_id)))?;
        match self.regions[region_id].zones[zone_id].endpoint.as_deref() {
            Some(endpoint) => parse_endpoint(endpoint),
            None => self.region_uri(region_id),
        }
    }

    /// Region used when the caller does not name one.
    ///
    /// The configured default, else the only region.
    pub fn implicit_region_id(&self) -> Result<String> {
        if let Some(region) = &self.default_region {
            return Ok(region.clone());
        }
        let mut ids = self.regions.keys();
        match (ids.next(), ids.next()) {
            (Some(only), None) => Ok(only.clone()),
            (None, _) => Err(NimbusError::ConfigError("no regions configured".into())),
            (Some(_), Some(_)) => Err(NimbusError::ConfigError(
                "several regions configured and no default_region set".into(),
            )),
        }
    }
}

/// Parses an endpoint, ensuring a trailing slash so relative joins append.
pub(crate) fn parse_endpoint(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Ok(Url::parse(trimmed)?)
    } else {
        Ok(Url::parse(&format!("{}/", trimmed))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "endpoint": "https://identity.example.com/v2.0",
        "iso3166_codes": ["US"],
        "default_region": "az-1.region-a.geo-1",
        "regions": {
            "az-1.region-a.geo-1": {
                "endpoint": "https://az-1.region-a.geo-1.compute.example.com/v2/3456",
                "zones": { "az1-nova": {}, "az1-internal": { "endpoint": "https://internal.example.com/v2/3456/" } }
            },
            "az-2.region-a.geo-1": {
                "iso3166_codes": ["US-VA"],
                "zones": { "az2-nova": {} }
            }
        }
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = LocationConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.provider, DEFAULT_PROVIDER);
        assert_eq!(config.regions.len(), 2);
        assert_eq!(config.implicit_region_id().unwrap(), "az-1.region-a.geo-1");
    }

    #[test]
    fn test_endpoint_fallbacks() {
        let config = LocationConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(
            config.region_uri("az-2.region-a.geo-1").unwrap().as_str(),
            "https://identity.example.com/v2.0/"
        );
        assert_eq!(
            config.zone_uri("az1-nova").unwrap().as_str(),
            "https://az-1.region-a.geo-1.compute.example.com/v2/3456/"
        );
        assert_eq!(
            config.zone_uri("az1-internal").unwrap().as_str(),
            "https://internal.example.com/v2/3456/"
        );
        assert!(matches!(config.zone_uri("missing"), Err(NimbusError::LocationNotFound(_))));
    }

    #[test]
    fn test_missing_provider_endpoint() {
        let config = LocationConfig::default();
        assert!(matches!(config.provider_uri(), Err(NimbusError::ConfigError(_))));
    }

    #[test]
    fn test_unknown_default_region_rejected() {
        let raw = r#"{ "endpoint": "https://identity.example.com/", "default_region": "nowhere", "regions": { "RegionOne": {} } }"#;
        let err = LocationConfig::from_json_str(raw).unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }

    #[test]
    fn test_duplicate_zone_rejected() {
        let raw = r#"{ "endpoint": "https://identity.example.com/", "regions": { "a": { "zones": { "z": {} } }, "b": { "zones": { "z": {} } } } }"#;
        let err = LocationConfig::from_json_str(raw).unwrap_err();
        assert!(err.to_string().contains("more than one region"));
    }

    #[test]
    fn test_region_without_any_endpoint_rejected() {
        let raw = r#"{ "regions": { "a": { "endpoint": "https://a.example.com/v2/1/" }, "b": {} } }"#;
        let err = LocationConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(&err, NimbusError::ConfigError(msg) if msg.contains("'b'")));

        // Zones inherit their region's endpoint, so a bare zone under a bare region is caught too.
        let raw = r#"{ "regions": { "a": { "zones": { "a1": {} } } } }"#;
        assert!(matches!(LocationConfig::from_json_str(raw), Err(NimbusError::ConfigError(_))));

        let raw = r#"{ "regions": { "a": { "endpoint": "https://a.example.com/v2/1/", "zones": { "a1": {} } } } }"#;
        let config = LocationConfig::from_json_str(raw).unwrap();
        assert_eq!(config.zone_uri("a1").unwrap().as_str(), "https://a.example.com/v2/1/");
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let raw = r#"{ "endpoint": "not a url" }"#;
        assert!(matches!(LocationConfig::from_json_str(raw), Err(NimbusError::InvalidUrl(_))));
    }

    #[test]
    fn test_implicit_region_requires_choice() {
        let raw = r#"{ "endpoint": "https://identity.example.com/v2.0/", "regions": { "a": {}, "b": {} } }"#;
        let config = LocationConfig::from_json_str(raw).unwrap();
        assert!(config.implicit_region_id().is_err());
        assert!(LocationConfig::default().implicit_region_id().is_err());
    }

    #[test]
    fn test_single_region() {
        let config = LocationConfig::single_region("RegionOne", "http://localhost:8774/v2.1");
        assert_eq!(config.implicit_region_id().unwrap(), "RegionOne");
        assert_eq!(config.region_uri("RegionOne").unwrap().as_str(), "http://localhost:8774/v2.1/");
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = LocationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.iso3166_codes.len(), 1);

        assert!(matches!(
            LocationConfig::from_json_file("/nonexistent/locations.json"),
            Err(NimbusError::IoError(_))
        ));
    }
}
