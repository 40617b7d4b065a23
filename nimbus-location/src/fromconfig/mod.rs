//! Raw (uncached) location suppliers backed by [`LocationConfig`].
//!
//! One supplier per lookup the location module memoizes. They never fail
//! with an authorization error; catalog-backed suppliers may, which is why
//! everything is wrapped by the auth-aware cache anyway.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use nimbus_core::error::Result;
use nimbus_core::Supplier;

use crate::config::LocationConfig;
use crate::types::{Iso3166Codes, Location, UriMap, ZoneIdsByRegion};

macro_rules! from_configuration {
    ($(#[$meta:meta])* $name:ident -> $ty:ty, |$config:ident| $body:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            config: Arc<LocationConfig>,
        }

        impl $name {
            /// Creates the supplier over a shared configuration.
            pub fn new(config: Arc<LocationConfig>) -> Self {
                Self { config }
            }
        }

        #[async_trait]
        impl Supplier<$ty> for $name {
            async fn get(&self) -> Result<$ty> {
                let $config: &LocationConfig = &self.config;
                $body
            }
        }
    };
}

from_configuration! {
    /// Provider endpoint from `endpoint`; fails when missing or unparsable.
    ProviderUriFromConfiguration -> Url, |config| config.provider_uri()
}

from_configuration! {
    /// Configured region ids.
    RegionIdsFromConfiguration -> BTreeSet<String>, |config| Ok(config.regions.keys().cloned().collect())
}

from_configuration! {
    /// Configured zone ids across all regions.
    ZoneIdsFromConfiguration -> BTreeSet<String>, |config| {
        Ok(config.regions.values().flat_map(|r| r.zones.keys().cloned()).collect())
    }
}

from_configuration! {
    /// Region id → compute endpoint.
    RegionIdToUriFromConfiguration -> UriMap, |config| {
        config
            .regions
            .keys()
            .map(|id| Ok((id.clone(), config.region_uri(id)?)))
            .collect()
    }
}

from_configuration! {
    /// Zone id → endpoint.
    ZoneIdToUriFromConfiguration -> UriMap, |config| {
        config
            .regions
            .values()
            .flat_map(|r| r.zones.keys())
            .map(|id| Ok((id.clone(), config.zone_uri(id)?)))
            .collect()
    }
}

from_configuration! {
    /// Region id → zone ids.
    RegionIdToZoneIdsFromConfiguration -> ZoneIdsByRegion, |config| {
        Ok(config
            .regions
            .iter()
            .map(|(id, r)| (id.clone(), r.zones.keys().cloned().collect()))
            .collect())
    }
}

from_configuration! {
    /// The default region, or the only one.
    ImplicitRegionIdFromConfiguration -> String, |config| config.implicit_region_id()
}

from_configuration! {
    /// Location id → ISO 3166 codes, inherited downwards when unset.
    Iso3166CodesFromConfiguration -> Iso3166Codes, |config| {
        Ok(all_locations(config)
            .into_iter()
            .map(|l| (l.id, l.iso3166_codes))
            .collect())
    }
}

from_configuration! {
    /// Provider, every region and every zone.
    LocationsFromConfiguration -> Vec<Location>, |config| Ok(all_locations(config))
}

from_configuration! {
    /// Implicit region as a location, else the provider itself.
    ImplicitLocationFromConfiguration -> Location, |config| {
        match config.implicit_region_id() {
            Ok(region_id) => Ok(region_location(config, &region_id)),
            Err(_) => Ok(provider_location(config)),
        }
    }
}

fn provider_location(config: &LocationConfig) -> Location {
    Location::provider(&config.provider, &config.provider).with_iso3166_codes(config.iso3166_codes.clone())
}

fn region_location(config: &LocationConfig, region_id: &str) -> Location {
    let provider = provider_location(config);
    let codes = match config.regions.get(region_id) {
        Some(region) if !region.iso3166_codes.is_empty() => region.iso3166_codes.clone(),
        _ => provider.iso3166_codes.clone(),
    };
    Location::region(region_id, provider).with_iso3166_codes(codes)
}

fn all_locations(config: &LocationConfig) -> Vec<Location> {
    let mut locations = vec![provider_location(config)];

    for (region_id, region) in &config.regions {
        let region_loc = region_location(config, region_id);
        for (zone_id, zone) in &region.zones {
            let codes = if zone.iso3166_codes.is_empty() {
                region_loc.iso3166_codes.clone()
            } else {
                zone.iso3166_codes.clone()
            };
            locations.push(Location::zone(zone_id, region_loc.clone()).with_iso3166_codes(codes));
        }
        locations.push(region_loc);
    }

    locations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LocationScope;

    fn config() -> Arc<LocationConfig> {
        let raw = r#"{
            "provider": "hpcloud-compute",
            "endpoint": "https://identity.example.com/v2.0/",
            "iso3166_codes": ["US-NV"],
            "regions": {
                "az-1.region-a.geo-1": { "zones": { "az1": { "iso3166_codes": ["US-NV-1"] } } },
                "az-2.region-a.geo-1": { "endpoint": "https://az-2.example.com/v2/3456/", "zones": { "az2": {} } }
            }
        }"#;
        Arc::new(LocationConfig::from_json_str(raw).unwrap())
    }

    #[tokio::test]
    async fn test_provider_uri() {
        let uri = ProviderUriFromConfiguration::new(config()).get().await.unwrap();
        assert_eq!(uri.as_str(), "https://identity.example.com/v2.0/");

        let missing = ProviderUriFromConfiguration::new(Arc::new(LocationConfig::default()));
        assert!(missing.get().await.is_err());
    }

    #[tokio::test]
    async fn test_region_and_zone_ids() {
        let regions = RegionIdsFromConfiguration::new(config()).get().await.unwrap();
        assert_eq!(
            regions.into_iter().collect::<Vec<_>>(),
            vec!["az-1.region-a.geo-1", "az-2.region-a.geo-1"]
        );

        let zones = ZoneIdsFromConfiguration::new(config()).get().await.unwrap();
        assert!(zones.contains("az1") && zones.contains("az2"));

        let by_region = RegionIdToZoneIdsFromConfiguration::new(config()).get().await.unwrap();
        assert!(by_region["az-2.region-a.geo-1"].contains("az2"));
    }

    #[tokio::test]
    async fn test_uri_maps() {
        let regions = RegionIdToUriFromConfiguration::new(config()).get().await.unwrap();
        assert_eq!(regions["az-1.region-a.geo-1"].as_str(), "https://identity.example.com/v2.0/");
        assert_eq!(regions["az-2.region-a.geo-1"].as_str(), "https://az-2.example.com/v2/3456/");

        let zones = ZoneIdToUriFromConfiguration::new(config()).get().await.unwrap();
        assert_eq!(zones["az2"].as_str(), "https://az-2.example.com/v2/3456/");
    }

    #[tokio::test]
    async fn test_implicit_region_requires_default() {
        assert!(ImplicitRegionIdFromConfiguration::new(config()).get().await.is_err());

        let implicit = ImplicitLocationFromConfiguration::new(config()).get().await.unwrap();
        assert_eq!(implicit.scope, LocationScope::Provider);
        assert_eq!(implicit.id, "hpcloud-compute");
    }

    #[tokio::test]
    async fn test_implicit_location_is_region() {
        let mut raw = (*config()).clone();
        raw.default_region = Some("az-2.region-a.geo-1".into());
        let implicit = ImplicitLocationFromConfiguration::new(Arc::new(raw)).get().await.unwrap();
        assert_eq!(implicit.scope, LocationScope::Region);
        assert_eq!(implicit.ancestor(LocationScope::Provider).unwrap().id, "hpcloud-compute");
    }

    #[tokio::test]
    async fn test_locations_and_iso_codes() {
        let locations = LocationsFromConfiguration::new(config()).get().await.unwrap();
        assert_eq!(locations.len(), 5);
        assert_eq!(locations[0].scope, LocationScope::Provider);

        let codes = Iso3166CodesFromConfiguration::new(config()).get().await.unwrap();
        assert!(codes["az1"].contains("US-NV-1"));
        assert!(codes["az2"].contains("US-NV"));
        assert!(codes["az-1.region-a.geo-1"].contains("US-NV"));
    }
}
