//! Wiring of the memoized location suppliers.
//!
//! All of these are memoized as locations do not change often at runtime.
//! Every cache shares the caller's [`AuthFailureSlot`], so one denial stops
//! all of them from calling the cloud again.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;
use url::Url;

use nimbus_cache::{AuthAwareMemoizingCache, CacheConfig};
use nimbus_core::error::{NimbusError, Result};
use nimbus_core::{AuthFailureSlot, Supplier};

use crate::config::LocationConfig;
use crate::fromconfig::*;
use crate::types::{Iso3166Codes, Location, UriMap, ZoneIdsByRegion};

/// The raw lookups before memoization.
pub struct UncachedLocationSuppliers {
    /// Location id → ISO 3166 codes
    pub iso3166_codes: Arc<dyn Supplier<Iso3166Codes>>,
    /// Provider endpoint
    pub provider: Arc<dyn Supplier<Url>>,
    /// Location used when the caller names none
    pub implicit_location: Arc<dyn Supplier<Location>>,
    /// All locations
    pub locations: Arc<dyn Supplier<Vec<Location>>>,
    /// Region ids
    pub region_ids: Arc<dyn Supplier<BTreeSet<String>>>,
    /// Region id → endpoint
    pub region_id_to_uri: Arc<dyn Supplier<UriMap>>,
    /// Region used when the caller names none
    pub implicit_region_id: Arc<dyn Supplier<String>>,
    /// Zone ids
    pub zone_ids: Arc<dyn Supplier<BTreeSet<String>>>,
    /// Region id → zone ids
    pub region_id_to_zone_ids: Arc<dyn Supplier<ZoneIdsByRegion>>,
    /// Zone id → endpoint
    pub zone_id_to_uri: Arc<dyn Supplier<UriMap>>,
}

impl UncachedLocationSuppliers {
    /// Suppliers reading a static [`LocationConfig`].
    pub fn from_config(config: LocationConfig) -> Self {
        let config = Arc::new(config);
        Self {
            iso3166_codes: Arc::new(Iso3166CodesFromConfiguration::new(config.clone())),
            provider: Arc::new(ProviderUriFromConfiguration::new(config.clone())),
            implicit_location: Arc::new(ImplicitLocationFromConfiguration::new(config.clone())),
            locations: Arc::new(LocationsFromConfiguration::new(config.clone())),
            region_ids: Arc::new(RegionIdsFromConfiguration::new(config.clone())),
            region_id_to_uri: Arc::new(RegionIdToUriFromConfiguration::new(config.clone())),
            implicit_region_id: Arc::new(ImplicitRegionIdFromConfiguration::new(config.clone())),
            zone_ids: Arc::new(ZoneIdsFromConfiguration::new(config.clone())),
            region_id_to_zone_ids: Arc::new(RegionIdToZoneIdsFromConfiguration::new(config.clone())),
            zone_id_to_uri: Arc::new(ZoneIdToUriFromConfiguration::new(config)),
        }
    }
}

/// Memoized location lookups sharing one failure slot and session interval.
#[derive(Clone)]
pub struct MemoizedLocations {
    /// Location id → ISO 3166 codes
    pub iso3166_codes: Arc<AuthAwareMemoizingCache<Iso3166Codes>>,
    /// Provider endpoint
    pub provider: Arc<AuthAwareMemoizingCache<Url>>,
    /// Location used when the caller names none
    pub implicit_location: Arc<AuthAwareMemoizingCache<Location>>,
    /// All locations
    pub locations: Arc<AuthAwareMemoizingCache<Vec<Location>>>,
    /// Region ids
    pub region_ids: Arc<AuthAwareMemoizingCache<BTreeSet<String>>>,
    /// Region id → endpoint
    pub region_id_to_uri: Arc<AuthAwareMemoizingCache<UriMap>>,
    /// Region used when the caller names none
    pub implicit_region_id: Arc<AuthAwareMemoizingCache<String>>,
    /// Zone ids
    pub zone_ids: Arc<AuthAwareMemoizingCache<BTreeSet<String>>>,
    /// Region id → zone ids
    pub region_id_to_zone_ids: Arc<AuthAwareMemoizingCache<ZoneIdsByRegion>>,
    /// Zone id → endpoint
    pub zone_id_to_uri: Arc<AuthAwareMemoizingCache<UriMap>>,
    slot: AuthFailureSlot,
}

impl MemoizedLocations {
    /// Endpoint of `region_id`.
    pub async fn region_uri(&self, region_id: &str) -> Result<Url> {
        self.region_id_to_uri
            .get()
            .await?
            .remove(region_id)
            .ok_or_else(|| NimbusError::LocationNotFound(format!("region '{}'", region_id)))
    }

    /// Endpoint of `zone_id`.
    pub async fn zone_uri(&self, zone_id: &str) -> Result<Url> {
        self.zone_id_to_uri
            .get()
            .await?
            .remove(zone_id)
            .ok_or_else(|| NimbusError::LocationNotFound(format!("zone '{}'", zone_id)))
    }

    /// Zones of `region_id`.
    pub async fn zones_in(&self, region_id: &str) -> Result<BTreeSet<String>> {
        self.region_id_to_zone_ids
            .get()
            .await?
            .remove(region_id)
            .ok_or_else(|| NimbusError::LocationNotFound(format!("region '{}'", region_id)))
    }

    /// The slot shared by every cache.
    pub fn failure_slot(&self) -> &AuthFailureSlot {
        &self.slot
    }
}

/// Builds [`MemoizedLocations`] from raw suppliers.
pub struct LocationModule;

impl LocationModule {
    /// Wraps every raw supplier in an [`AuthAwareMemoizingCache`].
    ///
    /// `config.ttl_seconds` is the session interval.
    pub fn wire(raw: UncachedLocationSuppliers, slot: AuthFailureSlot, config: &CacheConfig) -> MemoizedLocations {
        debug!(ttl_seconds = config.ttl_seconds, "Wiring memoized location suppliers");

        MemoizedLocations {
            iso3166_codes: memoize("iso3166_codes", raw.iso3166_codes, &slot, config),
            provider: memoize("provider", raw.provider, &slot, config),
            implicit_location: memoize("implicit_location", raw.implicit_location, &slot, config),
            locations: memoize("locations", raw.locations, &slot, config),
            region_ids: memoize("region_ids", raw.region_ids, &slot, config),
            region_id_to_uri: memoize("region_id_to_uri", raw.region_id_to_uri, &slot, config),
            implicit_region_id: memoize("implicit_region_id", raw.implicit_region_id, &slot, config),
            zone_ids: memoize("zone_ids", raw.zone_ids, &slot, config),
            region_id_to_zone_ids: memoize("region_id_to_zone_ids", raw.region_id_to_zone_ids, &slot, config),
            zone_id_to_uri: memoize("zone_id_to_uri", raw.zone_id_to_uri, &slot, config),
            slot,
        }
    }

    /// Shorthand for [`LocationModule::wire`] over a static configuration.
    pub fn from_config(config: LocationConfig, slot: AuthFailureSlot, cache: &CacheConfig) -> MemoizedLocations {
        Self::wire(UncachedLocationSuppliers::from_config(config), slot, cache)
    }
}

fn memoize<T>(
    name: &str,
    uncached: Arc<dyn Supplier<T>>,
    slot: &AuthFailureSlot,
    config: &CacheConfig,
) -> Arc<AuthAwareMemoizingCache<T>>
where
    T: Clone + Send + Sync + 'static,
{
    Arc::new(AuthAwareMemoizingCache::with_config(uncached, slot.clone(), config.clone()).named(name))
}
