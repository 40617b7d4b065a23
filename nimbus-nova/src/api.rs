//! Entry point to the Nova API across regions.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, instrument};

use nimbus_cache::{AuthAwareMemoizingCache, CacheConfig};
use nimbus_core::constants::OS_SERVICES_ALIAS;
use nimbus_core::error::{NimbusError, Result};
use nimbus_core::AuthFailureSlot;
use nimbus_location::MemoizedLocations;

use crate::config::NovaConfig;
use crate::extensions::{Extension, ExtensionsSupplier};
use crate::filter::AuthenticatedClient;
use crate::os_services::OsServicesApi;

/// Nova client for every configured region.
///
/// Shares the failure slot of the [`MemoizedLocations`] it is built from.
pub struct NovaApi {
    client: AuthenticatedClient,
    locations: MemoizedLocations,
    extensions: DashMap<String, Arc<AuthAwareMemoizingCache<Vec<Extension>>>>,
    cache_config: CacheConfig,
}

impl std::fmt::Debug for NovaApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NovaApi")
            .field("client", &self.client)
            .field("cache_config", &self.cache_config)
            .finish_non_exhaustive()
    }
}

impl NovaApi {
    /// Creates a client over the given location lookups.
    pub fn new(config: NovaConfig, locations: MemoizedLocations) -> Result<Self> {
        let client = AuthenticatedClient::new(&config, locations.failure_slot().clone())?;
        Ok(Self {
            client,
            locations,
            extensions: DashMap::new(),
            cache_config: config.cache_config(),
        })
    }

    /// Region ids this client can talk to.
    pub async fn configured_regions(&self) -> Result<BTreeSet<String>> {
        self.locations.region_ids.get().await
    }

    /// Zone ids across all regions.
    pub async fn configured_zones(&self) -> Result<BTreeSet<String>> {
        self.locations.zone_ids.get().await
    }

    /// Region used when the caller names none.
    pub async fn default_region(&self) -> Result<String> {
        self.locations.implicit_region_id.get().await
    }

    /// Extensions advertised by the compute endpoint of `region`.
    ///
    /// Memoized per region for the session interval. Unknown regions fail
    /// with [`NimbusError::LocationNotFound`] without allocating a cache.
    pub async fn extensions(&self, region: &str) -> Result<Vec<Extension>> {
        if let Some(cache) = self.extensions.get(region).map(|c| c.value().clone()) {
            return cache.get().await;
        }

        if !self.configured_regions().await?.contains(region) {
            return Err(NimbusError::LocationNotFound(format!("region '{}'", region)));
        }
        self.extension_cache(region).get().await
    }

    /// The os-services API of `region`, if the region advertises the extension.
    #[instrument(skip(self))]
    pub async fn os_services_api(&self, region: &str) -> Result<Option<OsServicesApi>> {
        let extensions = self.extensions(region).await?;
        if !extensions.iter().any(Extension::is_os_services) {
            debug!(region, "os-services extension not advertised");
            return Ok(None);
        }

        let endpoint = self.locations.region_uri(region).await?;
        Ok(Some(OsServicesApi::new(self.client.clone(), endpoint)))
    }

    /// Like [`NovaApi::os_services_api`], but a missing extension is an error.
    pub async fn require_os_services_api(&self, region: &str) -> Result<OsServicesApi> {
        self.os_services_api(region)
            .await?
            .ok_or_else(|| NimbusError::ExtensionNotAvailable {
                region: region.to_string(),
                extension: OS_SERVICES_ALIAS.to_string(),
            })
    }

    /// Slot shared with the location caches.
    pub fn failure_slot(&self) -> &AuthFailureSlot {
        self.client.failure_slot()
    }

    fn extension_cache(&self, region: &str) -> Arc<AuthAwareMemoizingCache<Vec<Extension>>> {
        self.extensions
            .entry(region.to_string())
            .or_insert_with(|| {
                let supplier = ExtensionsSupplier {
                    client: self.client.clone(),
                    locations: self.locations.clone(),
                    region: region.to_string(),
                };
                Arc::new(
                    AuthAwareMemoizingCache::with_config(
                        Arc::new(supplier),
                        self.client.failure_slot().clone(),
                        self.cache_config.clone(),
                    )
                    .named(format!("extensions:{}", region)),
                )
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_location::{LocationConfig, LocationModule};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const REGION: &str = "az-1.region-a.geo-1";

    fn nova(server: &MockServer) -> NovaApi {
        let locations = LocationConfig::single_region(REGION, format!("{}/v2/3456/", server.uri()));
        let memoized = LocationModule::from_config(locations, AuthFailureSlot::new(), &CacheConfig::default());
        NovaApi::new(NovaConfig::new("token"), memoized).unwrap()
    }

    fn extensions_payload(alias: &str) -> serde_json::Value {
        json!({
            "extensions": [
                {
                    "alias": "os-floating-ips",
                    "name": "FloatingIps",
                    "namespace": "http://docs.openstack.org/compute/ext/floating_ips/api/v1.1",
                    "description": "Floating IPs support",
                    "updated": "2011-06-16T00:00:00+00:00"
                },
                {
                    "alias": alias,
                    "name": "Services",
                    "description": "Services support",
                    "updated": "2012-10-28T00:00:00Z"
                }
            ]
        })
    }

    #[tokio::test]
    async fn test_os_services_api_present_when_advertised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/3456/extensions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(extensions_payload("os-services")))
            .expect(1)
            .mount(&server)
            .await;

        let nova = nova(&server);
        assert_eq!(nova.configured_regions().await.unwrap().into_iter().collect::<Vec<_>>(), vec![REGION]);

        let api = nova.os_services_api(REGION).await.unwrap().unwrap();
        assert_eq!(api.endpoint().path(), "/v2/3456/");

        // Second lookup is served from the memoized extension list.
        assert!(nova.os_services_api(REGION).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_os_services_api_absent_when_not_advertised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/3456/extensions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(extensions_payload("os-hosts")))
            .mount(&server)
            .await;

        assert!(nova(&server).os_services_api(REGION).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_region() {
        let server = MockServer::start().await;
        let err = nova(&server).os_services_api("nowhere").await.unwrap_err();
        assert!(matches!(err, NimbusError::LocationNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_regions_do_not_allocate_caches() {
        let server = MockServer::start().await;
        let nova = nova(&server);

        for i in 0..100 {
            let region = format!("bogus-{}", i);
            assert!(matches!(
                nova.os_services_api(&region).await,
                Err(NimbusError::LocationNotFound(_))
            ));
        }
        assert!(nova.extensions.is_empty());
        assert_eq!(server.received_requests().await.unwrap_or_default().len(), 0);
    }

    #[tokio::test]
    async fn test_require_os_services_api() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/3456/extensions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(extensions_payload("os-hosts")))
            .mount(&server)
            .await;

        let err = nova(&server).require_os_services_api(REGION).await.unwrap_err();
        match err {
            NimbusError::ExtensionNotAvailable { region, extension } => {
                assert_eq!(region, REGION);
                assert_eq!(extension, "os-services");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_denied_listing_poisons_location_lookups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/3456/extensions"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let nova = nova(&server);
        assert!(nova.os_services_api(REGION).await.unwrap_err().is_authorization_failure());
        assert!(nova.failure_slot().is_poisoned());

        // Location caches share the slot and refuse too.
        assert!(nova.configured_regions().await.unwrap_err().is_authorization_failure());
        assert!(nova.extensions(REGION).await.unwrap_err().is_authorization_failure());
    }

    #[tokio::test]
    async fn test_end_to_end_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/3456/extensions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(extensions_payload("os-services")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/3456/os-services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "services": [{ "binary": "nova-compute", "host": "c1", "status": "enabled", "zone": "nova" }]
            })))
            .mount(&server)
            .await;

        let nova = nova(&server);
        let region = nova.default_region().await.unwrap();
        let services = nova.os_services_api(&region).await.unwrap().unwrap().list().await.unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services[0].zone(), Some("nova"));
    }
}
