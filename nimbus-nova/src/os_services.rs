//! The Nova `os-services` extension.

use serde::Serialize;
use tracing::{debug, info, instrument};
use url::Url;

use nimbus_core::constants::OS_SERVICES_PATH;
use nimbus_core::error::{NimbusError, Result};
use nimbus_core::types::OsService;

use crate::filter::AuthenticatedClient;

#[derive(Serialize)]
struct ServiceRef<'a> {
    host: &'a str,
    binary: &'a str,
}

/// Lists, enables and disables compute services in one region.
///
/// Obtained from [`crate::NovaApi::os_services_api`], which only hands one
/// out when the region advertises the extension.
#[derive(Clone, Debug)]
pub struct OsServicesApi {
    client: AuthenticatedClient,
    endpoint: Url,
}

impl OsServicesApi {
    pub(crate) fn new(client: AuthenticatedClient, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    /// Compute endpoint this API talks to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Lists all services (binary, host, zone, ...).
    ///
    /// An endpoint answering 404 yields an empty list.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn list(&self) -> Result<Vec<OsService>> {
        let url = self.endpoint.join(OS_SERVICES_PATH)?;
        let services: Vec<OsService> = self
            .client
            .fetch_selected(self.client.http().get(url), "services")
            .await?
            .unwrap_or_default();

        debug!(count = services.len(), "Listed os-services");
        Ok(services)
    }

    /// Enables the service `binary` on `host`.
    ///
    /// Returns the updated service, or `None` when Nova answers 404.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn enable(&self, host: &str, binary: &str) -> Result<Option<OsService>> {
        self.update("enable", host, binary).await
    }

    /// Disables the service `binary` on `host`.
    ///
    /// Returns the updated service, or `None` when Nova answers 404.
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn disable(&self, host: &str, binary: &str) -> Result<Option<OsService>> {
        self.update("disable", host, binary).await
    }

    async fn update(&self, action: &str, host: &str, binary: &str) -> Result<Option<OsService>> {
        if host.trim().is_empty() || binary.trim().is_empty() {
            return Err(NimbusError::ValidationError("host and binary are required".into()));
        }

        let url = self.endpoint.join(&format!("{}/{}", OS_SERVICES_PATH, action))?;
        let request = self.client.http().put(url).json(&ServiceRef { host, binary });

        let service: Option<OsService> = self.client.fetch_selected(request, "service").await?;
        match &service {
            Some(s) => info!(host, binary, status = %s.status(), "Updated os-service"),
            None => debug!(host, binary, "os-service not found"),
        }
        Ok(service)
    }
}
