//! Nova extension discovery.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use nimbus_core::constants::{EXTENSIONS_PATH, OS_SERVICES_ALIAS, OS_SERVICES_NAMESPACE};
use nimbus_core::error::Result;
use nimbus_core::Supplier;
use nimbus_location::MemoizedLocations;

use crate::filter::AuthenticatedClient;

/// An API extension advertised by a compute endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Display name, e.g. `Services`
    pub name: String,
    /// Short alias, e.g. `os-services`
    pub alias: String,
    /// XML namespace (absent on v2.1 endpoints)
    #[serde(default)]
    pub namespace: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Last update, as reported
    #[serde(default)]
    pub updated: Option<String>,
}

impl Extension {
    /// Returns true if this is the os-services extension.
    pub fn is_os_services(&self) -> bool {
        self.alias.eq_ignore_ascii_case(OS_SERVICES_ALIAS)
            || self.namespace.as_deref() == Some(OS_SERVICES_NAMESPACE)
    }
}

/// Uncached `GET {region}/extensions`.
pub(crate) struct ExtensionsSupplier {
    pub(crate) client: AuthenticatedClient,
    pub(crate) locations: MemoizedLocations,
    pub(crate) region: String,
}

#[async_trait]
impl Supplier<Vec<Extension>> for ExtensionsSupplier {
    #[instrument(skip(self), fields(region = %self.region))]
    async fn get(&self) -> Result<Vec<Extension>> {
        let endpoint = self.locations.region_uri(&self.region).await?;
        let url = endpoint.join(EXTENSIONS_PATH)?;

        let extensions: Vec<Extension> = self
            .client
            .fetch_selected(self.client.http().get(url), "extensions")
            .await?
            .unwrap_or_default();

        debug!(count = extensions.len(), "Listed extensions");
        Ok(extensions)
    }
}
