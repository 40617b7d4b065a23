//! Constants for NIMBUS.
//!
//! Wire names and defaults used by the Nova client and the location module.

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION / CACHING
// ═══════════════════════════════════════════════════════════════════════════════

/// Default staleness window, in seconds, for memoized location lookups.
pub const DEFAULT_SESSION_INTERVAL_SECS: u64 = 60;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ═══════════════════════════════════════════════════════════════════════════════
// NOVA WIRE NAMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Header carrying the pre-issued Keystone token.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Alias Nova advertises for the os-services extension.
pub const OS_SERVICES_ALIAS: &str = "os-services";

/// Namespace Nova advertises for the os-services extension.
pub const OS_SERVICES_NAMESPACE: &str = "http://docs.openstack.org/compute/ext/services/api/v2";

/// Resource path of the os-services extension, relative to the compute endpoint.
pub const OS_SERVICES_PATH: &str = "os-services";

/// Resource path of the extension listing, relative to the compute endpoint.
pub const EXTENSIONS_PATH: &str = "extensions";

/// Default user agent sent by the Nova client.
pub const DEFAULT_USER_AGENT: &str = concat!("nimbus/", env!("CARGO_PKG_VERSION"));
