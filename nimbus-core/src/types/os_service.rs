//! Compute service daemons as reported by the Nova os-services extension.
//!
//! A service is identified by its `(binary, host)` pair, e.g.
//! `("nova-scheduler", "controller-1")`.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{NimbusError, Result};

macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// Any value this client does not know about.
            Unrecognized,
        }

        impl $name {
            /// Lowercase wire value.
            pub fn value(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unrecognized => "unrecognized",
                }
            }

            /// Case-insensitive parse; unknown strings map to `Unrecognized`.
            pub fn from_value(raw: &str) -> Self {
                match raw.trim().to_ascii_lowercase().as_str() {
                    $($wire => $name::$variant,)+
                    _ => $name::Unrecognized,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.value())
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self::from_value(s))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.value())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok(Self::from_value(&raw))
            }
        }
    };
}

wire_enum! {
    /// Administrative status of a service: whether the scheduler may use it.
    Status {
        /// Service accepts work.
        Enabled => "enabled",
        /// Service was disabled by an operator.
        Disabled => "disabled",
    }
}

wire_enum! {
    /// Liveness of a service as last reported by its heartbeat.
    State {
        /// Heartbeat is current.
        Up => "up",
        /// Heartbeat is missing.
        Down => "down",
    }
}

impl Status {
    /// Returns true for [`Status::Enabled`].
    pub fn is_enabled(&self) -> bool {
        matches!(self, Status::Enabled)
    }
}

/// A compute service daemon (scheduler, compute agent, conductor, ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OsService {
    binary: String,
    host: String,
    #[serde(default)]
    state: Option<State>,
    status: Status,
    #[serde(rename = "updated_at", default, with = "nova_timestamp")]
    updated: Option<DateTime<Utc>>,
    #[serde(default)]
    zone: Option<String>,
}

impl OsService {
    /// Starts an empty builder.
    pub fn builder() -> OsServiceBuilder {
        OsServiceBuilder::default()
    }

    /// Starts a builder pre-filled with this service's fields.
    pub fn to_builder(&self) -> OsServiceBuilder {
        OsServiceBuilder::default().from_os_service(self)
    }

    /// Service executable, e.g. `nova-compute`.
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Host the service runs on.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Last reported liveness.
    pub fn state(&self) -> Option<State> {
        self.state
    }

    /// Administrative status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Time of the last status change or heartbeat.
    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Availability zone, `internal` for control-plane services.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    /// Returns true if this service has the given identity.
    pub fn is(&self, host: &str, binary: &str) -> bool {
        self.host == host && self.binary == binary
    }
}

impl fmt::Display for OsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_null<T: fmt::Display>(v: Option<T>) -> String {
            v.map(|v| v.to_string()).unwrap_or_else(|| "null".into())
        }

        write!(
            f,
            "OsService{{binary={}, host={}, state={}, status={}, updated={}, zone={}}}",
            self.binary,
            self.host,
            or_null(self.state),
            self.status,
            or_null(self.updated.map(|u| u.to_rfc3339())),
            or_null(self.zone.as_deref()),
        )
    }
}

/// Builder for [`OsService`].
#[derive(Clone, Debug, Default)]
pub struct OsServiceBuilder {
    binary: Option<String>,
    host: Option<String>,
    state: Option<State>,
    status: Option<Status>,
    updated: Option<DateTime<Utc>>,
    zone: Option<String>,
}

impl OsServiceBuilder {
    /// Sets the binary.
    pub fn binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = Some(binary.into());
        self
    }

    /// Sets the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the state.
    pub fn state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the status.
    pub fn status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the updated timestamp.
    pub fn updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    /// Sets the zone.
    pub fn zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Copies every field of `service`.
    pub fn from_os_service(mut self, service: &OsService) -> Self {
        self.binary = Some(service.binary.clone());
        self.host = Some(service.host.clone());
        self.state = service.state;
        self.status = Some(service.status);
        self.updated = service.updated;
        self.zone = service.zone.clone();
        self
    }

    /// Builds the service. Binary, host and status are required.
    pub fn build(self) -> Result<OsService> {
        let missing = |field: &str| NimbusError::ValidationError(format!("os-service {} is required", field));

        Ok(OsService {
            binary: self.binary.ok_or_else(|| missing("binary"))?,
            host: self.host.ok_or_else(|| missing("host"))?,
            state: self.state,
            status: self.status.ok_or_else(|| missing("status"))?,
            updated: self.updated,
            zone: self.zone,
        })
    }
}

/// Parses a Nova timestamp.
///
/// Accepts RFC 3339 (`2012-10-29T13:42:02Z`, with offset) and the naive form
/// Nova emits (`2012-10-29T13:42:02.000000`, `2012-10-29 13:42:02`), which is UTC.
pub fn parse_nova_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(NimbusError::ValidationError(format!("invalid timestamp: {}", raw)))
}

mod nova_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => super::parse_nova_timestamp(&raw)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}
