//! Wire types of the discovery protocol.
//!
//! A [`Registration`] describes one service instance and the services it
//! depends on; a [`Patch`] carries incremental provider changes from the
//! registry to a dependent.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Well-known identity of a campus service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceName {
    LogSink,
    Grading,
    Portal,
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LogSink => "log-sink",
            Self::Grading => "grading",
            Self::Portal => "portal",
        };
        f.write_str(name)
    }
}

/// Discovery record for one live service instance.
///
/// Identified by `service_url`; immutable once registered. Changing the
/// dependency list requires re-registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub service_name: ServiceName,
    /// Base address of the instance; unique across the registry.
    pub service_url: String,
    /// Services this instance depends on, in declaration order.
    #[serde(default)]
    pub required_services: Vec<ServiceName>,
    /// Address the instance listens on for provider patches.
    pub service_update_url: String,
    /// Address the registry probes for liveness.
    pub heartbeat_url: String,
}

impl Registration {
    /// Build a registration with the conventional callback paths
    /// (`/services` for patches, `/heartbeat` for probes) under the
    /// instance's base address.
    #[must_use]
    pub fn new(service_name: ServiceName, service_url: impl Into<String>) -> Self {
        let service_url = service_url.into();
        Self {
            service_name,
            service_update_url: format!("{service_url}/services"),
            heartbeat_url: format!("{service_url}/heartbeat"),
            service_url,
            required_services: Vec::new(),
        }
    }

    /// Declare the services this instance depends on.
    #[must_use]
    pub fn with_required(mut self, required: Vec<ServiceName>) -> Self {
        self.required_services = required;
        self
    }

    /// Check that every embedded address is a well-formed URL.
    pub fn validate(&self) -> Result<()> {
        for (raw, field) in [
            (&self.service_url, "service"),
            (&self.service_update_url, "service update"),
            (&self.heartbeat_url, "heartbeat"),
        ] {
            Url::parse(raw)
                .map_err(|e| Error::Validation(format!("invalid {field} url {raw}: {e}")))?;
        }
        Ok(())
    }

    /// Path component of the patch-receiver address.
    pub fn update_path(&self) -> Result<String> {
        url_path(&self.service_update_url, "service update")
    }

    /// Path component of the heartbeat address.
    pub fn heartbeat_path(&self) -> Result<String> {
        url_path(&self.heartbeat_url, "heartbeat")
    }

    /// The patch entry announcing or withdrawing this instance.
    #[must_use]
    pub fn entry(&self) -> PatchEntry {
        PatchEntry {
            name: self.service_name,
            url: self.service_url.clone(),
        }
    }
}

fn url_path(raw: &str, field: &str) -> Result<String> {
    let url =
        Url::parse(raw).map_err(|e| Error::Validation(format!("invalid {field} url {raw}: {e}")))?;
    Ok(url.path().to_owned())
}

/// One appearance or disappearance of a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchEntry {
    pub name: ServiceName,
    pub url: String,
}

/// Incremental provider update pushed by the registry.
///
/// Either list may be empty; an empty patch is never sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added: Vec<PatchEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed: Vec<PatchEntry>,
}

impl Patch {
    /// A patch announcing new providers.
    #[must_use]
    pub fn added(entries: Vec<PatchEntry>) -> Self {
        Self {
            added: entries,
            removed: Vec::new(),
        }
    }

    /// A patch withdrawing providers.
    #[must_use]
    pub fn removed(entries: Vec<PatchEntry>) -> Self {
        Self {
            added: Vec::new(),
            removed: entries,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// The subset of this patch a dependent with the given dependency list
    /// cares about. Entries whose name is not required are dropped.
    #[must_use]
    pub fn restricted_to(&self, required: &[ServiceName]) -> Self {
        let keep = |entry: &&PatchEntry| required.contains(&entry.name);
        Self {
            added: self.added.iter().filter(keep).cloned().collect(),
            removed: self.removed.iter().filter(keep).cloned().collect(),
        }
    }
}
