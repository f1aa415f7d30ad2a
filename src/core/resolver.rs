//! Best-effort host resolution with a provenance note for the unit file.

use crate::util::system::System;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// The name resolved to a different address.
    Resolved,
    /// The input was already an address.
    Literal,
    /// Resolution failed; the name is used as given.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedHost {
    pub original: String,
    /// Address for `What=`, or the original name when resolution failed.
    pub address: String,
    pub provenance: Provenance,
}

impl ResolvedHost {
    /// Informational comment embedded in the mount unit.
    pub fn note(&self) -> String {
        match self.provenance {
            Provenance::Resolved => format!(
                "Host {} resolved to {} when this unit was written",
                self.original, self.address
            ),
            Provenance::Literal => format!("Host {} is already an IP address", self.original),
            Provenance::Unresolved => format!(
                "WARNING: could not resolve {}; using the name as given. \
                 Mounting at boot may fail if name resolution is not up yet",
                self.original
            ),
        }
    }
}

/// Never fails: an unresolvable name degrades to the name itself.
pub fn resolve(system: &dyn System, host: &str) -> ResolvedHost {
    match system.lookup_host(host) {
        Some(ip) if ip.to_string() == host => ResolvedHost {
            original: host.to_string(),
            address: host.to_string(),
            provenance: Provenance::Literal,
        },
        Some(ip) => {
            info!(host, address = %ip, "resolved server");
            ResolvedHost {
                original: host.to_string(),
                address: ip.to_string(),
                provenance: Provenance::Resolved,
            }
        }
        None => {
            warn!(host, "server name did not resolve, keeping it verbatim");
            ResolvedHost {
                original: host.to_string(),
                address: host.to_string(),
                provenance: Provenance::Unresolved,
            }
        }
    }
}
