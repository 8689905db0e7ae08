pub mod allocator;
pub mod netcfg;
pub mod pool;
pub mod tracker;
pub mod utils;

// Reexport
pub use allocator::{Allocation, NetAllocator};
pub use netcfg::{address_to_subnet, subnet_to_config, NetworkConfig, Route};
pub use pool::AddressPool;
pub use tracker::{check_fresh, check_fresh_at, AssignmentTracker};
pub use utils::{name_generator, NAME_SIZE};

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use strum::{Display, EnumIter, EnumString};

/*
* Every allocation is a point-to-point link:
* network, gateway, peer host, broadcast.
* Pool partitioning and address to subnet recovery must agree on it.
*/
pub const SUBNET_PREFIX: u8 = 30;

/// Parent block the pool is carved out of when nothing else is configured.
pub const DEFAULT_PARENT_CIDR: &str = "172.16.0.0/12";

pub fn default_parent() -> Ipv4Net {
    Ipv4Net::new_assert(Ipv4Addr::new(172, 16, 0, 0), 12)
}

/// Whether a lifecycle script brings the interface up or tears it down.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceState {
    Up,
    #[default]
    Down,
}

impl InterfaceState {
    /// Suffix of the matching lifecycle script: `<iface>-<suffix>.sh`.
    pub fn script_suffix(&self) -> &'static str {
        match self {
            InterfaceState::Up => "setup",
            InterfaceState::Down => "down",
        }
    }
}

impl From<bool> for InterfaceState {
    fn from(up: bool) -> Self {
        if up {
            InterfaceState::Up
        } else {
            InterfaceState::Down
        }
    }
}

/// The two logical overlay interfaces managed per node.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Iface {
    Fpn0,
    Fpn1,
}

impl Iface {
    /// Lifecycle script file name for this interface and state.
    pub fn script(&self, state: InterfaceState) -> String {
        format!("{}-{}.sh", self, state.script_suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn default_parent_matches_literal() -> Result<()> {
        let parent = Ipv4Net::from_str(DEFAULT_PARENT_CIDR).into_diagnostic()?;
        assert_eq!(default_parent(), parent);
        Ok(())
    }

    #[test]
    fn iface_script_names() -> Result<()> {
        assert_eq!(Iface::Fpn0.script(InterfaceState::Up), "fpn0-setup.sh");
        assert_eq!(Iface::Fpn1.script(InterfaceState::Down), "fpn1-down.sh");
        assert_eq!(Iface::from_str("fpn1").into_diagnostic()?, Iface::Fpn1);
        assert!(Iface::from_str("eth0").is_err());
        Ok(())
    }
}
