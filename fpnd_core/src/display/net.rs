use super::utils::*;
use crate::exec::get_net_cmds;
use crate::network::{Iface, InterfaceState, NetAllocator, NetworkConfig};

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use strum::IntoEnumIterator;
use tabled::Tabled;

#[derive(Default, Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Tabled)]
pub struct PoolTable {
    #[tabled(display("display_some_net"))]
    pub parent: Option<Ipv4Net>,
    pub available: usize,
    #[tabled(display("display_some_net"))]
    pub next: Option<Ipv4Net>,
    pub location: String,
}

#[derive(Default, Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Tabled)]
pub struct TrackerTable {
    pub assigned: usize,
    #[tabled(display("display_bool"))]
    pub fresh: bool,
    pub location: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Tabled)]
pub struct ScriptTable {
    pub script: String,
    #[tabled(display("display_bool"))]
    pub present: bool,
}

#[derive(Default, Debug, Serialize, Deserialize, Clone, Eq, PartialEq, Tabled)]
pub struct NetCfgTable {
    pub target: String,
    #[tabled(display("display_some_addr"))]
    pub via: Option<Ipv4Addr>,
}

impl PoolTable {
    pub fn from(alloc: &NetAllocator) -> Self {
        let pool = alloc.pool();
        Self {
            parent: pool.parent(),
            available: pool.len(),
            next: pool.peek(),
            location: pool.location().display().to_string(),
        }
    }
}

impl TrackerTable {
    pub fn from(alloc: &NetAllocator) -> Self {
        let tracker = alloc.tracker();
        Self {
            assigned: tracker.len(),
            fresh: tracker.is_fresh(),
            location: alloc.tracker_path().display().to_string(),
        }
    }
}

impl ScriptTable {
    /// One row per expected lifecycle script in `bin_dir`.
    pub fn from(bin_dir: &Path) -> Vec<Self> {
        let mut rows = vec![];
        for iface in Iface::iter() {
            for state in [InterfaceState::Up, InterfaceState::Down] {
                let present = get_net_cmds(bin_dir, Some(iface), state).is_some();
                rows.push(Self {
                    script: iface.script(state),
                    present,
                });
            }
        }
        rows
    }
}

impl NetCfgTable {
    pub fn from(config: &NetworkConfig) -> Vec<Self> {
        config
            .net_routes
            .iter()
            .map(|e| Self {
                target: e.target.to_string(),
                via: e.via,
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::display;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;

    #[test]
    fn display_netcfg() -> Result<()> {
        let cfg = NetworkConfig::from_cidr("10.0.0.0/30")?;
        let rows = NetCfgTable::from(&cfg);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].via, Some(Ipv4Addr::new(10, 0, 0, 1)));

        let table = display::default(rows)?;
        println!("\n{}", table);
        assert!(table.contains("0.0.0.0/0"));
        Ok(())
    }

    #[test]
    fn display_scripts() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        std::fs::write(dir.path().join("fpn0-setup.sh"), "").into_diagnostic()?;

        let rows = ScriptTable::from(dir.path());
        assert_eq!(rows.len(), 4);
        assert!(rows[0].present);
        assert!(rows[1..].iter().all(|e| !e.present));

        println!("\n{}", display::default(rows)?);
        Ok(())
    }
}
