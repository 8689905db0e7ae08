/*
* Allocation and reclamation of subnets for overlay peers.
*
* Pool pop and tracker assignment form one logical step:
* when anything fails after the pop, the subnet goes back to the pool
* and the identifier is forgotten, so a subnet is never both available
* and assigned.
*
* Methods take `&mut self`. Callers running several request handlers
* must guard the allocator with a single lock.
*/

use super::netcfg::{address_to_subnet, subnet_to_config, NetworkConfig};
use super::pool::AddressPool;
use super::tracker::{check_fresh, AssignmentTracker};
use crate::config::FpndConfig;

use ipnet::Ipv4Net;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Error handling
use fpnd_error::NetError;
use log::{error, info, warn};

/// Result of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub identifier: String,
    pub subnet: Ipv4Net,
    pub config: NetworkConfig,
}

#[derive(Debug)]
pub struct NetAllocator {
    pool: AddressPool,
    tracker: AssignmentTracker,
    tracker_path: PathBuf,
}

impl NetAllocator {
    /// Open the pool and tracker stores named by the configuration.
    pub fn open(config: &FpndConfig) -> Result<Self, NetError> {
        Self::open_at(
            &config.pool_path(),
            &config.tracker_path(),
            config.pool.parent,
        )
    }

    /// Open (or generate) the pool at `pool_path` and the tracker at `tracker_path`.
    /// A missing tracker is created and must pass the freshness gate.
    pub fn open_at(
        pool_path: &Path,
        tracker_path: &Path,
        parent: Ipv4Net,
    ) -> Result<Self, NetError> {
        let mut pool = AddressPool::open(pool_path)?;
        pool.initialize(parent)?;

        let tracker = if tracker_path.exists() {
            AssignmentTracker::load(tracker_path)?
        } else {
            let tracker = AssignmentTracker::create_at(tracker_path)?;
            let reloaded = AssignmentTracker::load(tracker_path)?;
            if !check_fresh(&reloaded) {
                return Err(NetError::CorruptState {
                    path: tracker_path.to_owned(),
                    reason: "newly created store is not fresh".to_owned(),
                });
            }
            tracker
        };

        Ok(Self {
            pool,
            tracker,
            tracker_path: tracker_path.to_owned(),
        })
    }

    /// Discard the tracker store and start over with a fresh one.
    /// Operator recovery for a corrupt store.
    pub fn reset_tracker(tracker_path: &Path) -> Result<AssignmentTracker, NetError> {
        warn!(
            "{} discarding state store: {}",
            "[tracker]".yellow(),
            tracker_path.display()
        );
        let tracker = AssignmentTracker::create_at(tracker_path)?;
        if !check_fresh(&tracker) {
            return Err(NetError::CorruptState {
                path: tracker_path.to_owned(),
                reason: "newly created store is not fresh".to_owned(),
            });
        }
        Ok(tracker)
    }

    /// Hand the next subnet to `identifier` and derive its config.
    pub fn allocate(&mut self, identifier: &str) -> Result<Allocation, NetError> {
        if identifier.is_empty() {
            return Err(NetError::InvalidIdentifier(identifier.to_owned()));
        }
        // Refuse before touching the pool.
        if self.tracker.contains(identifier) {
            return Err(NetError::DuplicateIdentifier(identifier.to_owned()));
        }

        let subnet = self.pool.next()?;
        match self.commit(identifier, subnet) {
            Ok(config) => {
                info!(
                    "{} {} -> {}",
                    "[alloc]".green(),
                    identifier,
                    subnet.to_string().blue()
                );
                Ok(Allocation {
                    identifier: identifier.to_owned(),
                    subnet,
                    config,
                })
            }
            Err(e) => {
                error!("{} {} failed: {}", "[alloc]".red(), identifier, e);
                self.rollback(identifier, subnet);
                Err(e)
            }
        }
    }

    fn commit(&mut self, identifier: &str, subnet: Ipv4Net) -> Result<NetworkConfig, NetError> {
        self.tracker.assign_subnet(identifier, subnet)?;
        self.tracker.save(&self.tracker_path)?;
        subnet_to_config(subnet)
    }

    fn rollback(&mut self, identifier: &str, subnet: Ipv4Net) {
        if self.tracker.release(identifier) {
            if let Err(e) = self.tracker.save(&self.tracker_path) {
                error!("{} couldn't save rollback: {}", "[tracker]".red(), e);
            }
        }
        if let Err(e) = self.pool.release(subnet) {
            error!("{} couldn't give back {}: {}", "[pool]".red(), subnet, e);
        }
    }

    /// Free the subnet holding `host_addr` and forget `identifier`.
    ///
    /// Only the subnet recorded for `identifier` goes back to the pool.
    /// An untracked identifier is a no-op that leaves the pool alone, so
    /// retrying a reclamation that already went through is harmless.
    /// Nothing changes unless every check passes.
    pub fn reclaim(&mut self, identifier: &str, host_addr: &str) -> Result<Ipv4Net, NetError> {
        let subnet = address_to_subnet(host_addr)?;
        self.pool.check_release(&subnet)?;

        if !self.tracker.contains(identifier) {
            warn!(
                "{} {} is not allocated, {} left untouched",
                "[reclaim]".yellow(),
                identifier,
                subnet
            );
            return Ok(subnet);
        }
        let held = self.tracker.subnet_of(identifier);
        if let Some(held) = held {
            if held != subnet {
                error!(
                    "{} {} holds {}, not {}",
                    "[reclaim]".red(),
                    identifier,
                    held,
                    subnet
                );
                return Err(NetError::InvalidAddress(host_addr.to_owned()));
            }
        }

        self.tracker.release(identifier);
        if let Err(e) = self.tracker.save(&self.tracker_path) {
            self.restore(identifier, held);
            return Err(e);
        }
        if let Err(e) = self.pool.release(subnet) {
            self.restore(identifier, held);
            if let Err(e) = self.tracker.save(&self.tracker_path) {
                error!("{} couldn't save rollback: {}", "[tracker]".red(), e);
            }
            return Err(e);
        }
        info!(
            "{} {} <- {}",
            "[reclaim]".green(),
            subnet.to_string().blue(),
            identifier
        );
        Ok(subnet)
    }

    fn restore(&mut self, identifier: &str, held: Option<Ipv4Net>) {
        let res = match held {
            Some(subnet) => self.tracker.assign_subnet(identifier, subnet),
            None => self.tracker.assign(identifier),
        };
        if let Err(e) = res {
            error!("{} couldn't restore {}: {}", "[tracker]".red(), identifier, e);
        }
    }

    /// Drop every assignment and start from a fresh tracker.
    /// The pool is left as is.
    pub fn reset(&mut self) -> Result<(), NetError> {
        self.tracker = Self::reset_tracker(&self.tracker_path)?;
        Ok(())
    }

    pub fn pool(&self) -> &AddressPool {
        &self.pool
    }
    pub fn tracker(&self) -> &AssignmentTracker {
        &self.tracker
    }
    pub fn tracker_path(&self) -> &Path {
        &self.tracker_path
    }
}
