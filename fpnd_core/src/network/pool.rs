/*
* The durable queue of not yet assigned subnets.
*
* The parent block is handed out in ascending /30 order, tracked by a
* cursor into its partition. Released subnets queue up behind it, first
* in first out. Only the cursor and the released subnets are persisted, so
* a save costs the same for a /12 as for a /28.
*/

use super::SUBNET_PREFIX;
use crate::store;

use ipnet::Ipv4Net;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

// Error handling
use fpnd_error::NetError;
use log::{debug, info, trace, warn};

/// Addresses spanned by one subnet.
const STRIDE: u32 = 1 << (32 - SUBNET_PREFIX);

/// On disk representation of the pool.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
struct QueueDocument {
    parent: Option<Ipv4Net>,
    /// Subnets of `parent` already handed out, in partition order.
    cursor: u64,
    recycled: VecDeque<Ipv4Net>,
}

/// Split `parent` into every /30 subnet it holds, in ascending address order.
pub fn partition(parent: Ipv4Net) -> Result<Vec<Ipv4Net>, NetError> {
    if parent.prefix_len() > SUBNET_PREFIX {
        return Err(NetError::InvalidSubnet(parent.to_string()));
    }
    let subnets = parent
        .trunc()
        .subnets(SUBNET_PREFIX)
        .map_err(|_| NetError::InvalidSubnet(parent.to_string()))?
        .collect();
    Ok(subnets)
}

fn subnet_count(parent: &Ipv4Net) -> u64 {
    1u64 << (SUBNET_PREFIX - parent.prefix_len())
}

/// The `index`th /30 of `parent`. The index must be below `subnet_count`.
fn subnet_at(parent: &Ipv4Net, index: u64) -> Ipv4Net {
    let addr = u32::from(parent.network()) + (index as u32) * STRIDE;
    Ipv4Net::new_assert(Ipv4Addr::from(addr), SUBNET_PREFIX)
}

fn index_of(parent: &Ipv4Net, subnet: &Ipv4Net) -> Option<u64> {
    if !parent.contains(subnet) {
        return None;
    }
    let offset = u32::from(subnet.network()) - u32::from(parent.network());
    Some((offset / STRIDE) as u64)
}

#[derive(Debug)]
pub struct AddressPool {
    path: PathBuf,
    parent: Option<Ipv4Net>,
    cursor: u64,
    recycled: VecDeque<Ipv4Net>,
    recycled_index: HashSet<Ipv4Net>,
}

impl AddressPool {
    /// Open the queue stored at `path`, or an empty one if there is none yet.
    /// Nothing is written until the pool is initialized or mutated.
    pub fn open(path: &Path) -> Result<Self, NetError> {
        let doc: QueueDocument = if path.exists() {
            store::read_json(path)?
        } else {
            QueueDocument::default()
        };
        if let Some(parent) = doc.parent {
            if parent.prefix_len() > SUBNET_PREFIX || doc.cursor > subnet_count(&parent) {
                return Err(NetError::CorruptState {
                    path: path.to_owned(),
                    reason: format!("cursor {} out of {}", doc.cursor, parent),
                });
            }
        }
        let recycled_index: HashSet<Ipv4Net> = doc.recycled.iter().copied().collect();
        if recycled_index.len() != doc.recycled.len() {
            return Err(NetError::CorruptState {
                path: path.to_owned(),
                reason: "duplicate subnets in queue".to_owned(),
            });
        }
        Ok(Self {
            path: path.to_owned(),
            parent: doc.parent,
            cursor: doc.cursor,
            recycled: doc.recycled,
            recycled_index,
        })
    }

    /// Generate the queue of `parent` on first use.
    /// A queue already generated is reused as is, even when exhausted,
    /// so calling this again is a no-op and never re-issues subnets.
    pub fn initialize(&mut self, parent: Ipv4Net) -> Result<(), NetError> {
        let tag = "[pool]".yellow().to_string();
        match self.parent {
            Some(stored) => {
                debug!("{} using existing queue: {}", tag, self.path.display());
                if stored != parent.trunc() {
                    warn!(
                        "{} stored queue was generated from {}, not {}",
                        tag, stored, parent
                    );
                }
            }
            None => {
                if parent.prefix_len() > SUBNET_PREFIX {
                    return Err(NetError::InvalidSubnet(parent.to_string()));
                }
                debug!("{} generating netobj queue from {}", tag, parent);
                self.parent = Some(parent.trunc());
                self.cursor = 0;
                if let Err(e) = self.save() {
                    self.parent = None;
                    return Err(e);
                }
            }
        }
        info!(
            "{} {} subnets in queue: {}",
            tag,
            self.len(),
            self.path.display()
        );
        Ok(())
    }

    fn pending(&self) -> u64 {
        match &self.parent {
            Some(parent) => subnet_count(parent) - self.cursor,
            None => 0,
        }
    }

    /// Pop the head of the queue.
    /// The pop is persisted before the subnet is handed out.
    pub fn next(&mut self) -> Result<Ipv4Net, NetError> {
        let subnet = match self.parent {
            Some(parent) if self.pending() > 0 => {
                let subnet = subnet_at(&parent, self.cursor);
                self.cursor += 1;
                if let Err(e) = self.save() {
                    self.cursor -= 1;
                    return Err(e);
                }
                subnet
            }
            _ => {
                let subnet = self.recycled.pop_front().ok_or(NetError::PoolExhausted)?;
                if let Err(e) = self.save() {
                    self.recycled.push_front(subnet);
                    return Err(e);
                }
                self.recycled_index.remove(&subnet);
                subnet
            }
        };
        trace!("popped {} ({} left)", subnet, self.len());
        Ok(subnet)
    }

    /// Whether `subnet` may be given back to this pool:
    /// a /30 network lying inside the parent block.
    pub fn check_release(&self, subnet: &Ipv4Net) -> Result<(), NetError> {
        if subnet.prefix_len() != SUBNET_PREFIX || subnet.addr() != subnet.network() {
            return Err(NetError::InvalidSubnet(subnet.to_string()));
        }
        if let Some(parent) = self.parent {
            if !parent.contains(subnet) {
                return Err(NetError::InvalidSubnet(subnet.to_string()));
            }
        }
        Ok(())
    }

    /// Give a subnet back, at the tail of the queue.
    /// Releasing a subnet that is already queued is a no-op.
    pub fn release(&mut self, subnet: Ipv4Net) -> Result<(), NetError> {
        self.check_release(&subnet)?;
        if self.contains(&subnet) {
            warn!("{} {} is already available", "[pool]".yellow(), subnet);
            return Ok(());
        }
        self.recycled.push_back(subnet);
        if let Err(e) = self.save() {
            self.recycled.pop_back();
            return Err(e);
        }
        self.recycled_index.insert(subnet);
        trace!("released {} ({} available)", subnet, self.len());
        Ok(())
    }

    pub fn save(&self) -> Result<(), NetError> {
        let doc = QueueDocument {
            parent: self.parent,
            cursor: self.cursor,
            recycled: self.recycled.clone(),
        };
        store::write_json(&self.path, &doc)
    }

    pub fn len(&self) -> usize {
        self.pending() as usize + self.recycled.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn contains(&self, subnet: &Ipv4Net) -> bool {
        if self.recycled_index.contains(subnet) {
            return true;
        }
        match &self.parent {
            Some(parent)
                if subnet.prefix_len() == SUBNET_PREFIX && subnet.addr() == subnet.network() =>
            {
                matches!(index_of(parent, subnet), Some(index) if index >= self.cursor)
            }
            _ => false,
        }
    }
    /// Next subnet to be handed out, without popping it.
    pub fn peek(&self) -> Option<Ipv4Net> {
        match &self.parent {
            Some(parent) if self.pending() > 0 => Some(subnet_at(parent, self.cursor)),
            _ => self.recycled.front().copied(),
        }
    }
    /// Parent block the queue was generated from.
    pub fn parent(&self) -> Option<Ipv4Net> {
        self.parent
    }
    /// Backing file.
    pub fn location(&self) -> &Path {
        &self.path
    }
}
