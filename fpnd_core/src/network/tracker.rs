/*
* The identifiers (network and member ids) already holding a subnet,
* with the subnet each one holds when it is known.
*
* Entries are kept ordered so prefix lookups are a range scan.
* The `fresh` marker is set when a store is created and cleared by the
* first mutation. It is persisted, so a reused or tampered store can be
* told apart from a newly created one on startup.
*/

use crate::store;

use ipnet::Ipv4Net;

use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};

// Error handling
use fpnd_error::NetError;
use log::{debug, info, trace};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTracker {
    fresh: bool,
    entries: BTreeMap<String, Option<Ipv4Net>>,
}

impl Default for AssignmentTracker {
    fn default() -> Self {
        Self {
            fresh: true,
            entries: BTreeMap::new(),
        }
    }
}

impl AssignmentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new durable store in `dir` (`trie*.dat`) holding a fresh tracker.
    /// Returns the tracker and the store location.
    pub fn create(dir: &Path) -> Result<(Self, PathBuf), NetError> {
        let file = tempfile::Builder::new()
            .prefix("trie")
            .suffix(".dat")
            .tempfile_in(dir)
            .map_err(|e| NetError::StorageIo {
                path: dir.to_owned(),
                source: e,
            })?;
        let (_, path) = file.keep().map_err(|e| NetError::StorageIo {
            path: dir.to_owned(),
            source: e.error,
        })?;

        let tracker = Self::new();
        tracker.save(&path)?;
        info!("{} created state store: {}", "[tracker]".yellow(), path.display());
        Ok((tracker, path))
    }

    /// Create a fresh tracker at a fixed location, replacing whatever was there.
    pub fn create_at(path: &Path) -> Result<Self, NetError> {
        let tracker = Self::new();
        tracker.save(path)?;
        info!("{} created state store: {}", "[tracker]".yellow(), path.display());
        Ok(tracker)
    }

    pub fn load(path: &Path) -> Result<Self, NetError> {
        let tracker: Self = store::read_json(path)?;
        debug!(
            "{} loaded {} entries from {}",
            "[tracker]".yellow(),
            tracker.len(),
            path.display()
        );
        Ok(tracker)
    }

    pub fn save(&self, path: &Path) -> Result<(), NetError> {
        store::write_json(path, self)?;
        trace!("saved {} entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Mark `identifier` as allocated.
    pub fn assign(&mut self, identifier: &str) -> Result<(), NetError> {
        self.insert(identifier, None)
    }

    /// Mark `identifier` as holding `subnet`.
    pub fn assign_subnet(&mut self, identifier: &str, subnet: Ipv4Net) -> Result<(), NetError> {
        self.insert(identifier, Some(subnet))
    }

    fn insert(&mut self, identifier: &str, subnet: Option<Ipv4Net>) -> Result<(), NetError> {
        if identifier.is_empty() {
            return Err(NetError::InvalidIdentifier(identifier.to_owned()));
        }
        if self.entries.contains_key(identifier) {
            return Err(NetError::DuplicateIdentifier(identifier.to_owned()));
        }
        self.entries.insert(identifier.to_owned(), subnet);
        self.fresh = false;
        Ok(())
    }

    /// Forget `identifier`. Absent identifiers are ignored so reclamation
    /// can be retried safely. Returns whether something was removed.
    pub fn release(&mut self, identifier: &str) -> bool {
        let removed = self.entries.remove(identifier).is_some();
        if removed {
            self.fresh = false;
        }
        removed
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Subnet held by `identifier`.
    /// `None` when the identifier is untracked or was assigned without one.
    pub fn subnet_of(&self, identifier: &str) -> Option<Ipv4Net> {
        self.entries.get(identifier).copied().flatten()
    }

    /// Ordered identifiers starting with `prefix`.
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.as_str())
    }

    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.keys_with_prefix(prefix).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// True until the first mutation since creation.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

/// Startup sanity gate: the tracker must be unmutated and empty.
pub fn check_fresh(tracker: &AssignmentTracker) -> bool {
    tracker.is_fresh() && tracker.is_empty()
}

/// Same as `check_fresh` for a store on disk.
/// Any failure to read the store counts as not fresh.
pub fn check_fresh_at(path: &Path) -> bool {
    match AssignmentTracker::load(path) {
        Ok(tracker) => check_fresh(&tracker),
        Err(e) => {
            debug!("{} {} is not fresh: {}", "[tracker]".yellow(), path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;

    #[test]
    fn created_store_is_fresh() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let (mut tracker, path) = AssignmentTracker::create(dir.path())?;

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("trie") && name.ends_with(".dat"));
        assert!(check_fresh(&tracker));
        assert!(check_fresh_at(&path));

        tracker.assign("a09acf0233ceff5c")?;
        assert!(!check_fresh(&tracker));

        tracker.save(&path)?;
        assert!(!check_fresh_at(&path));
        Ok(())
    }

    #[test]
    fn emptied_store_stays_stale() -> Result<()> {
        let mut tracker = AssignmentTracker::new();
        tracker.assign("beef")?;
        assert!(tracker.release("beef"));
        assert!(tracker.is_empty());
        assert!(!check_fresh(&tracker));
        Ok(())
    }

    #[test]
    fn duplicate_assignment() -> Result<()> {
        let mut tracker = AssignmentTracker::new();
        tracker.assign("beef")?;
        let res = tracker.assign("beef");
        assert!(matches!(res, Err(NetError::DuplicateIdentifier(_))));
        assert_eq!(tracker.len(), 1);

        assert!(matches!(
            tracker.assign(""),
            Err(NetError::InvalidIdentifier(_))
        ));
        Ok(())
    }

    #[test]
    fn release_absent_is_noop() {
        let mut tracker = AssignmentTracker::new();
        assert!(!tracker.release("beef"));
        // Nothing changed, still fresh.
        assert!(check_fresh(&tracker));
    }

    #[test]
    fn prefix_lookup() -> Result<()> {
        let mut tracker = AssignmentTracker::new();
        for id in ["a09acf02", "a09acf0233ceff5c", "a09b", "b000", "a0"] {
            tracker.assign(id)?;
        }
        let keys: Vec<&str> = tracker.keys_with_prefix("a09a").collect();
        assert_eq!(keys, vec!["a09acf02", "a09acf0233ceff5c"]);
        assert!(tracker.has_prefix("b"));
        assert!(!tracker.has_prefix("c"));
        assert_eq!(tracker.keys_with_prefix("").count(), 5);
        Ok(())
    }

    #[test]
    fn save_and_load() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let path = dir.path().join("net_trie.dat");

        let mut tracker = AssignmentTracker::create_at(&path)?;
        tracker.assign("beef")?;
        tracker.assign_subnet("cafe", "10.0.0.4/30".parse().into_diagnostic()?)?;
        tracker.save(&path)?;

        let loaded = AssignmentTracker::load(&path)?;
        assert_eq!(loaded, tracker);
        assert!(!loaded.is_fresh());
        assert_eq!(loaded.subnet_of("beef"), None);
        assert_eq!(loaded.subnet_of("cafe").map(|e| e.to_string()), Some("10.0.0.4/30".to_owned()));
        Ok(())
    }

    #[test]
    fn released_identifier_forgets_its_subnet() -> Result<()> {
        let mut tracker = AssignmentTracker::new();
        tracker.assign_subnet("beef", "10.0.0.0/30".parse().into_diagnostic()?)?;
        let res = tracker.assign_subnet("beef", "10.0.0.4/30".parse().into_diagnostic()?);
        assert!(matches!(res, Err(NetError::DuplicateIdentifier(_))));
        assert_eq!(tracker.subnet_of("beef").map(|e| e.to_string()), Some("10.0.0.0/30".to_owned()));

        assert!(tracker.release("beef"));
        assert_eq!(tracker.subnet_of("beef"), None);
        assert!(tracker.keys_with_prefix("b").next().is_none());
        Ok(())
    }

    #[test]
    fn corrupt_or_missing_store() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let path = dir.path().join("net_trie.dat");
        std::fs::write(&path, b"\x00\x01 not a trie").into_diagnostic()?;

        assert!(matches!(
            AssignmentTracker::load(&path),
            Err(NetError::CorruptState { .. })
        ));
        assert!(!check_fresh_at(&path));
        assert!(!check_fresh_at(&dir.path().join("missing.dat")));
        Ok(())
    }

    #[test]
    fn save_to_unwritable_location() {
        let tracker = AssignmentTracker::new();
        let res = tracker.save(Path::new("/proc/fpnd/net_trie.dat"));
        assert!(matches!(res, Err(NetError::StorageIo { .. })));
    }
}
