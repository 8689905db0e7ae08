use super::{FpndConfig, POOL_FILE, TRACKER_FILE};
use crate::connection::NotificationClient;
use crate::exec::CommandRunner;
use crate::network::NetAllocator;

use std::path::PathBuf;

// Error Handling
use fpnd_error::{FpndError, NetError};

/*
* Build the components from the configuration.
* Nothing reads global state: everything needed is passed in here.
*/
impl FpndConfig {
    pub fn pool_path(&self) -> PathBuf {
        self.state.dir.join(POOL_FILE)
    }
    pub fn tracker_path(&self) -> PathBuf {
        self.state.dir.join(TRACKER_FILE)
    }
    pub fn get_allocator(&self) -> Result<NetAllocator, NetError> {
        NetAllocator::open(self)
    }
    pub fn get_command_runner(&self) -> CommandRunner {
        CommandRunner::new(&self.scripts.bin_dir, self.retry.clone())
    }
    pub fn get_notification_client(&self) -> Result<NotificationClient, FpndError> {
        NotificationClient::from_config(&self.notify, self.retry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;

    #[test]
    fn state_files_live_in_state_dir() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let mut config = FpndConfig::default();
        config.state.dir = dir.path().to_owned();
        config.pool.parent = "10.0.0.0/29".parse().into_diagnostic()?;

        assert_eq!(config.pool_path(), dir.path().join("netobj_queue.json"));
        assert_eq!(config.tracker_path(), dir.path().join("net_trie.dat"));

        let alloc = config.get_allocator()?;
        assert_eq!(alloc.pool().len(), 2);
        assert!(config.tracker_path().exists());
        Ok(())
    }
}
