pub mod cli;
pub mod config;
pub mod connection;
pub mod display;
pub mod exec;
pub mod network;
pub mod retry;
pub mod store;

pub use config::FpndConfig;
pub use network::{Allocation, NetAllocator};
