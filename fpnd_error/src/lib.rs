use bon::bon;
use miette::{Diagnostic, Report};
pub use pipelight_error::{CastError, TomlError};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum FpndError {
    ////////////////////////////////
    // Lib native errors
    #[error(transparent)]
    #[diagnostic(transparent)]
    WrapError(#[from] WrapError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    LibError(#[from] LibError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NetError(#[from] NetError),

    ////////////////////////////////
    // Type convertion
    #[error(transparent)]
    #[diagnostic(code(parse::error))]
    ParseError(#[from] url::ParseError),

    #[error(transparent)]
    #[diagnostic(code(serde::error))]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(fpnd::strum::error))]
    StrumError(#[from] strum::ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    CastError(#[from] CastError),

    #[error(transparent)]
    #[diagnostic(code(fpnd::io::error))]
    IoError(#[from] std::io::Error),
}

/**
Subnet allocation and provisioning failures.

Validation errors (`InvalidSubnet`, `InvalidAddress`, `InvalidIdentifier`)
are caller bugs and never retried.
State-consistency errors (`PoolExhausted`, `DuplicateIdentifier`)
must reach the caller untouched.
*/
#[derive(Debug, Error, Diagnostic)]
pub enum NetError {
    #[error("no subnet left in pool")]
    #[diagnostic(
        code(fpnd::pool::exhausted),
        help("The parent block is fully allocated, reclaim subnets or use a larger block.")
    )]
    PoolExhausted,

    #[error("identifier {0:?} is already assigned")]
    #[diagnostic(
        code(fpnd::tracker::duplicate),
        help("Release the identifier before assigning it again.")
    )]
    DuplicateIdentifier(String),

    #[error("invalid identifier {0:?}")]
    #[diagnostic(code(fpnd::tracker::identifier), help("Identifiers can't be empty."))]
    InvalidIdentifier(String),

    #[error("corrupt state in {}: {reason}", path.display())]
    #[diagnostic(
        code(fpnd::state::corrupt),
        help("Discard the store and recreate it (fpnd init --fresh).")
    )]
    CorruptState { path: PathBuf, reason: String },

    #[error("storage io error on {}", path.display())]
    #[diagnostic(code(fpnd::state::io), help("Check the state directory permissions."))]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid subnet {0:?}")]
    #[diagnostic(code(fpnd::netcfg::subnet), help("Expected an IPv4 network with a /30 prefix."))]
    InvalidSubnet(String),

    #[error("invalid address {0:?}")]
    #[diagnostic(
        code(fpnd::netcfg::address),
        help("Expected a bare IPv4 host address (no mask, no network or broadcast address).")
    )]
    InvalidAddress(String),

    #[error("net cmd {cmd} failed: {reason}")]
    #[diagnostic(code(fpnd::exec::failure))]
    CommandFailure { cmd: String, reason: String },

    #[error("NanoMsgAPIError: connection to {endpoint} timed out")]
    #[diagnostic(code(fpnd::rpc::timeout), help("Is the peer service listening?"))]
    RpcTimeout { endpoint: String },

    #[error("transport error on {endpoint}: {reason}")]
    #[diagnostic(code(fpnd::rpc::transport), help("Does the socket exist?"))]
    Transport { endpoint: String, reason: String },

    #[error("protocol error on {endpoint}: {reason}")]
    #[diagnostic(code(fpnd::rpc::protocol))]
    Protocol { endpoint: String, reason: String },
}

impl NetError {
    /// Transient failures eligible for the bounded retry policy.
    /// `Protocol` errors are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            NetError::CommandFailure { .. }
                | NetError::RpcTimeout { .. }
                | NetError::Transport { .. }
                | NetError::StorageIo { .. }
        )
    }
}

/**
A config error with help higher origin
Can be recursively chained.
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(fpnd::wrap::error))]
pub struct WrapError {
    pub message: String,
    #[diagnostic_source]
    pub origin: Report,
    #[help]
    pub help: String,
}

#[bon]
impl WrapError {
    #[builder]
    pub fn new(msg: &str, help: &str, origin: Report) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
            origin,
        }
    }
}

/**
A root cause error with no inner origin
*/
#[derive(Debug, Error, Diagnostic)]
#[error("{}", message)]
#[diagnostic(code(fpnd::lib::error))]
pub struct LibError {
    pub message: String,
    #[help]
    pub help: String,
}

#[bon]
impl LibError {
    #[builder]
    pub fn new(msg: &str, help: &str) -> Self {
        Self {
            message: msg.to_owned(),
            help: help.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_classification() {
        assert!(NetError::RpcTimeout {
            endpoint: "ipc:///run/service.sock".to_owned()
        }
        .is_retryable());
        assert!(NetError::CommandFailure {
            cmd: "fpn0-setup.sh".to_owned(),
            reason: "exit status 1".to_owned()
        }
        .is_retryable());
        assert!(NetError::Transport {
            endpoint: "ipc:///run/service.sock".to_owned(),
            reason: "connection refused".to_owned()
        }
        .is_retryable());

        assert!(!NetError::Protocol {
            endpoint: "ipc:///run/service.sock".to_owned(),
            reason: "404 Not Found".to_owned()
        }
        .is_retryable());
        assert!(!NetError::PoolExhausted.is_retryable());
        assert!(!NetError::DuplicateIdentifier("beef".to_owned()).is_retryable());
        assert!(!NetError::InvalidSubnet("10.0.0.0/24".to_owned()).is_retryable());
        assert!(!NetError::CorruptState {
            path: PathBuf::from("/tmp/trie.dat"),
            reason: "eof".to_owned()
        }
        .is_retryable());
    }

    #[test]
    fn rpc_timeout_is_tagged() {
        let err = NetError::RpcTimeout {
            endpoint: "ipc:///run/service.sock".to_owned(),
        };
        assert!(err.to_string().starts_with("NanoMsgAPIError"));
    }
}
