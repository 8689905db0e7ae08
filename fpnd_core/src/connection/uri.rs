use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

// Error Handling
use fpnd_error::{FpndError, LibError};

/// Default endpoint of the peer service.
pub const DEFAULT_ENDPOINT: &str = "ipc:///run/service.sock";

/*
* Local socket endpoints, written the nanomsg way:
* - "ipc:///run/service.sock"
* - "unix:///run/service.sock"
*/
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct IpcEndpoint {
    pub path: String,
}
impl fmt::Display for IpcEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ipc://{}", self.path)
    }
}
impl Default for IpcEndpoint {
    fn default() -> Self {
        Self {
            path: "/run/service.sock".to_owned(),
        }
    }
}
impl IpcEndpoint {
    /// Helper to easily parse an endpoint url into a socket path.
    pub fn new(string: &str) -> Result<Self, FpndError> {
        let url = Url::parse(string)?;
        match url.scheme() {
            "ipc" | "unix" => {}
            _ => {
                return Err(LibError::builder()
                    .msg("Couldn't determine the endpoint scheme")
                    .help("Try ipc:///path/to/socket")
                    .build()
                    .into())
            }
        };
        // An empty path is parsed as "/" by the Url lib.
        if url.path().is_empty() || url.path() == "/" {
            let message = format!("No socket path in endpoint {:?}", string);
            return Err(LibError::builder()
                .msg(&message)
                .help("Try ipc:///path/to/socket")
                .build()
                .into());
        }
        Ok(Self {
            path: url.path().to_owned(),
        })
    }
}
