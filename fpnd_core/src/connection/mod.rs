/*
* Best effort notification of the peer service.
*
* The peer listens on a local unix socket named by an `ipc://` endpoint.
* Calls go through the `RpcTransport` trait so the transport can be
* swapped (or faked in tests) without touching the notification logic.
*
* Every transport or protocol failure is an error, distinguishable from a
* successful call with an empty reply, so the retry policy can tell
* "should retry" from "done".
*/

mod notify;
mod socket;
mod uri;

// Reexport
pub use notify::NotificationClient;
pub use socket::{RpcRequest, UnixTransport};
pub use uri::{IpcEndpoint, DEFAULT_ENDPOINT};

use serde_json::Value;
use std::future::Future;

// Error Handling
use fpnd_error::NetError;

pub trait RpcTransport {
    /// Where calls go, for diagnostics.
    fn endpoint(&self) -> String;
    /*
     * Call the remote procedure `method` with `args`
     * and return its decoded reply.
     */
    fn call(
        &self,
        method: &str,
        args: Value,
    ) -> impl Future<Output = Result<Value, NetError>> + Send;
}
