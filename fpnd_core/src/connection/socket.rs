/*
* Json rpc calls to the peer service through its local socket.
*
* Each call opens a connection, posts `{"method", "args"}` to `/<method>`
* over http/1.1 and decodes the json reply.
*/

use super::{IpcEndpoint, RpcTransport};

// Http
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::client::conn::http1::handshake;
use hyper::{Request, Response as HyperResponse, StatusCode};
use hyper_util::rt::TokioIo;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// Socket
use std::path::Path;
use std::time::Duration;
use tokio::net::UnixStream;
use tokio::time::timeout;

// Error Handling
use fpnd_error::NetError;
use log::{debug, trace};

/// Body of a remote procedure call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub args: Value,
}

#[derive(Debug, Clone)]
pub struct UnixTransport {
    pub endpoint: IpcEndpoint,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
}

impl UnixTransport {
    pub fn new(endpoint: IpcEndpoint, connect_timeout: Duration, response_timeout: Duration) -> Self {
        Self {
            endpoint,
            connect_timeout,
            response_timeout,
        }
    }

    fn transport_error(&self, reason: impl ToString) -> NetError {
        NetError::Transport {
            endpoint: self.endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
    fn protocol_error(&self, reason: impl ToString) -> NetError {
        NetError::Protocol {
            endpoint: self.endpoint.to_string(),
            reason: reason.to_string(),
        }
    }
    fn timeout_error(&self) -> NetError {
        NetError::RpcTimeout {
            endpoint: self.endpoint.to_string(),
        }
    }

    async fn connect(&self) -> Result<TokioIo<UnixStream>, NetError> {
        let socket = Path::new(&self.endpoint.path);
        match timeout(self.connect_timeout, UnixStream::connect(socket)).await {
            Err(_) => Err(self.timeout_error()),
            Ok(Err(e)) => Err(self.transport_error(e)),
            Ok(Ok(stream)) => Ok(TokioIo::new(stream)),
        }
    }

    async fn exchange(
        &self,
        stream: TokioIo<UnixStream>,
        method: &str,
        args: Value,
    ) -> Result<Value, NetError> {
        let (mut sender, connection) = handshake(stream)
            .await
            .map_err(|e| self.transport_error(e))?;
        let connection = tokio::spawn(async move { connection.await });

        let body = RpcRequest {
            method: method.to_owned(),
            args,
        };
        let body = serde_json::to_vec(&body).map_err(|e| self.protocol_error(e))?;
        let endpoint = format!("/{}", method);
        let request = Request::builder()
            .uri(endpoint.as_str())
            .method("POST")
            .header("Host", "localhost")
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| self.protocol_error(e))?;
        trace!("{:#?}", request);

        let response: HyperResponse<Incoming> = sender
            .send_request(request)
            .await
            .map_err(|e| self.transport_error(e))?;
        let status: StatusCode = response.status();
        let data = response
            .into_body()
            .collect()
            .await
            .map_err(|e| self.transport_error(e))?
            .to_bytes();
        connection.abort();

        if !status.is_success() {
            return Err(self.protocol_error(status));
        }
        let value: Value = serde_json::from_slice(&data).map_err(|e| self.protocol_error(e))?;
        debug!("{} {} -> {}", self.endpoint, endpoint, value);
        Ok(value)
    }
}

impl RpcTransport for UnixTransport {
    fn endpoint(&self) -> String {
        self.endpoint.to_string()
    }
    async fn call(&self, method: &str, args: Value) -> Result<Value, NetError> {
        let stream = self.connect().await?;
        match timeout(self.response_timeout, self.exchange(stream, method, args)).await {
            Err(_) => Err(self.timeout_error()),
            Ok(res) => res,
        }
    }
}
