use super::{IpcEndpoint, RpcTransport, UnixTransport};
use crate::config::NotifyConfig;
use crate::retry::RetryPolicy;

use owo_colors::OwoColorize;
use serde_json::{json, Value};
use std::time::Duration;

// Error Handling
use fpnd_error::{FpndError, NetError};
use log::{debug, error};

/// Notifies the peer service about overlay ids.
#[derive(Debug, Clone)]
pub struct NotificationClient<T: RpcTransport = UnixTransport> {
    transport: T,
    policy: RetryPolicy,
}

impl NotificationClient<UnixTransport> {
    pub fn from_config(config: &NotifyConfig, policy: RetryPolicy) -> Result<Self, FpndError> {
        let endpoint = IpcEndpoint::new(&config.endpoint)?;
        let transport = UnixTransport::new(
            endpoint,
            Duration::from_millis(config.connect_timeout),
            Duration::from_millis(config.response_timeout),
        );
        Ok(Self::new(transport, policy))
    }
}

impl<T: RpcTransport> NotificationClient<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Call the remote `echo` procedure once with `fpn_id`.
    /// An empty list is a valid reply, anything but a list is a protocol error.
    pub async fn echo(&self, fpn_id: &str) -> Result<Vec<Value>, NetError> {
        let res = self.transport.call("echo", json!([fpn_id])).await;
        match res {
            Ok(Value::Array(list)) => {
                debug!("Echo result is {:?}", list);
                Ok(list)
            }
            Ok(other) => {
                let err = NetError::Protocol {
                    endpoint: self.transport.endpoint(),
                    reason: format!("expected a list, got {}", other),
                };
                error!("{} Echo exc is {}", "[notify]".red(), err);
                Err(err)
            }
            Err(e) => {
                error!("{} Echo exc is {}", "[notify]".red(), e);
                Err(e)
            }
        }
    }

    /// `echo` under the retry policy, until success or the budget is spent.
    pub async fn echo_with_retry(&self, fpn_id: &str) -> Result<Vec<Value>, NetError> {
        self.policy.retry_async(|_| self.echo(fpn_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::socket::tests::serve;
    use hyper::StatusCode;
    use miette::{IntoDiagnostic, Result};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: 1,
            backoff: 1.0,
            max_delay: 1,
        }
    }

    /// Fails the first `failures` calls, then echoes its args back.
    struct FlakyTransport {
        failures: u32,
        calls: AtomicU32,
    }

    impl RpcTransport for FlakyTransport {
        fn endpoint(&self) -> String {
            "ipc:///run/flaky.sock".to_owned()
        }
        async fn call(&self, method: &str, args: Value) -> Result<Value, NetError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            assert_eq!(method, "echo");
            if call <= self.failures {
                Err(NetError::RpcTimeout {
                    endpoint: self.endpoint(),
                })
            } else {
                Ok(args)
            }
        }
    }

    #[tokio::test]
    async fn echo_retries_transient_errors() -> Result<()> {
        let transport = FlakyTransport {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let client = NotificationClient::new(transport, fast(5));
        let res = client.echo_with_retry("a09acf0233ceff5c").await?;
        assert_eq!(res, vec![json!("a09acf0233ceff5c")]);
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn echo_gives_up() -> Result<()> {
        let transport = FlakyTransport {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        let client = NotificationClient::new(transport, fast(3));
        let res = client.echo_with_retry("beef").await;
        assert!(matches!(res, Err(NetError::RpcTimeout { .. })));
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    /// Always answers with a map instead of a list.
    struct GarbledTransport {
        calls: AtomicU32,
    }

    impl RpcTransport for GarbledTransport {
        fn endpoint(&self) -> String {
            "ipc:///run/garbled.sock".to_owned()
        }
        async fn call(&self, _method: &str, _args: Value) -> Result<Value, NetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"ok": true}))
        }
    }

    #[tokio::test]
    async fn protocol_errors_are_not_retried() -> Result<()> {
        let transport = GarbledTransport {
            calls: AtomicU32::new(0),
        };
        let client = NotificationClient::new(transport, fast(5));
        let res = client.echo_with_retry("beef").await;
        match res {
            Err(NetError::Protocol { endpoint, .. }) => {
                assert_eq!(endpoint, "ipc:///run/garbled.sock")
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn echo_over_socket() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let path = dir.path().join("service.sock");
        serve(&path, |req| (StatusCode::OK, req.args.to_string()))?;

        let config = NotifyConfig {
            endpoint: format!("ipc://{}", path.display()),
            ..Default::default()
        };
        let client = NotificationClient::from_config(&config, fast(1))?;
        let res = client.echo("beef").await?;
        assert_eq!(res, vec![json!("beef")]);
        Ok(())
    }

    #[tokio::test]
    async fn empty_reply_is_not_an_error() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let path = dir.path().join("service.sock");
        serve(&path, |_| (StatusCode::OK, "[]".to_owned()))?;

        let config = NotifyConfig {
            endpoint: format!("unix://{}", path.display()),
            ..Default::default()
        };
        let client = NotificationClient::from_config(&config, fast(1))?;
        assert_eq!(client.echo("beef").await?, Vec::<Value>::new());
        Ok(())
    }

    #[tokio::test]
    async fn non_list_reply_is_protocol_error() -> Result<()> {
        let dir = tempfile::tempdir().into_diagnostic()?;
        let path = dir.path().join("service.sock");
        serve(&path, |_| (StatusCode::OK, "{\"ok\": true}".to_owned()))?;

        let config = NotifyConfig {
            endpoint: format!("ipc://{}", path.display()),
            ..Default::default()
        };
        let client = NotificationClient::from_config(&config, fast(1))?;
        let res = client.echo("beef").await;
        match res {
            Err(NetError::Protocol { endpoint, .. }) => {
                assert_eq!(endpoint, format!("ipc://{}", path.display()))
            }
            other => panic!("unexpected {other:?}"),
        }
        Ok(())
    }
}
