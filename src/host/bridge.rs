//! Host bridge trait and the ordered adapter chain.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::HostMode;
use super::error::HostError;

/// Invoke-by-name call surface to the desktop host.
///
/// Adapters answer [`HostError::Unavailable`] when they cannot reach the
/// host at all, which lets [`HostBridgeChain`] move on to the next one.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HostBridge: Send + Sync {
    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, HostError>;
}

/// Candidate bridge adapters tried in order.
///
/// The first adapter that reaches the host decides the outcome, whether it
/// succeeds or the host raises. In standalone mode no adapter is consulted.
pub struct HostBridgeChain {
    mode: HostMode,
    adapters: Vec<Box<dyn HostBridge>>,
}

impl HostBridgeChain {
    pub fn new(mode: HostMode) -> Self {
        Self {
            mode,
            adapters: Vec::new(),
        }
    }

    pub fn with_adapter(mut self, adapter: impl HostBridge + 'static) -> Self {
        self.adapters.push(Box::new(adapter));
        self
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }
}

#[async_trait]
impl HostBridge for HostBridgeChain {
    async fn invoke(&self, command: &str, args: Option<Value>) -> Result<Value, HostError> {
        if self.mode == HostMode::Standalone {
            return Err(HostError::Unavailable);
        }

        for (i, adapter) in self.adapters.iter().enumerate() {
            match adapter.invoke(command, args.clone()).await {
                Err(HostError::Unavailable) => {
                    debug!(command, adapter = i, "bridge adapter unavailable, trying next");
                }
                outcome => return outcome,
            }
        }

        Err(HostError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unavailable() -> MockHostBridge {
        let mut mock = MockHostBridge::new();
        mock.expect_invoke()
            .times(1)
            .returning(|_, _| Err(HostError::Unavailable));
        mock
    }

    #[tokio::test]
    async fn test_standalone_never_calls_adapters() {
        let mut mock = MockHostBridge::new();
        mock.expect_invoke().never();

        let chain = HostBridgeChain::new(HostMode::Standalone).with_adapter(mock);
        let err = chain.invoke("get_backend_port", None).await.unwrap_err();
        assert_eq!(err, HostError::Unavailable);
    }

    #[tokio::test]
    async fn test_falls_through_to_second_adapter() {
        let mut second = MockHostBridge::new();
        second
            .expect_invoke()
            .withf(|cmd, _| cmd == "get_backend_port")
            .times(1)
            .returning(|_, _| Ok(json!(51234)));

        let chain = HostBridgeChain::new(HostMode::Hosted)
            .with_adapter(unavailable())
            .with_adapter(second);

        let port = chain.invoke("get_backend_port", None).await.unwrap();
        assert_eq!(port, json!(51234));
    }

    #[tokio::test]
    async fn test_command_error_stops_the_chain() {
        let mut first = MockHostBridge::new();
        first
            .expect_invoke()
            .times(1)
            .returning(|_, _| Err(HostError::Command("python not found".to_string())));
        let mut second = MockHostBridge::new();
        second.expect_invoke().never();

        let chain = HostBridgeChain::new(HostMode::Hosted)
            .with_adapter(first)
            .with_adapter(second);

        let err = chain.invoke("start_backend", None).await.unwrap_err();
        assert_eq!(err, HostError::Command("python not found".to_string()));
    }

    #[tokio::test]
    async fn test_all_unavailable() {
        let chain = HostBridgeChain::new(HostMode::Hosted)
            .with_adapter(unavailable())
            .with_adapter(unavailable());

        assert_eq!(
            chain.invoke("start_backend", None).await.unwrap_err(),
            HostError::Unavailable
        );
    }

    #[tokio::test]
    async fn test_empty_hosted_chain_is_unavailable() {
        let chain = HostBridgeChain::new(HostMode::Hosted);
        assert_eq!(
            chain.invoke("start_backend", None).await.unwrap_err(),
            HostError::Unavailable
        );
    }
}
