use super::{WalletEvent, WalletProvider};
use crate::error::WaveError;
use alloy_primitives::Address;
use alloy_provider::{Provider, RootProvider};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// A wallet reached over JSON-RPC, speaking the EIP-1193 account methods.
///
/// The endpoint is expected to hold the keys: it answers `eth_requestAccounts` and
/// `eth_accounts`, and signs and broadcasts on `eth_sendTransaction`. A wallet constructed
/// without an endpoint behaves like a browser with no injected provider.
#[derive(Debug)]
pub struct Eip1193Wallet<P> {
    provider: Option<P>,
    events: broadcast::Sender<WalletEvent>,
}

impl Eip1193Wallet<RootProvider> {
    /// Connects to the wallet at `url`, if one is configured.
    pub fn connect_http(url: Option<&str>) -> Result<Self, WaveError> {
        let Some(url) = url else { return Ok(Self::absent()) };
        let url = url.parse().map_err(WaveError::network)?;
        Ok(Self::new(RootProvider::new_http(url)))
    }
}

impl<P: Provider> Eip1193Wallet<P> {
    pub fn new(provider: P) -> Self {
        Self::with_provider(Some(provider))
    }

    /// A wallet with no provider behind it.
    pub fn absent() -> Self {
        Self::with_provider(None)
    }

    fn with_provider(provider: Option<P>) -> Self {
        Self { provider, events: broadcast::channel(16).0 }
    }

    pub fn provider(&self) -> Option<&P> {
        self.provider.as_ref()
    }

    /// Forwards a wallet notification to all subscribers.
    pub fn emit(&self, event: WalletEvent) {
        trace!(?event, "wallet event");
        // no subscribers is fine
        let _ = self.events.send(event);
    }

    fn require(&self) -> Result<&P, WaveError> {
        self.provider.as_ref().ok_or(WaveError::NoWalletProvider)
    }
}

#[async_trait]
impl<P: Provider> WalletProvider for Eip1193Wallet<P> {
    fn is_present(&self) -> bool {
        self.provider.is_some()
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WaveError> {
        let accounts: Vec<Address> =
            self.require()?.raw_request("eth_requestAccounts".into(), ()).await?;
        debug!(?accounts, "wallet authorized");
        Ok(accounts)
    }

    async fn accounts(&self) -> Result<Vec<Address>, WaveError> {
        Ok(self.require()?.get_accounts().await?)
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}
