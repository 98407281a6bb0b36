use crate::{
    config::WaveConfig,
    contract::{ContractClient, WaveBackend},
    error::{ConfigError, WaveError},
    feed::{WaveFeed, WaveFeedCache},
    lifecycle::{LifecycleController, SubmitOutcome, TransactionLifecycle},
    wallet::{WalletEvent, WalletGateway, WalletProvider},
};
use alloy_primitives::Address;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// One user's session: the authorized account, the submission lifecycle and the wave feed.
///
/// All methods take `&self`, so the session can be shared with whatever renders it. Commands
/// suspend only at wallet and chain calls.
#[derive(Debug)]
pub struct WaveSession<W, B> {
    gateway: WalletGateway<W>,
    contract: ContractClient<B>,
    lifecycle: LifecycleController,
    feed: WaveFeedCache,
    events: Mutex<broadcast::Receiver<WalletEvent>>,
}

impl<W: WalletProvider, B: WaveBackend> WaveSession<W, B> {
    pub fn new(wallet: W, backend: B, config: &WaveConfig) -> Self {
        let gateway = WalletGateway::new(wallet);
        let events = Mutex::new(gateway.subscribe());
        Self {
            gateway,
            contract: ContractClient::new(backend, config),
            lifecycle: LifecycleController::new(),
            feed: WaveFeedCache::new(),
            events,
        }
    }

    /// Like [`new`](Self::new), first checking the configured ABI against the call variant.
    pub fn from_config(wallet: W, backend: B, config: &WaveConfig) -> Result<Self, ConfigError> {
        if let Some(abi) = config.abi()? {
            debug!(functions = abi.functions().count(), "validated contract ABI");
        }
        Ok(Self::new(wallet, backend, config))
    }

    pub fn gateway(&self) -> &WalletGateway<W> {
        &self.gateway
    }

    pub fn contract(&self) -> &ContractClient<B> {
        &self.contract
    }

    pub fn account(&self) -> Option<Address> {
        self.gateway.account()
    }

    pub fn lifecycle(&self) -> TransactionLifecycle {
        self.lifecycle.current()
    }

    pub fn feed(&self) -> Arc<WaveFeed> {
        self.feed.snapshot()
    }

    pub fn watch_account(&self) -> watch::Receiver<Option<Address>> {
        self.gateway.watch_account()
    }

    pub fn watch_lifecycle(&self) -> watch::Receiver<TransactionLifecycle> {
        self.lifecycle.watch()
    }

    pub fn watch_feed(&self) -> watch::Receiver<Arc<WaveFeed>> {
        self.feed.watch()
    }

    /// Restores an already authorized account without prompting, then loads the feed.
    ///
    /// Returns `Ok(None)` when nothing is authorized yet.
    pub async fn restore(&self) -> Result<Option<Address>, WaveError> {
        self.sync_wallet_events();
        let Some(account) = self.gateway.authorized_account().await? else {
            return Ok(None);
        };
        self.contract.bind(Some(account));
        self.refresh_quietly().await;
        Ok(Some(account))
    }

    /// Asks the wallet for authorization, then loads the feed.
    pub async fn connect(&self) -> Result<Address, WaveError> {
        self.sync_wallet_events();
        let account = self.gateway.request_account().await?;
        info!(%account, "connected");
        self.contract.bind(Some(account));
        self.refresh_quietly().await;
        Ok(account)
    }

    /// Submits a wave and follows it until it is mined, refreshing the feed on success.
    ///
    /// A declined signature is [`SubmitOutcome::Declined`], not an error. Every other failure
    /// is returned and also recorded on the lifecycle.
    pub async fn submit_wave(&self, message: &str) -> Result<SubmitOutcome, WaveError> {
        self.sync_wallet_events();
        if !self.gateway.detect() {
            return Err(WaveError::NoWalletProvider);
        }
        if self.contract.signer().is_none() {
            return Err(WaveError::invalid_state("connect a wallet before waving"));
        }

        let outcome = self
            .lifecycle
            .submit(&self.contract, message, || self.sync_wallet_events(), self.refresh_quietly())
            .await;
        if let Ok(SubmitOutcome::Confirmed(receipt)) = &outcome {
            info!(tx_hash = %receipt.tx_hash, "wave mined");
        }
        outcome
    }

    /// Re-reads the feed. Fails with `NoWalletProvider` without a wallet and with
    /// `InvalidState` before one is connected.
    pub async fn refresh(&self) -> Result<(), WaveError> {
        self.sync_wallet_events();
        if !self.gateway.detect() {
            return Err(WaveError::NoWalletProvider);
        }
        self.feed.refresh(&self.contract).await
    }

    /// Clears a failed lifecycle.
    pub fn reset(&self) {
        self.lifecycle.reset();
    }

    async fn refresh_quietly(&self) {
        if let Err(err) = self.feed.refresh(&self.contract).await {
            warn!(%err, "failed to refresh wave feed");
        }
    }

    /// Applies pending wallet notifications.
    ///
    /// Losing or switching the account rebinds the contract client and fails any in-flight
    /// submission, since it was signed for the previous account.
    fn sync_wallet_events(&self) {
        let mut events = self.events.lock();
        loop {
            let event = match events.try_recv() {
                Ok(event) => event,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "missed wallet events");
                    continue;
                }
                Err(_) => break,
            };
            if !self.gateway.apply(&event) {
                continue;
            }
            let account = self.gateway.account();
            debug!(?account, ?event, "wallet account changed");
            self.contract.bind(account);
            let reason = match event {
                WalletEvent::Disconnected => "wallet disconnected",
                WalletEvent::AccountsChanged(_) => "wallet account changed",
            };
            self.lifecycle.abort(&WaveError::network(reason));
        }
    }
}
