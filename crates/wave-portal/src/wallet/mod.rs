//! Wallet provider capability and the gateway that tracks the authorized account.

use crate::error::WaveError;
use alloy_primitives::Address;
use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

mod rpc;
pub use rpc::Eip1193Wallet;

/// Notifications pushed by the wallet outside of any request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WalletEvent {
    /// The set of exposed accounts changed. The first entry is the active account.
    AccountsChanged(Vec<Address>),
    /// The wallet disconnected from the chain.
    Disconnected,
}

/// An injected wallet, as seen by the client.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait WalletProvider: Send + Sync {
    /// Whether a wallet is available at all.
    fn is_present(&self) -> bool;

    /// Prompts the user to expose their accounts.
    async fn request_accounts(&self) -> Result<Vec<Address>, WaveError>;

    /// Returns the accounts already exposed to this client, without prompting.
    async fn accounts(&self) -> Result<Vec<Address>, WaveError>;

    /// Subscribes to account and connection notifications.
    fn subscribe(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Tracks the authorized account of one session.
#[derive(Debug)]
pub struct WalletGateway<W> {
    wallet: W,
    account: watch::Sender<Option<Address>>,
}

impl<W: WalletProvider> WalletGateway<W> {
    pub fn new(wallet: W) -> Self {
        Self { wallet, account: watch::Sender::new(None) }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Whether a wallet provider is present.
    pub fn detect(&self) -> bool {
        self.wallet.is_present()
    }

    /// The currently authorized account.
    pub fn account(&self) -> Option<Address> {
        *self.account.borrow()
    }

    pub fn watch_account(&self) -> watch::Receiver<Option<Address>> {
        self.account.subscribe()
    }

    /// Asks the wallet for authorization. Returns the known account without prompting if one
    /// is already authorized.
    pub async fn request_account(&self) -> Result<Address, WaveError> {
        self.ensure_present()?;
        if let Some(account) = self.account() {
            return Ok(account);
        }

        debug!("requesting wallet authorization");
        let accounts = self.wallet.request_accounts().await?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(|| WaveError::UserRejected("wallet exposed no accounts".to_string()))?;
        self.set_account(Some(account));
        Ok(account)
    }

    /// Returns the already authorized account, if any, without prompting.
    pub async fn authorized_account(&self) -> Result<Option<Address>, WaveError> {
        self.ensure_present()?;
        if let Some(account) = self.account() {
            return Ok(Some(account));
        }

        let account = self.wallet.accounts().await?.first().copied();
        match account {
            Some(account) => {
                debug!(%account, "found an authorized account");
                self.set_account(Some(account));
            }
            None => debug!("no authorized account found"),
        }
        Ok(account)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.wallet.subscribe()
    }

    /// Applies a wallet notification. Returns `true` if the active account changed.
    pub fn apply(&self, event: &WalletEvent) -> bool {
        let next = match event {
            WalletEvent::AccountsChanged(accounts) => accounts.first().copied(),
            WalletEvent::Disconnected => None,
        };
        self.set_account(next)
    }

    fn set_account(&self, account: Option<Address>) -> bool {
        self.account.send_if_modified(|current| {
            if *current == account {
                return false;
            }
            *current = account;
            true
        })
    }

    fn ensure_present(&self) -> Result<(), WaveError> {
        if self.detect() { Ok(()) } else { Err(WaveError::NoWalletProvider) }
    }
}
