//! Typed access to the WavePortal contract.

use crate::{
    config::{WaveConfig, WaveVariant},
    error::WaveError,
    feed::WaveRecord,
};
use alloy_primitives::{Address, TxHash};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

mod rpc;
pub use rpc::{AlloyWaveBackend, ILegacyWavePortal, IWavePortal};

/// The arguments of one `wave` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WaveCall {
    /// `wave(string)`
    WithMessage(String),
    /// `wave()`
    Bare,
}

/// The outcome of a mined wave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

/// The on-chain side of the contract: three calls plus confirmation.
#[async_trait]
#[auto_impl::auto_impl(&, Arc, Box)]
pub trait WaveBackend: Send + Sync {
    async fn total_waves(&self) -> Result<u64, WaveError>;

    async fn all_waves(&self) -> Result<Vec<WaveRecord>, WaveError>;

    /// Signs and broadcasts a wave from `from`, returning once the transaction is in the pool.
    async fn send_wave(&self, from: Address, call: &WaveCall) -> Result<TxHash, WaveError>;

    /// Waits until `tx_hash` is mined. A failed execution is
    /// [`TransactionReverted`](WaveError::TransactionReverted).
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<WaveReceipt, WaveError>;
}

/// Facade over a [`WaveBackend`] for one contract, bound to the authorized account.
#[derive(Debug)]
pub struct ContractClient<B> {
    backend: B,
    address: Address,
    variant: WaveVariant,
    signer: RwLock<Option<Address>>,
}

impl<B: WaveBackend> ContractClient<B> {
    pub fn new(backend: B, config: &WaveConfig) -> Self {
        Self {
            backend,
            address: config.contract_address,
            variant: config.variant(),
            signer: RwLock::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn variant(&self) -> WaveVariant {
        self.variant
    }

    /// The account writes are signed with.
    pub fn signer(&self) -> Option<Address> {
        *self.signer.read()
    }

    /// Binds the client to `account`, or unbinds it.
    pub fn bind(&self, account: Option<Address>) {
        let mut signer = self.signer.write();
        if *signer != account {
            debug!(?account, contract = %self.address, "binding contract client");
            *signer = account;
        }
    }

    pub async fn get_total_waves(&self) -> Result<u64, WaveError> {
        let total = self.backend.total_waves().await?;
        trace!(total, "getTotalWaves");
        Ok(total)
    }

    pub async fn get_all_waves(&self) -> Result<Vec<WaveRecord>, WaveError> {
        let waves = self.backend.all_waves().await?;
        trace!(count = waves.len(), "getAllWaves");
        Ok(waves)
    }

    /// Builds the call for the configured variant. `Bare` contracts drop the message.
    pub fn wave_call(&self, message: &str) -> WaveCall {
        match self.variant {
            WaveVariant::WithMessage => WaveCall::WithMessage(message.to_string()),
            WaveVariant::Bare => {
                if !message.is_empty() {
                    debug!("contract takes no message, dropping it");
                }
                WaveCall::Bare
            }
        }
    }

    /// Signs and broadcasts a wave. Returns before the transaction is mined.
    pub async fn wave(&self, message: &str) -> Result<TxHash, WaveError> {
        let from = self
            .signer()
            .ok_or_else(|| WaveError::invalid_state("no account bound to the contract client"))?;
        let tx_hash = self.backend.send_wave(from, &self.wave_call(message)).await?;
        debug!(%tx_hash, %from, "wave broadcast");
        Ok(tx_hash)
    }

    /// Waits for `tx_hash` to be mined.
    pub async fn await_confirmation(&self, tx_hash: TxHash) -> Result<WaveReceipt, WaveError> {
        let receipt = self.backend.wait_for_receipt(tx_hash).await?;
        debug!(%tx_hash, block = ?receipt.block_number, "wave mined");
        Ok(receipt)
    }
}
