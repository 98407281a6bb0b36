use super::{WaveBackend, WaveCall, WaveReceipt};
use crate::{config::WaveConfig, error::WaveError, feed::WaveRecord};
use alloy_network::ReceiptResponse;
use alloy_primitives::{Address, TxHash};
use alloy_provider::{PendingTransactionBuilder, Provider};
use alloy_sol_types::sol;
use async_trait::async_trait;
use std::time::Duration;

sol! {
    /// The WavePortal contract.
    #[sol(rpc)]
    interface IWavePortal {
        #[derive(Debug)]
        struct Wave {
            address waver;
            string message;
            uint256 timestamp;
        }

        function wave(string _message) external;
        function getAllWaves() external view returns (Wave[] memory);
        function getTotalWaves() external view returns (uint256);
    }

    /// Early WavePortal deployments, where `wave` takes no message.
    #[sol(rpc)]
    interface ILegacyWavePortal {
        function wave() external;
    }
}

impl From<IWavePortal::Wave> for WaveRecord {
    fn from(wave: IWavePortal::Wave) -> Self {
        Self { waver: wave.waver, message: wave.message, timestamp: wave.timestamp.saturating_to() }
    }
}

/// [`WaveBackend`] over an alloy [`Provider`] connected to the wallet.
///
/// Writes go out as `eth_sendTransaction`, leaving signing to the wallet behind the provider.
#[derive(Clone, Debug)]
pub struct AlloyWaveBackend<P> {
    provider: P,
    address: Address,
    confirmation_timeout: Option<Duration>,
}

impl<P: Provider> AlloyWaveBackend<P> {
    pub fn new(provider: P, config: &WaveConfig) -> Self {
        Self {
            provider,
            address: config.contract_address,
            confirmation_timeout: config.confirmation_timeout(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[async_trait]
impl<P: Provider> WaveBackend for AlloyWaveBackend<P> {
    async fn total_waves(&self) -> Result<u64, WaveError> {
        let total = IWavePortal::new(self.address, &self.provider).getTotalWaves().call().await?;
        Ok(total.saturating_to())
    }

    async fn all_waves(&self) -> Result<Vec<WaveRecord>, WaveError> {
        let waves = IWavePortal::new(self.address, &self.provider).getAllWaves().call().await?;
        Ok(waves.into_iter().map(Into::into).collect())
    }

    async fn send_wave(&self, from: Address, call: &WaveCall) -> Result<TxHash, WaveError> {
        let pending = match call {
            WaveCall::WithMessage(message) => {
                IWavePortal::new(self.address, &self.provider)
                    .wave(message.clone())
                    .from(from)
                    .send()
                    .await?
            }
            WaveCall::Bare => {
                ILegacyWavePortal::new(self.address, &self.provider).wave().from(from).send().await?
            }
        };
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<WaveReceipt, WaveError> {
        let receipt = match self.provider.get_transaction_receipt(tx_hash).await? {
            Some(receipt) => receipt,
            None => PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
                .with_timeout(self.confirmation_timeout)
                .get_receipt()
                .await
                .map_err(WaveError::network)?,
        };

        if !receipt.status() {
            return Err(WaveError::TransactionReverted(tx_hash));
        }
        Ok(WaveReceipt {
            tx_hash,
            block_number: receipt.block_number(),
            gas_used: receipt.gas_used(),
        })
    }
}
