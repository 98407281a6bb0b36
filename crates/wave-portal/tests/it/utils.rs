//! In-memory wallet and chain used by the session tests.

use alloy_primitives::{Address, B256, TxHash, address};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
};
use tokio::sync::{Notify, broadcast, watch};
use wave_portal::{
    Phase, TransactionLifecycle, WalletEvent, WalletProvider, WaveBackend, WaveCall, WaveConfig,
    WaveError, WaveReceipt, WaveRecord, WaveSession,
};

pub const ALICE: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
pub const BOB: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");

pub type TestSession = WaveSession<Arc<MockWallet>, Arc<MockChain>>;

/// Builds a session over `wallet` and `chain` with the default config.
pub fn session(wallet: &Arc<MockWallet>, chain: &Arc<MockChain>) -> TestSession {
    session_with(wallet, chain, &WaveConfig::default())
}

pub fn session_with(
    wallet: &Arc<MockWallet>,
    chain: &Arc<MockChain>,
    config: &WaveConfig,
) -> TestSession {
    let session = WaveSession::new(wallet.clone(), chain.clone(), config);
    chain.observe(session.watch_lifecycle());
    session
}

/// A wallet that answers from memory.
#[derive(Debug)]
pub struct MockWallet {
    present: bool,
    /// Accounts already exposed, returned by the passive check.
    authorized: Mutex<Vec<Address>>,
    /// Accounts exposed once the user approves a prompt.
    on_approve: Vec<Address>,
    rejects: AtomicBool,
    prompts: AtomicUsize,
    events: broadcast::Sender<WalletEvent>,
}

impl MockWallet {
    /// A wallet holding `account` that has not authorized this client yet.
    pub fn new(account: Address) -> Arc<Self> {
        Arc::new(Self::with(true, vec![], vec![account]))
    }

    /// A wallet that already authorized `account`.
    pub fn authorized(account: Address) -> Arc<Self> {
        Arc::new(Self::with(true, vec![account], vec![account]))
    }

    /// No wallet installed.
    pub fn absent() -> Arc<Self> {
        Arc::new(Self::with(false, vec![], vec![]))
    }

    fn with(present: bool, authorized: Vec<Address>, on_approve: Vec<Address>) -> Self {
        Self {
            present,
            authorized: Mutex::new(authorized),
            on_approve,
            rejects: AtomicBool::new(false),
            prompts: AtomicUsize::new(0),
            events: broadcast::channel(8).0,
        }
    }

    /// Makes the user decline every following prompt.
    pub fn reject_prompts(&self) {
        self.rejects.store(true, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    fn is_present(&self) -> bool {
        self.present
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, WaveError> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        if self.rejects.load(Ordering::SeqCst) {
            return Err(WaveError::UserRejected("User rejected the request.".to_string()));
        }
        *self.authorized.lock() = self.on_approve.clone();
        Ok(self.on_approve.clone())
    }

    async fn accounts(&self) -> Result<Vec<Address>, WaveError> {
        Ok(self.authorized.lock().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

/// How a broadcast transaction ends.
#[derive(Clone, Debug)]
pub enum Mined {
    Success,
    Reverted,
    Fail(WaveError),
}

/// A WavePortal deployment held in memory.
///
/// Waves are appended to the history only once their receipt is requested and they are mined
/// successfully. Every call records the lifecycle phase it observed.
#[derive(Debug, Default)]
pub struct MockChain {
    waves: Mutex<Vec<WaveRecord>>,
    pending: Mutex<HashMap<TxHash, WaveRecord>>,
    sent: Mutex<Vec<(Address, WaveCall)>>,
    send_results: Mutex<VecDeque<WaveError>>,
    mined: Mutex<VecDeque<Mined>>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    nonce: AtomicU64,
    gate: Mutex<Option<Arc<Notify>>>,
    lifecycle: Mutex<Option<watch::Receiver<TransactionLifecycle>>>,
    observed: Mutex<Vec<(&'static str, Phase)>>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn with_waves(waves: Vec<WaveRecord>) -> Arc<Self> {
        let chain = Self::default();
        *chain.waves.lock() = waves;
        Arc::new(chain)
    }

    pub fn observe(&self, lifecycle: watch::Receiver<TransactionLifecycle>) {
        *self.lifecycle.lock() = Some(lifecycle);
    }

    /// Makes the next `send_wave` fail with `err`, as the wallet would.
    pub fn fail_next_send(&self, err: WaveError) {
        self.send_results.lock().push_back(err);
    }

    /// Scripts how the next broadcast transaction ends. Unscripted ones succeed.
    pub fn mine_next(&self, mined: Mined) {
        self.mined.lock().push_back(mined);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Holds `send_wave` until the returned notify fires.
    pub fn gate_sends(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock() = Some(gate.clone());
        gate
    }

    /// Number of `getTotalWaves` reads, one per feed refresh.
    pub fn refreshes(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(Address, WaveCall)> {
        self.sent.lock().clone()
    }

    pub fn waves(&self) -> Vec<WaveRecord> {
        self.waves.lock().clone()
    }

    /// The lifecycle phase seen by each call, in call order.
    pub fn observed(&self) -> Vec<(&'static str, Phase)> {
        self.observed.lock().clone()
    }

    fn record(&self, call: &'static str) {
        let phase = self.lifecycle.lock().as_ref().map(|rx| rx.borrow().phase);
        if let Some(phase) = phase {
            self.observed.lock().push((call, phase));
        }
    }

    fn read(&self) -> Result<(), WaveError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(WaveError::network("connection refused"));
        }
        Ok(())
    }
}

#[async_trait]
impl WaveBackend for MockChain {
    async fn total_waves(&self) -> Result<u64, WaveError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.record("getTotalWaves");
        self.read()?;
        Ok(self.waves.lock().len() as u64)
    }

    async fn all_waves(&self) -> Result<Vec<WaveRecord>, WaveError> {
        self.record("getAllWaves");
        self.read()?;
        Ok(self.waves())
    }

    async fn send_wave(&self, from: Address, call: &WaveCall) -> Result<TxHash, WaveError> {
        self.record("wave");
        self.sent.lock().push((from, call.clone()));
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if let Some(err) = self.send_results.lock().pop_front() {
            return Err(err);
        }

        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst) + 1;
        let tx_hash = B256::with_last_byte(nonce as u8);
        let message = match call {
            WaveCall::WithMessage(message) => message.clone(),
            WaveCall::Bare => String::new(),
        };
        let record = WaveRecord { waver: from, message, timestamp: 1_650_000_000 + nonce };
        self.pending.lock().insert(tx_hash, record);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<WaveReceipt, WaveError> {
        self.record("receipt");
        let record = self.pending.lock().remove(&tx_hash);
        let Some(record) = record else {
            return Err(WaveError::network(format!("unknown transaction {tx_hash}")));
        };
        match self.mined.lock().pop_front().unwrap_or(Mined::Success) {
            Mined::Success => {}
            Mined::Reverted => return Err(WaveError::TransactionReverted(tx_hash)),
            Mined::Fail(err) => return Err(err),
        }
        let mut waves = self.waves.lock();
        waves.push(record);
        Ok(WaveReceipt { tx_hash, block_number: Some(waves.len() as u64), gas_used: 21_000 })
    }
}

pub fn wave(waver: Address, message: &str, timestamp: u64) -> WaveRecord {
    WaveRecord { waver, message: message.to_string(), timestamp }
}
