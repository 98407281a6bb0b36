//! # wave-portal
//!
//! Client core for the WavePortal contract.
//!
//! A [`WaveSession`] ties together:
//! - a [`WalletGateway`], which detects the wallet and tracks the authorized account;
//! - a [`ContractClient`], the typed `getTotalWaves` / `getAllWaves` / `wave` calls;
//! - a [`LifecycleController`], the `Idle → Approving → Mining → Idle` submission state machine;
//! - a [`WaveFeedCache`], the last known wave history.
//!
//! The wallet and the chain are reached through the [`WalletProvider`] and [`WaveBackend`]
//! traits. [`Eip1193Wallet`] and [`AlloyWaveBackend`] implement them over an alloy provider.

#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
extern crate tracing;

pub mod config;
pub mod contract;
pub mod error;
pub mod feed;
pub mod lifecycle;
pub mod session;
pub mod wallet;

pub use config::{WaveConfig, WaveVariant};
pub use contract::{AlloyWaveBackend, ContractClient, WaveBackend, WaveCall, WaveReceipt};
pub use error::{ConfigError, ErrorInfo, ErrorKind, WaveError};
pub use feed::{DisplayRecord, WaveFeed, WaveFeedCache, WaveRecord};
pub use lifecycle::{LifecycleController, Phase, SubmitOutcome, TransactionLifecycle};
pub use session::WaveSession;
pub use wallet::{Eip1193Wallet, WalletEvent, WalletGateway, WalletProvider};
