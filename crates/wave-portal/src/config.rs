//! Client configuration.
//!
//! Values are layered with [`figment`], lowest precedence first:
//!
//! 1. [`WaveConfig::default`]
//! 2. `waves.toml` in the working directory, or the file named by `WAVES_CONFIG`
//! 3. `WAVES_`-prefixed environment variables, e.g. `WAVES_WITH_MESSAGE=false`

use crate::error::ConfigError;
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, address};
use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

/// Address of the original WavePortal deployment.
pub const DEFAULT_CONTRACT_ADDRESS: Address = address!("0x59FcF27A2C83e0382fC0b93C9ED6C301B5a5ff42");

/// Which `wave` signature the deployed contract exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveVariant {
    /// `wave(string)`
    #[default]
    WithMessage,
    /// `wave()`
    Bare,
}

impl WaveVariant {
    pub fn signature(&self) -> &'static str {
        match self {
            Self::WithMessage => "wave(string)",
            Self::Bare => "wave()",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaveConfig {
    /// The WavePortal contract.
    pub contract_address: Address,
    /// Path to the contract's JSON ABI, or to a build artifact with an `abi` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<PathBuf>,
    /// Whether `wave` takes a message argument.
    pub with_message: bool,
    /// JSON-RPC endpoint of the wallet. No endpoint means no wallet provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    /// Seconds to wait for a transaction to be mined. Waits indefinitely when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation_timeout: Option<u64>,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            abi: None,
            with_message: true,
            rpc_url: None,
            confirmation_timeout: None,
        }
    }
}

impl Provider for WaveConfig {
    fn metadata(&self) -> Metadata {
        Metadata::named("Wave Portal Config")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}

impl WaveConfig {
    /// The default config file name.
    pub const FILE_NAME: &'static str = "waves.toml";

    /// The environment variable prefix.
    pub const ENV_PREFIX: &'static str = "WAVES_";

    /// Returns the default figment: defaults, then the config file, then the environment.
    pub fn figment() -> Figment {
        let file = Env::var_or("WAVES_CONFIG", Self::FILE_NAME);
        Self::figment_with_file(file)
    }

    /// Same as [`figment`](Self::figment), reading the given file instead.
    pub fn figment_with_file(file: impl AsRef<Path>) -> Figment {
        Figment::from(Self::default())
            .merge(Toml::file(file.as_ref()))
            .merge(Env::prefixed(Self::ENV_PREFIX).ignore(&["CONFIG"]))
    }

    /// Loads the config from the default figment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_provider(Self::figment())
    }

    /// Extracts a config from any figment provider.
    pub fn from_provider<T: Provider>(provider: T) -> Result<Self, ConfigError> {
        let config = Figment::from(provider).extract::<Self>()?;
        trace!(?config, "loaded config");
        Ok(config)
    }

    /// The `wave` call variant, resolved once at client construction.
    pub fn variant(&self) -> WaveVariant {
        if self.with_message { WaveVariant::WithMessage } else { WaveVariant::Bare }
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout.map(Duration::from_secs)
    }

    /// Loads the configured ABI, if any, and checks it against the selected variant.
    pub fn abi(&self) -> Result<Option<JsonAbi>, ConfigError> {
        let Some(path) = &self.abi else { return Ok(None) };
        let abi = read_abi(path)?;
        validate_abi(&abi, self.variant())?;
        Ok(Some(abi))
    }
}

/// Reads a plain JSON ABI or a build artifact carrying one under `abi`.
pub fn read_abi(path: &Path) -> Result<JsonAbi, ConfigError> {
    let content = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadAbi { path: path.to_path_buf(), source })?;
    let parse_err = |source| ConfigError::ParseAbi { path: path.to_path_buf(), source };
    let mut value: serde_json::Value = serde_json::from_str(&content).map_err(parse_err)?;
    if let Some(abi) = value.get_mut("abi") {
        value = abi.take();
    }
    serde_json::from_value(value).map_err(parse_err)
}

/// Checks that `abi` declares every call the client makes.
pub fn validate_abi(abi: &JsonAbi, variant: WaveVariant) -> Result<(), ConfigError> {
    for name in ["getTotalWaves", "getAllWaves"] {
        if abi.function(name).is_none() {
            return Err(ConfigError::MissingFunction(name));
        }
    }
    let Some(waves) = abi.function("wave") else {
        return Err(ConfigError::MissingFunction("wave"));
    };
    let expected = variant.signature();
    if !waves.iter().any(|f| f.signature() == expected) {
        return Err(ConfigError::WaveSignature { expected });
    }
    Ok(())
}
