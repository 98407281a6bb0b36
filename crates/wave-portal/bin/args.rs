use alloy_primitives::Address;
use clap::{Parser, Subcommand};
use figment::{
    Metadata, Profile, Provider,
    value::{Dict, Map, Value},
};
use std::path::PathBuf;
use wave_portal::WaveConfig;

/// Wave at the WavePortal contract from the terminal.
#[derive(Debug, Parser)]
#[command(name = "waves", version)]
pub struct Waves {
    #[command(flatten)]
    pub opts: WaveOpts,

    #[command(subcommand)]
    pub cmd: WavesSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum WavesSubcommand {
    /// Authorize with the wallet and print the account.
    Connect,

    /// Send a wave and wait for it to be mined.
    Wave {
        /// The message to attach.
        #[arg(default_value = "")]
        message: String,
    },

    /// Print the wave history.
    Feed {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

/// Overrides for `waves.toml` and `WAVES_*`.
#[derive(Clone, Debug, Default, Parser)]
#[command(next_help_heading = "Connection options")]
pub struct WaveOpts {
    /// The wallet JSON-RPC endpoint.
    #[arg(long, short, value_name = "URL")]
    pub rpc_url: Option<String>,

    /// The WavePortal contract address.
    #[arg(long, value_name = "ADDRESS")]
    pub contract: Option<Address>,

    /// Path to the contract ABI.
    #[arg(long, value_name = "PATH")]
    pub abi: Option<PathBuf>,

    /// Call `wave()` without a message, for early deployments.
    #[arg(long)]
    pub no_message: bool,

    /// Seconds to wait for the wave to be mined.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Use the given config file instead of `waves.toml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

impl WaveOpts {
    /// Loads the config, with these options taking precedence.
    pub fn load_config(&self) -> eyre::Result<WaveConfig> {
        let figment = match &self.config {
            Some(file) => WaveConfig::figment_with_file(file),
            None => WaveConfig::figment(),
        };
        Ok(WaveConfig::from_provider(figment.merge(self.clone()))?)
    }

    fn dict(&self) -> Dict {
        let mut dict = Dict::new();
        if let Some(url) = &self.rpc_url {
            dict.insert("rpc_url".into(), url.clone().into());
        }
        if let Some(contract) = self.contract {
            dict.insert("contract_address".into(), contract.to_string().into());
        }
        if let Some(abi) = &self.abi {
            dict.insert("abi".into(), abi.to_string_lossy().into_owned().into());
        }
        if self.no_message {
            dict.insert("with_message".into(), false.into());
        }
        if let Some(timeout) = self.timeout {
            dict.insert("confirmation_timeout".into(), Value::from(timeout));
        }
        dict
    }
}

impl Provider for WaveOpts {
    fn metadata(&self) -> Metadata {
        Metadata::named("WaveOpts")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Ok(Map::from([(Profile::Default, self.dict())]))
    }
}
