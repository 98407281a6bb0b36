#[macro_use]
extern crate tracing;

use clap::Parser;
use eyre::Result;
use wave_portal::{
    AlloyWaveBackend, Eip1193Wallet, SubmitOutcome, WaveBackend, WaveSession, WaveVariant,
    WalletProvider,
};

mod args;

use args::{Waves, WavesSubcommand};

fn main() -> Result<()> {
    subscriber();
    let args = Waves::parse();
    main_args(args)
}

/// Initializes a tracing Subscriber for logging
fn subscriber() {
    tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main_args(args: Waves) -> Result<()> {
    let config = args.opts.load_config()?;
    let wallet = Eip1193Wallet::connect_http(config.rpc_url.as_deref())?;
    let Some(provider) = wallet.provider().cloned() else {
        eyre::bail!("no wallet provider configured, pass --rpc-url or set WAVES_RPC_URL")
    };
    let backend = AlloyWaveBackend::new(provider, &config);
    let session = WaveSession::from_config(wallet, backend, &config)?;

    match args.cmd {
        WavesSubcommand::Connect => {
            let account = session.connect().await?;
            println!("Connected with address {account}");
            print_total(&session);
        }
        WavesSubcommand::Wave { message } => {
            session.connect().await?;
            if config.variant() == WaveVariant::Bare && !message.is_empty() {
                warn!("the configured contract takes no message, sending a bare wave");
            }
            println!("Waiting for your approval...");
            let mut lifecycle = session.watch_lifecycle();
            let progress = tokio::spawn(async move {
                while lifecycle.changed().await.is_ok() {
                    let state = lifecycle.borrow_and_update().clone();
                    if let Some(tx_hash) = state.tx_hash.filter(|_| state.phase.is_in_flight()) {
                        println!("Mining {tx_hash}...");
                    }
                }
            });
            let outcome = session.submit_wave(&message).await;
            progress.abort();
            match outcome? {
                SubmitOutcome::Confirmed(receipt) => {
                    println!("Mined {} in block {:?}", receipt.tx_hash, receipt.block_number);
                    print_total(&session);
                }
                SubmitOutcome::Declined => println!("Wave declined"),
            }
        }
        WavesSubcommand::Feed { json } => {
            if session.restore().await?.is_none() {
                session.connect().await?;
            }
            // restore and connect only log refresh failures
            session.refresh().await?;
            let feed = session.feed();
            if json {
                println!("{}", serde_json::to_string_pretty(&feed.display())?);
            } else {
                print_total(&session);
                for record in feed.display() {
                    println!("{record}");
                }
            }
        }
    }
    Ok(())
}

fn print_total<W: WalletProvider, B: WaveBackend>(session: &WaveSession<W, B>) {
    match session.feed().total() {
        Some(total) => println!("Total waves: {total}"),
        None => println!("Total waves: unknown"),
    }
}
