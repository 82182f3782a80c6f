use clap::{Parser, ValueEnum};
use qkd_cipher::errors::ProtocolError;
use qkd_cipher::{Config, EveView, Protocol, Session};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "qkd-round",
    version,
    about = "Runs one simulated Alice/Bob/Eve key exchange and message round"
)]
struct Cli {
    #[arg(long, value_enum, default_value = "bb84")]
    protocol: ProtocolArg,
    /// Let Eve intercept the key exchange
    #[arg(long)]
    eavesdrop: bool,
    #[arg(long)]
    seed: Option<u32>,
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "This is a test message")]
    message: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProtocolArg {
    Baseline,
    Bb84,
    E91,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Baseline => Protocol::Baseline,
            ProtocolArg::Bb84 => Protocol::Bb84,
            ProtocolArg::E91 => Protocol::E91,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run(cli: Cli) -> Result<(), ProtocolError> {
    let config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::default(),
    };
    init_tracing(config.verbose);

    let protocol = Protocol::from(cli.protocol);
    let session = Session::open(protocol, cli.eavesdrop, &config, cli.seed)?;
    let reconciliation = session.reconciliation();

    println!("protocol:      {protocol}");
    println!("eavesdropping: {}", cli.eavesdrop);
    println!(
        "key:           {}",
        if reconciliation.compromised { "compromised" } else { "valid" }
    );
    if let Some(qber) = reconciliation.qber {
        println!("qber:          {qber:.4}");
    }
    if let Some(chsh) = reconciliation.chsh {
        println!("chsh:          {chsh:.4}");
    }

    let transmission = session.alice_send(&cli.message, protocol.name())?;
    println!("alice sends:   {}", transmission.display());
    println!("bob reads:     {}", session.bob_receive(&transmission)?);
    match session.eve_receive(&transmission)? {
        EveView::Disabled => println!("eve reads:     (eavesdropping disabled)"),
        EveView::Decrypted(text) => println!("eve reads:     {text}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
