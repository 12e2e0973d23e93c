use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ledger_enroll::config::DEFAULT_RPC_URL;
use ledger_enroll::{
    enroll, Config, ConfigError, EnrollError, LedgerSolana, RpcClient, RpcError, Stage,
    TransportType,
};

/// Exit status for configuration and usage errors (matches clap's).
const EXIT_USAGE: u8 = 2;

/// Sign the enrollment `submit` transaction on a Ledger and send it.
#[derive(Parser, Debug)]
#[command(name = "ledger-enroll", version)]
#[command(about = "Sign and submit a Solana enrollment transaction with a Ledger device")]
struct Cli {
    /// JSON-RPC endpoint of the target cluster
    #[arg(short, long, env = "LEDGER_ENROLL_RPC_URL", default_value = DEFAULT_RPC_URL)]
    url: String,

    /// Hardware wallet derivation path
    #[arg(short, long, default_value = "44'/501'/0'")]
    derivation_path: String,

    /// Bytes submitted as the instruction argument (UTF-8)
    #[arg(short, long, default_value = "MuzykPro")]
    payload: String,

    /// Seed of the enrollment record address
    #[arg(long, default_value = "preQ225")]
    seed: String,

    /// Enrollment program id (base58)
    #[arg(long)]
    program_id: Option<String>,

    /// Commitment for the blockhash fetch and preflight
    #[arg(long, default_value = "confirmed")]
    commitment: String,

    /// Per-request RPC timeout in seconds
    #[arg(long, default_value_t = 30)]
    rpc_timeout_secs: u64,

    /// Show the address on the device and wait for confirmation
    #[arg(long)]
    confirm_address: bool,

    /// Talk to a Speculos simulator at HOST:PORT instead of USB
    #[cfg(feature = "tcp")]
    #[arg(long, value_name = "HOST:PORT")]
    speculos: Option<String>,
}

impl Cli {
    fn config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::default()
            .with_rpc_url(&self.url)?
            .with_derivation_path(&self.derivation_path)?
            .with_commitment(&self.commitment)?
            .with_seed(self.seed.as_bytes())?
            .with_payload(self.payload.as_bytes())
            .with_rpc_timeout(Duration::from_secs(self.rpc_timeout_secs))
            .with_confirm_address(self.confirm_address);
        if let Some(program_id) = &self.program_id {
            config = config.with_program_id(program_id)?;
        }
        Ok(config)
    }

    fn transport(&self) -> Result<TransportType, String> {
        #[cfg(feature = "tcp")]
        {
            if let Some(addr) = &self.speculos {
                return parse_speculos(addr);
            }
        }
        default_transport()
    }
}

#[cfg(feature = "tcp")]
fn parse_speculos(addr: &str) -> Result<TransportType, String> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| format!("--speculos expects HOST:PORT, got {addr:?}"))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("invalid port in {addr:?}"))?;
    Ok(TransportType::TCP(host.to_string(), port))
}

#[cfg(feature = "hid")]
fn default_transport() -> Result<TransportType, String> {
    Ok(TransportType::NativeHID)
}

#[cfg(not(feature = "hid"))]
fn default_transport() -> Result<TransportType, String> {
    Err("no USB transport in this build — pass --speculos or enable the 'hid' feature".into())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(config: &Config, transport: &TransportType) -> Result<(), EnrollError> {
    let rpc = RpcClient::new(&config.rpc_url, config.rpc_timeout, config.commitment)
        .map_err(|e| EnrollError::from_rpc(Stage::Start, e))?;
    let ledger = LedgerSolana::new(transport).map_err(|e| EnrollError::device(Stage::Start, e))?;

    let enrollment = enroll::run(&ledger, &rpc, &config.enroll)?;

    println!("Ledger public key: {}", enrollment.signer);
    println!("Enrollment account: {}", enrollment.enrollment);
    println!(
        "Success! Check out your TX here:\n{}",
        config.explorer_url(&enrollment.txid)
    );
    Ok(())
}

/// Lines printed on stderr for a failed run: the error once, then any
/// program logs the cluster returned.
fn failure_report(e: &EnrollError) -> Vec<String> {
    let mut lines = vec![format!("Oops, something went wrong: {e}")];
    if let EnrollError::ProgramRejection(RpcError::ProgramRejected { logs, .. }) = e {
        lines.extend(logs.iter().map(|line| format!("  {line}")));
    }
    lines
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };
    let transport = match cli.transport() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    log::info!("enrolling via {} on {transport}", config.rpc_url);
    match run(&config, &transport) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            for line in failure_report(&e) {
                eprintln!("{line}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}
