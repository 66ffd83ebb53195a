//! `m5synth`: simulated synth device server, command sender and script player.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use m5synth_host::{HostError, StreamTransport, SynthClient, Transport};
use m5synth_protocol::{Operation, Profile};
use m5synth_runner::player::ScriptPlayer;
use m5synth_runner::script::Script;
use m5synth_runner::server::{DeviceServer, ServerConfig};
use m5synth_runner::{table, Result, RunnerError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "m5synth", version, about = "Tools for the M5Unit-Synth serial protocol")]
struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "debug" or "m5synth_host=trace".
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve simulated synth units over TCP, one per connection.
    Serve(ServeArgs),
    /// Send one command and print the status.
    Send(SendArgs),
    /// Play a YAML script.
    Play(PlayArgs),
    /// Print a command table.
    Table(TableArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// TCP port.
    #[arg(long, default_value_t = 9100)]
    port: u16,

    /// Command table the simulated firmware speaks.
    #[arg(long, default_value_t = Profile::Canonical)]
    profile: Profile,

    /// Device name prefix.
    #[arg(long, default_value = "synth")]
    name: String,
}

#[derive(Args, Debug)]
struct TransportArgs {
    /// Device server address (host:port).
    #[arg(long, conflicts_with = "serial", required_unless_present = "serial")]
    tcp: Option<String>,

    /// Serial port path.
    #[arg(long)]
    serial: Option<PathBuf>,

    /// Serial baud rate.
    #[arg(long, default_value_t = 115_200)]
    baud: u32,

    /// Response timeout in milliseconds.
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,
}

impl TransportArgs {
    fn open(&self) -> Result<Box<dyn Transport>> {
        let timeout = Duration::from_millis(self.timeout_ms);
        match (&self.tcp, &self.serial) {
            (Some(addr), _) => Ok(Box::new(StreamTransport::connect_tcp(addr.as_str(), timeout)?)),
            (None, Some(path)) => Ok(Box::new(StreamTransport::open_serial(path, self.baud, timeout)?)),
            (None, None) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "either --tcp or --serial is required",
            )
            .into()),
        }
    }
}

#[derive(Args, Debug)]
struct SendArgs {
    #[command(flatten)]
    transport: TransportArgs,

    /// Command table.
    #[arg(long, default_value_t = Profile::Canonical)]
    profile: Profile,

    /// Operation name, e.g. set_note_on.
    operation: Operation,

    /// Field values in table order.
    #[arg(allow_negative_numbers = true)]
    args: Vec<i32>,
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// Script file.
    script: PathBuf,

    #[command(flatten)]
    transport: TransportArgs,

    /// Override the script's command table.
    #[arg(long)]
    profile: Option<Profile>,
}

#[derive(Args, Debug)]
struct TableArgs {
    #[arg(long, default_value_t = Profile::Canonical)]
    profile: Profile,

    /// Print JSON instead of a text table.
    #[arg(long)]
    json: bool,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn serve(args: ServeArgs) -> Result<()> {
    m5synth_metrics::describe_metrics();
    let config = ServerConfig {
        bind: args.bind,
        port: args.port,
        profile: args.profile,
        name: args.name,
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let server = DeviceServer::bind(config).await?;
        server.run().await
    })?;
    Ok(())
}

fn send(args: SendArgs) -> Result<()> {
    let transport = args.transport.open()?;
    let mut client = SynthClient::with_profile(transport, args.profile);
    let response = client.request(args.operation, &args.args)?;
    let status = response.payload().first().copied().unwrap_or(0);
    println!(
        "{} (0x{:02X}) -> status {} [{}]",
        args.operation,
        response.id(),
        status,
        hex::encode(response.payload())
    );
    if response.status().is_ok() {
        Ok(())
    } else {
        Err(HostError::Failure {
            operation: args.operation,
            id: response.id(),
            status,
        }
        .into())
    }
}

fn play(args: PlayArgs) -> Result<()> {
    let mut script = Script::load(&args.script)?;
    if let Some(profile) = args.profile {
        script.profile = profile;
    }
    let compiled = script.compile()?;
    info!(
        script = %args.script.display(),
        profile = %compiled.profile,
        steps = compiled.actions.len(),
        "script loaded"
    );

    let transport = args.transport.open()?;
    let mut client = SynthClient::with_profile(transport, compiled.profile);
    let player = ScriptPlayer::new();
    player.install_ctrlc()?;
    player.play(&mut client, &compiled)?;
    Ok(())
}

fn print_table(args: TableArgs) -> Result<()> {
    if args.json {
        println!("{}", table::render_json(args.profile)?);
    } else {
        print!("{}", table::render(args.profile));
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Serve(args) => serve(args),
        Commands::Send(args) => send(args),
        Commands::Play(args) => play(args),
        Commands::Table(args) => print_table(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(RunnerError::Interrupted) => {
            error!("interrupted");
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
