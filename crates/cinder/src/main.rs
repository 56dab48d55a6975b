use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use cinder_core::DumpReader;
use cinder_protocol::SnapshotRequest;
use cinder_utils::{info, LogLevel, LoggingConfig};

mod dump;
mod inspect;

use dump::{build_dump, parse_annotation, parse_number, parse_u32, DumpContents, ModuleSpec};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Write, inspect and serve minidump-style crash files.
#[derive(Parser, Debug)]
#[command(name = "cinder")]
#[command(version)]
#[command(about = "Write, inspect and serve minidump-style crash files", long_about = None)]
struct Cli
{
    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Also write logs to this file (overrides CINDER_LOG_FILE)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Write a crash file with annotations and a module list
    Write
    {
        /// Path of the crash file to create
        #[arg(short, long)]
        output: PathBuf,
        /// Process annotation as key=value (repeatable)
        #[arg(short, long = "annotation", value_parser = parse_annotation)]
        annotations: Vec<(String, String)>,
        /// Loaded module as name@base:size (repeatable; numbers may be hex)
        #[arg(short, long = "module")]
        modules: Vec<ModuleSpec>,
    },
    /// Print the contents of a crash file
    Inspect
    {
        /// Crash file to read
        file: PathBuf,
    },
    /// Wait for one snapshot request and write a crash file for it
    #[cfg(unix)]
    Serve
    {
        /// Datagram socket path to bind
        #[arg(short, long)]
        socket: PathBuf,
        /// Path of the crash file to create
        #[arg(short, long)]
        output: PathBuf,
        /// Give up after this many milliseconds (default: wait forever; 0: don't wait)
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// With an already-expired deadline, still check for a queued request once
        #[arg(long, default_value_t = false)]
        run_even_if_expired: bool,
    },
    /// Send a snapshot request to a serving handler
    #[cfg(unix)]
    Request
    {
        /// Datagram socket path of the handler
        #[arg(short, long)]
        socket: PathBuf,
        /// Process ID to report
        #[arg(long, value_parser = parse_u32)]
        pid: u32,
        /// Crashing thread ID
        #[arg(long, value_parser = parse_u32)]
        thread: u32,
        /// Exception code (hex format: 0xb or decimal)
        #[arg(long, value_parser = parse_u32)]
        code: u32,
        /// Faulting address (hex format: 0x1000 or decimal)
        #[arg(long, value_parser = parse_number, default_value = "0")]
        address: u64,
    },
}

fn main()
{
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    if let Some(level) = cli.log_level {
        logging = logging.with_level(level);
    }
    if let Some(path) = &cli.log_file {
        logging = logging.with_file(path);
    }
    let _guard = match logging.init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_command(command: Commands) -> CliResult<()>
{
    match command {
        Commands::Write {
            output,
            annotations,
            modules,
        } => {
            let contents = DumpContents {
                annotations,
                modules,
                request: None,
                timestamp: current_timestamp(),
            };
            write_dump(&contents, &output)
        }
        Commands::Inspect { file } => {
            let bytes = std::fs::read(&file)?;
            let reader = DumpReader::parse(&bytes)?;
            print!("{}", inspect::render(&reader)?);
            Ok(())
        }
        #[cfg(unix)]
        Commands::Serve {
            socket,
            output,
            timeout_ms,
            run_even_if_expired,
        } => serve(&socket, &output, timeout_ms, run_even_if_expired),
        #[cfg(unix)]
        Commands::Request {
            socket,
            pid,
            thread,
            code,
            address,
        } => {
            let request = SnapshotRequest::new(pid, thread, code, address);
            cinder_protocol::DatagramTransport::send_to(&socket, &request.encode()?)?;
            info!(pid, thread, socket = %socket.display(), "snapshot request sent");
            println!("Sent snapshot request for process {pid} to {}", socket.display());
            Ok(())
        }
    }
}

#[cfg(unix)]
fn serve(socket: &Path, output: &Path, timeout_ms: Option<u64>, run_even_if_expired: bool) -> CliResult<()>
{
    use cinder_protocol::{message_with_deadline, DatagramTransport, Deadline, ExpiredPolicy};

    let mut transport = DatagramTransport::bind(socket)?;
    let deadline = timeout_ms.map_or(Deadline::WaitIndefinitely, |ms| Deadline::from_timeout(Duration::from_millis(ms)));
    info!(socket = %socket.display(), ?deadline, "waiting for a snapshot request");

    let message = message_with_deadline(&mut transport, deadline, ExpiredPolicy::from_flag(run_even_if_expired))?;
    let request = SnapshotRequest::decode(&message)?;
    info!(
        pid = request.process_id,
        thread = request.thread_id,
        code = request.exception_code,
        "snapshot request received"
    );

    let contents = DumpContents {
        request: Some(request),
        timestamp: current_timestamp(),
        ..DumpContents::default()
    };
    write_dump(&contents, output)
}

fn write_dump(contents: &DumpContents, output: &Path) -> CliResult<()>
{
    let mut root = build_dump(contents)?;
    let written = root.write_to_path(output)?;
    info!(path = %output.display(), bytes = written, "crash file written");
    println!("Wrote {written} bytes to {}", output.display());
    Ok(())
}

fn current_timestamp() -> u32
{
    u32::try_from(Utc::now().timestamp()).unwrap_or(u32::MAX)
}
