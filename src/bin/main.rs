use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tlm_bridge::config::{self, SettingsOverrides, TraceSettings};
use tlm_bridge::harness::{self, ScenarioReport};

/// Runs transactions through a target socket that bridges blocking and
/// non-blocking transport, and prints the phase trace
#[derive(Parser)]
#[command(name = "tlm-bridge")]
#[command(version)]
#[command(about = "Trace blocking/non-blocking transport adaptation in a target socket")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the adaptation scenarios and print their phase traces
    Trace {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Which scenario to run
        #[arg(long, value_enum, default_value_t = Scenario::All)]
        scenario: Scenario,

        /// Enable debug logging (RUST_LOG takes precedence)
        #[arg(short, long)]
        verbose: bool,
    },
    /// Print the effective settings as TOML
    ShowConfig {
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(clap::Args)]
struct SettingsArgs {
    /// Settings file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop each scenario after this many nanoseconds of simulated time
    #[arg(long)]
    time_limit_ns: Option<u64>,

    /// Latency of the blocking-only target
    #[arg(long)]
    response_delay_ns: Option<u64>,

    /// Delay from BEGIN_REQ to END_REQ of the non-blocking-only target
    #[arg(long)]
    end_request_delay_ns: Option<u64>,

    /// Delay from END_REQ to BEGIN_RESP of the non-blocking-only target
    #[arg(long)]
    begin_response_delay_ns: Option<u64>,
}

impl SettingsArgs {
    fn resolve(&self) -> config::ConfigResult<TraceSettings> {
        let file = config::load_settings(self.config.as_deref())?;
        let settings = config::merge_settings(
            file,
            &SettingsOverrides {
                time_limit_ns: self.time_limit_ns,
                response_delay_ns: self.response_delay_ns,
                end_request_delay_ns: self.end_request_delay_ns,
                begin_response_delay_ns: self.begin_response_delay_ns,
            },
        );
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Blocking-only target, non-blocking initiator
    BlockingTarget,
    /// Non-blocking-only target, blocking initiator
    NonBlockingTarget,
    All,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "tlm_bridge=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn print_report(report: &ScenarioReport) {
    println!("== {} ==", report.name);
    for entry in &report.trace {
        println!("{entry}");
    }
    match report.elapsed {
        Some(elapsed) => println!(
            "elapsed: {} ns, response: {:?}",
            elapsed.as_nanos(),
            report.response_status
        ),
        None => println!(
            "exchange unfinished when the run stopped at {} ns",
            report.summary.end_time.as_nanos()
        ),
    }
    println!();
}

fn run_trace(settings: &TraceSettings, scenario: Scenario) -> Result<(), String> {
    let limit = settings.time_limit();
    if matches!(scenario, Scenario::BlockingTarget | Scenario::All) {
        let report = harness::run_blocking_target(&settings.blocking_target_scenario(), limit)
            .map_err(|e| e.to_string())?;
        print_report(&report);
    }
    if matches!(scenario, Scenario::NonBlockingTarget | Scenario::All) {
        let report =
            harness::run_non_blocking_target(&settings.non_blocking_target_scenario(), limit)
                .map_err(|e| e.to_string())?;
        print_report(&report);
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Trace {
            settings,
            scenario,
            verbose,
        } => {
            init_logging(verbose);
            settings
                .resolve()
                .map_err(|e| e.to_string())
                .and_then(|settings| run_trace(&settings, scenario))
        }
        Commands::ShowConfig { settings } => {
            init_logging(false);
            settings
                .resolve()
                .and_then(|settings| settings.render())
                .map(|rendered| print!("{rendered}"))
                .map_err(|e| e.to_string())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
