// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use tokio_util::sync::CancellationToken;

use wordcap::Controller;
use wordcap::app_config::{self, Config};
use wordcap::cli::{CommandLineOptions, Commands, ServeArgs, load_config};
use wordcap::errors::PipelineError;
use wordcap::pipeline::RunOutcome;
use wordcap::server::{self, UploadService};

/// Exit status when the operator interrupts the run
const EXIT_CANCELLED: u8 = 130;

/// Exit status for unusable configuration
const EXIT_CONFIG: u8 = 2;

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("🚧", "1;33"),
            Level::Info => ("  ", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

// @returns: Token cancelled on the first Ctrl-C
fn cancel_on_interrupt(message: &'static str) -> CancellationToken {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("{}", message);
            signal_token.cancel();
        }
    });
    cancel
}

// @returns: Validated controller, or the exit code explaining why not
fn build_controller(config: Config) -> Result<Controller, ExitCode> {
    log::set_max_level(level_filter(&config.log_level));
    Controller::with_config(config).map_err(|e| {
        error!("Configuration validation failed: {:#}", e);
        ExitCode::from(EXIT_CONFIG)
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize the logger once with info level by default
    // The level is updated after loading the config if needed
    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    let cli = CommandLineOptions::parse();

    match &cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(*shell, &mut cmd, "wordcap", &mut std::io::stdout());
            return ExitCode::SUCCESS;
        }
        Some(Commands::Serve(args)) => return run_server(args).await,
        None => {}
    }

    let (input_path, output_path) = match cli.run_paths() {
        Ok(paths) => paths,
        Err(e) => e.exit(),
    };

    if let Some(cmd_log_level) = &cli.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let mut config = match load_config(&cli.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    cli.apply_overrides(&mut config);

    let controller = match build_controller(config) {
        Ok(controller) => controller,
        Err(code) => return code,
    };

    let cancel = cancel_on_interrupt("Interrupt received, cancelling run");

    match controller.run(input_path, output_path, cancel).await {
        Ok(RunOutcome::Done(run)) => {
            info!("Success: {:?}", run.output_path);
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Failed { failure, .. }) if failure.is_cancelled() => {
            warn!("Run cancelled during {}", failure.stage);
            ExitCode::from(EXIT_CANCELLED)
        }
        Ok(RunOutcome::Failed { failure, .. }) => {
            error!("Error in {} stage: {}", failure.stage, failure.error);
            ExitCode::FAILURE
        }
        Err(PipelineError::Config(message)) => {
            error!("Invalid configuration: {}", message);
            ExitCode::from(EXIT_CONFIG)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_server(args: &ServeArgs) -> ExitCode {
    if let Some(cmd_log_level) = &args.log_level {
        log::set_max_level(level_filter(&cmd_log_level.clone().into()));
    }

    let mut config = match load_config(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    args.apply_overrides(&mut config);

    let controller = match build_controller(config) {
        Ok(controller) => controller,
        Err(code) => return code,
    };

    let listener = match server::bind(&controller.config().server).await {
        Ok(listener) => listener,
        Err(e) => {
            let server = &controller.config().server;
            error!("Failed to bind {}:{}: {}", server.host, server.port, e);
            return ExitCode::FAILURE;
        }
    };

    let service = match UploadService::from_controller(controller) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let cancel = cancel_on_interrupt("Interrupt received, shutting down server");
    match server::serve(service, listener, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
