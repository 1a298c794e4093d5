//! block-arbiter - Main Entry Point
//!
//! One-shot decisions on stdin/stdout by default, plus schedule lookup,
//! conflict scanning and the HTTP decision service.
//!
//! stdout carries exactly one JSON object per one-shot command; all logging
//! goes to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use block_arbiter::api::create_app;
use block_arbiter::config::{ArbiterConfig, ConfigProvenance, LoggingConfig};
use block_arbiter::pipeline::{Arbiter, FileSource, PayloadSource, StdinSource};
use block_arbiter::types::TrainRef;
use block_arbiter::FailureResponse;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "block-arbiter")]
#[command(about = "Block conflict arbitration: train precedence and speed/hold decisions")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (default: $BLOCK_ARBITER_CONFIG, then ./block_arbiter.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Classifier artifact (JSON decision forest)
    #[arg(long, global = true, env = "ARBITER_MODEL_PATH", value_name = "PATH")]
    model: Option<PathBuf>,

    /// Train reference table (CSV)
    #[arg(long, global = true, env = "ARBITER_SCHEDULE_PATH", value_name = "PATH")]
    schedule: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Arbitrate one conflict payload (the default command)
    Decide {
        /// Read the payload from a file instead of stdin
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
    },

    /// Look up a train in the reference table
    Lookup {
        /// Train identifier
        id: String,
    },

    /// Detect block, loop-line and junction conflicts in the reference table
    Scan {
        /// Also arbitrate every detected conflict
        #[arg(long)]
        resolve: bool,
    },

    /// Run the HTTP decision service
    Serve {
        /// Bind address (default from config: "0.0.0.0:5000")
        #[arg(short, long, env = "ARBITER_SERVER_ADDR", value_name = "HOST:PORT")]
        addr: Option<String>,
    },
}

// ============================================================================
// Setup
// ============================================================================

/// Load config under a temporary stderr subscriber so unknown-key and range
/// warnings are visible before the configured logger exists.
fn load_config(args: &CliArgs) -> Result<(ArbiterConfig, ConfigProvenance)> {
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("warn"))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let (mut config, provenance) = tracing::subscriber::with_default(bootstrap, || {
        ArbiterConfig::load(args.config.as_deref())
    })
    .context("Failed to load configuration")?;

    if let Some(model) = &args.model {
        config.artifacts.model_path.clone_from(model);
    }
    if let Some(schedule) = &args.schedule {
        config.artifacts.schedule_path = Some(schedule.clone());
    }
    Ok((config, provenance))
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// Output
// ============================================================================

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<()> {
    let json = serde_json::to_string(value).context("Failed to serialize output")?;
    writeln!(out, "{json}").context("Failed to write to stdout")?;
    Ok(())
}

/// Print the failure object and return exit code 1.
fn fail(err: impl std::fmt::Display) -> ExitCode {
    let failure = FailureResponse::new(err);
    if let Err(e) = write_json(&mut std::io::stdout().lock(), &failure) {
        error!(error = %format!("{e:#}"), "Could not emit failure object");
    }
    ExitCode::FAILURE
}

fn finish<T: Serialize>(value: &T) -> ExitCode {
    finish_to(&mut std::io::stdout().lock(), value)
}

/// Once stdout has failed nothing else is written to it.
fn finish_to<W: Write, T: Serialize>(out: &mut W, value: &T) -> ExitCode {
    match write_json(out, value) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Could not emit result");
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run_decide(arbiter: &Arbiter, input: Option<PathBuf>) -> ExitCode {
    let mut source: Box<dyn PayloadSource> = match input {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(StdinSource),
    };
    let raw = match source.read_payload() {
        Ok(raw) => raw,
        Err(e) => return fail(format!("{e:#}")),
    };
    tracing::debug!(source = source.source_name(), bytes = raw.len(), "Payload read");

    match arbiter.evaluate(&raw) {
        Ok(response) => {
            info!(
                decision = %response.decision,
                priority = %response.priority_train,
                reduced = %response.reduced_train,
                confidence = response.confidence,
                "Decision"
            );
            finish(&response)
        }
        Err(e) => {
            info!(kind = ?e.kind(), error = %e, "Decision failed");
            fail(e)
        }
    }
}

#[derive(Serialize)]
struct LookupOutput<'a> {
    success: bool,
    train: &'a block_arbiter::TrainRecord,
}

fn run_lookup(arbiter: &Arbiter, id: &str) -> ExitCode {
    match arbiter.lookup(&TrainRef::Text(id.to_string())) {
        Ok(train) => finish(&LookupOutput {
            success: true,
            train,
        }),
        Err(e) => fail(e),
    }
}

#[derive(Serialize)]
struct ScanOutput {
    success: bool,
    count: usize,
    conflicts: Vec<serde_json::Value>,
}

fn run_scan(arbiter: &Arbiter, resolve: bool) -> Result<ScanOutput, String> {
    let conflicts = arbiter.scan().map_err(|e| e.to_string())?;
    let mut entries = Vec::with_capacity(conflicts.len());
    for conflict in &conflicts {
        let mut entry = serde_json::to_value(conflict).map_err(|e| e.to_string())?;
        if resolve {
            let resolution = match arbiter.resolve(conflict) {
                Ok(response) => serde_json::to_value(response),
                Err(e) => serde_json::to_value(FailureResponse::new(e)),
            };
            entry["resolution"] = resolution.map_err(|e| e.to_string())?;
        }
        entries.push(entry);
    }
    Ok(ScanOutput {
        success: true,
        count: entries.len(),
        conflicts: entries,
    })
}

async fn serve(arbiter: Arc<Arbiter>, addr: String) -> Result<()> {
    let app = create_app(arbiter);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!(addr = %addr, "Decision service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Received Ctrl+C, shutting down");
        })
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn run_serve(arbiter: Arbiter, addr: String) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(serve(Arc::new(arbiter), addr))
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let (config, provenance) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!(error = %format!("{e:#}"), "Startup failed");
            return fail(format!("{e:#}"));
        }
    };
    init_logging(&config.logging);
    info!(
        source = %provenance
            .source
            .as_ref()
            .map_or_else(|| "built-in defaults".to_string(), |p| p.display().to_string()),
        overrides = provenance.explicit_keys.len(),
        "Configuration loaded"
    );

    let arbiter = match Arbiter::load(&config) {
        Ok(arbiter) => arbiter,
        Err(e) => {
            error!(error = %e, "Failed to load artifacts");
            return fail(e);
        }
    };

    match args.command.unwrap_or(SubCommand::Decide { input: None }) {
        SubCommand::Decide { input } => run_decide(&arbiter, input),
        SubCommand::Lookup { id } => run_lookup(&arbiter, &id),
        SubCommand::Scan { resolve } => match run_scan(&arbiter, resolve) {
            Ok(output) => finish(&output),
            Err(e) => fail(e),
        },
        SubCommand::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            match run_serve(arbiter, addr) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %format!("{e:#}"), "Decision service stopped");
                    ExitCode::FAILURE
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Counts write attempts and fails every one of them.
    struct BrokenPipe {
        attempts: usize,
    }

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            self.attempts += 1;
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn result_is_one_json_line() {
        let mut out = Vec::new();
        let code = finish_to(&mut out, &json!({"success": true}));
        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::SUCCESS));
        assert_eq!(String::from_utf8(out).unwrap(), "{\"success\":true}\n");
    }

    #[test]
    fn write_failure_exits_without_second_object() {
        let mut out = BrokenPipe { attempts: 0 };
        let code = finish_to(&mut out, &json!({"success": true}));
        assert_eq!(format!("{code:?}"), format!("{:?}", ExitCode::FAILURE));
        assert_eq!(out.attempts, 1);
    }
}
