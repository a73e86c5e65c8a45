//! SwarSetu CLI - Command-line interface for SwarSetu Flux
//!
//! Commands:
//! - normalize: Turn a raw assessment payload into the canonical session
//! - explain: Print the local explanation for a prediction
//! - doctor: Diagnose configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use swarsetu_flux::explainer::{Explainer, ExplainerConfig, API_KEY_ENV};
use swarsetu_flux::{build_session, ComputeError, Disorder, FLUX_VERSION, PRODUCER_NAME};

/// SwarSetu Flux - normalize screening game telemetry
#[derive(Parser)]
#[command(name = "swarsetu")]
#[command(version = FLUX_VERSION)]
#[command(about = "Normalize learning-screening game telemetry into canonical sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a raw assessment payload into the canonical session
    Normalize {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Disorder category (defaults to the payload's disorder_type)
        #[arg(long)]
        disorder_type: Option<String>,

        /// Output format
        #[arg(long, default_value = "json")]
        format: OutputFormat,
    },

    /// Explain a prediction for parents (local fallback explanation)
    Explain {
        /// Prediction JSON file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Disorder category the prediction is for
        #[arg(long)]
        disorder_type: String,
    },

    /// Diagnose configuration
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SwarsetuCliError> {
    match cli.command {
        Commands::Normalize {
            input,
            output,
            disorder_type,
            format,
        } => cmd_normalize(&input, &output, disorder_type.as_deref(), format),

        Commands::Explain {
            input,
            disorder_type,
        } => cmd_explain(&input, &disorder_type),

        Commands::Doctor { json } => cmd_doctor(json),
    }
}

fn cmd_normalize(
    input: &Path,
    output: &Path,
    disorder_type: Option<&str>,
    format: OutputFormat,
) -> Result<(), SwarsetuCliError> {
    let payload: Value = serde_json::from_str(&read_input(input)?)?;
    let session = build_session(&payload, disorder_type);

    let rendered = render(&session, &format)?;
    if output.to_string_lossy() == "-" {
        println!("{}", rendered);
    } else {
        fs::write(output, rendered + "\n")?;
    }

    Ok(())
}

fn cmd_explain(input: &Path, disorder_type: &str) -> Result<(), SwarsetuCliError> {
    let disorder: Disorder = disorder_type.parse()?;
    let prediction: Value = serde_json::from_str(&read_input(input)?)?;

    let explainer = Explainer::new(ExplainerConfig::from_env());
    let explanation = explainer.explain(disorder.as_str(), &prediction, &Value::Null);

    println!("{}", serde_json::to_string_pretty(&explanation)?);
    Ok(())
}

fn cmd_doctor(json: bool) -> Result<(), SwarsetuCliError> {
    let config = ExplainerConfig::from_env();
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Flux version {}", FLUX_VERSION),
    });

    checks.push(if config.has_api_key() {
        DoctorCheck {
            name: "explainer_credential".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} is set", API_KEY_ENV),
        }
    } else {
        DoctorCheck {
            name: "explainer_credential".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} is not set; explanations use the local fallback", API_KEY_ENV),
        }
    });

    checks.push(DoctorCheck {
        name: "explainer_model".to_string(),
        status: CheckStatus::Ok,
        message: format!("Model: {}", config.model),
    });

    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: if atty::is(atty::Stream::Stdin) {
            "stdin is a TTY (interactive mode)".to_string()
        } else {
            "stdin is a pipe (ready for piped payloads)".to_string()
        },
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("SwarSetu Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, SwarsetuCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn render<T: Serialize>(value: &T, format: &OutputFormat) -> Result<String, SwarsetuCliError> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(value)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
    })
}

// Error types

#[derive(Debug)]
enum SwarsetuCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Compute(ComputeError),
}

impl From<io::Error> for SwarsetuCliError {
    fn from(e: io::Error) -> Self {
        SwarsetuCliError::Io(e)
    }
}

impl From<serde_json::Error> for SwarsetuCliError {
    fn from(e: serde_json::Error) -> Self {
        SwarsetuCliError::Json(e)
    }
}

impl From<ComputeError> for SwarsetuCliError {
    fn from(e: ComputeError) -> Self {
        SwarsetuCliError::Compute(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SwarsetuCliError> for CliError {
    fn from(e: SwarsetuCliError) -> Self {
        match e {
            SwarsetuCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SwarsetuCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SwarsetuCliError::Compute(ComputeError::UnsupportedDisorder(name)) => CliError {
                code: "UNSUPPORTED_DISORDER".to_string(),
                message: format!("Unsupported disorder_type: {}", name),
                hint: Some("Use one of: dyslexia, dyscalculia, dysgraphia".to_string()),
            },
            SwarsetuCliError::Compute(e) => CliError {
                code: "COMPUTE_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
}
