//! Appfile CLI entrypoint.
//!
//! This is the main entrypoint for the appfile command-line tool.

use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use appfile::cli::{Cli, Commands, LogFormat, OutputFormatter};
use appfile::config::{AppSpecification, SpecLoader, SpecValidator};
use appfile::error::{ConfigError, Result};
use appfile::platform::DigitalOceanClient;
use appfile::reconciler::{ComponentSummary, Reconciler};

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the DigitalOcean access token.
const ACCESS_TOKEN_VAR: &str = "DIGITALOCEAN_ACCESS_TOKEN";

/// Main entrypoint.
fn main() -> ExitCode {
    // Loaded before parsing so `.env` can supply the flags' env defaults
    let env_file = Cli::env_file_hint(std::env::args_os().skip(1));
    let env_loaded = dotenvy::from_path(&env_file);

    let cli = Cli::parse_args();

    init_logging(&cli.log_level, cli.log_format);
    report_env_file(&env_file, &env_loaded);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Logs the outcome of loading the env file; a missing file is not an error.
fn report_env_file(path: &Path, result: &dotenvy::Result<()>) {
    match result {
        Ok(()) => debug!("Loaded environment variables from {}", path.display()),
        Err(e) => debug!("Skipping env file {}: {e}", path.display()),
    }
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let specs = SpecLoader::new().load(&cli.file, &cli.environment)?;
    let token = cli.access_token.as_deref();

    match cli.command {
        Commands::Render => emit(&formatter.format_specs(&specs)?),
        Commands::List { app: Some(name) } => {
            emit(&formatter.format_components(&ComponentSummary::for_app(&specs, &name)?)?)
        }
        Commands::List { app: None } => {
            let client = create_client(token)?;
            let statuses = Reconciler::new(&specs, &client).status().await?;
            emit(&formatter.format_list(&statuses)?)
        }
        Commands::Status => {
            let client = create_client(token)?;
            let statuses = Reconciler::new(&specs, &client).status().await?;
            emit(&formatter.format_status(&statuses)?)
        }
        Commands::Sync => {
            let client = create_client(token)?;
            let report = Reconciler::new(&specs, &client).sync().await?;
            emit(&formatter.format_sync(&report)?)
        }
        Commands::Diff => {
            let client = create_client(token)?;
            let diffs = Reconciler::new(&specs, &client).diff().await?;
            emit(&formatter.format_diffs(&diffs)?)
        }
        Commands::Lint => {
            let client = create_client(token)?;
            cmd_lint(&Reconciler::new(&specs, &client), &formatter).await
        }
        Commands::Destroy { yes, cleanup_dns } => {
            let client = create_client(token)?;
            if !yes && !confirm_destroy(&specs)? {
                info!("Destruction cancelled.");
                return Ok(());
            }

            let mut reconciler = Reconciler::new(&specs, &client);
            if cleanup_dns {
                reconciler = reconciler.with_dns_cleanup(&client);
            }
            emit(&formatter.format_destroy(&reconciler.destroy().await?)?)
        }
    }
}

/// Lints every app and fails if any app has findings.
async fn cmd_lint(
    reconciler: &Reconciler<'_, DigitalOceanClient>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let validator = SpecValidator::new()?;
    let reports = reconciler.lint(&validator).await?;
    emit(&formatter.format_lint(&reports)?)?;

    let failing: Vec<_> = reports.iter().filter(|r| !r.is_valid()).collect();
    if failing.is_empty() {
        return Ok(());
    }

    Err(ConfigError::ValidationFailed {
        apps: failing.len(),
        errors: failing.iter().map(|r| r.error_count()).sum(),
    }
    .into())
}

/// Asks the user to type `destroy` before deleting anything.
fn confirm_destroy(specs: &[AppSpecification]) -> Result<bool> {
    eprint!("{}", OutputFormatter::format_destroy_prompt(specs));
    eprint!("\nThis action is IRREVERSIBLE. Type 'destroy' to confirm: ");
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    Ok(input.trim() == "destroy")
}

/// Writes command output to stdout.
fn emit(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Creates a DigitalOcean API client from the flag or the environment.
fn create_client(flag: Option<&str>) -> Result<DigitalOceanClient> {
    let token = flag
        .map(str::to_string)
        .or_else(|| std::env::var(ACCESS_TOKEN_VAR).ok())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            error!(
                "No access token option specified and {ACCESS_TOKEN_VAR} environment variable is not defined"
            );
            ConfigError::MissingEnvVar {
                name: ACCESS_TOKEN_VAR.to_string(),
            }
        })?;

    DigitalOceanClient::new(&token)
}
