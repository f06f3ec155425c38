use anyhow::Context;
use clap::Parser;
use stepvault::cli::{Cli, Commands, ConfigAction, ConnectOpts, FileOpts};
use stepvault::config::{validate_config_object, StepsConfig};
use stepvault::crypto::{check_compliance, FipsAllowList, SymmetricAlgorithm};
use stepvault::error::error_chain;
use stepvault::logging;
use stepvault::steps::{
    configure, run_step, CipherDirection, ConnectionOutputs, DatabaseTransaction, FileCipherStep,
    FileOutputs, StepContext, StepReport,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Encrypt(opts) => run_file_step(CipherDirection::Encrypt, opts).await?,
        Commands::Decrypt(opts) => run_file_step(CipherDirection::Decrypt, opts).await?,
        Commands::Connect(opts) => run_connect(opts).await?,
        Commands::Check(opts) => {
            let algorithms = match opts.algorithm {
                Some(algorithm) => vec![algorithm],
                None => SymmetricAlgorithm::ALL.to_vec(),
            };
            for algorithm in algorithms {
                let finding = check_compliance(algorithm, &FipsAllowList);
                let status = if finding.compliant { "compliant" } else { "not compliant" };
                println!("{:<12} {status}", finding.algorithm);
            }
        }
        Commands::Config(opts) => match opts.action {
            ConfigAction::Show => {
                let config = load_config(opts.config.as_deref())?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Validate => {
                let config = load_config(opts.config.as_deref())?;
                validate_config_object(&config)?;
                info!("Configuration is valid");
            }
            ConfigAction::Init => {
                let path = opts.config.as_deref().unwrap_or("stepvault.json");
                StepsConfig::write_default(path)?;
                println!("Configuration file created at {path}");
            }
        },
        Commands::Version => {
            println!("stepvault {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Load configuration and install logging from it.
fn load_config(path: Option<&str>) -> anyhow::Result<StepsConfig> {
    let config = StepsConfig::load(path)?;
    logging::init(&config.logging);
    Ok(config)
}

/// As [`load_config`], but refuses an invalid configuration. Every command
/// that runs a step goes through here.
fn load_run_config(path: Option<&str>) -> anyhow::Result<StepsConfig> {
    let config = StepsConfig::load_validated(path)?;
    logging::init(&config.logging);
    Ok(config)
}

/// A context whose token is cancelled on Ctrl-C.
fn interruptible_context() -> StepContext {
    let token = CancellationToken::new();
    let ctx = StepContext::with_cancellation(token.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; steps not yet dispatched will be cancelled");
            token.cancel();
        }
    });
    ctx
}

fn report_suppressed(report: &StepReport) {
    if let Some(err) = &report.suppressed {
        eprintln!("{} completed with a suppressed error: {}", report.step, error_chain(err));
    }
}

async fn run_file_step(direction: CipherDirection, opts: FileOpts) -> anyhow::Result<()> {
    let config = load_run_config(opts.config.as_deref())?;

    let mut step = FileCipherStep::from_config(direction, &config.crypto)
        .with_paths(opts.input, opts.output)
        .with_key(opts.key.secret_args()?)
        .with_overwrite(opts.overwrite)
        .with_continue_on_error(opts.continue_on_error);
    if let Some(algorithm) = opts.algorithm {
        step = step.with_algorithm(algorithm);
    }
    if let Some(encoding) = opts.encoding {
        step.key_encoding = Some(encoding);
    }

    configure(&step);

    let mut outputs = FileOutputs::default();
    let report = run_step(&step, &interruptible_context(), &mut outputs).await?;
    report_suppressed(&report);
    if let Some(path) = outputs.output_file {
        println!("{}", path.display());
    }
    Ok(())
}

async fn run_connect(opts: ConnectOpts) -> anyhow::Result<()> {
    let config = load_run_config(opts.config.as_deref())?;

    let step = DatabaseTransaction::from_config(&config.database)
        .with_provider(opts.provider.clone())
        .with_connection_string(opts.secret_args()?)
        .with_transaction(!opts.no_transaction)
        .with_continue_on_error(opts.continue_on_error);

    let mut outputs = ConnectionOutputs::default();
    let report = run_step(&step, &interruptible_context(), &mut outputs).await?;
    report_suppressed(&report);

    let Some(handle) = outputs.database_connection else {
        return Ok(());
    };
    let connection = handle.connection().clone();

    for sql in &opts.statements {
        let affected = connection
            .execute(sql)
            .with_context(|| format!("Statement failed on connection {}", connection.id()))?;
        info!(affected, "statement executed");
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "connection": connection.id().to_string(),
            "provider": connection.provider(),
            "openedAt": connection.opened_at().to_rfc3339(),
            "owned": handle.is_owned(),
            "inTransaction": handle.in_transaction(),
        }))?
    );

    if handle.in_transaction() {
        if opts.commit {
            connection.commit()?;
            info!("transaction committed");
        } else {
            connection.rollback()?;
            info!("transaction rolled back");
        }
    }
    handle.close()?;
    Ok(())
}
