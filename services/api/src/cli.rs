use crate::demo::{run_demo, DemoArgs};
use crate::infra::{build_service, open_repository};
use crate::server;
use clap::{Args, Parser, Subcommand};
use lostfound::config::{AppConfig, ConfigError};
use lostfound::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Campus Lost and Found",
    about = "Run and administer the campus lost-and-found service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Create the administrator account and default settings in the data file
    Init(InitArgs),
    /// Walk an item from report to return against an in-memory store
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct InitArgs {
    /// Snapshot file to seed (defaults to APP_DATA_FILE)
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
    /// Administrator email (defaults to ADMIN_EMAIL)
    #[arg(long)]
    pub(crate) email: Option<String>,
    /// Administrator password (defaults to ADMIN_PASSWORD)
    #[arg(long)]
    pub(crate) password: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Init(args) => run_init(args),
        Command::Demo(args) => run_demo(args),
    }
}

fn run_init(args: InitArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(path) = args.data_file {
        config.storage.data_file = Some(path);
    }
    if let Some(email) = args.email {
        config.bootstrap.admin_email = email;
    }
    if let Some(password) = args.password {
        config.bootstrap.admin_password = Some(password);
    }

    let data_file = config
        .storage
        .data_file
        .clone()
        .ok_or(ConfigError::MissingDataFile)?;
    let password = config
        .bootstrap
        .admin_password
        .clone()
        .ok_or(ConfigError::MissingAdminPassword)?;

    let repository = open_repository(&config.storage)?;
    let service = build_service(&config, repository);
    let admin = service.bootstrap_admin(&config.bootstrap.admin_email, &password)?;
    let settings = service.seed_default_settings(Some(admin.id))?;

    println!("Seeded {}", data_file.display());
    println!("  Administrator: {} (id {})", admin.email, admin.id);
    for setting in settings {
        println!("  Setting {} = {}", setting.key, setting.value);
    }
    Ok(())
}
