//! Memoria admin CLI: migrations, moderation and account status from the shell.
//!
//! Reads the same environment as the library (DATABASE_URL, MEMORIA_*).

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use memoria_cli::{account_rows, report_rows};
use memoria_core::{
    models::{AccountRole, AccountStatus, SignupRequest},
    Config,
};
use memoria_services::{init_telemetry, Memoria};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "memoria", about = "Memoria administration CLI")]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "json", global = true)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Table,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create an administrator account
    CreateAdmin {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        nickname: String,
        /// Falls back to MEMORIA_ADMIN_PASSWORD
        #[arg(long, env = "MEMORIA_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Accounts with post and cumulative report counts
    Accounts,
    /// Dashboard figures
    Stats,
    /// All reports with the current state of the reported content
    Reports,
    /// Mark a report processed without touching content
    Resolve { report_id: Uuid },
    /// Soft-delete the reported sub-collection and mark the report processed
    Remove {
        report_id: Uuid,
        sub_collection_id: Uuid,
    },
    /// Change an account's status (ACTIVE, SUSPENDED, BANNED)
    SetStatus {
        account_id: Uuid,
        status: AccountStatus,
        /// Suspension length in days
        #[arg(long)]
        days: Option<i64>,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Evaluate an account's gate status, invalidating sessions when blocked
    SessionStatus { account_id: Uuid },
    /// Sub-collection with owner and every item, deleted ones included
    Detail { sub_collection_id: Uuid },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn print_rows(rows: Vec<String>) {
    for row in rows {
        println!("{}", row);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;
    init_telemetry(config.log_format, "memoria=warn,sqlx=warn")
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    if let Commands::Migrate = cli.command {
        memoria_db::setup_database(&config).await?;
        return print_json(&serde_json::json!({ "success": true, "message": "Migrations applied" }));
    }

    let app = Memoria::from_config(&config).await?;
    let moderation = app.moderation();

    match cli.command {
        Commands::Migrate => {}
        Commands::CreateAdmin {
            username,
            email,
            nickname,
            password,
        } => {
            let account = app
                .accounts()
                .create_account(
                    SignupRequest {
                        username,
                        email,
                        password,
                        nickname,
                    },
                    AccountRole::Admin,
                )
                .await?;
            print_json(&account.snapshot())?;
        }
        Commands::Accounts => {
            let accounts = moderation.account_overview().await?;
            match cli.format {
                Format::Json => print_json(&accounts)?,
                Format::Table => print_rows(account_rows(&accounts)),
            }
        }
        Commands::Stats => {
            print_json(&moderation.stats().await?)?;
        }
        Commands::Reports => {
            let reports = moderation.list_reports().await?;
            match cli.format {
                Format::Json => print_json(&reports)?,
                Format::Table => print_rows(report_rows(&reports)),
            }
        }
        Commands::Resolve { report_id } => {
            moderation.resolve(report_id).await?;
            print_json(&serde_json::json!({ "success": true, "report_id": report_id }))?;
        }
        Commands::Remove {
            report_id,
            sub_collection_id,
        } => {
            moderation
                .resolve_with_removal(report_id, sub_collection_id)
                .await?;
            print_json(&serde_json::json!({
                "success": true,
                "report_id": report_id,
                "removed_sub_collection_id": sub_collection_id,
            }))?;
        }
        Commands::SetStatus {
            account_id,
            status,
            days,
            reason,
        } => {
            let snapshot = app
                .gate()
                .set_account_status(account_id, status, days, reason)
                .await?;
            print_json(&snapshot)?;
        }
        Commands::SessionStatus { account_id } => {
            print_json(&app.gate().check_session_status(account_id).await?)?;
        }
        Commands::Detail { sub_collection_id } => {
            print_json(&moderation.sub_collection_detail(sub_collection_id).await?)?;
        }
    }

    Ok(())
}
