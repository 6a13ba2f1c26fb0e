use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use storeops_api::{
    config::{self, AppConfig},
    db::{self, DbPool},
    entities::Role,
    services::{
        reconciliation::{NocoDbClient, ReconciliationService},
        users::{NewUser, UserService},
    },
};
use tracing::debug;

/// Operator commands for a StoreOps deployment.
#[derive(Parser, Debug)]
#[command(name = "storeops-cli", version, about = "StoreOps operator tooling")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a user account, typically the first administrator
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum, default_value_t = RoleArg::Employee)]
        role: RoleArg,
        /// Store group the account belongs to; repeat for several
        #[arg(long = "group")]
        groups: Vec<i32>,
    },
    /// Look an invoice reference up in a group's NocoDB ledger
    CheckInvoice {
        #[arg(long)]
        group: i32,
        #[arg(long)]
        reference: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum RoleArg {
    Admin,
    Manager,
    Employee,
}

impl From<RoleArg> for Role {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => Role::Admin,
            RoleArg::Manager => Role::Manager,
            RoleArg::Employee => Role::Employee,
        }
    }
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load configuration")?;
        config::init_tracing(&config.log_level, config.log_json);
        debug!(environment = %config.environment, "cli configuration loaded");

        let db = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to the database")?;
        Ok(Self {
            config,
            db: Arc::new(db),
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedUser {
    id: i32,
    username: String,
    role: Role,
    group_ids: Vec<i32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            print_line(cli.json, "migrations applied")?;
        }
        Commands::CreateUser {
            username,
            password,
            role,
            groups,
        } => {
            let service = UserService::new(context.db.clone());
            let account = service
                .create_unchecked(NewUser {
                    username,
                    password,
                    role: role.into(),
                    group_ids: groups,
                })
                .await
                .context("failed to create user")?;
            let created = CreatedUser {
                id: account.user.id,
                username: account.user.username,
                role: account.user.role,
                group_ids: account.group_ids,
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&created)?);
            } else {
                println!(
                    "created user #{} '{}' ({}) in groups {:?}",
                    created.id, created.username, created.role, created.group_ids
                );
            }
        }
        Commands::CheckInvoice { group, reference } => {
            let ledger = NocoDbClient::new(Duration::from_secs(
                context.config.nocodb_timeout_secs,
            ))?;
            let service = ReconciliationService::new(context.db.clone(), Arc::new(ledger));
            let check = service.verify_invoice_reference(group, &reference).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&check)?);
            } else {
                match &check.error {
                    Some(error) => println!("check failed: {}", error),
                    None if check.exists => println!("'{}' found in group {}", reference.trim(), group),
                    None => println!("'{}' not found in group {}", reference.trim(), group),
                }
            }
        }
    }

    Ok(())
}

fn print_line(json: bool, message: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(&serde_json::json!({ "message": message }))?);
    } else {
        println!("{}", message);
    }
    Ok(())
}
