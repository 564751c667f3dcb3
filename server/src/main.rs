mod config;
mod http;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use tracing::info;

use crate::{
    config::AppConfig,
    http::{AppState, ServeConfig},
};

#[derive(Parser, Debug)]
#[command(name = "directory-server", version, about = "Employee and department directory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert demo departments and employees into an empty directory.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
    /// Rollback everything and reapply.
    Reset,
    /// List applied and pending migrations.
    Status,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
    #[arg(long, help = "Apply pending migrations before serving")]
    migrate: bool,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _obs = init_tracing(ObsConfig::from_env()?)?;
    let cli = Cli::parse();
    let config = Arc::new(AppConfig::load()?);
    match cli.command {
        Command::Serve(cmd) => run_server(cmd, config).await,
        Command::Migrate(action) => run_migrate(action, &config).await,
        Command::Seed => run_seed(&config).await,
    }
}

async fn setup_pool(config: &AppConfig) -> Result<DbPool> {
    connect(&config.database).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand, config: Arc<AppConfig>) -> Result<()> {
    let pool = setup_pool(&config).await?;
    if cmd.migrate {
        Migrator::up(&pool, None).await?;
        info!("database migrations applied");
    }
    ensure_migrations(&pool, cmd.allow_dirty).await?;

    let state = AppState::new(pool.clone(), config);
    let served = http::serve(ServeConfig::new(cmd.bind), state).await;
    platform_db::close(pool).await?;
    served
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "{} pending migration(s); run `migrate up` or pass --migrate / --allow-dirty",
            pending.len()
        );
    }
    Ok(())
}

async fn run_migrate(action: MigrateCommand, config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    match action {
        MigrateCommand::Up => {
            Migrator::up(&pool, None).await?;
            info!("database migrations applied");
        }
        MigrateCommand::Down => {
            Migrator::down(&pool, Some(1)).await?;
            info!("most recent migration rolled back");
        }
        MigrateCommand::Reset => {
            Migrator::refresh(&pool).await?;
            info!("database schema rebuilt");
        }
        MigrateCommand::Status => {
            let applied = Migrator::get_applied_migrations(&pool).await?;
            let pending = Migrator::get_pending_migrations(&pool).await?;
            for migration in &applied {
                info!(name = migration.name(), "applied");
            }
            for migration in &pending {
                info!(name = migration.name(), "pending");
            }
            info!(
                applied = applied.len(),
                pending = pending.len(),
                "migration status"
            );
        }
    }
    platform_db::close(pool).await?;
    Ok(())
}

async fn run_seed(config: &AppConfig) -> Result<()> {
    let pool = setup_pool(config).await?;
    ensure_migrations(&pool, false).await?;
    let summary = products_hr::seed_demo(&pool).await?;
    if !summary.skipped {
        info!(
            departments = summary.departments,
            employees = summary.employees,
            "seed complete"
        );
    }
    platform_db::close(pool).await?;
    Ok(())
}
