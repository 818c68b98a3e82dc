mod cli;

use camstation::{
    config,
    server::{self, auth},
};
use camstation_av::{CaptureBackend, ToolRegistry};
use camstation_common::Role;
use camstation_db::pool::init_pool;
use camstation_db::queries::{recordings, users};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;

async fn start_server(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&Path>,
) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting Camstation server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    let db_pool = open_database(&config)?;

    let tools = ToolRegistry::discover(config.tools.ffmpeg_path.as_deref());
    if let Err(e) = tools.require("ffmpeg") {
        tracing::warn!("{}; live view and recording will fail until it is installed", e);
    }

    tracing::info!(
        "Recordings will be written to {}",
        config.recording.dir.display()
    );

    let backend: Arc<dyn CaptureBackend> = Arc::new(server::ffmpeg_backend(&config, &tools));
    server::start_server(config, db_pool, backend).await
}

fn open_database(config: &config::Config) -> Result<camstation_db::pool::DbPool> {
    let db_path = &config.server.db_path;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }

    let db_path_str = db_path.to_string_lossy();
    tracing::info!("Initializing database at {}", db_path_str);
    Ok(init_pool(&db_path_str)?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "camstation=trace,camstation_av=trace,camstation_db=debug,tower_http=debug".to_string()
        } else {
            "camstation=debug,camstation_av=debug,camstation_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("camstation {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::HashPassword { password } => hash_password(&password),
        Commands::CreateUser {
            username,
            password,
            role,
        } => create_user(cli.config.as_deref(), &username, &password, &role),
        Commands::CleanDb => clean_db(cli.config.as_deref()),
    }
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = ToolRegistry::discover(config.tools.ffmpeg_path.as_deref()).check_all();
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg is missing. Install it to enable live view and recording.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let resolved = config::find_config_file(path);
    let config = match resolved {
        Some(ref p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file found, using defaults");
            config::Config::default()
        }
    };

    let capture = config.capture.capture_settings();
    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Auth enabled: {}", config.auth.enabled);
    println!("  Recordings dir: {}", config.recording.dir.display());
    println!(
        "  Stop timeout: {}s (force kill: {})",
        config.recording.stop_timeout_secs, config.recording.force_kill_on_timeout
    );
    println!(
        "  Capture: {} {}",
        capture.input_format,
        capture.device_for(capture.device_index)
    );

    Ok(())
}

fn hash_password(password: &str) -> Result<()> {
    let hash = auth::hash_password(password)?;
    println!("{}", hash);
    Ok(())
}

fn create_user(config_path: Option<&Path>, username: &str, password: &str, role: &str) -> Result<()> {
    let role: Role = role.parse().map_err(anyhow::Error::msg)?;
    let config = config::load_config_or_default(config_path)?;
    let pool = open_database(&config)?;
    let conn = pool.get()?;

    let hash = auth::hash_password(password)?;
    let user = users::create_user(&conn, username, &hash, role)?;
    println!("Created {} account '{}' ({})", user.role, user.username, user.id);
    Ok(())
}

fn clean_db(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_database(&config)?;
    let conn = pool.get()?;

    let removed = recordings::delete_orphaned(&conn)?;
    println!("Removed {} recording rows without a filename", removed);
    Ok(())
}
