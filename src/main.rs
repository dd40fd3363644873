//! Repository Dossier - compose a project dossier from a local git repository
//!
//! # Usage
//! ```bash
//! repo-dossier /path/to/repository                          # Start server
//! repo-dossier export /path/to/repository --format pdf --all
//! repo-dossier export . --format md --path src/main.rs --commits 20
//! repo-dossier tree /path/to/repository                     # Print folder structure
//! ```

use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use repo_dossier::dossier::PathTree;
use repo_dossier::git::GitRepository;
use repo_dossier::models::CommitQuery;
use repo_dossier::pipeline::{self, DossierRequest};
use repo_dossier::render::ExportFormat;
use repo_dossier::routes::{self, AppState};
use repo_dossier::{ExportConfig, ServiceArgs};

/// Repository Dossier - Compose a navigable dossier of a git repository
#[derive(Parser)]
#[command(name = "repo-dossier")]
#[command(about = "Compose and export a project dossier from a git repository", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the git repository to serve
    #[arg(value_name = "REPO_PATH")]
    repo_path: Option<PathBuf>,

    /// Port to run the server on
    #[arg(short, long, env = "DOSSIER_PORT", default_value = "3001")]
    port: u16,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a dossier and write it to a file
    Export {
        #[arg(value_name = "REPO_PATH")]
        repo_path: PathBuf,

        #[arg(short, long, value_enum, default_value_t = ExportFormat::Md)]
        format: ExportFormat,

        /// File to include (repeatable, kept in the given order)
        #[arg(long = "path", value_name = "PATH")]
        paths: Vec<String>,

        /// Include every file at HEAD
        #[arg(long, conflicts_with = "paths")]
        all: bool,

        /// Number of commits to review (0 leaves the history out)
        #[arg(long, default_value_t = 20)]
        commits: usize,

        /// Output file (defaults to the sanitized title in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Print the folder structure of HEAD
    Tree {
        #[arg(value_name = "REPO_PATH")]
        repo_path: PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Export {
            repo_path,
            format,
            paths,
            all,
            commits,
            output,
            service,
        }) => {
            let config = ExportConfig::new(repo_path, &service);
            run_export(&config, format, paths, all, commits, output).await
        }
        Some(Commands::Tree { repo_path }) => {
            let repo = GitRepository::open(&repo_path)
                .with_context(|| format!("failed to open repository at {}", repo_path.display()))?;
            let listing = repo.list_paths(None)?;
            println!("{}", PathTree::from_entries(&listing).render());
            Ok(())
        }
        None => {
            let repo_path = cli.repo_path.unwrap_or_else(|| {
                eprintln!("Usage: repo-dossier <REPO_PATH> [--port <PORT>]");
                eprintln!("       repo-dossier export <REPO_PATH> --format md|pdf|docx [--path P]... [--all]");
                eprintln!("       repo-dossier tree <REPO_PATH>");
                std::process::exit(1);
            });
            let config = ExportConfig::new(repo_path, &cli.service);
            serve(config, cli.port).await
        }
    }
}

async fn run_export(
    config: &ExportConfig,
    format: ExportFormat,
    paths: Vec<String>,
    all: bool,
    commits: usize,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let paths = if all { pipeline::all_files(config).await? } else { paths };
    let request = DossierRequest {
        paths,
        commits: (commits > 0).then(|| CommitQuery {
            limit: Some(commits),
            ..Default::default()
        }),
        include_tree: true,
        notes: Vec::new(),
    };

    let metadata = pipeline::metadata(config).await?;
    let title = format!("{}-dossier", metadata.name);
    let text = pipeline::build_dossier(config, &request, Utc::now()).await?;
    let rendered = config.renderers().render(format, &text, &title).await?;

    let target = output.unwrap_or_else(|| PathBuf::from(&rendered.filename));
    tokio::fs::write(&target, &rendered.bytes)
        .await
        .with_context(|| format!("failed to write {}", target.display()))?;
    println!("✓ Wrote {} ({} bytes)", target.display(), rendered.bytes.len());
    Ok(())
}

async fn serve(config: ExportConfig, port: u16) -> anyhow::Result<()> {
    // Fail fast on a bad path; request handlers open their own handles.
    let repo = match GitRepository::open(&config.repo_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("✗ Failed to open repository: {}", e);
            eprintln!("  Path: {}", config.repo_path.display());
            std::process::exit(1);
        }
    };
    let config = ExportConfig {
        repo_path: repo.path.clone(),
        ..config
    };
    drop(repo);

    let renderers = config.renderers();
    let repo_display = config.repo_path.display().to_string();
    let state = AppState::new(config, renderers);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to port {}: {}", port, e);
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    println!();
    println!("  Repository Dossier");
    println!();
    println!("  Repository: {}", repo_display);
    println!("  Server:     http://{}", addr);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
