use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use ronflex::app::{self, AppState};
use ronflex::gate::Configuration;
use ronflex::jwt::JwtConfig;
use ronflex::settings::GateSettingsEnv;

#[derive(Parser, Debug)]
#[command(author, version, about = "ronflex maintenance gate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Run the demo server behind the maintenance gate (default)
    Serve,
    /// Print a bearer token for the given role
    Token {
        #[arg(long, default_value = "admin")]
        role: String,
        #[arg(long)]
        user_id: Option<Uuid>,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "APP_PORT", default_value_t = 8000, global = true)]
    port: u16,
    /// Start with the gate enabled
    #[arg(long, global = true)]
    enable: bool,
    /// Custom maintenance page (.html, or .hbs to render)
    #[arg(long, global = true)]
    maintenance_page: Option<PathBuf>,
    /// Replace the excluded paths (repeatable)
    #[arg(long = "exclude", global = true)]
    excluded_paths: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Token { role, user_id }) => {
            let jwt = JwtConfig::from_env()?;
            let token = jwt.encode(user_id.unwrap_or_else(Uuid::new_v4), &role)?;
            println!("{token}");
            Ok(())
        }
        Some(Commands::Serve) | None => serve(cli.serve).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let jwt = Arc::new(JwtConfig::from_env()?);

    let gate = Configuration::new();
    GateSettingsEnv::from_env()?.apply_to(&gate);
    if args.enable {
        gate.enable_gate();
    }
    if let Some(page) = args.maintenance_page {
        gate.set_maintenance_page(page);
    }
    if !args.excluded_paths.is_empty() {
        gate.set_excluded_paths(args.excluded_paths);
    }
    app::install_rules(&gate, Arc::clone(&jwt))?;

    tracing::info!(
        enabled = gate.is_enabled(),
        excluded = ?gate.excluded_paths(),
        "maintenance gate configured"
    );

    let state = AppState {
        jwt,
        gate: Arc::new(gate),
    };
    let app = app::create_app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,ronflex=debug"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
