pub mod cli;
pub mod clients;
pub mod config;
pub mod domain;
pub mod models;
pub mod services;

use anyhow::Context;
use clap::Parser;
use clients::HttpSearchBackend;
use cli::{Cli, Commands};
pub use config::Config;
use models::FieldMapper;
use services::{SearchController, SearchSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Controller type the binary drives: HTTP backend, config-driven mapper.
pub type HttpSearchController = SearchController<HttpSearchBackend, FieldMapper>;

/// Builds a lookup controller for a configured endpoint.
pub fn build_controller(
    config: &Config,
    endpoint_name: &str,
) -> anyhow::Result<HttpSearchController> {
    let endpoint = config
        .find_endpoint(endpoint_name)
        .with_context(|| format!("Unknown endpoint '{endpoint_name}'"))?;

    let backend = HttpSearchBackend::new(&config.backend, endpoint)?;
    let mapper = FieldMapper::from(endpoint);

    Ok(SearchController::new(backend, mapper, SearchSettings::from(config)))
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    init_tracing(&config);
    config.validate()?;

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Search {
            endpoint,
            query,
            page,
        }) => cli::cmd_search(&config, &endpoint, &query.join(" "), page).await,

        Some(Commands::Lookup { endpoint }) => {
            info!("Starting interactive lookup on '{}'", endpoint);
            cli::cmd_lookup(&config, &endpoint).await
        }

        Some(Commands::Endpoints) => {
            cli::cmd_list_endpoints(&config);
            Ok(())
        }

        Some(Commands::InitConfig) => cli::cmd_init_config(),

        None => {
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("BizLookup - customer and material lookups");
    println!();
    println!("Usage: bizlookup <command> [args]");
    println!();
    println!("Commands:");
    println!("  search <endpoint> <query> [--page N]   Run one search");
    println!("  lookup <endpoint>                      Interactive debounced lookup");
    println!("  endpoints                              List configured endpoints");
    println!("  init-config                            Create default config.toml");
    println!();
    println!("Run 'bizlookup --help' for details.");
}
