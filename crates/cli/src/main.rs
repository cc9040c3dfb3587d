//! shellcache command line entry point.
//!
//! Drives the cache controller lifecycle by hand and routes single requests
//! through it. Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use shellcache_client::fetch::resolve;
use shellcache_client::header::HeaderValue;
use shellcache_client::{
    CacheController, ControllerConfig, Destination, FetchClient, FetchConfig, Method, Network, RequestDescriptor,
    ResponseView,
};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

/// Offline cache controller for the packet module app
#[derive(Parser, Debug)]
#[command(name = "shellcache")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the bucket for the configured version with the shell resources
    Install,
    /// Delete every bucket except the current one
    Activate,
    /// Install if needed, then activate
    Start,
    /// Route one request through the controller
    ///
    /// Installs and activates first when needed. If that fails (for example
    /// on a first run without network) the request is still answered, with
    /// the offline response for its category.
    Fetch {
        /// Absolute URL or path relative to the configured origin
        url: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Destination hint (document, script, style, image, ...)
        #[arg(short, long)]
        destination: Option<String>,

        /// Accept header
        #[arg(long)]
        accept: Option<String>,
    },
    /// List cache buckets and entry counts
    Buckets,
}

#[derive(Serialize)]
struct BucketRow {
    name: String,
    current: bool,
    entries: u64,
}

/// Bring the controller up before routing a request.
///
/// Returns false when install or activate failed. Requests can still be
/// answered in that state.
async fn ensure_started<N: Network>(controller: &CacheController<N>) -> bool {
    match controller.start().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("controller not ready, answering offline: {e}");
            false
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { EnvFilter::new("debug") } else { EnvFilter::from_default_env() };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let controller = CacheController::new(ControllerConfig::from_app_config(&config)?, db, network);

    match args.command {
        Command::Install => print_json(&controller.on_install().await?),
        Command::Activate => print_json(&controller.on_activate().await?),
        Command::Start => print_json(&controller.start().await?),
        Command::Fetch { url, method, destination, accept } => {
            ensure_started(&controller).await;

            let url = resolve(&controller.config().origin, &url)?;
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("unsupported method: {method}"))?;
            let mut request = RequestDescriptor::new(method, url);
            if let Some(destination) = destination {
                request = request.with_destination(Destination::from(destination.as_str()));
            }
            if let Some(accept) = accept {
                request = request.with_accept(HeaderValue::from_str(&accept).context("invalid accept header")?);
            }

            let response = controller.on_fetch(&request).await;
            print_json(&ResponseView::from(&response))
        }
        Command::Buckets => {
            let db = controller.db();
            let mut rows = Vec::new();
            for name in db.bucket_names().await? {
                let entries = db.entry_count(&name).await?;
                let current = name == controller.config().bucket_name;
                rows.push(BucketRow { name, current, entries });
            }
            print_json(&rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellcache_client::{NetworkError, Response, StatusCode};

    #[test]
    fn test_parse_fetch() {
        let args = Args::parse_from(["shellcache", "fetch", "/app/script.js", "-d", "script"]);
        match args.command {
            Command::Fetch { url, method, destination, accept } => {
                assert_eq!(url, "/app/script.js");
                assert_eq!(method, "GET");
                assert_eq!(destination.as_deref(), Some("script"));
                assert!(accept.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_lifecycle_commands() {
        assert!(matches!(Args::parse_from(["shellcache", "install"]).command, Command::Install));
        assert!(matches!(Args::parse_from(["shellcache", "activate"]).command, Command::Activate));
        assert!(matches!(Args::parse_from(["shellcache", "--debug", "buckets"]).command, Command::Buckets));
    }

    struct OfflineNetwork;

    #[async_trait::async_trait]
    impl Network for OfflineNetwork {
        async fn fetch(&self, request: &RequestDescriptor) -> Result<Response, NetworkError> {
            Err(NetworkError::Transport(format!("offline: {}", request.url)))
        }
    }

    #[tokio::test]
    async fn test_fetch_answers_when_first_start_is_offline() {
        let config = AppConfig {
            origin: "https://school.example".into(),
            seed_urls: vec!["/app/index.html".into()],
            fallback_path: "/app/index.html".into(),
            ..Default::default()
        };
        let controller = CacheController::new(
            ControllerConfig::from_app_config(&config).unwrap(),
            CacheDb::open_in_memory().await.unwrap(),
            OfflineNetwork,
        );

        assert!(!ensure_started(&controller).await);

        let url = resolve(&controller.config().origin, "/app/script.js").unwrap();
        let response = controller.on_fetch(&RequestDescriptor::get(url)).await;
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.content_type(), Some("text/plain"));
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
