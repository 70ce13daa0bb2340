//! Keygate - licensing and whitelist bot core
//!
//! Serves the signed interaction ingress that a chat gateway relay forwards
//! slash commands, button presses and modal submissions to.

use std::env;
use std::io::BufReader;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, prelude::*, registry::LookupSpan, EnvFilter, Layer};

use keygate::{
    api,
    config::{self, LogFormat, LogTarget},
    db,
    platform::{ChatPlatform, DisabledPlatform, HttpPlatformClient},
    AppConfig, AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("Keygate {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Loaded before logging so the log format is known
    let config = AppConfig::load().context("Failed to load configuration")?;

    // Must outlive the server so buffered file logs are flushed
    let _log_guard = init_logging(&config);

    info!("Keygate starting up");

    ensure_data_directory(&config)?;

    info!("Initializing database connection");
    let db = db::init_pool(&config.database)
        .await
        .context("Failed to initialize database")?;

    let platform: Arc<dyn ChatPlatform> = match config.platform {
        Some(ref platform_config) => {
            info!(
                "Initializing chat platform client: {}",
                platform_config.api_base_url
            );
            Arc::new(
                HttpPlatformClient::new(platform_config)
                    .context("Failed to initialize chat platform client")?,
            )
        }
        None => {
            warn!("No chat platform configured; deliveries will be reported as failed");
            Arc::new(DisabledPlatform)
        }
    };

    let state = AppState::new(config.clone(), db, platform);

    if config.bot.seed_demo_keys {
        let inserted = state
            .keys()
            .seed_demo_keys()
            .await
            .context("Failed to seed demo keys")?;
        info!(inserted, "Demo keys seeded");
    }

    let app = api::create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    if let Some(ref tls_config) = config.server.tls {
        info!("Starting HTTPS server on https://{}", addr);
        let rustls_config = create_rustls_config(tls_config)?;

        axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)?
            .serve(app.into_make_service())
            .await
            .context("HTTPS server error")?;
    } else {
        info!("Starting HTTP server on http://{}", addr);

        axum::serve(listener, app)
            .await
            .context("HTTP server error")?;
    }

    Ok(())
}

/// Build the rustls server configuration from the PEM files in the config
fn create_rustls_config(
    tls_config: &config::TlsConfig,
) -> Result<axum_server::tls_rustls::RustlsConfig> {
    use axum_server::tls_rustls::RustlsConfig;
    use rustls::crypto::aws_lc_rs::default_provider;
    use rustls::ServerConfig;

    let cert_file = std::fs::File::open(&tls_config.cert_file)
        .with_context(|| format!("Failed to open certificate file: {:?}", tls_config.cert_file))?;
    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("Failed to parse certificates: {:?}", tls_config.cert_file))?;
    if certs.is_empty() {
        anyhow::bail!("No certificates found in {:?}", tls_config.cert_file);
    }

    let key_file = std::fs::File::open(&tls_config.key_file)
        .with_context(|| format!("Failed to open key file: {:?}", tls_config.key_file))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .with_context(|| format!("Failed to read private key: {:?}", tls_config.key_file))?
        .ok_or_else(|| anyhow::anyhow!("No private key found in {:?}", tls_config.key_file))?;

    let versions: Vec<&'static rustls::SupportedProtocolVersion> =
        if tls_config.min_version == "1.3" {
            vec![&rustls::version::TLS13]
        } else {
            vec![&rustls::version::TLS12, &rustls::version::TLS13]
        };

    let mut server_config = ServerConfig::builder_with_provider(default_provider().into())
        .with_protocol_versions(&versions)
        .context("Failed to set TLS protocol versions")?
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .context("Failed to build TLS server config")?;
    server_config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    info!("TLS configured with minimum version: {}", tls_config.min_version);

    Ok(RustlsConfig::from_config(Arc::new(server_config)))
}

/// Initialize the logging/tracing infrastructure
fn init_logging(config: &AppConfig) -> Option<WorkerGuard> {
    let log_config = &config.logging;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_config.level));

    let (console, file, guard) = match log_config.target {
        LogTarget::Console => (Some(fmt_layer(&log_config.format, None)), None, None),
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            (None, Some(fmt_layer(&log_config.format, Some(writer))), Some(guard))
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            (
                Some(fmt_layer(&log_config.format, None)),
                Some(fmt_layer(&log_config.format, Some(writer))),
                Some(guard),
            )
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file)
        .init();

    guard
}

/// One formatting layer, writing to stdout or to the given file writer
fn fmt_layer<S>(
    format: &LogFormat,
    writer: Option<NonBlocking>,
) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    match (format, writer) {
        (LogFormat::Json, None) => fmt::layer().json().with_target(true).boxed(),
        (LogFormat::Json, Some(w)) => fmt::layer().json().with_target(true).with_writer(w).boxed(),
        (LogFormat::Compact, None) => fmt::layer().compact().with_target(false).boxed(),
        (LogFormat::Compact, Some(w)) => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(w)
            .boxed(),
        (LogFormat::Pretty, None) => fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        (LogFormat::Pretty, Some(w)) => fmt::layer()
            .with_target(true)
            .with_file(false)
            .with_line_number(false)
            .with_writer(w)
            .boxed(),
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(log_config: &config::LoggingConfig) -> (NonBlocking, WorkerGuard) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

/// Directory holding the SQLite file named by a `sqlite://` URL
fn data_directory(url: &str) -> Option<&std::path::Path> {
    let path = url.strip_prefix("sqlite://")?;
    let path = path.split('?').next().unwrap_or(path);
    std::path::Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
}

/// Ensure the data directory exists
fn ensure_data_directory(config: &AppConfig) -> Result<()> {
    if let Some(parent) = data_directory(&config.database.url) {
        if !parent.exists() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
            info!("Created data directory: {:?}", parent);
        }
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"Keygate {}

USAGE:
    keygate [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information

ENVIRONMENT:
    KEYGATE_CONFIG          Path to configuration file (default: config.yaml)
    KEYGATE_OWNER_ID        Primary owner user id
    KEYGATE_SIGNING_SECRET  Shared secret for signed interactions
    DISCORD_BOT_TOKEN       Bot token for the chat platform REST API
    KEYGATE_GUILD_ID        Guild the panel and roles live in
    ENABLE_SELF_HWID_RESET  Allow users to reset their own HWID
    SCRIPT_CONTENT          Default script template ({{{{KEY}}}} is replaced)
    DATABASE_URL            SQLite connection URL

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by KEYGATE_CONFIG environment variable
    2. ./config.yaml
    3. ./config/config.yaml
    4. /etc/keygate/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
