use anyhow::{Context, Result};
use clap::Parser;
use std::env;

const DEFAULT_MAX_HTML_BYTES: u64 = 5_000_000;
const DEFAULT_MAX_ZIP_BYTES: u64 = 25_000_000;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub sites_dir: String,
    pub database_url: String,
    pub max_html_bytes: u64,
    pub max_zip_bytes: u64,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-tenant static-site host")]
pub struct Args {
    /// Host to bind to (overrides SITE_HOST_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides SITE_HOST_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where deployed sites are stored (overrides SITE_HOST_SITES_DIR)
    #[arg(long)]
    pub sites_dir: Option<String>,

    /// Database URL (overrides SITE_HOST_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Max accepted size for single-HTML uploads, in bytes (overrides SITE_HOST_MAX_HTML_BYTES)
    #[arg(long)]
    pub max_html_bytes: Option<u64>,

    /// Max accepted size for ZIP bundle uploads, in bytes (overrides SITE_HOST_MAX_ZIP_BYTES)
    #[arg(long)]
    pub max_zip_bytes: Option<u64>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("SITE_HOST_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("SITE_HOST_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing SITE_HOST_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading SITE_HOST_PORT"),
        };
        let env_sites_dir =
            env::var("SITE_HOST_SITES_DIR").unwrap_or_else(|_| "./data/sites".into());
        let env_db = env::var("SITE_HOST_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/site_host.db".into());
        let env_max_html = parse_size_var("SITE_HOST_MAX_HTML_BYTES", DEFAULT_MAX_HTML_BYTES)?;
        let env_max_zip = parse_size_var("SITE_HOST_MAX_ZIP_BYTES", DEFAULT_MAX_ZIP_BYTES)?;

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            sites_dir: args.sites_dir.unwrap_or(env_sites_dir),
            database_url: args.database_url.unwrap_or(env_db),
            max_html_bytes: args.max_html_bytes.unwrap_or(env_max_html),
            max_zip_bytes: args.max_zip_bytes.unwrap_or(env_max_zip),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_size_var(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}
