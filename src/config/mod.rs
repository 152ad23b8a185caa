//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use uuid::Uuid;

use crate::{
    application::registry::TypeConfig,
    domain::{content_type::ContentType, types::ItemStatus},
    infra::http::DEFAULT_IDENTITY_HEADER,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "reorder-posts";
const ENV_PREFIX: &str = "REORDER_POSTS";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_ADMIN_HOST: &str = "127.0.0.1";
const DEFAULT_PUBLIC_PORT: u16 = 3000;
const DEFAULT_ADMIN_PORT: u16 = 3001;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_NONCE_LIFETIME_SECS: u64 = 86_400;
const DEFAULT_BRAND_TITLE: &str = "Reorder";

/// Command-line arguments for the reorder-posts binary.
#[derive(Debug, Parser)]
#[command(
    name = "reorder-posts",
    version,
    about = "Drag-and-drop ordering service for posts and pages"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "REORDER_POSTS_CONFIG_FILE",
        value_name = "PATH"
    )]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the admin and public HTTP listeners.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the public listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the public listener port.
    #[arg(long = "server-public-port", value_name = "PORT")]
    pub public_port: Option<u16>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the public ordinal ordering override for every type.
    #[arg(
        long = "reorder-order-override",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub order_override_enabled: Option<bool>,

    /// Override the header carrying the admin identity.
    #[arg(long = "admin-identity-header", value_name = "HEADER")]
    pub identity_header: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub reorder: ReorderSettings,
    pub security: SecuritySettings,
    pub admin: AdminSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub public_addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

/// Registered content types and the global public ordering switch.
#[derive(Debug, Clone)]
pub struct ReorderSettings {
    pub types: Vec<TypeConfig>,
    pub order_override_enabled: bool,
}

#[derive(Clone)]
pub struct SecuritySettings {
    pub nonce_secret: String,
    /// Set when no secret was configured and one was generated at startup.
    pub ephemeral_secret: bool,
    pub nonce_lifetime: Duration,
}

impl std::fmt::Debug for SecuritySettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecuritySettings")
            .field("nonce_secret", &"<redacted>")
            .field("ephemeral_secret", &self.ephemeral_secret)
            .field("nonce_lifetime", &self.nonce_lifetime)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub identity_header: String,
    pub editors: Vec<String>,
    pub managers: Vec<String>,
    pub brand_title: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("admin.editors")
            .with_list_parse_key("admin.managers"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    reorder: RawReorderSettings,
    security: RawSecuritySettings,
    admin: RawAdminSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(host) = overrides.server_admin_host.as_ref() {
            self.server.admin_host = Some(host.clone());
        }
        if let Some(port) = overrides.public_port {
            self.server.public_port = Some(port);
        }
        if let Some(port) = overrides.admin_port {
            self.server.admin_port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(enabled) = overrides.order_override_enabled {
            self.reorder.order_override_enabled = Some(enabled);
        }
        if let Some(header) = overrides.identity_header.as_ref() {
            self.admin.identity_header = Some(header.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            reorder,
            security,
            admin,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            reorder: build_reorder_settings(reorder)?,
            security: build_security_settings(security)?,
            admin: build_admin_settings(admin)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());
    let admin_host = server
        .admin_host
        .unwrap_or_else(|| DEFAULT_ADMIN_HOST.to_string());

    let public_port = server.public_port.unwrap_or(DEFAULT_PUBLIC_PORT);
    if public_port == 0 {
        return Err(LoadError::invalid(
            "server.public_port",
            "port must be greater than zero",
        ));
    }
    let admin_port = server.admin_port.unwrap_or(DEFAULT_ADMIN_PORT);
    if admin_port == 0 {
        return Err(LoadError::invalid(
            "server.admin_port",
            "port must be greater than zero",
        ));
    }

    let public_addr = parse_socket_addr(&host, public_port)
        .map_err(|reason| LoadError::invalid("server.public_addr", reason))?;
    let admin_addr = parse_socket_addr(&admin_host, admin_port)
        .map_err(|reason| LoadError::invalid("server.admin_addr", reason))?;
    if public_addr == admin_addr {
        return Err(LoadError::invalid(
            "server.admin_port",
            "admin and public listeners must not share an address",
        ));
    }

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        public_addr,
        admin_addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_reorder_settings(reorder: RawReorderSettings) -> Result<ReorderSettings, LoadError> {
    let RawReorderSettings {
        order_override_enabled,
        batch_size,
        page_size,
        page_stride,
        types: raw_types,
    } = reorder;
    let raw_types = if raw_types.is_empty() {
        default_raw_types()
    } else {
        raw_types
    };

    let mut types = Vec::with_capacity(raw_types.len());
    for mut raw in raw_types {
        raw.batch_size = raw.batch_size.or(batch_size);
        raw.page_size = raw.page_size.or(page_size);
        raw.page_stride = raw.page_stride.or(page_stride);
        let config = build_type_config(raw)?;
        if types
            .iter()
            .any(|existing: &TypeConfig| existing.name() == config.name())
        {
            return Err(LoadError::invalid(
                "reorder.types",
                format!("content type `{}` is listed twice", config.name()),
            ));
        }
        types.push(config);
    }

    Ok(ReorderSettings {
        types,
        order_override_enabled: order_override_enabled.unwrap_or(true),
    })
}

fn default_raw_types() -> Vec<RawTypeSettings> {
    vec![
        RawTypeSettings {
            name: "post".to_string(),
            label: Some("Posts".to_string()),
            hierarchical: false,
            ..RawTypeSettings::default()
        },
        RawTypeSettings {
            name: "page".to_string(),
            label: Some("Pages".to_string()),
            hierarchical: true,
            ..RawTypeSettings::default()
        },
    ]
}

fn build_type_config(raw: RawTypeSettings) -> Result<TypeConfig, LoadError> {
    let label = raw.label.unwrap_or_else(|| raw.name.clone());
    let content_type = ContentType::new(raw.name, label, raw.hierarchical)
        .map_err(|err| LoadError::invalid("reorder.types", err.to_string()))?;

    let mut config = TypeConfig::new(content_type);
    if let Some(heading) = raw.heading {
        config.heading = heading;
    }
    if let Some(menu_label) = raw.menu_label {
        config.menu_label = menu_label;
    }
    config.intro = raw.intro.filter(|text| !text.trim().is_empty());
    config.outro = raw.outro.filter(|text| !text.trim().is_empty());
    if let Some(status) = raw.status {
        config.status = ItemStatus::from_str(&status)
            .map_err(|err| LoadError::invalid("reorder.types.status", err.to_string()))?;
    }
    if let Some(size) = raw.batch_size {
        config.batch_size = size;
    }
    if let Some(size) = raw.page_size {
        config.page_size = size;
    }
    if let Some(stride) = raw.page_stride {
        config.page_stride = stride;
    }
    if let Some(cap) = raw.child_cap {
        config.child_cap = cap;
    }
    if let Some(depth) = raw.max_depth {
        config.max_depth = depth;
    }
    if let Some(threshold) = raw.large_list_threshold {
        config.large_list_threshold = threshold;
    }

    config
        .validate()
        .map_err(|err| LoadError::invalid("reorder.types", err.to_string()))?;
    Ok(config)
}

fn build_security_settings(security: RawSecuritySettings) -> Result<SecuritySettings, LoadError> {
    let (nonce_secret, ephemeral_secret) = match security.nonce_secret {
        Some(secret) if secret.trim().is_empty() => {
            return Err(LoadError::invalid(
                "security.nonce_secret",
                "must not be blank when set",
            ));
        }
        Some(secret) => (secret, false),
        None => (Uuid::new_v4().simple().to_string(), true),
    };

    let lifetime_secs = security
        .nonce_lifetime_seconds
        .unwrap_or(DEFAULT_NONCE_LIFETIME_SECS);
    if lifetime_secs < 2 {
        return Err(LoadError::invalid(
            "security.nonce_lifetime_seconds",
            "must be at least 2 seconds",
        ));
    }

    Ok(SecuritySettings {
        nonce_secret,
        ephemeral_secret,
        nonce_lifetime: Duration::from_secs(lifetime_secs),
    })
}

fn build_admin_settings(admin: RawAdminSettings) -> Result<AdminSettings, LoadError> {
    let identity_header = admin
        .identity_header
        .map(|header| header.trim().to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_IDENTITY_HEADER.to_string());
    axum::http::HeaderName::from_str(&identity_header).map_err(|err| {
        LoadError::invalid("admin.identity_header", format!("invalid header: {err}"))
    })?;

    let brand_title = admin
        .brand_title
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| DEFAULT_BRAND_TITLE.to_string());

    Ok(AdminSettings {
        identity_header,
        editors: clean_names(admin.editors),
        managers: clean_names(admin.managers),
        brand_title,
    })
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    admin_host: Option<String>,
    public_port: Option<u16>,
    admin_port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawReorderSettings {
    order_override_enabled: Option<bool>,
    /// Applied to every type that does not set its own.
    batch_size: Option<u32>,
    page_size: Option<u32>,
    page_stride: Option<u32>,
    types: Vec<RawTypeSettings>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTypeSettings {
    name: String,
    label: Option<String>,
    hierarchical: bool,
    heading: Option<String>,
    menu_label: Option<String>,
    intro: Option<String>,
    outro: Option<String>,
    status: Option<String>,
    batch_size: Option<u32>,
    page_size: Option<u32>,
    page_stride: Option<u32>,
    child_cap: Option<u32>,
    max_depth: Option<u32>,
    large_list_threshold: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSecuritySettings {
    nonce_secret: Option<String>,
    nonce_lifetime_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAdminSettings {
    identity_header: Option<String>,
    editors: Vec<String>,
    managers: Vec<String>,
    brand_title: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
