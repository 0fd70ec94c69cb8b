//! Run configuration.
//!
//! Settings come from an optional YAML file and the command line; any flag
//! given on the command line wins over the file. Nothing is hardcoded apart
//! from the defaults documented on each field.

use std::{
    env, fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::cli::{ConnectionArgs, Driver, ExportArgs, QuoteStyle};

pub const PASSWORD_ENV: &str = "EXPORT_VERIFY_PASSWORD";
const DEFAULT_HOST: &str = "localhost";

/// Shape of the YAML configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub connection: FileConnection,
    pub output_dir: Option<PathBuf>,
    pub missing_marker: Option<String>,
    pub quote_style: Option<QuoteStyle>,
    pub strict_coercion: Option<bool>,
    pub include_views: Option<bool>,
    pub tables: Vec<String>,
    pub exclude: Vec<String>,
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConnection {
    pub driver: Option<Driver>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub password_env: Option<String>,
    pub database: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)
            .with_context(|| format!("Parsing config file {path:?}"))?;
        Ok(config)
    }

    fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub driver: Driver,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    /// Schema name for mysql, file path for sqlite.
    pub database: String,
}

impl ConnectionConfig {
    /// Connection target suitable for logs; never includes the password.
    pub fn display_target(&self) -> String {
        match self.driver {
            Driver::Mysql => format!(
                "mysql://{}@{}:{}/{}",
                self.user, self.host, self.port, self.database
            ),
            Driver::Sqlite => format!("sqlite://{}", self.database),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .finish()
    }
}

/// Which tables a run touches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_views: bool,
}

impl TableFilter {
    pub fn accepts(&self, table: &str) -> bool {
        if self.exclude.iter().any(|t| t == table) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|t| t == table)
    }

    /// Applies the filter and returns requested tables the catalog lacks.
    pub fn apply(&self, tables: Vec<String>) -> (Vec<String>, Vec<String>) {
        let unknown = self
            .include
            .iter()
            .filter(|name| !tables.contains(name))
            .cloned()
            .collect();
        let selected = tables.into_iter().filter(|t| self.accepts(t)).collect();
        (selected, unknown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    pub missing_marker: String,
    pub quote_style: QuoteStyle,
    pub strict_coercion: bool,
}

impl ExportOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            missing_marker: String::new(),
            quote_style: QuoteStyle::default(),
            strict_coercion: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub connection: ConnectionConfig,
    pub filter: TableFilter,
    pub options: ExportOptions,
    pub report: Option<PathBuf>,
}

impl ExportConfig {
    pub fn resolve(args: &ExportArgs) -> Result<Self> {
        let file = FileConfig::load_optional(args.connection.config.as_deref())?;
        let connection = resolve_connection(&args.connection, &file)?;
        let filter = resolve_filter(&args.connection, &file);
        let output_dir = args
            .output_dir
            .clone()
            .or_else(|| file.output_dir.clone())
            .ok_or_else(|| anyhow!("An output directory is required (--output-dir)"))?;
        let options = ExportOptions {
            output_dir,
            missing_marker: args
                .missing_marker
                .clone()
                .or_else(|| file.missing_marker.clone())
                .unwrap_or_default(),
            quote_style: args.quote_style.or(file.quote_style).unwrap_or_default(),
            strict_coercion: args.strict_coercion || file.strict_coercion.unwrap_or(false),
        };
        if options.missing_marker.contains(['\n', '\r']) {
            bail!("The missing marker cannot contain line breaks");
        }
        Ok(Self {
            connection,
            filter,
            options,
            report: args.report.clone().or(file.report),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub connection: ConnectionConfig,
    pub filter: TableFilter,
}

impl CatalogConfig {
    pub fn resolve(args: &ConnectionArgs) -> Result<Self> {
        let file = FileConfig::load_optional(args.config.as_deref())?;
        Ok(Self {
            connection: resolve_connection(args, &file)?,
            filter: resolve_filter(args, &file),
        })
    }
}

fn resolve_filter(args: &ConnectionArgs, file: &FileConfig) -> TableFilter {
    let include = if args.tables.is_empty() {
        file.tables.clone()
    } else {
        args.tables.clone()
    };
    let exclude = if args.exclude.is_empty() {
        file.exclude.clone()
    } else {
        args.exclude.clone()
    };
    TableFilter {
        include: clean_names(include),
        exclude: clean_names(exclude),
        include_views: args.include_views || file.include_views.unwrap_or(false),
    }
}

fn clean_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn resolve_connection(args: &ConnectionArgs, file: &FileConfig) -> Result<ConnectionConfig> {
    let fc = &file.connection;
    let driver = args.driver.or(fc.driver).unwrap_or(Driver::Mysql);
    let database = args
        .database
        .clone()
        .or_else(|| fc.database.clone())
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| anyhow!("A database name is required (--database)"))?;
    let host = args
        .host
        .clone()
        .or_else(|| fc.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args
        .port
        .or(fc.port)
        .or(driver.default_port())
        .unwrap_or_default();
    let user = args
        .user
        .clone()
        .or_else(|| fc.user.clone())
        .unwrap_or_default();
    let password = match (&args.password, &fc.password) {
        (Some(p), _) => Some(p.clone()),
        (None, Some(p)) => Some(p.clone()),
        (None, None) => {
            let var = fc.password_env.as_deref().unwrap_or(PASSWORD_ENV);
            env::var(var).ok()
        }
    };
    if driver == Driver::Mysql && user.is_empty() {
        bail!("A database user is required for mysql (--user)");
    }
    Ok(ConnectionConfig {
        driver,
        host,
        port,
        user,
        password,
        database,
    })
}
