//! Configuration loaded from environment variables.
//!
//! | Variable                    | Default                                  |
//! |-----------------------------|------------------------------------------|
//! | `CAMINHO_PADRAO`            | `C:\IBMRPA\Hospital\Austa_RepasseMedico` |
//! | `DEV`                       | `False`                                  |
//! | `BD_USUARIO` / `BD_SENHA`   | empty                                    |
//! | `AUSTA_BD_ORACLE_DEV`       | empty (`host,port,service`)              |
//! | `UNIDADE` / `PROJETO`       | empty                                    |
//! | `RPA_SCRIPT_NAME`           | empty                                    |
//! | `USERNAME`                  | empty                                    |
//! | `ORACLE_INSTANT_CLIENT_DIR` | unset                                    |
//! | `IMPORT_SINCE`              | `01/09/2025`                             |
//! | `TASY_URL`                  | unset                                    |
//! | `WEBDRIVER_URL`             | unset (spawn a local driver)             |
//! | `WEBDRIVER_PATH`            | unset                                    |
//! | `BROWSER`                   | `chrome`                                 |
//! | `DEV_EMAIL_DESTINO`         | unset                                    |
//! | `CLIQ_WEBHOOK_URL`          | unset                                    |
//! | `LOG_DIR`                   | `logs`                                   |

use anyhow::{Context, Result};
use chrono::NaiveDate;
use repasse_browser::{BrowserKind, LaunchOptions};
use repasse_db::models::ExecutionContext;
use repasse_db::DbSettings;
use repasse_telemetry::evidence::evidence_dir;
use std::path::PathBuf;

pub const DEFAULT_BASE_DIR: &str = r"C:\IBMRPA\Hospital\Austa_RepasseMedico";
pub const DEFAULT_IMPORT_SINCE: &str = "01/09/2025";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub dev_mode: bool,
    pub db: DbSettings,
    pub execution: ExecutionContext,
    /// Titles released before this date are not imported.
    pub import_since: NaiveDate,
    pub tasy_url: Option<String>,
    pub browser: LaunchOptions,
    /// Destination used instead of the real e-mail in dev mode.
    pub dev_email: Option<String>,
    pub cliq_webhook_url: Option<String>,
    pub log_dir: PathBuf,
}

impl Config {
    /// Load the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load the configuration through a key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        let get_opt = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let get_or = |key: &str, default: &str| get_opt(key).unwrap_or_else(|| default.to_string());

        let base_dir = PathBuf::from(get_or("CAMINHO_PADRAO", DEFAULT_BASE_DIR));
        let dev_mode = parse_flag(&get("DEV"));
        let (host, port, service) = split_db_list(&get("AUSTA_BD_ORACLE_DEV"));

        let import_since_raw = get_or("IMPORT_SINCE", DEFAULT_IMPORT_SINCE);
        let import_since = NaiveDate::parse_from_str(import_since_raw.trim(), "%d/%m/%Y")
            .with_context(|| {
                format!("IMPORT_SINCE must be DD/MM/YYYY, got {:?}", import_since_raw)
            })?;

        let kind = match get_opt("BROWSER") {
            Some(name) => name.parse::<BrowserKind>().context("invalid BROWSER")?,
            None => BrowserKind::default(),
        };

        let db = DbSettings {
            user: get("BD_USUARIO"),
            password: get("BD_SENHA"),
            host,
            port,
            service,
            client_lib_dir: get_opt("ORACLE_INSTANT_CLIENT_DIR").map(PathBuf::from),
            base_dir: base_dir.clone(),
        };

        let execution = ExecutionContext {
            unit: get("UNIDADE"),
            project: get("PROJETO"),
            script: get("RPA_SCRIPT_NAME"),
            step: "-".to_string(),
            user: get("USERNAME"),
        };

        let browser = LaunchOptions {
            kind,
            webdriver_url: get_opt("WEBDRIVER_URL"),
            driver_path: get_opt("WEBDRIVER_PATH").map(PathBuf::from),
            search_dir: base_dir.clone(),
        };

        Ok(Self {
            base_dir,
            dev_mode,
            db,
            execution,
            import_since,
            tasy_url: get_opt("TASY_URL"),
            browser,
            dev_email: get_opt("DEV_EMAIL_DESTINO"),
            cliq_webhook_url: get_opt("CLIQ_WEBHOOK_URL"),
            log_dir: PathBuf::from(get_or("LOG_DIR", DEFAULT_LOG_DIR)),
        })
    }

    /// Directory for screenshots, run evidence and metrics.
    pub fn evidence_dir(&self) -> PathBuf {
        evidence_dir(&self.base_dir)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}

/// Split `host,port,service`; missing parts are empty.
fn split_db_list(value: &str) -> (String, String, String) {
    let mut parts = value.split(',').map(|p| p.trim().to_string());
    (
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
        parts.next().unwrap_or_default(),
    )
}
