//! Oracle connection wrapper.
//!
//! The Oracle driver is blocking, so every call runs on the blocking thread
//! pool behind a mutex-guarded connection.

use crate::error::{DbError, DbResult};
use chrono::NaiveDateTime;
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, InitParams};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Default Oracle listener port.
pub const DEFAULT_PORT: u16 = 1521;

/// Instant Client directories looked up under the base directory when no
/// explicit library directory is configured.
pub const INSTANT_CLIENT_DIRS: [&str; 3] =
    ["instantclient", "instantclient_23_9", "instantclient_19_8"];

/// Connection settings.
#[derive(Debug, Clone, Default)]
pub struct DbSettings {
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
    pub service: String,
    /// Explicit Oracle client library directory.
    pub client_lib_dir: Option<PathBuf>,
    /// Directory searched for a bundled Instant Client.
    pub base_dir: PathBuf,
}

impl DbSettings {
    /// Easy Connect string: `host:port/service`.
    pub fn connect_string(&self) -> DbResult<String> {
        if self.host.trim().is_empty() || self.service.trim().is_empty() {
            return Err(DbError::Settings(
                "host and service name are required".to_string(),
            ));
        }
        let port = if self.port.trim().is_empty() {
            DEFAULT_PORT
        } else {
            self.port
                .trim()
                .parse::<u16>()
                .map_err(|_| DbError::Settings(format!("invalid port: {}", self.port)))?
        };
        Ok(format!("{}:{}/{}", self.host.trim(), port, self.service.trim()))
    }

    /// Oracle client library directory to initialise, if any.
    pub fn resolve_client_lib_dir(&self) -> Option<PathBuf> {
        if let Some(dir) = &self.client_lib_dir {
            return Some(dir.clone());
        }
        INSTANT_CLIENT_DIRS
            .iter()
            .map(|name| self.base_dir.join(name))
            .find(|path| path.is_dir())
    }
}

/// Positional bind value.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(Option<String>),
    Int(Option<i64>),
    Date(Option<NaiveDateTime>),
}

impl SqlParam {
    fn as_sql(&self) -> &dyn ToSql {
        match self {
            SqlParam::Text(v) => v,
            SqlParam::Int(v) => v,
            SqlParam::Date(v) => v,
        }
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(Some(value.to_string()))
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(Some(value))
    }
}

impl From<Option<String>> for SqlParam {
    fn from(value: Option<String>) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(Some(value))
    }
}

impl From<Option<i64>> for SqlParam {
    fn from(value: Option<i64>) -> Self {
        SqlParam::Int(value)
    }
}

impl From<NaiveDateTime> for SqlParam {
    fn from(value: NaiveDateTime) -> Self {
        SqlParam::Date(Some(value))
    }
}

impl From<Option<NaiveDateTime>> for SqlParam {
    fn from(value: Option<NaiveDateTime>) -> Self {
        SqlParam::Date(value)
    }
}

/// Stored procedure argument.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcParam {
    In(SqlParam),
    /// Numeric OUT argument; its value is returned by [`OracleClient::call_procedure`].
    OutNumber,
}

impl ProcParam {
    pub fn input(value: impl Into<SqlParam>) -> Self {
        ProcParam::In(value.into())
    }
}

/// A result row as column name (lower case) and text value pairs, in select order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    columns: Vec<(String, Option<String>)>,
}

impl Record {
    pub fn push(&mut self, column: impl Into<String>, value: Option<String>) {
        self.columns.push((column.into().to_lowercase(), value));
    }

    /// Value of a column; `None` when the column is absent or NULL.
    pub fn get(&self, column: &str) -> Option<&str> {
        let column = column.to_lowercase();
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

/// PL/SQL block calling a procedure with `arity` positional binds.
pub fn procedure_call_sql(name: &str, arity: usize) -> String {
    let binds = (1..=arity)
        .map(|i| format!(":{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    format!("BEGIN {}({}); END;", name, binds)
}

/// Oracle client wrapper.
#[derive(Clone)]
pub struct OracleClient {
    conn: Arc<Mutex<Connection>>,
    target: String,
}

impl OracleClient {
    /// Connect to Oracle.
    ///
    /// Initialises the Oracle client library first when a library directory
    /// is configured or a bundled Instant Client is found.
    pub async fn connect(settings: &DbSettings) -> DbResult<Self> {
        let settings = settings.clone();
        let target = settings.connect_string()?;
        let connect_target = target.clone();

        let conn = tokio::task::spawn_blocking(move || -> DbResult<Connection> {
            init_client_library(&settings)?;
            Ok(Connection::connect(
                &settings.user,
                &settings.password,
                &connect_target,
            )?)
        })
        .await??;

        info!("Connected to Oracle at {}", target);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            target,
        })
    }

    /// The `host:port/service` this client is connected to.
    pub fn target(&self) -> &str {
        &self.target
    }

    async fn with_conn<T, F>(&self, f: F) -> DbResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| DbError::Poisoned)?;
            f(&guard)
        })
        .await?
    }

    /// Run a query and return every row.
    pub async fn query(&self, sql: &str, params: Vec<SqlParam>) -> DbResult<Vec<Record>> {
        debug!("Executing query: {} | params={:?}", sql, params);
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let binds: Vec<&dyn ToSql> = params.iter().map(SqlParam::as_sql).collect();
            let rows = conn.query(&sql, &binds)?;
            let names: Vec<String> = rows
                .column_info()
                .iter()
                .map(|c| c.name().to_lowercase())
                .collect();

            let mut records = Vec::new();
            for row in rows {
                let row = row?;
                let mut record = Record::default();
                for (idx, name) in names.iter().enumerate() {
                    record.push(name.clone(), row.get::<usize, Option<String>>(idx)?);
                }
                records.push(record);
            }
            Ok(records)
        })
        .await
    }

    /// First column of the first row, or `None` when the query returns nothing.
    pub async fn query_scalar(&self, sql: &str, params: Vec<SqlParam>) -> DbResult<Option<String>> {
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let binds: Vec<&dyn ToSql> = params.iter().map(SqlParam::as_sql).collect();
            let mut rows = conn.query(&sql, &binds)?;
            match rows.next() {
                Some(row) => Ok(row?.get::<usize, Option<String>>(0)?),
                None => Ok(None),
            }
        })
        .await
    }

    /// Run a typed query; `map` converts each row.
    pub async fn query_as<T, F>(&self, sql: &str, params: Vec<SqlParam>, map: F) -> DbResult<Vec<T>>
    where
        T: Send + 'static,
        F: Fn(&oracle::Row) -> DbResult<T> + Send + 'static,
    {
        debug!("Executing query: {} | params={:?}", sql, params);
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let binds: Vec<&dyn ToSql> = params.iter().map(SqlParam::as_sql).collect();
            let mut out = Vec::new();
            for row in conn.query(&sql, &binds)? {
                out.push(map(&row?)?);
            }
            Ok(out)
        })
        .await
    }

    /// Execute a DML statement and commit. Returns the affected row count.
    pub async fn execute(&self, sql: &str, params: Vec<SqlParam>) -> DbResult<u64> {
        debug!("Executing statement: {} | params={:?}", sql, params);
        let sql = sql.to_string();
        self.with_conn(move |conn| {
            let binds: Vec<&dyn ToSql> = params.iter().map(SqlParam::as_sql).collect();
            let stmt = conn.execute(&sql, &binds)?;
            let affected = stmt.row_count()?;
            conn.commit()?;
            Ok(affected)
        })
        .await
    }

    /// Call a stored procedure and commit.
    ///
    /// # Returns
    /// The values of the `OutNumber` arguments, in argument order.
    pub async fn call_procedure(
        &self,
        name: &str,
        params: Vec<ProcParam>,
    ) -> DbResult<Vec<Option<i64>>> {
        debug!("Calling procedure {} with {:?}", name, params);
        let plsql = procedure_call_sql(name, params.len());
        self.with_conn(move |conn| {
            let out_type = OracleType::Number(0, 0);
            let binds: Vec<&dyn ToSql> = params
                .iter()
                .map(|p| match p {
                    ProcParam::In(value) => value.as_sql(),
                    ProcParam::OutNumber => &out_type as &dyn ToSql,
                })
                .collect();

            let mut stmt = conn.statement(&plsql).build()?;
            stmt.execute(&binds)?;

            let mut outputs = Vec::new();
            for (idx, param) in params.iter().enumerate() {
                if matches!(param, ProcParam::OutNumber) {
                    outputs.push(stmt.bind_value::<usize, Option<i64>>(idx + 1)?);
                }
            }
            conn.commit()?;
            Ok(outputs)
        })
        .await
    }

    /// Close the connection.
    pub async fn close(&self) -> DbResult<()> {
        self.with_conn(|conn| Ok(conn.close()?)).await?;
        info!("Closed Oracle connection to {}", self.target);
        Ok(())
    }
}

fn init_client_library(settings: &DbSettings) -> DbResult<()> {
    let Some(lib_dir) = settings.resolve_client_lib_dir() else {
        return Ok(());
    };
    init_client_library_at(&lib_dir)
}

fn init_client_library_at(lib_dir: &Path) -> DbResult<()> {
    let mut params = InitParams::new();
    params.oracle_client_lib_dir(lib_dir)?;
    match params.init() {
        Ok(true) => {
            info!("Initialized Oracle client library from {:?}", lib_dir);
            Ok(())
        }
        Ok(false) => {
            debug!("Oracle client library already initialized");
            Ok(())
        }
        Err(e) => {
            warn!("Oracle client initialization failed for {:?}: {}", lib_dir, e);
            Err(e.into())
        }
    }
}
