//! Database models and types.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Released reimbursement title, as read from `TASY.RPA_EMAIL_REPASSE_V`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasedTitle {
    pub cnpj: Option<String>,
    pub razao_social: Option<String>,
    pub seq_terceiro: Option<i64>,
    pub nr_repasse: i64,
    pub nr_titulo: Option<i64>,
    pub dt_lib_titulo: Option<NaiveDateTime>,
    pub email: Option<String>,
    pub dt_ult_envio_email: Option<NaiveDateTime>,
    pub dt_lib_repasse: Option<NaiveDateTime>,
}

/// Row of the robot's work table `HOS_REPASSE_MEDICO`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepasseMedico {
    pub cnpj: Option<String>,
    pub razao_social: Option<String>,
    pub seq_terceiro: Option<i64>,
    pub nr_repasse: i64,
    pub nr_titulo: Option<i64>,
    pub dt_lib_titulo: Option<NaiveDateTime>,
    pub email: Option<String>,
    pub dt_ult_envio_email: Option<NaiveDateTime>,
    pub dt_lib_repasse: Option<NaiveDateTime>,
    pub status: RepasseStatus,
    pub mensagem: Option<String>,
}

impl RepasseMedico {
    /// Whether every field needed to send the e-mail is filled in.
    pub fn is_complete(&self) -> bool {
        self.dt_lib_titulo.is_some()
            && self.nr_titulo.is_some()
            && self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
            && self.dt_lib_repasse.is_some()
    }

    /// Status message stored for rows that cannot be sent.
    pub fn incomplete_message(&self) -> String {
        format!(
            "Dados não preenchidos. Email: {} - Dt Liberação: {} - Nr Titulo: {} - Dt lib Repasse: {}",
            display_or_none(self.email.as_ref()),
            display_or_none(self.dt_lib_titulo.as_ref()),
            display_or_none(self.nr_titulo.as_ref()),
            display_or_none(self.dt_lib_repasse.as_ref()),
        )
    }
}

fn display_or_none<T: fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

/// Processing status of a repasse in `HOS_REPASSE_MEDICO.STATUS`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepasseStatus {
    /// Imported, waiting to be sent.
    Pending,
    /// Missing data, or the third party was not found in Tasy.
    Incomplete,
    /// E-mail sent.
    Sent,
    /// Tasy aborted the send.
    SendFailed,
    Other(String),
}

impl RepasseStatus {
    pub fn code(&self) -> &str {
        match self {
            RepasseStatus::Pending => "P",
            RepasseStatus::Incomplete => "I",
            RepasseStatus::Sent => "E",
            // Existing rows and reports already use this literal.
            RepasseStatus::SendFailed => "False",
            RepasseStatus::Other(code) => code,
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "P" => RepasseStatus::Pending,
            "I" => RepasseStatus::Incomplete,
            "E" => RepasseStatus::Sent,
            "False" => RepasseStatus::SendFailed,
            other => RepasseStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RepasseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of a line written through `ROBO_RPA.PR_REGISTRAR_LOG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogKind {
    Info,
    Warn,
    Error,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Info => "INFO",
            LogKind::Warn => "WARN",
            LogKind::Error => "ERROR",
        }
    }
}

/// Identification of a robot execution, sent to
/// `ROBO_RPA.PR_CRIAR_CONTROLE_EXECUCAO`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub unit: String,
    pub project: String,
    pub script: String,
    pub step: String,
    pub user: String,
}
