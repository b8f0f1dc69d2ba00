//! Repository of repasse rows and execution control.

use crate::client::{OracleClient, ProcParam, SqlParam};
use crate::error::{DbError, DbResult};
use crate::models::{ExecutionContext, LogKind, ReleasedTitle, RepasseMedico, RepasseStatus};
use async_trait::async_trait;
use chrono::NaiveDate;

pub const PROC_CREATE_EXECUTION: &str = "ROBO_RPA.PR_CRIAR_CONTROLE_EXECUCAO";
pub const PROC_REGISTER_LOG: &str = "ROBO_RPA.PR_REGISTRAR_LOG";
pub const PROC_FINISH_EXECUTION: &str = "ROBO_RPA.PR_FINALIZAR_EXECUCAO";

const SELECT_RELEASED_TITLES: &str = r#"
    SELECT cnpj, razao_social, seq_terceiro, nr_repasse, nr_titulo, dt_lib_titulo,
           email, dt_ult_envio_email, dt_lib_repasse
    FROM TASY.RPA_EMAIL_REPASSE_V
    WHERE dt_lib_titulo >= :1
    ORDER BY dt_lib_titulo ASC
"#;

const SELECT_REPASSE_EXISTS: &str = "SELECT 1 FROM hos_repasse_medico WHERE nr_repasse = :1";

const INSERT_REPASSE: &str = r#"
    INSERT INTO hos_repasse_medico (
        cnpj, razao_social, seq_terceiro, nr_repasse, nr_titulo, dt_lib_titulo,
        email, dt_ult_envio_email, status, dt_lib_repasse
    ) VALUES (:1, :2, :3, :4, :5, :6, :7, SYSDATE, :8, :9)
"#;

const SELECT_PENDING: &str = r#"
    SELECT cnpj, razao_social, seq_terceiro, nr_repasse, nr_titulo, dt_lib_titulo,
           email, dt_ult_envio_email, dt_lib_repasse, status, mensagem
    FROM hos_repasse_medico
    WHERE status = :1
"#;

const UPDATE_STATUS: &str =
    "UPDATE hos_repasse_medico SET status = :1, mensagem = :2 WHERE nr_repasse = :3";

/// Persistence used by the workflow.
///
/// Implemented by [`OracleClient`]; tests provide in-memory fakes.
#[async_trait]
pub trait RepasseStore: Send + Sync {
    /// Titles released on or after `since`, oldest first.
    async fn released_titles(&self, since: NaiveDate) -> DbResult<Vec<ReleasedTitle>>;

    /// Whether `nr_repasse` is already in the work table.
    async fn repasse_exists(&self, nr_repasse: i64) -> DbResult<bool>;

    /// Insert a title into the work table with status `P`.
    async fn insert_pending(&self, title: &ReleasedTitle) -> DbResult<()>;

    /// Rows with status `P`.
    async fn pending_repasses(&self) -> DbResult<Vec<RepasseMedico>>;

    async fn update_status(
        &self,
        nr_repasse: i64,
        status: &RepasseStatus,
        message: &str,
    ) -> DbResult<()>;

    /// Register a new execution and return its id.
    async fn create_execution(&self, ctx: &ExecutionContext) -> DbResult<i64>;

    async fn register_log(
        &self,
        execution_id: i64,
        kind: LogKind,
        record_id: &str,
        message: &str,
    ) -> DbResult<()>;

    async fn finish_execution(&self, execution_id: i64, status: &str, notes: &str) -> DbResult<()>;

    async fn close(&self) -> DbResult<()>;
}

fn released_title_from_row(row: &oracle::Row) -> DbResult<ReleasedTitle> {
    Ok(ReleasedTitle {
        cnpj: row.get(0)?,
        razao_social: row.get(1)?,
        seq_terceiro: row.get(2)?,
        nr_repasse: row.get(3)?,
        nr_titulo: row.get(4)?,
        dt_lib_titulo: row.get(5)?,
        email: row.get(6)?,
        dt_ult_envio_email: row.get(7)?,
        dt_lib_repasse: row.get(8)?,
    })
}

fn repasse_from_row(row: &oracle::Row) -> DbResult<RepasseMedico> {
    let status: Option<String> = row.get(9)?;
    Ok(RepasseMedico {
        cnpj: row.get(0)?,
        razao_social: row.get(1)?,
        seq_terceiro: row.get(2)?,
        nr_repasse: row.get(3)?,
        nr_titulo: row.get(4)?,
        dt_lib_titulo: row.get(5)?,
        email: row.get(6)?,
        dt_ult_envio_email: row.get(7)?,
        dt_lib_repasse: row.get(8)?,
        status: RepasseStatus::from_code(status.as_deref().unwrap_or_default()),
        mensagem: row.get(10)?,
    })
}

#[async_trait]
impl RepasseStore for OracleClient {
    async fn released_titles(&self, since: NaiveDate) -> DbResult<Vec<ReleasedTitle>> {
        let since = since.and_hms_opt(0, 0, 0).unwrap_or_default();
        self.query_as(SELECT_RELEASED_TITLES, vec![since.into()], released_title_from_row)
            .await
    }

    async fn repasse_exists(&self, nr_repasse: i64) -> DbResult<bool> {
        let found = self
            .query_scalar(SELECT_REPASSE_EXISTS, vec![nr_repasse.into()])
            .await?;
        Ok(found.is_some())
    }

    async fn insert_pending(&self, title: &ReleasedTitle) -> DbResult<()> {
        let params: Vec<SqlParam> = vec![
            title.cnpj.clone().into(),
            title.razao_social.clone().into(),
            title.seq_terceiro.into(),
            title.nr_repasse.into(),
            title.nr_titulo.into(),
            title.dt_lib_titulo.into(),
            title.email.clone().into(),
            RepasseStatus::Pending.code().into(),
            title.dt_lib_repasse.into(),
        ];
        self.execute(INSERT_REPASSE, params).await?;
        Ok(())
    }

    async fn pending_repasses(&self) -> DbResult<Vec<RepasseMedico>> {
        self.query_as(
            SELECT_PENDING,
            vec![RepasseStatus::Pending.code().into()],
            repasse_from_row,
        )
        .await
    }

    async fn update_status(
        &self,
        nr_repasse: i64,
        status: &RepasseStatus,
        message: &str,
    ) -> DbResult<()> {
        self.execute(
            UPDATE_STATUS,
            vec![status.code().into(), message.into(), nr_repasse.into()],
        )
        .await?;
        Ok(())
    }

    async fn create_execution(&self, ctx: &ExecutionContext) -> DbResult<i64> {
        let outputs = self
            .call_procedure(
                PROC_CREATE_EXECUTION,
                vec![
                    ProcParam::input(ctx.unit.as_str()),
                    ProcParam::input(ctx.project.as_str()),
                    ProcParam::input(ctx.script.as_str()),
                    ProcParam::input(ctx.step.as_str()),
                    ProcParam::input(ctx.user.as_str()),
                    ProcParam::OutNumber,
                ],
            )
            .await?;
        outputs
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| DbError::MissingOutput(PROC_CREATE_EXECUTION.to_string()))
    }

    async fn register_log(
        &self,
        execution_id: i64,
        kind: LogKind,
        record_id: &str,
        message: &str,
    ) -> DbResult<()> {
        self.call_procedure(
            PROC_REGISTER_LOG,
            vec![
                ProcParam::input(execution_id),
                ProcParam::input(kind.as_str()),
                ProcParam::input(record_id),
                ProcParam::input(message),
            ],
        )
        .await?;
        Ok(())
    }

    async fn finish_execution(&self, execution_id: i64, status: &str, notes: &str) -> DbResult<()> {
        self.call_procedure(
            PROC_FINISH_EXECUTION,
            vec![
                ProcParam::input(execution_id),
                ProcParam::input(status),
                ProcParam::input(notes),
            ],
        )
        .await?;
        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        OracleClient::close(self).await
    }
}
