//! Repasse orchestration: import released titles, then send each pending
//! repasse through the "Repasse para Terceiros" screen.

use crate::config::Config;
use crate::tasy;
use anyhow::{anyhow, bail, Context};
use chrono::{Local, NaiveDateTime};
use repasse_browser::{Browser, BrowserError, BrowserLauncher, BrowserResult};
use repasse_db::models::{LogKind, RepasseMedico, RepasseStatus};
use repasse_db::{DbError, RepasseStore};
use repasse_telemetry::evidence::{evidence_stamp, screenshot_file_name, RunEvidence};
use repasse_telemetry::Metrics;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);
const PANEL_TIMEOUT: Duration = Duration::from_secs(20);
const CELL_TIMEOUT: Duration = Duration::from_secs(2);
const ABORTED_DIALOG_TIMEOUT: Duration = Duration::from_secs(5);
const DESCRIPTION_ATTEMPTS: usize = 10;
const DESCRIPTION_INTERVAL: Duration = Duration::from_millis(500);
const SETTLE_SHORT: Duration = Duration::from_millis(500);
const SETTLE_LONG: Duration = Duration::from_secs(1);

/// Moves focus out of the filter input so Tasy resolves the description.
const BLUR_SCRIPT: &str = "document.activeElement.blur();";

/// Status passed to `PR_FINALIZAR_EXECUCAO`.
pub const FINISH_STATUS: &str = "Concluido";

/// Name of the metrics file written at the end of a run.
pub const METRICS_FILE: &str = "metrics.prom";

/// Which steps a run performs after `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Import released titles, then send the pending repasses.
    #[default]
    Full,
    /// Only import released titles.
    ImportOnly,
}

/// What happened to one pending repasse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepasseOutcome {
    /// E-mail sent from Tasy.
    Sent,
    /// Required data missing in the work table.
    Incomplete,
    /// Tasy does not know the third party.
    NotFound,
    /// Tasy showed "Operação abortada" after the send.
    SendAborted,
}

impl RepasseOutcome {
    /// Status stored in the work table.
    pub fn status(&self) -> RepasseStatus {
        match self {
            RepasseOutcome::Sent => RepasseStatus::Sent,
            RepasseOutcome::Incomplete | RepasseOutcome::NotFound => RepasseStatus::Incomplete,
            RepasseOutcome::SendAborted => RepasseStatus::SendFailed,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RepasseOutcome::Sent => "sent",
            RepasseOutcome::Incomplete => "incomplete",
            RepasseOutcome::NotFound => "not_found",
            RepasseOutcome::SendAborted => "send_failed",
        }
    }
}

/// Counters of a run, used for the final notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub imported: usize,
    pub pending: usize,
    pub sent: usize,
    /// Incomplete data or third party not found.
    pub incomplete: usize,
    /// Sends aborted by Tasy.
    pub failed: usize,
    /// Rows that hit an unexpected error and stay pending.
    pub errored: usize,
}

impl RunSummary {
    fn record(&mut self, outcome: RepasseOutcome) {
        match outcome {
            RepasseOutcome::Sent => self.sent += 1,
            RepasseOutcome::Incomplete | RepasseOutcome::NotFound => self.incomplete += 1,
            RepasseOutcome::SendAborted => self.failed += 1,
        }
    }

    /// Key/value pairs for a notification.
    pub fn details(&self) -> Vec<(String, String)> {
        [
            ("Importados", self.imported),
            ("Pendentes", self.pending),
            ("Enviados", self.sent),
            ("Incompletos", self.incomplete),
            ("Falhas de envio", self.failed),
            ("Erros", self.errored),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
    }
}

#[derive(Debug, Serialize)]
struct RepasseEvidence {
    nr_repasse: i64,
    seq_terceiro: Option<i64>,
    outcome: &'static str,
    status: Option<String>,
    error: Option<String>,
    elapsed_ms: u128,
    at: NaiveDateTime,
}

/// Drives one automation run.
pub struct RepasseProcessor {
    config: Config,
    store: Option<Arc<dyn RepasseStore>>,
    launcher: Box<dyn BrowserLauncher>,
    browser: Option<Box<dyn Browser>>,
    metrics: Metrics,
    execution_id: Option<i64>,
    evidence: Option<RunEvidence>,
    summary: RunSummary,
}

impl RepasseProcessor {
    /// Create a processor.
    ///
    /// # Arguments
    /// * `config` - Runtime configuration
    /// * `store` - Work table and execution control; `None` when the database is unavailable
    /// * `launcher` - Opens the browser on first use
    /// * `metrics` - Metrics collector for this run
    pub fn new(
        config: Config,
        store: Option<Arc<dyn RepasseStore>>,
        launcher: Box<dyn BrowserLauncher>,
        metrics: Metrics,
    ) -> Self {
        Self {
            config,
            store,
            launcher,
            browser: None,
            metrics,
            execution_id: None,
            evidence: None,
            summary: RunSummary::default(),
        }
    }

    pub fn execution_id(&self) -> Option<i64> {
        self.execution_id
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Create the working directories and register the execution.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        info!("Inicializando automação");
        let now = Local::now().naive_local();
        debug!("Data atual: {} -> {}", now, evidence_stamp(now));
        let evidence = RunEvidence::create(&self.config.base_dir, now).with_context(|| {
            format!("Failed to create {:?}", self.config.evidence_dir())
        })?;
        info!("Evidências em {:?}", evidence.records_path());
        self.evidence = Some(evidence);

        let Some(store) = self.store.clone() else {
            warn!("Banco indisponível; controle de execução não registrado");
            return Ok(());
        };

        match store.create_execution(&self.config.execution).await {
            Ok(id) => {
                info!("Controle de execução criado com sucesso: {}", id);
                self.execution_id = Some(id);
            }
            Err(e) => {
                self.metrics.inc_db_errors();
                error!("Erro ao criar o controle de execução: {}", e);
            }
        }
        Ok(())
    }

    /// Write a line to the execution log.
    ///
    /// In dev mode the line is echoed at its own level. Persisting failures
    /// are logged and swallowed.
    pub async fn register_log(&self, kind: LogKind, message: &str, record_id: Option<&str>) {
        if self.config.dev_mode {
            match kind {
                LogKind::Info => info!("{}", message),
                LogKind::Warn => warn!("{}", message),
                LogKind::Error => error!("{}", message),
            }
        } else {
            debug!("[{}] {}", kind.as_str(), message);
        }

        if let Some(store) = &self.store {
            let execution_id = self.execution_id.unwrap_or(0);
            if let Err(e) = store
                .register_log(execution_id, kind, record_id.unwrap_or(""), message)
                .await
            {
                self.metrics.inc_db_errors();
                error!("Falha ao registrar log no banco: {}", e);
            }
        }
    }

    /// Open the browser if needed and go to the Tasy start page.
    pub async fn login_tasy(&mut self) -> bool {
        info!("Iniciando navegador Tasy");
        match self.open_tasy().await {
            Ok(()) => {
                self.register_log(LogKind::Info, "Login Tasy: True", None).await;
                true
            }
            Err(e) => {
                self.metrics.inc_browser_errors();
                error!("Falha no login Tasy: {}", e);
                self.register_log(LogKind::Error, "Login Tasy: False", None).await;
                false
            }
        }
    }

    async fn open_tasy(&mut self) -> BrowserResult<()> {
        if self.browser.is_none() {
            self.browser = Some(self.launcher.launch().await?);
        }
        let url = self.config.tasy_url.as_deref();
        if let (Some(browser), Some(url)) = (self.browser.as_deref(), url) {
            browser.navigate(url).await?;
        }
        Ok(())
    }

    /// Open a screen through the menu search.
    pub async fn navigate_menu(&self, screen: &str) -> anyhow::Result<()> {
        let browser = self.browser()?;
        info!("Navegando para a tela: {}", screen);

        let search = tasy::menu_search();
        if !browser.wait_visible(&search, ELEMENT_TIMEOUT).await? {
            bail!("Campo de pesquisa do menu não encontrado");
        }
        browser.set_value(&search, screen, ELEMENT_TIMEOUT).await?;

        let entry = tasy::menu_entry(screen);
        if !browser.wait_visible(&entry, ELEMENT_TIMEOUT).await? {
            bail!("Falha ao acessar o menu [{}]", screen);
        }
        browser.click(&entry, ELEMENT_TIMEOUT).await?;
        Ok(())
    }

    /// Copy newly released titles into the work table as pending.
    ///
    /// Returns the number of rows inserted. A failed insert is logged and
    /// skipped.
    pub async fn import_accounts(&mut self) -> anyhow::Result<usize> {
        let store = self.store()?;
        let titles = store
            .released_titles(self.config.import_since)
            .await
            .context("Failed to read released titles")?;
        info!(
            "{} títulos liberados desde {}",
            titles.len(),
            self.config.import_since.format("%d/%m/%Y")
        );

        let mut imported = 0;
        for title in &titles {
            let exists = store
                .repasse_exists(title.nr_repasse)
                .await
                .with_context(|| format!("Failed to check repasse {}", title.nr_repasse))?;
            if exists {
                debug!("Repasse {} já importado", title.nr_repasse);
                continue;
            }

            match store.insert_pending(title).await {
                Ok(()) => {
                    imported += 1;
                    self.metrics.inc_imported();
                    let message = format!(
                        "Inserido na tabela HOS_REPASSE_MEDICO: Terceiro: {} - Repasse: {} - Título: {} - CNPJ: {} - Status: P",
                        or_none(&title.seq_terceiro),
                        title.nr_repasse,
                        or_none(&title.nr_titulo),
                        or_none(&title.cnpj),
                    );
                    self.register_log(LogKind::Info, &message, Some(&title.nr_repasse.to_string()))
                        .await;
                }
                Err(e) => {
                    self.metrics.inc_db_errors();
                    error!("Falha ao inserir repasse {}: {}", title.nr_repasse, e);
                }
            }
        }

        let message = format!("Dados Importados com Sucesso: [{}/{}]", imported, titles.len());
        self.register_log(LogKind::Info, &message, None).await;
        self.summary.imported = imported;
        Ok(imported)
    }

    /// Initialize, import and, in [`RunMode::Full`], send the pending
    /// repasses. Stops at the first failing step; `finalize` is left to the
    /// caller.
    pub async fn execute(&mut self, mode: RunMode) -> anyhow::Result<()> {
        self.initialize().await?;
        self.import_accounts().await?;
        if mode == RunMode::Full {
            self.run().await?;
        }
        Ok(())
    }

    /// Send every pending repasse.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let store = self.store()?;
        let message = format!("Inicio robô - Id Exec: {}", or_none(&self.execution_id));
        self.register_log(LogKind::Info, &message, None).await;

        let pending = store
            .pending_repasses()
            .await
            .context("Failed to read pending repasses")?;
        self.summary.pending = pending.len();
        if pending.is_empty() {
            self.register_log(LogKind::Info, "Sem repasses para realizar o envio", None)
                .await;
            return Ok(());
        }

        if !self.login_tasy().await {
            bail!("Não foi possível efetuar login no Tasy");
        }
        self.navigate_menu(tasy::SCREEN_REPASSE_TERCEIROS).await?;

        let total = pending.len();
        for (idx, row) in pending.iter().enumerate() {
            info!("[{}/{}] Processando repasse {}", idx + 1, total, row.nr_repasse);
            let started = Instant::now();
            let result = self.process_repasse(row).await;
            let elapsed = started.elapsed();
            self.metrics.observe_repasse_duration(elapsed.as_secs_f64());

            let (outcome, status, error) = match result {
                Ok(outcome) => {
                    self.summary.record(outcome);
                    (outcome.label(), Some(outcome.status().code().to_string()), None)
                }
                Err(e) => {
                    self.summary.errored += 1;
                    self.handle_row_error(row, &e).await;
                    ("error", None, Some(format!("{:#}", e)))
                }
            };
            self.metrics.inc_outcome(outcome);

            let record = RepasseEvidence {
                nr_repasse: row.nr_repasse,
                seq_terceiro: row.seq_terceiro,
                outcome,
                status,
                error,
                elapsed_ms: elapsed.as_millis(),
                at: Local::now().naive_local(),
            };
            if let Some(evidence) = &self.evidence {
                if let Err(e) = evidence.record(&record) {
                    warn!("Failed to write evidence for repasse {}: {}", row.nr_repasse, e);
                }
            }
        }

        info!(
            "Envio concluído: {} enviados, {} incompletos, {} falhas, {} erros",
            self.summary.sent, self.summary.incomplete, self.summary.failed, self.summary.errored
        );
        Ok(())
    }

    /// Process one pending row and store its new status.
    ///
    /// Expects the "Repasse para Terceiros" screen to be open. An error
    /// leaves the row pending.
    pub async fn process_repasse(&self, row: &RepasseMedico) -> anyhow::Result<RepasseOutcome> {
        let store = self.store()?;
        let record_id = row.nr_repasse.to_string();

        if !row.is_complete() {
            let message = row.incomplete_message();
            self.register_log(LogKind::Info, &message, Some(&record_id)).await;
            store
                .update_status(row.nr_repasse, &RepasseStatus::Incomplete, &message)
                .await?;
            return Ok(RepasseOutcome::Incomplete);
        }

        let Some(seq_terceiro) = row.seq_terceiro else {
            return self.mark_not_found(store.as_ref(), row).await;
        };
        let destination = self.destination_email(row)?;
        let nav = self.browser()?;

        let token = tasy::filter_token();
        nav.wait_visible(&token, ELEMENT_TIMEOUT).await?;
        nav.click(&token, ELEMENT_TIMEOUT).await?;

        nav.wait_visible(&tasy::filter_modal(), ELEMENT_TIMEOUT).await?;
        nav.set_value(&tasy::third_party_input(), &seq_terceiro.to_string(), ELEMENT_TIMEOUT)
            .await?;
        nav.pause(SETTLE_SHORT).await;
        nav.execute_js(BLUR_SCRIPT).await?;

        if self.third_party_description(nav).await.is_none() {
            return self.mark_not_found(store.as_ref(), row).await;
        }

        nav.click(&tasy::filter_button(), ELEMENT_TIMEOUT).await?;
        nav.pause(SETTLE_LONG).await;

        let grid_row = tasy::grid_row(seq_terceiro);
        if !nav.wait_visible(&grid_row, ELEMENT_TIMEOUT).await? {
            return self.mark_not_found(store.as_ref(), row).await;
        }
        nav.click(&grid_row, ELEMENT_TIMEOUT).await?;
        nav.wait_visible(&tasy::repasse_panel(), PANEL_TIMEOUT).await?;

        let cell = tasy::repasse_cell(row.nr_repasse);
        nav.wait_visible(&cell, CELL_TIMEOUT).await?;
        nav.click(&cell, ELEMENT_TIMEOUT).await?;
        nav.click(&tasy::send_email_button(), ELEMENT_TIMEOUT).await?;

        nav.wait_visible(&tasy::email_dialog(), ELEMENT_TIMEOUT).await?;
        nav.set_value(&tasy::email_destination(), &destination, ELEMENT_TIMEOUT)
            .await?;
        nav.click(&tasy::email_send_button(), ELEMENT_TIMEOUT).await?;

        if nav.wait_visible(&tasy::aborted_dialog(), ABORTED_DIALOG_TIMEOUT).await? {
            let detail = nav
                .text(&tasy::aborted_dialog_text(), ELEMENT_TIMEOUT)
                .await
                .unwrap_or_default();
            nav.click(&tasy::dialog_ok_button(), ELEMENT_TIMEOUT).await?;
            warn!("Tasy abortou o envio do repasse {}: {}", row.nr_repasse, detail.trim());

            let message = "Falha no envio do email";
            self.register_log(LogKind::Info, message, Some(&record_id)).await;
            store
                .update_status(row.nr_repasse, &RepasseStatus::SendFailed, message)
                .await?;
            return Ok(RepasseOutcome::SendAborted);
        }

        let message = "Enviado";
        store
            .update_status(row.nr_repasse, &RepasseStatus::Sent, message)
            .await?;
        self.register_log(LogKind::Info, message, Some(&record_id)).await;
        Ok(RepasseOutcome::Sent)
    }

    /// Register "Fim Robô", finish the execution and release the resources.
    ///
    /// `error` goes to the execution notes when the run failed.
    pub async fn finalize(&mut self, error: Option<&str>) {
        self.register_log(LogKind::Info, "Fim Robô", None).await;

        if let Some(store) = self.store.take() {
            let execution_id = self.execution_id.unwrap_or(0);
            if let Err(e) = store
                .finish_execution(execution_id, FINISH_STATUS, error.unwrap_or("-"))
                .await
            {
                debug!("PR_FINALIZAR_EXECUCAO indisponível: {}", e);
            }
            if let Err(e) = store.close().await {
                error!("Erro ao fechar conexão com o banco: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                error!("Erro ao fechar navegador: {}", e);
            }
        }

        let metrics_path = self.config.evidence_dir().join(METRICS_FILE);
        if let Err(e) = self.metrics.write_to(&metrics_path) {
            warn!("Failed to write metrics to {:?}: {}", metrics_path, e);
        }
        info!("Automação finalizada.");
    }

    async fn mark_not_found(
        &self,
        store: &dyn RepasseStore,
        row: &RepasseMedico,
    ) -> anyhow::Result<RepasseOutcome> {
        let message = format!("Não encontrou a sequência: {}", or_none(&row.seq_terceiro));
        self.register_log(LogKind::Info, &message, Some(&row.nr_repasse.to_string()))
            .await;
        store
            .update_status(row.nr_repasse, &RepasseStatus::Incomplete, &message)
            .await?;
        Ok(RepasseOutcome::NotFound)
    }

    /// Poll the third party description until Tasy fills it in.
    async fn third_party_description(&self, nav: &dyn Browser) -> Option<String> {
        let selector = tasy::third_party_description();
        for attempt in 1..=DESCRIPTION_ATTEMPTS {
            nav.pause(DESCRIPTION_INTERVAL).await;
            let found = match nav.input_value(&selector, DESCRIPTION_INTERVAL).await {
                Ok(value) => value.filter(|v| !v.trim().is_empty()),
                Err(_) => None,
            };
            info!(
                "[{}/{}] - Nome [{}]",
                attempt,
                DESCRIPTION_ATTEMPTS,
                found.as_deref().unwrap_or("None")
            );
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn destination_email(&self, row: &RepasseMedico) -> anyhow::Result<String> {
        if self.config.dev_mode {
            return self
                .config
                .dev_email
                .clone()
                .ok_or_else(|| anyhow!("DEV_EMAIL_DESTINO não configurado para o modo DEV"));
        }
        row.email
            .as_deref()
            .map(|email| email.trim().to_string())
            .ok_or_else(|| anyhow!("Repasse {} sem email", row.nr_repasse))
    }

    async fn handle_row_error(&self, row: &RepasseMedico, e: &anyhow::Error) {
        if e.downcast_ref::<BrowserError>().is_some() {
            self.metrics.inc_browser_errors();
        } else if e.downcast_ref::<DbError>().is_some() {
            self.metrics.inc_db_errors();
        }
        error!("Erro ao processar repasse {}: {:#}", row.nr_repasse, e);

        let message = format!("Erro ao processar repasse {}", row.nr_repasse);
        self.register_log(LogKind::Error, &message, Some(&row.nr_repasse.to_string()))
            .await;
        self.capture_screenshot(row.nr_repasse).await;
    }

    async fn capture_screenshot(&self, nr_repasse: i64) {
        let Some(browser) = self.browser.as_deref() else {
            return;
        };
        let now = Local::now().naive_local();
        let path = match &self.evidence {
            Some(evidence) => evidence.screenshot_path(nr_repasse, now),
            None => self
                .config
                .evidence_dir()
                .join(screenshot_file_name(nr_repasse, now)),
        };
        match browser.screenshot(&path).await {
            Ok(()) => info!("Screenshot salvo em {:?}", path),
            Err(e) => warn!("Failed to capture screenshot for repasse {}: {}", nr_repasse, e),
        }
    }

    fn browser(&self) -> anyhow::Result<&dyn Browser> {
        self.browser
            .as_deref()
            .ok_or_else(|| anyhow!("Navegador não iniciado"))
    }

    fn store(&self) -> anyhow::Result<Arc<dyn RepasseStore>> {
        self.store
            .clone()
            .ok_or_else(|| anyhow!("Banco não conectado"))
    }
}

/// Render an optional value the way the execution log expects, `None` when absent.
fn or_none<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "None".to_string())
}
