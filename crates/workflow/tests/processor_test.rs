//! Integration tests for the repasse workflow against in-memory fakes.

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use repasse_browser::{Browser, BrowserError, BrowserLauncher, BrowserResult, Selector};
    use repasse_db::models::{
        ExecutionContext, LogKind, ReleasedTitle, RepasseMedico, RepasseStatus,
    };
    use repasse_db::{DbError, RepasseStore};
    use repasse_telemetry::Metrics;
    use repasse_workflow::processor::METRICS_FILE;
    use repasse_workflow::{tasy, Config, RepasseOutcome, RepasseProcessor, RunMode};
    use serde_json::Value;
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex, MutexGuard};
    use std::time::Duration;

    type DbResult<T> = Result<T, DbError>;

    #[derive(Default)]
    struct StoreState {
        released: Vec<ReleasedTitle>,
        existing: HashSet<i64>,
        fail_insert: HashSet<i64>,
        inserted: Vec<i64>,
        pending: Vec<RepasseMedico>,
        updates: Vec<(i64, RepasseStatus, String)>,
        logs: Vec<(i64, LogKind, String, String)>,
        execution_id: Option<i64>,
        finished: Vec<(i64, String, String)>,
        closed: bool,
    }

    #[derive(Clone, Default)]
    struct FakeStore(Arc<Mutex<StoreState>>);

    impl FakeStore {
        fn messages(&self) -> Vec<String> {
            self.0.lock().unwrap().logs.iter().map(|l| l.3.clone()).collect()
        }

        fn updates(&self) -> Vec<(i64, RepasseStatus, String)> {
            self.0.lock().unwrap().updates.clone()
        }
    }

    #[async_trait]
    impl RepasseStore for FakeStore {
        async fn released_titles(&self, _since: NaiveDate) -> DbResult<Vec<ReleasedTitle>> {
            Ok(self.0.lock().unwrap().released.clone())
        }

        async fn repasse_exists(&self, nr_repasse: i64) -> DbResult<bool> {
            Ok(self.0.lock().unwrap().existing.contains(&nr_repasse))
        }

        async fn insert_pending(&self, title: &ReleasedTitle) -> DbResult<()> {
            let mut state = self.0.lock().unwrap();
            if state.fail_insert.contains(&title.nr_repasse) {
                return Err(DbError::Settings("ORA-00001: unique constraint".to_string()));
            }
            state.inserted.push(title.nr_repasse);
            state.existing.insert(title.nr_repasse);
            Ok(())
        }

        async fn pending_repasses(&self) -> DbResult<Vec<RepasseMedico>> {
            Ok(self.0.lock().unwrap().pending.clone())
        }

        async fn update_status(
            &self,
            nr_repasse: i64,
            status: &RepasseStatus,
            message: &str,
        ) -> DbResult<()> {
            self.0
                .lock()
                .unwrap()
                .updates
                .push((nr_repasse, status.clone(), message.to_string()));
            Ok(())
        }

        async fn create_execution(&self, _ctx: &ExecutionContext) -> DbResult<i64> {
            self.0
                .lock()
                .unwrap()
                .execution_id
                .ok_or_else(|| DbError::MissingOutput("PR_CRIAR_CONTROLE_EXECUCAO".to_string()))
        }

        async fn register_log(
            &self,
            execution_id: i64,
            kind: LogKind,
            record_id: &str,
            message: &str,
        ) -> DbResult<()> {
            self.0.lock().unwrap().logs.push((
                execution_id,
                kind,
                record_id.to_string(),
                message.to_string(),
            ));
            Ok(())
        }

        async fn finish_execution(
            &self,
            execution_id: i64,
            status: &str,
            notes: &str,
        ) -> DbResult<()> {
            self.0
                .lock()
                .unwrap()
                .finished
                .push((execution_id, status.to_string(), notes.to_string()));
            Ok(())
        }

        async fn close(&self) -> DbResult<()> {
            self.0.lock().unwrap().closed = true;
            Ok(())
        }
    }

    #[derive(Default)]
    struct BrowserState {
        visible: HashSet<Selector>,
        values: HashMap<Selector, String>,
        texts: HashMap<Selector, String>,
        fail_click: HashSet<Selector>,
        clicks: Vec<Selector>,
        typed: Vec<(Selector, String)>,
        navigated: Vec<String>,
        scripts: Vec<String>,
        screenshots: Vec<PathBuf>,
        launches: usize,
        fail_launch: bool,
        closed: bool,
    }

    #[derive(Clone, Default)]
    struct Ui(Arc<Mutex<BrowserState>>);

    impl Ui {
        fn state(&self) -> MutexGuard<'_, BrowserState> {
            self.0.lock().unwrap()
        }

        fn show(&self, selector: Selector) {
            self.0.lock().unwrap().visible.insert(selector);
        }

        fn hide(&self, selector: &Selector) {
            self.0.lock().unwrap().visible.remove(selector);
        }

        fn clicked(&self, selector: &Selector) -> bool {
            self.0.lock().unwrap().clicks.contains(selector)
        }

        fn typed_into(&self, selector: &Selector) -> Vec<String> {
            self.0
                .lock()
                .unwrap()
                .typed
                .iter()
                .filter(|(s, _)| s == selector)
                .map(|(_, text)| text.clone())
                .collect()
        }

        /// Menu plus every step of a successful send for one repasse.
        fn ready_for(&self, seq_terceiro: i64, nr_repasse: i64) {
            self.show(tasy::menu_search());
            self.show(tasy::menu_entry(tasy::SCREEN_REPASSE_TERCEIROS));
            self.show(tasy::filter_token());
            self.show(tasy::filter_modal());
            self.show(tasy::grid_row(seq_terceiro));
            self.show(tasy::repasse_panel());
            self.show(tasy::repasse_cell(nr_repasse));
            self.show(tasy::email_dialog());
            self.0
                .lock()
                .unwrap()
                .values
                .insert(tasy::third_party_description(), "CLINICA SAO LUCAS".to_string());
        }
    }

    struct FakeBrowser(Ui);

    #[async_trait]
    impl Browser for FakeBrowser {
        async fn navigate(&self, url: &str) -> BrowserResult<()> {
            self.0.state().navigated.push(url.to_string());
            Ok(())
        }

        async fn wait_visible(
            &self,
            selector: &Selector,
            _timeout: Duration,
        ) -> BrowserResult<bool> {
            Ok(self.0.state().visible.contains(selector))
        }

        async fn click(&self, selector: &Selector, _timeout: Duration) -> BrowserResult<()> {
            let mut state = self.0.state();
            if state.fail_click.contains(selector) {
                return Err(BrowserError::ElementNotFound(selector.to_string()));
            }
            state.clicks.push(selector.clone());
            Ok(())
        }

        async fn set_value(
            &self,
            selector: &Selector,
            text: &str,
            _timeout: Duration,
        ) -> BrowserResult<()> {
            self.0
                .state()
                .typed
                .push((selector.clone(), text.to_string()));
            Ok(())
        }

        async fn text(&self, selector: &Selector, _timeout: Duration) -> BrowserResult<String> {
            self.0
                .state()
                .texts
                .get(selector)
                .cloned()
                .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))
        }

        async fn input_value(
            &self,
            selector: &Selector,
            _timeout: Duration,
        ) -> BrowserResult<Option<String>> {
            Ok(self.0.state().values.get(selector).cloned())
        }

        async fn execute_js(&self, script: &str) -> BrowserResult<Value> {
            self.0.state().scripts.push(script.to_string());
            Ok(Value::Null)
        }

        async fn screenshot(&self, path: &Path) -> BrowserResult<()> {
            self.0.state().screenshots.push(path.to_path_buf());
            Ok(())
        }

        async fn pause(&self, _duration: Duration) {}

        async fn close(&mut self) -> BrowserResult<()> {
            self.0.state().closed = true;
            Ok(())
        }
    }

    struct FakeLauncher(Ui);

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self) -> BrowserResult<Box<dyn Browser>> {
            let mut state = self.0.state();
            if state.fail_launch {
                return Err(BrowserError::DriverNotFound("chromedriver".to_string()));
            }
            state.launches += 1;
            Ok(Box::new(FakeBrowser(self.0.clone())))
        }
    }

    fn at(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn title(nr_repasse: i64) -> ReleasedTitle {
        ReleasedTitle {
            cnpj: Some("12345678000199".to_string()),
            razao_social: Some("CLINICA SAO LUCAS".to_string()),
            seq_terceiro: Some(77),
            nr_repasse,
            nr_titulo: Some(5000 + nr_repasse),
            dt_lib_titulo: Some(at(10)),
            email: Some("financeiro@clinica.com.br".to_string()),
            dt_ult_envio_email: None,
            dt_lib_repasse: Some(at(12)),
        }
    }

    fn pending(seq_terceiro: i64, nr_repasse: i64) -> RepasseMedico {
        RepasseMedico {
            cnpj: Some("12345678000199".to_string()),
            razao_social: Some("CLINICA SAO LUCAS".to_string()),
            seq_terceiro: Some(seq_terceiro),
            nr_repasse,
            nr_titulo: Some(5000 + nr_repasse),
            dt_lib_titulo: Some(at(10)),
            email: Some("financeiro@clinica.com.br".to_string()),
            dt_ult_envio_email: None,
            dt_lib_repasse: Some(at(12)),
            status: RepasseStatus::Pending,
            mensagem: None,
        }
    }

    struct Harness {
        processor: RepasseProcessor,
        store: FakeStore,
        ui: Ui,
        metrics: Metrics,
        dir: tempfile::TempDir,
    }

    fn harness(extra_env: &[(&str, &str)], with_store: bool) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().to_string_lossy().to_string();
        let mut vars: HashMap<String, String> = extra_env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.insert("CAMINHO_PADRAO".to_string(), base);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let store = FakeStore::default();
        store.0.lock().unwrap().execution_id = Some(42);
        let ui = Ui::default();
        let metrics = Metrics::new().unwrap();
        let store_arg: Option<Arc<dyn RepasseStore>> = if with_store {
            Some(Arc::new(store.clone()))
        } else {
            None
        };
        let processor = RepasseProcessor::new(
            config,
            store_arg,
            Box::new(FakeLauncher(ui.clone())),
            metrics.clone(),
        );
        Harness {
            processor,
            store,
            ui,
            metrics,
            dir,
        }
    }

    #[tokio::test]
    async fn test_import_skips_existing_repasses() {
        let mut h = harness(&[], true);
        {
            let mut state = h.store.0.lock().unwrap();
            state.released = vec![title(1), title(2), title(3)];
            state.existing.insert(2);
        }

        let imported = h.processor.import_accounts().await.unwrap();

        assert_eq!(imported, 2);
        assert_eq!(h.store.0.lock().unwrap().inserted, vec![1, 3]);
        assert_eq!(h.processor.summary().imported, 2);
        let messages = h.store.messages();
        assert!(messages.contains(&"Dados Importados com Sucesso: [2/3]".to_string()));
        assert!(messages.contains(
            &"Inserido na tabela HOS_REPASSE_MEDICO: Terceiro: 77 - Repasse: 1 - Título: 5001 - CNPJ: 12345678000199 - Status: P"
                .to_string()
        ));
        assert!(h.metrics.gather().unwrap().contains("repasse_imported_total 2"));
    }

    #[tokio::test]
    async fn test_import_insert_failure_is_skipped() {
        let mut h = harness(&[], true);
        {
            let mut state = h.store.0.lock().unwrap();
            state.released = vec![title(1), title(2)];
            state.fail_insert.insert(1);
        }

        let imported = h.processor.import_accounts().await.unwrap();

        assert_eq!(imported, 1);
        assert_eq!(h.store.0.lock().unwrap().inserted, vec![2]);
        assert!(h
            .store
            .messages()
            .contains(&"Dados Importados com Sucesso: [1/2]".to_string()));
    }

    #[tokio::test]
    async fn test_run_without_pending_skips_browser() {
        let mut h = harness(&[], true);

        h.processor.run().await.unwrap();

        assert_eq!(h.ui.state().launches, 0);
        assert!(h
            .store
            .messages()
            .contains(&"Sem repasses para realizar o envio".to_string()));
    }

    #[tokio::test]
    async fn test_incomplete_row_is_marked_without_touching_the_ui() {
        let mut h = harness(&[], true);
        let mut row = pending(77, 900);
        row.email = None;
        h.store.0.lock().unwrap().pending = vec![row];
        h.ui.ready_for(77, 900);

        h.processor.run().await.unwrap();

        let updates = h.store.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, 900);
        assert_eq!(updates[0].1, RepasseStatus::Incomplete);
        assert_eq!(
            updates[0].2,
            "Dados não preenchidos. Email: None - Dt Liberação: 2025-09-10 10:00:00 - Nr Titulo: 5900 - Dt lib Repasse: 2025-09-12 10:00:00"
        );
        assert!(!h.ui.clicked(&tasy::filter_token()));
        assert_eq!(h.processor.summary().incomplete, 1);
    }

    #[tokio::test]
    async fn test_send_marks_row_as_sent() {
        let mut h = harness(&[("TASY_URL", "https://tasy.example/#/login")], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.ready_for(77, 900);

        h.processor.initialize().await.unwrap();
        h.processor.run().await.unwrap();

        assert_eq!(
            h.store.updates(),
            vec![(900, RepasseStatus::Sent, "Enviado".to_string())]
        );
        assert_eq!(
            h.ui.typed_into(&tasy::email_destination()),
            vec!["financeiro@clinica.com.br".to_string()]
        );
        assert_eq!(h.ui.typed_into(&tasy::third_party_input()), vec!["77".to_string()]);
        assert_eq!(
            h.ui.typed_into(&tasy::menu_search()),
            vec![tasy::SCREEN_REPASSE_TERCEIROS.to_string()]
        );
        assert!(h.ui.clicked(&tasy::email_send_button()));

        {
            let state = h.ui.state();
            assert_eq!(state.launches, 1);
            assert_eq!(state.navigated, vec!["https://tasy.example/#/login".to_string()]);
            assert_eq!(state.scripts, vec!["document.activeElement.blur();".to_string()]);
        }

        let messages = h.store.messages();
        assert!(messages.contains(&"Login Tasy: True".to_string()));
        assert!(messages.contains(&"Inicio robô - Id Exec: 42".to_string()));
        assert_eq!(h.processor.summary().sent, 1);
        assert!(h
            .metrics
            .gather()
            .unwrap()
            .contains("repasse_processed_total{outcome=\"sent\"} 1"));

        let evidence_dir = h.dir.path().join("Evidencia");
        let evidence: Vec<_> = std::fs::read_dir(&evidence_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("repasses_"))
            .collect();
        assert_eq!(evidence.len(), 1);
        let content = std::fs::read_to_string(evidence[0].path()).unwrap();
        let record: Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(record["nr_repasse"], 900);
        assert_eq!(record["outcome"], "sent");
        assert_eq!(record["status"], "E");
    }

    #[tokio::test]
    async fn test_dev_mode_overrides_destination() {
        let mut h = harness(&[("DEV", "true"), ("DEV_EMAIL_DESTINO", "qa@austa.com.br")], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.ready_for(77, 900);

        h.processor.run().await.unwrap();

        assert_eq!(
            h.ui.typed_into(&tasy::email_destination()),
            vec!["qa@austa.com.br".to_string()]
        );
        assert_eq!(h.store.updates()[0].1, RepasseStatus::Sent);
    }

    #[tokio::test]
    async fn test_dev_mode_without_destination_fails_the_row() {
        let mut h = harness(&[("DEV", "1")], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.ready_for(77, 900);

        h.processor.run().await.unwrap();

        assert!(h.store.updates().is_empty());
        assert!(h.ui.typed_into(&tasy::email_destination()).is_empty());
        assert_eq!(h.processor.summary().errored, 1);
        assert!(h
            .store
            .0
            .lock()
            .unwrap()
            .logs
            .iter()
            .any(|l| l.1 == LogKind::Error && l.3 == "Erro ao processar repasse 900"));
    }

    #[tokio::test]
    async fn test_unknown_third_party_is_marked_incomplete() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.ready_for(77, 900);
        h.ui.state()
            .values
            .insert(tasy::third_party_description(), "   ".to_string());

        h.processor.run().await.unwrap();

        assert_eq!(
            h.store.updates(),
            vec![(
                900,
                RepasseStatus::Incomplete,
                "Não encontrou a sequência: 77".to_string()
            )]
        );
        assert!(!h.ui.clicked(&tasy::filter_button()));
    }

    #[tokio::test]
    async fn test_missing_grid_row_is_marked_incomplete() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.ready_for(77, 900);
        h.ui.hide(&tasy::grid_row(77));

        h.processor.run().await.unwrap();

        assert!(h.ui.clicked(&tasy::filter_button()));
        assert_eq!(
            h.store.updates(),
            vec![(
                900,
                RepasseStatus::Incomplete,
                "Não encontrou a sequência: 77".to_string()
            )]
        );
        assert!(h
            .metrics
            .gather()
            .unwrap()
            .contains("repasse_processed_total{outcome=\"not_found\"} 1"));
    }

    #[tokio::test]
    async fn test_aborted_send_is_marked_false() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.ready_for(77, 900);
        h.ui.show(tasy::aborted_dialog());
        h.ui.state().texts.insert(
            tasy::aborted_dialog_text(),
            "Operação abortada: e-mail inválido".to_string(),
        );

        h.processor.run().await.unwrap();

        assert!(h.ui.clicked(&tasy::dialog_ok_button()));
        let updates = h.store.updates();
        assert_eq!(updates[0].1.code(), "False");
        assert_eq!(updates[0].2, "Falha no envio do email");
        assert_eq!(h.processor.summary().failed, 1);
    }

    #[tokio::test]
    async fn test_row_error_does_not_stop_the_loop() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900), pending(77, 901)];
        h.ui.ready_for(77, 900);
        h.ui.ready_for(77, 901);
        h.ui.state()
            .fail_click
            .insert(tasy::repasse_cell(900));

        h.processor.initialize().await.unwrap();
        h.processor.run().await.unwrap();

        assert_eq!(
            h.store.updates(),
            vec![(901, RepasseStatus::Sent, "Enviado".to_string())]
        );
        let summary = h.processor.summary();
        assert_eq!(summary.errored, 1);
        assert_eq!(summary.sent, 1);

        let screenshots = h.ui.state().screenshots.clone();
        assert_eq!(screenshots.len(), 1);
        assert!(screenshots[0].starts_with(h.dir.path().join("Evidencia")));
        assert!(screenshots[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("900_"));
        assert!(h
            .metrics
            .gather()
            .unwrap()
            .contains("repasse_browser_errors_total 1"));
    }

    #[tokio::test]
    async fn test_process_repasse_reports_outcome() {
        let mut h = harness(&[], true);
        h.ui.ready_for(77, 900);
        assert!(h.processor.login_tasy().await);
        h.processor
            .navigate_menu(tasy::SCREEN_REPASSE_TERCEIROS)
            .await
            .unwrap();

        let outcome = h.processor.process_repasse(&pending(77, 900)).await.unwrap();

        assert_eq!(outcome, RepasseOutcome::Sent);
    }

    #[tokio::test]
    async fn test_without_database() {
        let mut h = harness(&[], false);

        h.processor.initialize().await.unwrap();
        assert_eq!(h.processor.execution_id(), None);
        assert!(h.dir.path().join("Evidencia").is_dir());

        let import = h.processor.import_accounts().await.unwrap_err();
        assert_eq!(import.to_string(), "Banco não conectado");
        assert!(h.processor.run().await.is_err());

        h.processor.finalize(Some("Banco não conectado")).await;
        assert!(h.dir.path().join("Evidencia").join(METRICS_FILE).is_file());
    }

    #[tokio::test]
    async fn test_initialize_and_finalize_execution() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.ready_for(77, 900);

        h.processor.initialize().await.unwrap();
        assert_eq!(h.processor.execution_id(), Some(42));
        h.processor.run().await.unwrap();
        h.processor.finalize(None).await;

        let state = h.store.0.lock().unwrap();
        assert_eq!(state.finished, vec![(42, "Concluido".to_string(), "-".to_string())]);
        assert!(state.closed);
        assert!(state.logs.iter().all(|l| l.0 == 42));
        assert_eq!(state.logs.last().unwrap().3, "Fim Robô");
        assert!(h.ui.state().closed);

        let metrics_path = h.dir.path().join("Evidencia").join(METRICS_FILE);
        let metrics = std::fs::read_to_string(metrics_path).unwrap();
        assert!(metrics.contains("repasse_processed_total"));
    }

    #[tokio::test]
    async fn test_execution_registration_failure_is_not_fatal() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().execution_id = None;

        h.processor.initialize().await.unwrap();
        assert_eq!(h.processor.execution_id(), None);

        h.processor.finalize(Some("falha")).await;
        let state = h.store.0.lock().unwrap();
        assert_eq!(state.finished, vec![(0, "Concluido".to_string(), "falha".to_string())]);
        assert_eq!(state.logs[0].0, 0);
    }

    #[tokio::test]
    async fn test_login_failure_stops_the_run() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.state().fail_launch = true;

        let err = h.processor.run().await.unwrap_err();

        assert_eq!(err.to_string(), "Não foi possível efetuar login no Tasy");
        assert!(h.store.messages().contains(&"Login Tasy: False".to_string()));
        assert!(h.store.updates().is_empty());
    }

    #[tokio::test]
    async fn test_missing_menu_search_stops_the_run() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];

        let err = h.processor.run().await.unwrap_err();

        assert_eq!(err.to_string(), "Campo de pesquisa do menu não encontrado");
    }

    #[tokio::test]
    async fn test_missing_menu_entry_stops_the_run() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.show(tasy::menu_search());

        let err = h.processor.run().await.unwrap_err();

        assert_eq!(err.to_string(), "Falha ao acessar o menu [Repasse para Terceiros]");
    }

    #[tokio::test]
    async fn test_import_only_never_launches_the_browser() {
        let mut h = harness(&[], true);
        {
            let mut state = h.store.0.lock().unwrap();
            state.released = vec![title(1), title(2)];
            state.pending = vec![pending(77, 900)];
        }
        h.ui.ready_for(77, 900);

        h.processor.execute(RunMode::ImportOnly).await.unwrap();

        assert_eq!(h.ui.state().launches, 0);
        assert_eq!(h.store.0.lock().unwrap().inserted, vec![1, 2]);
        assert!(h.store.updates().is_empty());
        assert_eq!(h.processor.summary().imported, 2);
        assert_eq!(h.processor.summary().sent, 0);
    }

    #[tokio::test]
    async fn test_full_mode_imports_then_sends() {
        let mut h = harness(&[], true);
        {
            let mut state = h.store.0.lock().unwrap();
            state.released = vec![title(1)];
            state.pending = vec![pending(77, 900)];
        }
        h.ui.ready_for(77, 900);

        h.processor.execute(RunMode::Full).await.unwrap();

        assert_eq!(h.ui.state().launches, 1);
        assert_eq!(h.processor.summary().imported, 1);
        assert_eq!(
            h.store.updates(),
            vec![(900, RepasseStatus::Sent, "Enviado".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_run_is_finished_with_the_failure_text() {
        let mut h = harness(&[], true);
        h.store.0.lock().unwrap().pending = vec![pending(77, 900)];
        h.ui.state().fail_launch = true;

        let err = h.processor.execute(RunMode::Full).await.unwrap_err();
        let failure = format!("{:#}", err);
        h.processor.finalize(Some(&failure)).await;

        let state = h.store.0.lock().unwrap();
        assert_eq!(
            state.finished,
            vec![(
                42,
                "Concluido".to_string(),
                "Não foi possível efetuar login no Tasy".to_string()
            )]
        );
        assert!(state.closed);
    }
}
