//! 제어 루프 -- 인벤토리 수집 → 규칙 생성 → 조립 → 변경 감지 → 실행
//!
//! [`Controller::run_pass`]는 한 번의 패스를 수행합니다.
//! [`run_monitor`]는 이벤트 모니터를 띄우고 재생성 신호마다 패스를 한 번씩 실행합니다.
//! 패스는 직렬로만 실행되며, 종료 시그널은 패스 사이에서만 처리됩니다.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use dockwall_core::config::FirewallConfig;
use dockwall_core::metrics as m;
use dockwall_docker::{
    EventMonitor, EventSubscriber, InventoryProvider, MonitorConfig, load_inventory,
    regeneration_channel,
};
use dockwall_rules::{ChangeDetector, ChangeStatus, RuleSettings, Table, assemble, synthesize};
use tracing::{debug, error, info, warn};

use crate::artifact::write_artifact;
use crate::error::CliError;
use crate::executor::ScriptExecutor;
use crate::options::RunOptions;

/// 한 패스의 결과 요약
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// 변경 감지 결과
    pub status: ChangeStatus,
    /// 쓰기/실행/출력을 수행했는지 여부
    pub acted: bool,
    /// 생성된 전체 문장 수 (선택과 무관)
    pub statements: usize,
}

/// 패스 실행기
///
/// 변경 감지기의 메모리 기준값이 패스 사이에 유지되므로 모니터 모드에서는
/// 같은 인스턴스를 재사용해야 합니다.
pub struct Controller<P: InventoryProvider> {
    provider: Arc<P>,
    options: RunOptions,
    settings: RuleSettings,
    detector: ChangeDetector,
    executor: ScriptExecutor,
}

impl<P: InventoryProvider> Controller<P> {
    pub fn new(provider: Arc<P>, options: RunOptions, firewall: &FirewallConfig) -> Self {
        let settings = RuleSettings::from_config(firewall, options.mode);
        let detector = ChangeDetector::for_output(options.output.as_deref());
        let executor = ScriptExecutor::new(options.verbose);
        Self {
            provider,
            options,
            settings,
            detector,
            executor,
        }
    }

    /// 실행기를 교체합니다.
    pub fn with_executor(mut self, executor: ScriptExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// 패스를 한 번 실행합니다.
    ///
    /// `out`에는 생성된 스크립트(출력/실행/호출이 없을 때)와 자식 프로세스 출력이 기록됩니다.
    ///
    /// # Errors
    ///
    /// 인벤토리 수집, 산출물 쓰기, 실행 중 하나라도 실패하면 이 패스만 실패합니다.
    pub async fn run_pass(&mut self, out: &mut dyn Write) -> Result<PassReport, CliError> {
        let started = Instant::now();
        let result = self.pass(out).await;

        let label = if result.is_ok() { "success" } else { "failure" };
        metrics::counter!(m::PASSES_TOTAL, m::LABEL_RESULT => label).increment(1);
        metrics::histogram!(m::PASS_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        result
    }

    async fn pass(&mut self, out: &mut dyn Write) -> Result<PassReport, CliError> {
        let inventory = load_inventory(self.provider.as_ref()).await?;
        metrics::gauge!(m::NAT_NETWORKS).set(inventory.nat_network_count() as f64);
        metrics::gauge!(m::CONTAINERS).set(inventory.containers.len() as f64);

        let store = synthesize(&self.settings, &inventory);
        let mut statements = 0;
        for table in Table::ALL {
            let count = store.statement_count(table);
            statements += count;
            metrics::gauge!(m::RULES_GENERATED, m::LABEL_TABLE => table.as_str()).set(count as f64);
        }

        let script = assemble(&store, &self.options.tables, &self.options.sections);
        let evaluation = self.detector.evaluate(&script).await;
        let status = evaluation.status;

        if status.is_changed() {
            metrics::counter!(m::OUTPUT_CHANGES_TOTAL).increment(1);
            debug!(?status, "rules have changed");
        } else {
            metrics::counter!(m::OUTPUT_UNCHANGED_TOTAL).increment(1);
        }

        let acted = status.is_changed() || !self.options.change_only;
        if acted {
            // 실패한 동작은 기준값으로 확정하지 않음: 다음 패스에서 다시 시도
            if let Err(e) = self.act(&script, out).await {
                self.detector.mark_failed();
                return Err(e);
            }
            self.detector.commit(evaluation.digest);
        } else {
            info!("no change in generated rules, nothing to do");
        }

        Ok(PassReport {
            status,
            acted,
            statements,
        })
    }

    async fn act(&self, script: &str, out: &mut dyn Write) -> Result<(), CliError> {
        if let Some(path) = &self.options.output {
            write_artifact(path, script, self.options.artifact_format()).await?;
            info!(path = %path.display(), "rules written");
        }

        if self.options.prints_to_stdout() {
            writeln!(out, "{script}")?;
        }

        // execute가 실패해도 invoke는 실행하고, 먼저 난 에러를 반환
        let mut failure = None;

        if self.options.execute {
            let result = self.executor.execute(script).await;
            record_execution("execute", result.is_ok());
            match result {
                Ok(output) => {
                    if self.options.verbose {
                        out.write_all(output.combined.as_bytes())?;
                    }
                    info!("rules applied");
                }
                Err(e) => {
                    error!(error = %e, "executing generated statements failed");
                    failure = Some(e);
                }
            }
        }

        if let Some(executable) = &self.options.invoke {
            let result = self
                .executor
                .invoke(executable, self.options.output.as_deref(), script)
                .await;
            record_execution("invoke", result.is_ok());
            match result {
                Ok(output) => out.write_all(output.combined.as_bytes())?,
                Err(e) => {
                    error!(error = %e, executable = %executable.display(), "invocation failed");
                    if failure.is_none() {
                        failure = Some(e);
                    }
                }
            }
        }

        out.flush()?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn record_execution(mode: &'static str, ok: bool) {
    let result = if ok { "success" } else { "failure" };
    metrics::counter!(m::EXECUTIONS_TOTAL, m::LABEL_MODE => mode, m::LABEL_RESULT => result)
        .increment(1);
}

/// 모니터 모드 제어 루프
///
/// 이벤트 모니터를 별도 태스크로 띄우고 신호마다 패스를 한 번 실행합니다.
/// 시작 시 패스를 실행하지 않으며, 첫 네트워크 이벤트를 기다립니다.
/// 실패한 패스는 로그만 남기고 다음 신호를 기다립니다.
/// `shutdown`이 완료되거나 모니터가 멈추면 반환합니다.
pub async fn run_monitor<P, S, F>(
    controller: &mut Controller<P>,
    subscriber: Arc<S>,
    config: MonitorConfig,
    out: &mut dyn Write,
    shutdown: F,
) -> Result<(), CliError>
where
    P: InventoryProvider,
    S: EventSubscriber,
    F: Future<Output = ()>,
{
    let (tx, mut rx) = regeneration_channel();
    let monitor = tokio::spawn(EventMonitor::new(subscriber, config, tx).run());
    tokio::pin!(shutdown);

    info!("waiting for docker network events");

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("stopping control loop");
                break;
            }
            signal = rx.recv() => {
                let Some(signal) = signal else {
                    warn!("event monitor stopped unexpectedly");
                    break;
                };
                info!(events = signal.events, "updating docker firewall rules");
                match controller.run_pass(out).await {
                    Ok(report) => debug!(
                        changed = report.status.is_changed(),
                        acted = report.acted,
                        statements = report.statements,
                        "pass finished"
                    ),
                    Err(e) => error!(error = %e, "regeneration pass failed"),
                }
            }
        }
    }

    drop(rx);
    monitor.abort();
    match monitor.await {
        Ok(Err(e)) => warn!(error = %e, "event monitor ended with error"),
        Err(e) if !e.is_cancelled() => warn!(error = %e, "event monitor task failed"),
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use dockwall_core::types::{
        ContainerRecord, NetworkAttachment, NetworkRecord, PortMapping, Protocol,
    };
    use dockwall_docker::DockerSourceError;
    use dockwall_rules::ChangeReason;

    struct StaticProvider {
        networks: Vec<NetworkRecord>,
        containers: Vec<ContainerRecord>,
        reachable: bool,
    }

    impl StaticProvider {
        fn scenario() -> Self {
            Self {
                networks: vec![NetworkRecord {
                    id: "aaa".to_owned(),
                    name: "frontend".to_owned(),
                    driver: "bridge".to_owned(),
                    interface_name: "br-aaa".to_owned(),
                    nat_ipv4: true,
                    nat_subnets: vec!["172.17.0.0/16".parse().unwrap()],
                }],
                containers: vec![ContainerRecord {
                    id: "c1".to_owned(),
                    name: "web".to_owned(),
                    ports: vec![PortMapping {
                        public_port: 8080,
                        private_port: 80,
                        protocol: Protocol::Tcp,
                    }],
                    networks: vec![NetworkAttachment {
                        network_id: "aaa".to_owned(),
                        ip_address: "172.17.0.2".parse().unwrap(),
                    }],
                }],
                reachable: true,
            }
        }
    }

    impl InventoryProvider for StaticProvider {
        async fn ping(&self) -> Result<(), DockerSourceError> {
            if self.reachable {
                Ok(())
            } else {
                Err(DockerSourceError::DockerConnection("refused".to_owned()))
            }
        }

        async fn list_networks(&self) -> Result<Vec<NetworkRecord>, DockerSourceError> {
            Ok(self.networks.clone())
        }

        async fn list_containers(&self) -> Result<Vec<ContainerRecord>, DockerSourceError> {
            Ok(self.containers.clone())
        }
    }

    fn controller(options: RunOptions) -> Controller<StaticProvider> {
        Controller::new(
            Arc::new(StaticProvider::scenario()),
            options,
            &FirewallConfig::default(),
        )
    }

    #[tokio::test]
    async fn prints_script_without_sinks() {
        let mut controller = controller(RunOptions::default());
        let mut out = Vec::new();

        let report = controller.run_pass(&mut out).await.unwrap();
        assert!(report.acted);
        assert!(report.statements > 0);

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("## [DOCKWALL] Table: nat Section: init\n"));
        assert!(text.contains("--to-destination 172.17.0.2:80"));
    }

    #[tokio::test]
    async fn change_only_skips_identical_pass() {
        let options = RunOptions {
            change_only: true,
            ..RunOptions::default()
        };
        let mut controller = controller(options);

        let mut first = Vec::new();
        let report = controller.run_pass(&mut first).await.unwrap();
        assert_eq!(report.status, ChangeStatus::Changed(ChangeReason::NoBaseline));
        assert!(!first.is_empty());

        let mut second = Vec::new();
        let report = controller.run_pass(&mut second).await.unwrap();
        assert_eq!(report.status, ChangeStatus::Unchanged);
        assert!(!report.acted);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn without_change_only_every_pass_acts() {
        let mut controller = controller(RunOptions::default());
        controller.run_pass(&mut Vec::new()).await.unwrap();
        let report = controller.run_pass(&mut Vec::new()).await.unwrap();
        assert_eq!(report.status, ChangeStatus::Unchanged);
        assert!(report.acted);
    }

    #[tokio::test]
    async fn output_file_suppresses_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.sh");
        let options = RunOptions {
            output: Some(path.clone()),
            ..RunOptions::default()
        };
        let mut controller = controller(options);
        let mut out = Vec::new();

        controller.run_pass(&mut out).await.unwrap();
        assert!(out.is_empty());
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("-j MASQUERADE"));
    }

    #[tokio::test]
    async fn unreachable_daemon_fails_the_pass() {
        let provider = StaticProvider {
            reachable: false,
            ..StaticProvider::scenario()
        };
        let mut controller =
            Controller::new(Arc::new(provider), RunOptions::default(), &FirewallConfig::default());
        let err = controller.run_pass(&mut Vec::new()).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn invoke_receives_script_on_stdin() {
        let options = RunOptions {
            invoke: Some(Path::new("/bin/cat").to_path_buf()),
            tables: vec![Table::Filter],
            sections: vec![dockwall_rules::Section::Init],
            ..RunOptions::default()
        };
        let mut controller = controller(options);
        let mut out = Vec::new();

        controller.run_pass(&mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("## [DOCKWALL] Table: filter Section: init\n"));
        assert!(text.contains("-N DOCKER_FORWARD"));
    }

    #[tokio::test]
    async fn failing_execution_fails_the_pass() {
        let options = RunOptions {
            execute: true,
            ..RunOptions::default()
        };
        let mut controller =
            controller(options).with_executor(ScriptExecutor::new(false).with_shell("/bin/false"));
        let err = controller.run_pass(&mut Vec::new()).await.unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn failed_execution_is_retried_under_change_only() {
        let options = RunOptions {
            execute: true,
            change_only: true,
            ..RunOptions::default()
        };
        let mut controller =
            controller(options).with_executor(ScriptExecutor::new(false).with_shell("/bin/false"));
        assert!(controller.run_pass(&mut Vec::new()).await.is_err());

        // 같은 토폴로지라도 실패 뒤에는 다시 실행
        controller.executor = ScriptExecutor::new(false).with_shell("/bin/true");
        let report = controller.run_pass(&mut Vec::new()).await.unwrap();
        assert_eq!(
            report.status,
            ChangeStatus::Changed(ChangeReason::RetryAfterFailure)
        );
        assert!(report.acted);

        let report = controller.run_pass(&mut Vec::new()).await.unwrap();
        assert_eq!(report.status, ChangeStatus::Unchanged);
        assert!(!report.acted);
    }

    #[tokio::test]
    async fn failed_execution_still_invokes() {
        let options = RunOptions {
            execute: true,
            invoke: Some(Path::new("/bin/cat").to_path_buf()),
            tables: vec![Table::Nat],
            sections: vec![dockwall_rules::Section::Docker],
            ..RunOptions::default()
        };
        let mut controller =
            controller(options).with_executor(ScriptExecutor::new(false).with_shell("/bin/false"));
        let mut out = Vec::new();

        let err = controller.run_pass(&mut out).await.unwrap_err();
        assert_eq!(err.exit_code(), 4);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("--to-destination 172.17.0.2:80"));
    }
}
