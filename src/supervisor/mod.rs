pub mod error;
pub mod process;
pub mod startup;
pub mod state_machine;

use std::sync::Arc;

pub use error::StartupError;
pub use process::{Launcher, ShellLauncher};
pub use startup::{ServerStartup, StartupTask};
pub use state_machine::{State, StateMachine};

use crate::config::{Timings, WatchdogSettings};
use crate::process_monitor::{self, ProcessProbe};
use crate::utils::fmt_millis;

/// How a dispatched startup sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupOutcome {
    Completed,
    Failed(String),
    Panicked,
}

/// Summary of one supervision cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Liveness polls that found the server running before it went away.
    pub running_polls: u32,
    pub outcome: StartupOutcome,
}

/// Keeps the server alive: waits while it runs, restarts it when it is gone.
///
/// At most one startup sequence is in flight: `cycle` does not return to
/// liveness polling until the dispatched task has finished.
pub struct Supervisor<P, S> {
    probe: Arc<P>,
    startup: Arc<S>,
    process_names: Vec<String>,
    timings: Timings,
    machine: StateMachine,
    restarts: u64,
}

impl<P: ProcessProbe, S: StartupTask> Supervisor<P, S> {
    pub fn new(probe: P, startup: S, settings: &WatchdogSettings) -> Self {
        Self {
            probe: Arc::new(probe),
            startup: Arc::new(startup),
            process_names: settings.process_names.clone(),
            timings: settings.timings,
            machine: StateMachine::new(),
            restarts: 0,
        }
    }

    pub fn state(&self) -> State {
        self.machine.state
    }

    /// Number of startup sequences dispatched so far.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Supervise forever.
    pub async fn run(&mut self) {
        tracing::info!(
            "Supervising {:?} (poll {}, grace {}, settle {})",
            self.process_names,
            fmt_millis(self.timings.poll_interval()),
            fmt_millis(self.timings.grace_delay()),
            fmt_millis(self.timings.settle_delay())
        );
        loop {
            let report = self.cycle().await;
            tracing::debug!("Cycle finished: {:?}", report);
        }
    }

    /// Waiting → IdleGrace → Starting → Waiting, once.
    pub async fn cycle(&mut self) -> CycleReport {
        let running_polls = self.wait_while_running().await;

        self.enter(State::IdleGrace);
        tracing::warn!(
            "Server not running! Starting server in {}",
            fmt_millis(self.timings.grace_delay())
        );
        tokio::time::sleep(self.timings.grace_delay()).await;

        self.enter(State::Starting);
        let outcome = self.dispatch_startup().await;
        self.restarts += 1;

        tokio::time::sleep(self.timings.settle_delay()).await;
        self.enter(State::Waiting);

        CycleReport {
            running_polls,
            outcome,
        }
    }

    async fn wait_while_running(&mut self) -> u32 {
        let mut polls = 0;
        loop {
            let running = process_monitor::any_running_async(
                Arc::clone(&self.probe),
                self.process_names.clone(),
            )
            .await;
            if !running {
                return polls;
            }

            polls += 1;
            self.enter(State::Waiting);
            tracing::info!(
                "Server is running. Checking again in {}",
                fmt_millis(self.timings.poll_interval())
            );
            tokio::time::sleep(self.timings.poll_interval()).await;
        }
    }

    async fn dispatch_startup(&self) -> StartupOutcome {
        let task = Arc::clone(&self.startup);
        let handle = tokio::task::spawn_blocking(move || task.run());

        // 완료될 때까지 짧은 간격으로 확인 (취소 없음, 타임아웃 없음)
        while !handle.is_finished() {
            tokio::time::sleep(self.timings.completion_poll()).await;
        }

        match handle.await {
            Ok(Ok(())) => {
                tracing::info!("Startup sequence completed");
                StartupOutcome::Completed
            }
            Ok(Err(e)) => {
                tracing::error!("Startup sequence failed [{}]: {}", e.error_code(), e);
                StartupOutcome::Failed(e.to_string())
            }
            Err(e) => {
                tracing::error!("Startup task aborted: {}", e);
                StartupOutcome::Panicked
            }
        }
    }

    fn enter(&mut self, to: State) {
        if let Err(e) = self.machine.transition(to) {
            tracing::error!("{}", e);
        }
    }
}
