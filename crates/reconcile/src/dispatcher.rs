//! Fire-and-forget dispatch of the external computation.
//!
//! The dispatcher's contract ends at "process start requested". It never
//! waits for the child, never reads its exit status, and never retries; a
//! key whose computation fails simply stays missing and comes back on the
//! next pass.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, info};

use hydrosync_core::config::PipelineConfig;
use hydrosync_core::WorkItem;

use crate::bus::NotificationBus;
use crate::error::DispatchSpawnError;

/// Starts one external computation for a work item.
pub trait JobLauncher: Send + Sync {
    /// Request the start of the computation and return without waiting.
    fn launch(&self, item: WorkItem) -> Result<(), DispatchSpawnError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Launches `<program> [args...] <machine_id> <cycle_id>` as a child process.
///
/// The child handle is dropped right after spawning; the tokio runtime reaps
/// it in the background. Dropping does not kill the child.
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            program: PathBuf::from(&config.program),
            args: config.args.clone(),
            working_dir: config.working_dir.clone(),
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn command(&self, item: WorkItem) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(item.machine_id.to_string())
            .arg(item.cycle_id.to_string())
            .stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl JobLauncher for ProcessLauncher {
    fn launch(&self, item: WorkItem) -> Result<(), DispatchSpawnError> {
        let child = self.command(item).spawn().map_err(|source| DispatchSpawnError {
            item,
            program: self.program.clone(),
            source,
        })?;
        debug!(
            machine_id = item.machine_id,
            cycle_id = item.cycle_id,
            pid = child.id(),
            "pipeline process started"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "process"
    }
}

/// Launches the computation for one item and, only if the launch was
/// initiated, emits exactly one change notification.
#[derive(Clone)]
pub struct JobDispatcher {
    launcher: Arc<dyn JobLauncher>,
    bus: NotificationBus,
}

impl JobDispatcher {
    pub fn new(launcher: Arc<dyn JobLauncher>, bus: NotificationBus) -> Self {
        Self { launcher, bus }
    }

    pub fn dispatch(&self, item: WorkItem) -> Result<(), DispatchSpawnError> {
        info!(
            machine_id = item.machine_id,
            cycle_id = item.cycle_id,
            launcher = self.launcher.name(),
            "running pipeline"
        );
        self.launcher.launch(item)?;
        self.bus.broadcast();
        Ok(())
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingLauncher {
        launches: Arc<AtomicUsize>,
        should_fail: bool,
    }

    impl JobLauncher for CountingLauncher {
        fn launch(&self, item: WorkItem) -> Result<(), DispatchSpawnError> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if self.should_fail {
                Err(DispatchSpawnError {
                    item,
                    program: PathBuf::from("mock"),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "mock failure"),
                })
            } else {
                Ok(())
            }
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    #[test]
    fn successful_dispatch_emits_one_notification() {
        let bus = NotificationBus::new();
        let mut sub = bus.subscribe();
        let launches = Arc::new(AtomicUsize::new(0));
        let dispatcher = JobDispatcher::new(
            Arc::new(CountingLauncher {
                launches: launches.clone(),
                should_fail: false,
            }),
            bus,
        );

        dispatcher.dispatch(WorkItem::new(1, 2)).unwrap();

        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert!(sub.try_recv().is_some());
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn failed_spawn_emits_nothing() {
        let bus = NotificationBus::new();
        let mut sub = bus.subscribe();
        let dispatcher = JobDispatcher::new(
            Arc::new(CountingLauncher {
                launches: Arc::new(AtomicUsize::new(0)),
                should_fail: true,
            }),
            bus,
        );

        let err = dispatcher.dispatch(WorkItem::new(3, 4)).unwrap_err();
        assert_eq!(err.item, WorkItem::new(3, 4));
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let launcher = ProcessLauncher::new("/nonexistent/hydrosync-pipeline", vec![]);
        let err = launcher.launch(WorkItem::new(1, 1)).unwrap_err();
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("machine 1 / cycle 1"));
    }

    #[tokio::test]
    async fn process_receives_machine_then_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = ProcessLauncher::new(
            "sh",
            vec!["-c".to_string(), "echo \"$0 $1\" > args.txt".to_string()],
        )
        .with_working_dir(dir.path());

        launcher.launch(WorkItem::new(7, 42)).unwrap();

        // The launcher does not wait, so poll for the child's output.
        let path = dir.path().join("args.txt");
        let mut contents = String::new();
        for _ in 0..100 {
            if let Ok(s) = std::fs::read_to_string(&path) {
                if s.ends_with('\n') {
                    contents = s;
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(contents.trim(), "7 42");
    }
}
