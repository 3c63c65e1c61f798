//! Tool server subprocesses
//!
//! [`ManagedProcess`] is what the cleanup code needs from a process: its
//! exit code if known, a graceful and a forceful stop, and a way to wait.
//!
//! [`ChildProcess`] implements it over `tokio::process::Child`. A reaper task
//! owns the `Child`, publishes the exit code on a `watch` channel and services
//! kill requests sent over a control channel, so any number of handles can
//! observe or stop the process without sharing the `Child` itself.
//!
//! Exit codes follow the POSIX convention: a process killed by signal N
//! reports `-N`.

use super::error::LifecycleError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Operations the cleanup sequence needs from an OS process.
#[async_trait]
pub trait ManagedProcess: Send + Sync {
    fn pid(&self) -> Option<u32>;

    /// Exit code, or `None` while the process is running.
    fn returncode(&self) -> Option<i32>;

    /// Ask the process to stop (SIGTERM on Unix).
    fn terminate(&self) -> std::io::Result<()>;

    /// Stop the process unconditionally.
    fn kill(&self) -> std::io::Result<()>;

    /// Wait for exit. `None` if the exit could not be observed.
    async fn wait(&self) -> Option<i32>;
}

/// Piped stdio of a freshly spawned process.
#[derive(Debug, Default)]
pub struct ProcessPipes {
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

enum Control {
    Kill,
}

/// A spawned subprocess observed through its reaper task.
pub struct ChildProcess {
    name: String,
    pid: Option<u32>,
    exit: watch::Receiver<Option<i32>>,
    control: mpsc::UnboundedSender<Control>,
}

impl std::fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess")
            .field("name", &self.name)
            .field("pid", &self.pid)
            .field("returncode", &self.returncode())
            .finish()
    }
}

impl ChildProcess {
    /// Spawn `argv` with piped stdio and `env` overlaid on the ambient
    /// environment.
    ///
    /// The child is killed when the reaper drops it, and on Linux the kernel
    /// sends it SIGTERM if this process dies first.
    pub fn spawn(
        name: &str,
        argv: &[String],
        env: &BTreeMap<String, String>,
    ) -> Result<(Arc<Self>, ProcessPipes), LifecycleError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| LifecycleError::EmptyCommand(name.to_string()))?;
        let runtime =
            Handle::try_current().map_err(|_| LifecycleError::NoRuntime(name.to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn().map_err(|source| LifecycleError::Spawn {
            name: name.to_string(),
            source,
        })?;

        let pipes = ProcessPipes {
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
        };
        let pid = child.id();
        info!("Started '{}' (pid {:?}): {}", name, pid, argv.join(" "));

        let (exit_tx, exit_rx) = watch::channel(None);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        runtime.spawn(reap(name.to_string(), child, exit_tx, control_rx));

        let process = Arc::new(Self {
            name: name.to_string(),
            pid,
            exit: exit_rx,
            control: control_tx,
        });
        Ok((process, pipes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl ManagedProcess for ChildProcess {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    fn returncode(&self) -> Option<i32> {
        *self.exit.borrow()
    }

    #[cfg(unix)]
    fn terminate(&self) -> std::io::Result<()> {
        if self.returncode().is_some() {
            return Ok(());
        }
        let Some(pid) = self.pid else {
            return Ok(());
        };
        // SAFETY: kill(2) has no memory-safety preconditions.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc == -1 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ESRCH) {
                return Ok(());
            }
            return Err(err);
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn terminate(&self) -> std::io::Result<()> {
        self.kill()
    }

    fn kill(&self) -> std::io::Result<()> {
        if self.returncode().is_some() {
            return Ok(());
        }
        self.control
            .send(Control::Kill)
            .map_err(|_| std::io::Error::other("process reaper has stopped"))
    }

    async fn wait(&self) -> Option<i32> {
        let mut exit = self.exit.clone();
        exit.wait_for(Option::is_some).await.ok().and_then(|code| *code)
    }
}

/// Own the child until it exits, then publish its exit code.
///
/// When every handle is gone the child is killed: nobody could stop it
/// otherwise.
async fn reap(
    name: String,
    mut child: Child,
    exit: watch::Sender<Option<i32>>,
    mut control: mpsc::UnboundedReceiver<Control>,
) {
    let mut detached = false;
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            request = control.recv(), if !detached => match request {
                Some(Control::Kill) => {
                    debug!("Killing '{}'", name);
                    if let Err(e) = child.start_kill() {
                        warn!("Failed to kill '{}': {}", name, e);
                    }
                }
                None => {
                    detached = true;
                    debug!("All handles to '{}' dropped, killing", name);
                    let _ = child.start_kill();
                }
            },
        }
    };

    let code = match status {
        Ok(status) => exit_code(status),
        Err(e) => {
            warn!("Failed to wait for '{}': {}", name, e);
            -1
        }
    };
    debug!("'{}' exited with code {}", name, code);
    exit.send_replace(Some(code));
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Process double driven by paused tokio time.
    ///
    /// `terminate` schedules an exit after `exit_after_terminate` (never if
    /// `None`); `kill` exits at once unless `survives_kill` is set.
    pub(crate) struct MockProcess {
        exit: watch::Sender<Option<i32>>,
        exit_after_terminate: Option<Duration>,
        survives_kill: bool,
        fail_terminate: bool,
        pub(crate) terminate_calls: AtomicUsize,
        pub(crate) kill_calls: AtomicUsize,
    }

    impl MockProcess {
        pub(crate) fn running() -> Self {
            Self {
                exit: watch::channel(None).0,
                exit_after_terminate: Some(Duration::ZERO),
                survives_kill: false,
                fail_terminate: false,
                terminate_calls: AtomicUsize::new(0),
                kill_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn exited(code: i32) -> Self {
            let process = Self::running();
            process.exit.send_replace(Some(code));
            process
        }

        /// Ignores SIGTERM for `delay`.
        pub(crate) fn slow_to_terminate(delay: Duration) -> Self {
            Self {
                exit_after_terminate: Some(delay),
                ..Self::running()
            }
        }

        /// Ignores both signals.
        pub(crate) fn unkillable() -> Self {
            Self {
                exit_after_terminate: None,
                survives_kill: true,
                ..Self::running()
            }
        }

        pub(crate) fn failing_terminate() -> Self {
            Self {
                fail_terminate: true,
                ..Self::running()
            }
        }

        pub(crate) fn terminates(&self) -> usize {
            self.terminate_calls.load(Ordering::SeqCst)
        }

        pub(crate) fn kills(&self) -> usize {
            self.kill_calls.load(Ordering::SeqCst)
        }

        pub(crate) fn exit_now(&self, code: i32) {
            self.exit.send_if_modified(|current| {
                if current.is_none() {
                    *current = Some(code);
                    true
                } else {
                    false
                }
            });
        }
    }

    #[async_trait]
    impl ManagedProcess for MockProcess {
        fn pid(&self) -> Option<u32> {
            Some(4242)
        }

        fn returncode(&self) -> Option<i32> {
            *self.exit.borrow()
        }

        fn terminate(&self) -> std::io::Result<()> {
            self.terminate_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_terminate {
                return Err(std::io::Error::other("permission denied"));
            }
            match self.exit_after_terminate {
                Some(delay) if delay.is_zero() => self.exit_now(-15),
                Some(delay) => {
                    let exit = self.exit.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        exit.send_if_modified(|c| c.is_none() && c.replace(-15).is_none());
                    });
                }
                None => {}
            }
            Ok(())
        }

        fn kill(&self) -> std::io::Result<()> {
            self.kill_calls.fetch_add(1, Ordering::SeqCst);
            if !self.survives_kill {
                self.exit_now(-9);
            }
            Ok(())
        }

        async fn wait(&self) -> Option<i32> {
            let mut exit = self.exit.subscribe();
            exit.wait_for(Option::is_some).await.ok().and_then(|code| *code)
        }
    }

    #[test]
    fn test_mock_exit_now_keeps_first_code() {
        let process = MockProcess::running();
        process.exit_now(0);
        process.exit_now(1);
        assert_eq!(process.returncode(), Some(0));
    }

    #[tokio::test]
    async fn test_empty_argv_is_rejected() {
        let result = ChildProcess::spawn("empty", &[], &BTreeMap::new());
        assert!(matches!(result, Err(LifecycleError::EmptyCommand(name)) if name == "empty"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let argv = vec!["/nonexistent/toolrouter-test-binary".to_string()];
        let result = ChildProcess::spawn("ghost", &argv, &BTreeMap::new());
        assert!(matches!(result, Err(LifecycleError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_code_is_published() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 3".to_string()];
        let (process, _pipes) = ChildProcess::spawn("sh", &argv, &BTreeMap::new()).unwrap();
        assert_eq!(process.wait().await, Some(3));
        assert_eq!(process.returncode(), Some(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_terminate_reports_negative_signal() {
        let argv = vec!["sleep".to_string(), "30".to_string()];
        let (process, _pipes) = ChildProcess::spawn("sleep", &argv, &BTreeMap::new()).unwrap();
        assert!(process.returncode().is_none());

        process.terminate().unwrap();
        let code = tokio::time::timeout(Duration::from_secs(5), process.wait())
            .await
            .unwrap();
        assert_eq!(code, Some(-libc::SIGTERM));

        // Signalling an exited process is a no-op
        process.terminate().unwrap();
        process.kill().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_env_is_overlaid() {
        use tokio::io::AsyncReadExt;

        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf %s \"$TOOLROUTER_TEST_VALUE\"".to_string(),
        ];
        let env = BTreeMap::from([("TOOLROUTER_TEST_VALUE".to_string(), "hello".to_string())]);
        let (process, pipes) = ChildProcess::spawn("env", &argv, &env).unwrap();

        let mut out = String::new();
        pipes.stdout.unwrap().read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello");
        assert_eq!(process.wait().await, Some(0));
    }
}
