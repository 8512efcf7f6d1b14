//! Host bridge backed by a port file.
//!
//! The desktop host launches the backend with the path of a port file as its
//! last argument; the backend binds an ephemeral port and writes it there.
//! This adapter reads that file and, when a launch command is configured,
//! plays the host's part of launching the backend itself.
//!
//! Every `inkling` invocation builds a fresh bridge, so the launched
//! backend's pid is recorded in `{port_file}.pid`. A later invocation reuses
//! a backend that is still alive and `cleanup_backend` stops it by pid.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::bridge::HostBridge;
use super::error::HostError;
use super::{CLEANUP_BACKEND, GET_BACKEND_PORT, START_BACKEND};

const PORT_FILE_POLL: Duration = Duration::from_millis(200);
const PORT_FILE_SETTLE: Duration = Duration::from_millis(100);

pub struct PortFileBridge {
    port_file: PathBuf,
    pid_file: PathBuf,
    backend_command: Option<Vec<String>>,
    wait_timeout: Duration,
    poll_interval: Duration,
    launched: AtomicBool,
    child: Mutex<Option<Child>>,
}

impl PortFileBridge {
    pub fn new(port_file: PathBuf) -> Self {
        let mut pid_file = OsString::from(port_file.as_os_str());
        pid_file.push(".pid");

        Self {
            port_file,
            pid_file: PathBuf::from(pid_file),
            backend_command: None,
            wait_timeout: Duration::from_secs(30),
            poll_interval: PORT_FILE_POLL,
            launched: AtomicBool::new(false),
            child: Mutex::new(None),
        }
    }

    /// Launch the backend with this argv; the port file path is appended.
    pub fn with_backend_command(mut self, argv: Vec<String>) -> Self {
        self.backend_command = Some(argv).filter(|a| !a.is_empty());
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn port_file(&self) -> &Path {
        &self.port_file
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    async fn read_port(&self) -> Result<u16, HostError> {
        let raw = tokio::fs::read_to_string(&self.port_file).await.map_err(|e| {
            HostError::Command(format!(
                "failed to read port file at {}: {e}",
                self.port_file.display()
            ))
        })?;

        raw.trim()
            .parse::<u16>()
            .map_err(|e| HostError::Command(format!("invalid port format in file: {e}")))
    }

    /// Pid recorded by whichever invocation launched the backend.
    async fn recorded_pid(&self) -> Option<u32> {
        let raw = tokio::fs::read_to_string(&self.pid_file).await.ok()?;
        raw.trim().parse().ok()
    }

    /// Pid of a previously launched backend that is still serving.
    async fn running_backend(&self) -> Option<u32> {
        let pid = self.recorded_pid().await?;
        if tokio::fs::metadata(&self.port_file).await.is_err() {
            return None;
        }
        process_alive(pid).await.then_some(pid)
    }

    async fn start_backend(&self) -> Result<(), HostError> {
        // Launch at most once; later calls only wait for the port file.
        if !self.launched.swap(true, Ordering::SeqCst) {
            if let Some(argv) = &self.backend_command {
                match self.running_backend().await {
                    Some(pid) => info!(pid, "backend already running, reusing it"),
                    None => self.launch(argv).await?,
                }
            }
        } else {
            debug!("backend already launched, waiting for port file");
        }

        self.wait_for_port_file().await
    }

    async fn launch(&self, argv: &[String]) -> Result<(), HostError> {
        // Leftovers from a previous run would point at a dead backend.
        self.remove_state_files().await;

        let (program, args) = argv
            .split_first()
            .ok_or_else(|| HostError::Command("empty backend command".to_string()))?;

        info!(program = %program, port_file = %self.port_file.display(), "launching backend");

        let child = Command::new(program)
            .args(args)
            .arg(&self.port_file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| HostError::Command(format!("failed to start backend: {e}")))?;

        if let Some(pid) = child.id() {
            if let Err(e) = tokio::fs::write(&self.pid_file, pid.to_string()).await {
                warn!(error = %e, pid_file = %self.pid_file.display(), "failed to record backend pid");
            }
        }

        *self.child.lock().await = Some(child);
        Ok(())
    }

    async fn wait_for_port_file(&self) -> Result<(), HostError> {
        let deadline = tokio::time::Instant::now() + self.wait_timeout;

        loop {
            if tokio::fs::metadata(&self.port_file).await.is_ok() {
                // The backend writes the file right after binding; give it a moment to finish.
                tokio::time::sleep(PORT_FILE_SETTLE).await;
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(HostError::Command(format!(
                    "timeout waiting for backend to start after {} seconds",
                    self.wait_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Stop the launched backend. Returns whether anything was stopped.
    async fn cleanup_backend(&self) -> Result<bool, HostError> {
        if let Some(mut child) = self.child.lock().await.take() {
            child
                .kill()
                .await
                .map_err(|e| HostError::Command(format!("failed to stop backend: {e}")))?;
            self.remove_state_files().await;
            info!("backend process stopped");
            return Ok(true);
        }

        let Some(pid) = self.recorded_pid().await else {
            debug!("no backend process to clean up");
            return Ok(false);
        };

        if !process_alive(pid).await {
            debug!(pid, "recorded backend already exited");
            self.remove_state_files().await;
            return Ok(false);
        }

        terminate_process(pid).await?;
        self.remove_state_files().await;
        info!(pid, "backend process stopped");
        Ok(true)
    }

    async fn remove_state_files(&self) {
        let _ = tokio::fs::remove_file(&self.port_file).await;
        let _ = tokio::fs::remove_file(&self.pid_file).await;
    }
}

#[async_trait]
impl HostBridge for PortFileBridge {
    async fn invoke(&self, command: &str, _args: Option<Value>) -> Result<Value, HostError> {
        match command {
            GET_BACKEND_PORT => self.read_port().await.map(|port| json!(port)),
            START_BACKEND => self.start_backend().await.map(|_| Value::Null),
            CLEANUP_BACKEND => self
                .cleanup_backend()
                .await
                .map(|stopped| json!({ "stopped": stopped })),
            other => Err(HostError::Command(format!("unknown host command: {other}"))),
        }
    }
}

#[cfg(not(windows))]
async fn process_alive(pid: u32) -> bool {
    Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok_and(|status| status.success())
}

#[cfg(windows)]
async fn process_alive(pid: u32) -> bool {
    let filter = format!("PID eq {pid}");
    match Command::new("tasklist")
        .args(["/FI", filter.as_str(), "/NH", "/FO", "CSV"])
        .output()
        .await
    {
        Ok(output) => String::from_utf8_lossy(&output.stdout).contains(&format!("\"{pid}\"")),
        Err(_) => false,
    }
}

#[cfg(not(windows))]
async fn terminate_process(pid: u32) -> Result<(), HostError> {
    let mut kill = Command::new("kill");
    kill.arg(pid.to_string());
    run_kill(&mut kill, pid).await
}

#[cfg(windows)]
async fn terminate_process(pid: u32) -> Result<(), HostError> {
    let mut kill = Command::new("taskkill");
    kill.args(["/PID", &pid.to_string(), "/T", "/F"]);
    run_kill(&mut kill, pid).await
}

async fn run_kill(command: &mut Command, pid: u32) -> Result<(), HostError> {
    let output = command
        .output()
        .await
        .map_err(|e| HostError::Command(format!("failed to stop backend: {e}")))?;

    if !output.status.success() {
        return Err(HostError::Command(format!(
            "failed to stop backend process {pid}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn bridge(dir: &TempDir) -> PortFileBridge {
        PortFileBridge::new(dir.path().join("backend_port.txt"))
            .with_wait_timeout(Duration::from_secs(2))
            .with_poll_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_reads_trimmed_port() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);
        std::fs::write(bridge.port_file(), "51234\n").unwrap();

        let port = bridge.invoke(GET_BACKEND_PORT, None).await.unwrap();
        assert_eq!(port, json!(51234));
    }

    #[tokio::test]
    async fn test_missing_port_file_is_command_error() {
        let dir = TempDir::new().unwrap();
        let err = bridge(&dir).invoke(GET_BACKEND_PORT, None).await.unwrap_err();
        assert!(matches!(err, HostError::Command(msg) if msg.contains("failed to read port file")));
    }

    #[tokio::test]
    async fn test_malformed_port_file_is_command_error() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);
        std::fs::write(bridge.port_file(), "not-a-port").unwrap();

        let err = bridge.invoke(GET_BACKEND_PORT, None).await.unwrap_err();
        assert!(matches!(err, HostError::Command(msg) if msg.contains("invalid port format")));
    }

    #[tokio::test]
    async fn test_start_waits_for_externally_written_file() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);
        let path = bridge.port_file().to_path_buf();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tokio::fs::write(path, "40100").await.unwrap();
        });

        bridge.invoke(START_BACKEND, None).await.unwrap();
        assert_eq!(bridge.invoke(GET_BACKEND_PORT, None).await.unwrap(), json!(40100));
    }

    #[tokio::test]
    async fn test_start_times_out_without_port_file() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir).with_wait_timeout(Duration::from_millis(50));

        let err = bridge.invoke(START_BACKEND, None).await.unwrap_err();
        assert!(matches!(err, HostError::Command(msg) if msg.contains("timeout")));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_launches_command_with_port_file_argument() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir).with_backend_command(vec![
            "sh".to_string(),
            "-c".to_string(),
            "printf 40222 > \"$0\"".to_string(),
        ]);
        std::fs::write(bridge.port_file(), "1").unwrap();

        bridge.invoke(START_BACKEND, None).await.unwrap();
        assert_eq!(bridge.invoke(GET_BACKEND_PORT, None).await.unwrap(), json!(40222));
    }

    #[tokio::test]
    async fn test_cleanup_without_backend_reports_nothing_stopped() {
        let dir = TempDir::new().unwrap();
        let result = bridge(&dir).invoke(CLEANUP_BACKEND, None).await.unwrap();
        assert_eq!(result, json!({ "stopped": false }));
    }

    #[tokio::test]
    async fn test_cleanup_with_stale_pid_file_reports_nothing_stopped() {
        let dir = TempDir::new().unwrap();
        let bridge = bridge(&dir);
        std::fs::write(bridge.port_file(), "40300").unwrap();
        // Larger than any pid the kernel hands out.
        std::fs::write(bridge.pid_file(), "4194304999").unwrap();

        let result = bridge.invoke(CLEANUP_BACKEND, None).await.unwrap();
        assert_eq!(result, json!({ "stopped": false }));
        assert!(!bridge.pid_file().exists());
        assert!(!bridge.port_file().exists());
    }

    #[test]
    fn test_pid_file_sits_next_to_port_file() {
        let bridge = PortFileBridge::new(PathBuf::from("/tmp/inkling/backend_port.txt"));
        assert_eq!(bridge.pid_file(), Path::new("/tmp/inkling/backend_port.txt.pid"));
    }

    /// Separate bridges on one port file stand in for separate `inkling` runs.
    #[cfg(unix)]
    #[tokio::test]
    async fn test_backend_shared_across_invocations() {
        let dir = TempDir::new().unwrap();
        let launches = dir.path().join("backend_port.txt.launches");
        let invocation = || {
            bridge(&dir).with_backend_command(vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo launched >> \"$0.launches\"; printf 40444 > \"$0\"; exec sleep 30".to_string(),
            ])
        };

        let first = invocation();
        first.invoke(START_BACKEND, None).await.unwrap();
        let pid: u32 = std::fs::read_to_string(first.pid_file())
            .unwrap()
            .trim()
            .parse()
            .unwrap();

        let second = invocation();
        second.invoke(START_BACKEND, None).await.unwrap();
        assert_eq!(second.invoke(GET_BACKEND_PORT, None).await.unwrap(), json!(40444));
        assert!(second.child.lock().await.is_none());
        assert_eq!(std::fs::read_to_string(&launches).unwrap().lines().count(), 1);

        let stop = invocation();
        let result = stop.invoke(CLEANUP_BACKEND, None).await.unwrap();
        assert_eq!(result, json!({ "stopped": true }));
        assert!(!stop.pid_file().exists());
        assert!(!stop.port_file().exists());

        let mut child = first.child.lock().await.take().unwrap();
        assert_eq!(child.id(), Some(pid));
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .unwrap()
            .unwrap();
        assert!(!status.success());

        let again = invocation().invoke(CLEANUP_BACKEND, None).await.unwrap();
        assert_eq!(again, json!({ "stopped": false }));
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let dir = TempDir::new().unwrap();
        let err = bridge(&dir).invoke("open_window", None).await.unwrap_err();
        assert_eq!(err, HostError::Command("unknown host command: open_window".to_string()));
    }
}
