//! Torrent engine backed by an external BitTorrent client process.
//!
//! One client process runs per locator, writing into the session's own
//! directory. Readiness is derived from the directory contents: once a media
//! file reaches the configured threshold, sequential playback is viable.
//! Pausing stops the process; resuming starts it again over the same
//! directory, which the client picks up from its control file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;

use super::{FetchEngine, FetchError};
use crate::bus::{Signal, SignalBus};
use crate::config::{EngineConfig, FetchConfig};
use crate::locator::Locator;

// Files the client writes next to the payload
const IGNORED_SUFFIXES: &[&str] = &[".aria2", ".torrent", ".part", ".tmp"];
const MAX_SCAN_DEPTH: usize = 2;

#[derive(Debug)]
struct Download {
    destination: PathBuf,
    ready_path: Arc<Mutex<Option<PathBuf>>>,
    stop: Option<oneshot::Sender<()>>,
    exited: Arc<AtomicBool>,
}

impl Download {
    /// A client was spawned and has neither been stopped nor exited.
    fn is_running(&self) -> bool {
        self.stop.is_some() && !self.exited.load(Ordering::Acquire)
    }
}

/// Engine running one external client process per locator.
#[derive(Debug)]
pub struct ProcessFetchEngine {
    bus: SignalBus,
    program: PathBuf,
    args: Vec<String>,
    ready_threshold_bytes: u64,
    poll_interval: Duration,
    downloads: HashMap<Locator, Download>,
}

impl ProcessFetchEngine {
    /// Creates an engine for the configured client program.
    ///
    /// # Errors
    /// - `FetchError::EngineUnavailable` - Client program cannot be found
    pub fn new(
        bus: SignalBus,
        engine: &EngineConfig,
        fetch: &FetchConfig,
    ) -> Result<Self, FetchError> {
        let program =
            resolve_program(&engine.program).ok_or_else(|| FetchError::EngineUnavailable {
                reason: format!("'{}' was not found in PATH", engine.program),
            })?;

        tracing::debug!("Using torrent client {}", program.display());

        Ok(Self {
            bus,
            program,
            args: engine.args.clone(),
            ready_threshold_bytes: fetch.ready_threshold_bytes,
            poll_interval: fetch.poll_interval,
            downloads: HashMap::new(),
        })
    }

    fn spawn_client(
        &self,
        locator: &Locator,
        download: &mut Download,
    ) -> Result<(), FetchError> {
        let child = Command::new(&self.program)
            .args(build_args(&self.args, locator, &download.destination))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FetchError::EngineUnavailable {
                reason: format!("cannot start {}: {e}", self.program.display()),
            })?;

        let (stop_tx, stop_rx) = oneshot::channel();
        download.stop = Some(stop_tx);
        download.exited = Arc::new(AtomicBool::new(false));

        let monitor = ClientMonitor {
            bus: self.bus.clone(),
            locator: locator.clone(),
            destination: download.destination.clone(),
            ready_path: Arc::clone(&download.ready_path),
            exited: Arc::clone(&download.exited),
            threshold: self.ready_threshold_bytes,
            poll_interval: self.poll_interval,
        };
        tokio::spawn(monitor.run(child, stop_rx));

        Ok(())
    }
}

#[async_trait]
impl FetchEngine for ProcessFetchEngine {
    async fn begin_fetch(
        &mut self,
        locator: &Locator,
        destination: &Path,
    ) -> Result<(), FetchError> {
        if let Some(existing) = self.downloads.get(locator) {
            let ready = existing.ready_path.lock().clone();
            if let Some(local_path) = ready {
                tracing::debug!("{} already playable, announcing again", locator);
                self.bus.emit(Signal::ContentReady {
                    locator: locator.clone(),
                    local_path,
                });
            }
            if existing.is_running() {
                return Ok(());
            }
            tracing::debug!("Client for {} is not running, starting it again", locator);
            return self.resume(locator).await;
        }

        tokio::fs::create_dir_all(destination).await?;

        let mut download = Download {
            destination: destination.to_path_buf(),
            ready_path: Arc::new(Mutex::new(None)),
            stop: None,
            exited: Arc::new(AtomicBool::new(false)),
        };
        self.spawn_client(locator, &mut download)?;
        self.downloads.insert(locator.clone(), download);

        Ok(())
    }

    async fn pause(&mut self, locator: &Locator) -> Result<(), FetchError> {
        let download = self
            .downloads
            .get_mut(locator)
            .ok_or_else(|| FetchError::UnknownLocator {
                locator: locator.clone(),
            })?;

        match download.stop.take() {
            Some(stop) => {
                let _ = stop.send(());
                tracing::debug!("Stopped client for {}", locator);
            }
            None => tracing::debug!("{} already paused", locator),
        }
        Ok(())
    }

    async fn resume(&mut self, locator: &Locator) -> Result<(), FetchError> {
        let mut download =
            self.downloads
                .remove(locator)
                .ok_or_else(|| FetchError::UnknownLocator {
                    locator: locator.clone(),
                })?;

        let result = if download.is_running() {
            Ok(())
        } else {
            self.spawn_client(locator, &mut download)
        };

        self.downloads.insert(locator.clone(), download);
        result
    }
}

/// Watches one client process and translates its progress into signals.
struct ClientMonitor {
    bus: SignalBus,
    locator: Locator,
    destination: PathBuf,
    ready_path: Arc<Mutex<Option<PathBuf>>>,
    exited: Arc<AtomicBool>,
    threshold: u64,
    poll_interval: Duration,
}

impl ClientMonitor {
    async fn run(self, mut child: Child, mut stop: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.poll_interval);

        loop {
            let waiting = self.ready_path.lock().is_none();

            tokio::select! {
                status = child.wait() => {
                    self.exited.store(true, Ordering::Release);
                    self.on_exit(status).await;
                    break;
                }
                _ = &mut stop => {
                    if let Err(e) = child.kill().await {
                        tracing::warn!("Could not stop client for {}: {}", self.locator, e);
                    }
                    break;
                }
                _ = ticker.tick(), if waiting => {
                    let found = find_playable(&self.destination, self.threshold).await;
                    if let Some(local_path) = found {
                        self.announce(local_path);
                    }
                }
            }
        }
    }

    fn announce(&self, local_path: PathBuf) {
        tracing::info!(
            "Enough of {} is available, notifying ({})",
            self.locator,
            local_path.display()
        );
        *self.ready_path.lock() = Some(local_path.clone());
        self.bus.emit(Signal::ContentReady {
            locator: self.locator.clone(),
            local_path,
        });
    }

    async fn on_exit(&self, status: std::io::Result<std::process::ExitStatus>) {
        let announced = self.ready_path.lock().is_some();

        match status {
            Ok(status) if status.success() => {
                if !announced {
                    if let Some(local_path) = find_playable(&self.destination, 1).await {
                        self.announce(local_path);
                    }
                }
                tracing::info!("Fetch of {} completed", self.locator);
                self.bus.emit(Signal::FetchCompleted {
                    locator: self.locator.clone(),
                });
            }
            Ok(status) => {
                self.on_failure(announced, format!("torrent client exited with {status}"));
            }
            Err(e) => self.on_failure(announced, format!("torrent client failed: {e}")),
        }
    }

    fn on_failure(&self, announced: bool, reason: String) {
        if announced {
            tracing::warn!("{} after {} became playable", reason, self.locator);
        } else {
            tracing::error!("Fetch of {} failed: {}", self.locator, reason);
            self.bus.emit(Signal::FetchFailed {
                locator: self.locator.clone(),
                reason,
            });
        }
    }
}

pub(crate) fn resolve_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }

    let search_path = std::env::var_os("PATH")?;
    std::env::split_paths(&search_path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

fn build_args(template: &[String], locator: &Locator, destination: &Path) -> Vec<String> {
    let destination = destination.to_string_lossy();
    template
        .iter()
        .map(|arg| {
            arg.replace("{destination}", &destination)
                .replace("{locator}", locator.as_str())
        })
        .collect()
}

/// Largest payload file under `dir` holding at least `threshold` bytes.
async fn find_playable(dir: &Path, threshold: u64) -> Option<PathBuf> {
    let threshold = threshold.max(1);
    let mut best: Option<(u64, PathBuf)> = None;
    let mut pending = vec![(dir.to_path_buf(), 0usize)];

    while let Some((current, depth)) = pending.pop() {
        let Ok(mut entries) = tokio::fs::read_dir(&current).await else {
            continue;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };

            if metadata.is_dir() {
                if depth < MAX_SCAN_DEPTH {
                    pending.push((path, depth + 1));
                }
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || IGNORED_SUFFIXES.iter().any(|s| name.ends_with(s)) {
                continue;
            }

            let len = metadata.len();
            if len >= threshold && best.as_ref().is_none_or(|(size, _)| len > *size) {
                best = Some((len, path));
            }
        }
    }

    best.map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::topics;

    #[test]
    fn test_missing_program_is_unavailable() {
        let engine = EngineConfig {
            program: "peerwatch-definitely-not-installed".to_string(),
            ..EngineConfig::default()
        };
        let result = ProcessFetchEngine::new(SignalBus::new(), &engine, &FetchConfig::default());
        assert!(matches!(result, Err(FetchError::EngineUnavailable { .. })));
    }

    #[test]
    fn test_placeholders_are_substituted() {
        let template = vec![
            "--dir".to_string(),
            "{destination}".to_string(),
            "--out={destination}/x".to_string(),
            "{locator}".to_string(),
        ];
        let args = build_args(&template, &Locator::new("magnet:?xt=abc"), Path::new("/dl/abc"));
        assert_eq!(args, vec!["--dir", "/dl/abc", "--out=/dl/abc/x", "magnet:?xt=abc"]);
    }

    #[tokio::test]
    async fn test_find_playable_skips_control_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("Some Video");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(dir.path().join("video.mp4.aria2"), vec![0u8; 8192]).await.unwrap();
        tokio::fs::write(nested.join("small.srt"), vec![0u8; 10]).await.unwrap();
        tokio::fs::write(nested.join("video.mp4"), vec![0u8; 4096]).await.unwrap();

        assert_eq!(
            find_playable(dir.path(), 1024).await,
            Some(nested.join("video.mp4"))
        );
        assert_eq!(find_playable(dir.path(), 1024 * 1024).await, None);
    }

    #[cfg(unix)]
    fn shell_engine(bus: &SignalBus, script: &str) -> ProcessFetchEngine {
        let engine = EngineConfig {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            ..EngineConfig::default()
        };
        let fetch = FetchConfig {
            ready_threshold_bytes: 1024,
            poll_interval: Duration::from_millis(10),
            ..FetchConfig::default()
        };
        ProcessFetchEngine::new(bus.clone(), &engine, &fetch).unwrap()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_client_output_triggers_ready_then_completed() {
        let bus = SignalBus::new();
        let dir = tempfile::tempdir().unwrap();
        let mut signals = bus.subscribe_channel(&[topics::CONTENT_READY, topics::FETCH_COMPLETED]);
        let mut engine = shell_engine(
            &bus,
            "head -c 4096 /dev/zero > '{destination}/video.mp4' && sleep 0.2",
        );

        let locator = Locator::new("https://example.org/torrents/video-720.torrent");
        engine.begin_fetch(&locator, dir.path()).await.unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            first,
            Signal::ContentReady { local_path, .. } if local_path == dir.path().join("video.mp4")
        ));

        let second = tokio::time::timeout(Duration::from_secs(5), signals.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(second, Signal::FetchCompleted { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_client_exit_before_ready_is_failure() {
        let bus = SignalBus::new();
        let dir = tempfile::tempdir().unwrap();
        let mut failures = bus.subscribe_channel(&[topics::FETCH_FAILED]);
        let mut engine = shell_engine(&bus, "exit 3");

        engine
            .begin_fetch(&Locator::new("loc"), dir.path())
            .await
            .unwrap();

        let signal = tokio::time::timeout(Duration::from_secs(5), failures.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(signal, Signal::FetchFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_after_failure_starts_new_client() {
        let bus = SignalBus::new();
        let dir = tempfile::tempdir().unwrap();
        let mut failures = bus.subscribe_channel(&[topics::FETCH_FAILED]);
        let mut engine = shell_engine(&bus, "exit 3");
        let locator = Locator::new("loc");

        for _ in 0..2 {
            engine.begin_fetch(&locator, dir.path()).await.unwrap();

            let signal = tokio::time::timeout(Duration::from_secs(5), failures.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(
                signal,
                Signal::FetchFailed { locator: ref failed, .. } if *failed == locator
            ));
        }
        assert!(!engine.downloads[&locator].is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_pause_stops_and_resume_restarts() {
        let bus = SignalBus::new();
        let dir = tempfile::tempdir().unwrap();
        let mut engine = shell_engine(&bus, "sleep 30");
        let locator = Locator::new("loc");

        engine.begin_fetch(&locator, dir.path()).await.unwrap();
        engine.pause(&locator).await.unwrap();
        assert!(engine.downloads[&locator].stop.is_none());

        engine.resume(&locator).await.unwrap();
        assert!(engine.downloads[&locator].stop.is_some());

        let unknown = engine.pause(&Locator::new("other")).await;
        assert!(matches!(unknown, Err(FetchError::UnknownLocator { .. })));
    }
}
