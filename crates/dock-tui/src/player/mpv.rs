/// mpv JSON IPC driver.
///
/// ```text
///   MpvPlayer::ensure_running()
///         │
///         ├── writer_task   ← receives PendingRequest via mpsc, writes → socket
///         └── reader_task   ← reads JSON lines from socket
///                                ├── reply (has request_id) → matching oneshot
///                                └── event                   → logged, dropped
/// ```
///
/// The process is spawned lazily on the first `load` and respawned if it has
/// exited since. Unix uses a domain socket, Windows a named pipe.
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use dock_proto::platform;

use super::Playback;

#[cfg(unix)]
use tokio::net::UnixStream;

#[cfg(windows)]
use tokio::net::windows::named_pipe::ClientOptions;

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const PROPERTY_UNAVAILABLE: &str = "property unavailable";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MpvError {
    #[error("mpv error: {0}")]
    Command(String),
    #[error("mpv IPC timeout for req={0}")]
    Timeout(u64),
    #[error("mpv IPC connection closed")]
    Closed,
    #[error("mpv IPC: {0}")]
    Io(String),
}

type Reply = Result<Value, MpvError>;
type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Reply>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String,
    reply: oneshot::Sender<Reply>,
}

/// Cloneable handle to the writer task.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> Result<Value, MpvError> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let mut raw = json!({ "command": command, "request_id": req_id }).to_string();
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| MpvError::Closed)?;

        tokio::time::timeout(REPLY_TIMEOUT, reply_rx)
            .await
            .map_err(|_| MpvError::Timeout(req_id))?
            .map_err(|_| MpvError::Closed)?
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Reads a property, mapping "unavailable" (nothing loaded yet) to `None`.
    pub async fn get_property(&self, name: &str) -> Result<Option<Value>, MpvError> {
        match self.send(json!(["get_property", name])).await {
            Ok(resp) => Ok(resp.get("data").cloned().filter(|v| !v.is_null())),
            Err(MpvError::Command(e)) if e == PROPERTY_UNAVAILABLE => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn set_property(&self, name: &str, value: Value) -> Result<(), MpvError> {
        self.send(json!(["set_property", name, value])).await.map(|_| ())
    }
}

/// Splits `stream` into the reader/writer task pair and returns the handle.
pub fn start_io_tasks<S>(stream: S) -> MpvHandle
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending));

    MpvHandle { tx: cmd_tx }
}

/// Splits one IPC line into its request id and outcome. Lines without a
/// request id are events.
fn parse_reply(line: &str) -> Option<(u64, Reply)> {
    let val: Value = serde_json::from_str(line).ok()?;
    let req_id = val.get("request_id")?.as_u64()?;
    let result = match val.get("error").and_then(Value::as_str) {
        Some("success") => Ok(val),
        Some(err) => Err(MpvError::Command(err.to_string())),
        None => Err(MpvError::Command("unknown error".to_string())),
    };
    Some((req_id, result))
}

async fn fail_all(pending: &PendingMap, err: MpvError) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(err.clone()));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap)
where
    R: AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_all(&pending, MpvError::Closed).await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match parse_reply(trimmed) {
                    Some((req_id, result)) => {
                        let mut map = pending.lock().await;
                        match map.remove(&req_id) {
                            Some(tx) => {
                                let _ = tx.send(result);
                            }
                            None => debug!("mpv reader: reply for unknown req={}", req_id),
                        }
                    }
                    None => debug!("mpv reader: event {}", trimmed),
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_all(&pending, MpvError::Io(e.to_string())).await;
                break;
            }
        }
    }
}

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // registered before the write so the reader can always match the reply
        pending.lock().await.insert(req.req_id, req.reply);
        debug!("mpv writer: req={} {}", req.req_id, req.payload.trim());
        let written = match writer.write_all(req.payload.as_bytes()).await {
            Ok(()) => writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("mpv writer: write error: {}", e);
            if let Some(tx) = pending.lock().await.remove(&req.req_id) {
                let _ = tx.send(Err(MpvError::Io(e.to_string())));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}

/// mpv process plus its IPC connection.
pub struct MpvPlayer {
    socket_name: String,
    extra_args: Vec<String>,
    process: Option<tokio::process::Child>,
    handle: Option<MpvHandle>,
}

impl MpvPlayer {
    pub fn new(extra_args: Vec<String>) -> Self {
        Self {
            socket_name: platform::mpv_socket_name(),
            extra_args,
            process: None,
            handle: None,
        }
    }

    fn process_alive(&mut self) -> bool {
        let Some(child) = self.process.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                match status.code() {
                    Some(code) => warn!("mpv exited with code {}", code),
                    None => warn!("mpv terminated by signal"),
                }
                false
            }
            Err(e) => {
                warn!("mpv liveness check failed: {}", e);
                false
            }
        }
    }

    fn connected(&mut self) -> Option<MpvHandle> {
        let open = self.handle.as_ref().is_some_and(|h| !h.is_closed());
        if open && self.process_alive() {
            self.handle.clone()
        } else {
            None
        }
    }

    async fn ensure_running(&mut self) -> anyhow::Result<MpvHandle> {
        if let Some(handle) = self.connected() {
            return Ok(handle);
        }
        self.handle = None;
        if let Some(mut p) = self.process.take() {
            let _ = p.kill().await;
        }

        let handle = self.spawn_and_connect().await?;
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    fn command(&self) -> anyhow::Result<tokio::process::Command> {
        let binary = platform::find_mpv_binary().ok_or_else(|| anyhow::anyhow!("mpv binary not found"))?;
        let mut cmd = tokio::process::Command::new(binary);
        cmd.arg("--idle=yes")
            .arg("--force-window=yes")
            .arg("--keep-open=yes")
            .arg("--quiet")
            .arg(platform::mpv_socket_arg())
            .args(&self.extra_args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .kill_on_drop(true);

        let stderr_path = platform::data_dir().join("mpv-stderr.log");
        match std::fs::OpenOptions::new().create(true).append(true).open(&stderr_path) {
            Ok(file) => {
                cmd.stderr(file);
            }
            Err(e) => {
                warn!("mpv: cannot open {:?}: {}", stderr_path, e);
                cmd.stderr(std::process::Stdio::null());
            }
        }
        Ok(cmd)
    }

    #[cfg(unix)]
    async fn spawn_and_connect(&mut self) -> anyhow::Result<MpvHandle> {
        let socket_path = PathBuf::from(&self.socket_name);
        let _ = tokio::fs::remove_file(&socket_path).await;

        let child = self.command()?.spawn()?;
        info!("mpv: spawned pid {:?}", child.id());
        self.process = Some(child);

        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if socket_path.exists() {
                if let Ok(stream) = UnixStream::connect(&socket_path).await {
                    info!("mpv: connected to {:?}", socket_path);
                    return Ok(start_io_tasks(stream));
                }
            }
        }
        anyhow::bail!("mpv IPC socket did not appear")
    }

    #[cfg(windows)]
    async fn spawn_and_connect(&mut self) -> anyhow::Result<MpvHandle> {
        let child = self.command()?.spawn()?;
        info!("mpv: spawned pid {:?}", child.id());
        self.process = Some(child);

        let pipe_path = format!(r"\\.\pipe\{}", self.socket_name);
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Ok(client) = ClientOptions::new().open(&pipe_path) {
                info!("mpv: connected to {}", pipe_path);
                return Ok(start_io_tasks(client));
            }
        }
        anyhow::bail!("mpv named pipe did not appear")
    }

    fn handle(&self) -> anyhow::Result<&MpvHandle> {
        self.handle.as_ref().ok_or_else(|| anyhow::anyhow!("mpv is not running"))
    }

    async fn number_property(&self, name: &str) -> anyhow::Result<Option<f64>> {
        let Some(handle) = self.handle.as_ref() else {
            return Ok(None);
        };
        Ok(handle.get_property(name).await?.and_then(|v| v.as_f64()))
    }
}

impl Playback for MpvPlayer {
    async fn load(&mut self, url: &str, paused: bool) -> anyhow::Result<()> {
        let handle = self.ensure_running().await?;
        handle.set_property("pause", json!(paused)).await?;
        handle.send(json!(["loadfile", url, "replace"])).await?;
        debug!("mpv: loaded {} paused={}", url, paused);
        Ok(())
    }

    async fn seek(&mut self, secs: f64) -> anyhow::Result<()> {
        let handle = self.handle()?.clone();
        // right after loadfile the demuxer may not be ready to seek yet
        for _ in 0..30 {
            match handle.send(json!(["seek", secs, "absolute"])).await {
                Ok(_) => return Ok(()),
                Err(MpvError::Command(e)) => {
                    debug!("mpv: seek not ready ({}), waiting", e);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
        anyhow::bail!("mpv: could not seek to {}s", secs)
    }

    async fn set_paused(&mut self, paused: bool) -> anyhow::Result<()> {
        self.handle()?.set_property("pause", json!(paused)).await?;
        Ok(())
    }

    async fn is_paused(&mut self) -> anyhow::Result<bool> {
        let Some(handle) = self.handle.as_ref() else {
            return Ok(false);
        };
        Ok(handle
            .get_property("pause")
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn position(&mut self) -> anyhow::Result<Option<f64>> {
        self.number_property("time-pos").await
    }

    async fn duration(&mut self) -> anyhow::Result<Option<f64>> {
        self.number_property("duration").await
    }

    async fn eof_reached(&mut self) -> anyhow::Result<bool> {
        let Some(handle) = self.handle.as_ref() else {
            return Ok(false);
        };
        Ok(handle
            .get_property("eof-reached")
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    fn is_alive(&mut self) -> bool {
        self.connected().is_some()
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        if let Some(handle) = self.handle.as_ref() {
            handle.send(json!(["stop"])).await?;
        }
        Ok(())
    }
}

impl Drop for MpvPlayer {
    fn drop(&mut self) {
        if let Some(child) = self.process.as_mut() {
            let _ = child.start_kill();
        }
        #[cfg(unix)]
        {
            let _ = std::fs::remove_file(&self.socket_name);
        }
    }
}
