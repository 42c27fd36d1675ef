//! Control socket: server (during a foreground run) and client (for
//! `vdm pause|resume|cancel|delete|delete-series` from another shell).
//! Protocol: one request line "<action> <target>", one reply line.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use vdm_core::QueueController;

use super::commands::ControlAction;

/// Listener task plus the socket file it owns.
pub struct ControlSocket {
    path: PathBuf,
    handle: tokio::task::JoinHandle<()>,
}

impl ControlSocket {
    pub fn shutdown(self) {
        self.handle.abort();
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Listens on the default socket path and applies each request to `ctrl`.
/// Returns None (after logging) when the socket cannot be bound.
pub fn spawn_control_listener(ctrl: QueueController) -> Result<Option<ControlSocket>> {
    let path = vdm_core::control::default_control_socket_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = std::fs::remove_file(&path);
    let listener = match UnixListener::bind(&path) {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!(path = %path.display(), "control socket bind: {}", e);
            return Ok(None);
        }
    };
    tracing::debug!(path = %path.display(), "control socket listening");

    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let ctrl = ctrl.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve(stream, &ctrl).await {
                            tracing::debug!("control socket client: {}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(Some(ControlSocket { path, handle }))
}

async fn serve(stream: UnixStream, ctrl: &QueueController) -> Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        let reply = match parse_request(&line) {
            Some((action, target)) => match action.apply(ctrl, target).await {
                Ok(message) => format!("ok {}\n", message),
                Err(e) => format!("error {:#}\n", e),
            },
            None => format!("error malformed request {:?}\n", line.trim()),
        };
        write.write_all(reply.as_bytes()).await?;
    }
    Ok(())
}

pub(crate) fn parse_request(line: &str) -> Option<(ControlAction, &str)> {
    let (action, target) = line.trim().split_once(' ')?;
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    Some((ControlAction::parse(action)?, target))
}

async fn connect() -> Option<UnixStream> {
    let path = vdm_core::control::default_control_socket_path().ok()?;
    connect_at(&path).await
}

async fn connect_at(path: &Path) -> Option<UnixStream> {
    if !path.exists() {
        return None;
    }
    UnixStream::connect(path).await.ok()
}

/// True when a foreground `vdm` is accepting control requests.
pub async fn runner_active() -> bool {
    connect().await.is_some()
}

/// Forwards a request to the foreground `vdm`. Returns its reply, or None when
/// no foreground process is running.
pub async fn send(action: ControlAction, target: &str) -> Result<Option<String>> {
    let Some(stream) = connect().await else {
        return Ok(None);
    };
    let (read, mut write) = stream.into_split();
    write
        .write_all(format!("{} {}\n", action.as_str(), target).as_bytes())
        .await?;
    let reply = BufReader::new(read).lines().next_line().await?;
    Ok(reply)
}
