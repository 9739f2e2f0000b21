//! Control socket: server (during `ripper run`) and client for the commands
//! that must act on the live queue while a run owns it.
//!
//! Protocol: the client sends one request line ("stop", "stop <id>",
//! "remove <id>", "clear", "requeue <id>", "status") and closes its write
//! half. The server answers "ok" followed by the message, or "err <message>".

use anyhow::{bail, Result};
use ripper_core::queue::JobId;
use ripper_core::{Engine, EngineError};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use super::commands::render_status;

/// A request the running engine answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    StopAll,
    Stop(JobId),
    Remove(JobId),
    Clear,
    Requeue(JobId),
    Status,
}

impl ControlCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let verb = words.next()?;
        let id = words.next();
        if words.next().is_some() {
            return None;
        }
        let id = match id {
            Some(id) => Some(id.parse::<JobId>().ok()?),
            None => None,
        };
        match (verb, id) {
            ("stop", None) => Some(ControlCommand::StopAll),
            ("stop", Some(id)) => Some(ControlCommand::Stop(id)),
            ("remove", Some(id)) => Some(ControlCommand::Remove(id)),
            ("clear", None) => Some(ControlCommand::Clear),
            ("requeue", Some(id)) => Some(ControlCommand::Requeue(id)),
            ("status", None) => Some(ControlCommand::Status),
            _ => None,
        }
    }

    pub fn to_line(self) -> String {
        match self {
            ControlCommand::StopAll => "stop\n".to_string(),
            ControlCommand::Stop(id) => format!("stop {}\n", id),
            ControlCommand::Remove(id) => format!("remove {}\n", id),
            ControlCommand::Clear => "clear\n".to_string(),
            ControlCommand::Requeue(id) => format!("requeue {}\n", id),
            ControlCommand::Status => "status\n".to_string(),
        }
    }
}

/// Applies `cmd` to the engine that owns the live queue.
pub fn apply(engine: &Engine, cmd: ControlCommand) -> Result<String, EngineError> {
    match cmd {
        ControlCommand::StopAll => Ok(if engine.stop_all() {
            "Asked the active run to stop".to_string()
        } else {
            "No run in progress.".to_string()
        }),
        ControlCommand::Stop(id) => {
            engine.stop(id)?;
            Ok(format!("Asked the active run to stop job {id}"))
        }
        ControlCommand::Remove(id) => {
            let job = engine.remove(id)?;
            Ok(format!("Removed job {id} ({})", job.display_name))
        }
        ControlCommand::Clear => Ok(format!("Removed {} job(s)", engine.remove_all())),
        ControlCommand::Requeue(id) => {
            engine.requeue(id)?;
            Ok(format!("Job {id} is waiting again"))
        }
        ControlCommand::Status => Ok(render_status(engine)),
    }
}

fn reply_for(engine: &Engine, line: &str) -> String {
    match ControlCommand::parse(line) {
        Some(cmd) => match apply(engine, cmd) {
            Ok(message) => format!("ok\n{}\n", message.trim_end()),
            Err(e) => {
                tracing::debug!(line = %line, "control request refused: {}", e);
                format!("err {}\n", e)
            }
        },
        None => format!("err unknown control request {:?}\n", line.trim()),
    }
}

async fn serve(engine: Arc<Engine>, stream: UnixStream) -> std::io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        write.write_all(reply_for(&engine, &line).as_bytes()).await?;
    }
    write.shutdown().await
}

/// Spawns a task that listens on `path` and answers control requests
/// against `engine`.
pub fn spawn_control_listener(
    engine: Arc<Engine>,
    path: impl AsRef<Path>,
) -> Result<tokio::task::JoinHandle<()>> {
    let path = path.as_ref().to_path_buf();
    let _ = std::fs::remove_file(&path);
    let listener = UnixListener::bind(&path)?;
    let handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let engine = Arc::clone(&engine);
                    tokio::spawn(async move {
                        if let Err(e) = serve(engine, stream).await {
                            tracing::debug!("control connection: {}", e);
                        }
                    });
                }
                Err(e) => tracing::debug!("control socket accept: {}", e),
            }
        }
    });
    Ok(handle)
}

async fn connect(socket_path: &Path) -> Result<Option<UnixStream>> {
    if !socket_path.exists() {
        return Ok(None);
    }
    match UnixStream::connect(socket_path).await {
        Ok(s) => Ok(Some(s)),
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ) =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// True if a `ripper run` is listening on `socket_path`.
pub async fn run_is_active(socket_path: &Path) -> Result<bool> {
    Ok(connect(socket_path).await?.is_some())
}

/// Sends `cmd` to the running engine. `Ok(None)` means no run is listening;
/// a refused request is an error carrying the engine's message.
pub async fn send(socket_path: &Path, cmd: ControlCommand) -> Result<Option<String>> {
    let Some(mut stream) = connect(socket_path).await? else {
        return Ok(None);
    };
    stream.write_all(cmd.to_line().as_bytes()).await?;
    stream.shutdown().await?;
    let mut reply = String::new();
    stream.read_to_string(&mut reply).await?;

    if let Some(message) = reply.strip_prefix("ok\n") {
        return Ok(Some(message.trim_end().to_string()));
    }
    match reply.strip_prefix("err ") {
        Some(message) => bail!("{}", message.trim_end()),
        None => bail!("unexpected control reply {:?}", reply.trim_end()),
    }
}
