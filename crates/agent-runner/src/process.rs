use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::types::{Chunk, RunOutput};
use crate::{Result, RunnerError};

// ─── AgentProcess ─────────────────────────────────────────────────────────

/// A running agent subprocess with stdin closed and both output streams
/// drained concurrently into one ordered channel.
pub(crate) struct AgentProcess {
    child: Child,
    rx: mpsc::Receiver<Chunk>,
}

impl AgentProcess {
    pub(crate) fn from_command(mut cmd: Command) -> Result<Self> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(RunnerError::Io)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::Process("stdout not captured".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::Process("stderr not captured".into()))?;

        // The channel closes once both readers hit EOF.
        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(pump(stdout, tx.clone(), Chunk::Stdout));
        tokio::spawn(pump(stderr, tx, Chunk::Stderr));

        Ok(Self { child, rx })
    }

    /// Collect all output, then wait for the exit status.
    pub(crate) async fn wait(mut self) -> Result<RunOutput> {
        let mut out = RunOutput::default();
        while let Some(chunk) = self.rx.recv().await {
            match chunk {
                Chunk::Stdout(text) => {
                    tracing::debug!(target: "agent_runner::stdout", "{}", text.trim_end());
                    out.transcript.push_str(&text);
                    out.stdout.push_str(&text);
                }
                Chunk::Stderr(text) => {
                    tracing::debug!(target: "agent_runner::stderr", "{}", text.trim_end());
                    out.transcript.push_str("[STDERR]: ");
                    out.transcript.push_str(&text);
                    out.stderr.push_str(&text);
                }
            }
        }
        let status = self.child.wait().await.map_err(RunnerError::Io)?;
        out.exit_code = status.code();
        Ok(out)
    }
}

/// Forward everything `reader` produces as text chunks. Multi-byte
/// characters split across reads are held back until complete.
async fn pump<R>(mut reader: R, tx: mpsc::Sender<Chunk>, wrap: fn(String) -> Chunk)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; 8192];
    let mut pending: Vec<u8> = Vec::new();
    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        pending.extend_from_slice(&buf[..n]);
        let text = take_utf8(&mut pending);
        if !text.is_empty() && tx.send(wrap(text)).await.is_err() {
            return;
        }
    }
    if !pending.is_empty() {
        let _ = tx
            .send(wrap(String::from_utf8_lossy(&pending).into_owned()))
            .await;
    }
}

/// Drain the longest decodable prefix of `pending`. Invalid bytes are
/// replaced; an incomplete trailing sequence stays in `pending`.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(s) => {
            let s = s.to_string();
            pending.clear();
            s
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let rest = pending.split_off(valid);
            let s = String::from_utf8_lossy(pending).into_owned();
            *pending = rest;
            s
        }
        Err(_) => {
            let s = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            s
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
