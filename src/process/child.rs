use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use crate::error::ClientError;

/// Child process whose output is forwarded to the log.
pub struct LoggedChild {
    label: String,
    child: Child,
    readers: Vec<JoinHandle<()>>,
    reaped: bool,
}

impl LoggedChild {
    /// Spawn `command` with piped output; stdout lines are logged at info,
    /// stderr lines at warn.
    ///
    /// # Errors
    ///
    /// [`ClientError::ProcessNotStarted`] if the process cannot be spawned,
    /// or [`ClientError::ThreadSpawn`] if a log reader thread cannot be
    /// started (the process is killed first).
    pub fn spawn(
        label: &str,
        mut command: Command,
    ) -> Result<Self, ClientError> {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ClientError::ProcessNotStarted(format!("{label}: {e}"))
            })?;

        let readers = match spawn_readers(label, &mut child) {
            Ok(readers) => readers,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        };
        log::info!("Started {label} (pid {})", child.id());
        Ok(Self {
            label: label.to_owned(),
            child,
            readers,
            reaped: false,
        })
    }

    /// Whether the process is still alive. Never blocks.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Block until the process exits on its own.
    ///
    /// # Errors
    ///
    /// [`ClientError::Io`] if waiting on the process fails.
    pub fn wait(&mut self) -> Result<ExitStatus, ClientError> {
        let status = self.child.wait()?;
        self.reaped = true;
        self.join_readers();
        Ok(status)
    }

    /// Kill the process (if alive) and reap it. Idempotent.
    pub fn stop(&mut self) {
        if self.reaped {
            return;
        }
        if self.is_running() {
            if let Err(e) = self.child.kill() {
                log::warn!("Failed to kill {}: {e}", self.label);
            }
        }
        match self.child.wait() {
            Ok(status) => log::info!("{} exited with {status}", self.label),
            Err(e) => log::warn!("Failed to reap {}: {e}", self.label),
        }
        self.reaped = true;
        // Grandchildren may keep the pipes open; let the readers finish
        // on their own.
        self.readers.clear();
    }

    fn join_readers(&mut self) {
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
    }
}

fn spawn_readers(
    label: &str,
    child: &mut Child,
) -> Result<Vec<JoinHandle<()>>, ClientError> {
    let mut readers = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(forward(label, "stdout", stdout, log::Level::Info)?);
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(forward(label, "stderr", stderr, log::Level::Warn)?);
    }
    Ok(readers)
}

fn forward(
    label: &str,
    stream: &str,
    source: impl Read + Send + 'static,
    level: log::Level,
) -> Result<JoinHandle<()>, ClientError> {
    let tag = format!("{label} {stream}");
    std::thread::Builder::new()
        .name(format!("{label}-{stream}"))
        .spawn(move || {
            for line in BufReader::new(source).lines() {
                match line {
                    Ok(line) => log::log!(level, "[{tag}] {line}"),
                    Err(_) => break,
                }
            }
        })
        .map_err(ClientError::ThreadSpawn)
}
