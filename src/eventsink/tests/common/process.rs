use std::io::Write;
use std::process::ExitStatus;
use std::time::Duration;

use anyhow::Context;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tempfile::NamedTempFile;

/// A running `eventsink` binary, killed when dropped
pub struct Process {
    proc: std::process::Child,
}

impl Process {
    pub fn new_with_args(args: &[&str]) -> anyhow::Result<Self> {
        let proc = std::process::Command::new(env!("CARGO_BIN_EXE_eventsink"))
            .args(args)
            .spawn()
            .context("failed to spawn eventsink process")?;

        Ok(Self { proc })
    }

    pub fn signal(&mut self, signal: Signal) -> anyhow::Result<()> {
        let pid = Pid::from_raw(self.proc.id().try_into()?);
        signal::kill(pid, signal).context("failed to send signal to eventsink process")?;

        Ok(())
    }

    /// Polls for the process to exit, giving up after `timeout`
    pub async fn wait_for_exit(&mut self, timeout: Duration) -> anyhow::Result<Option<ExitStatus>> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(status) = self.proc.try_wait()? {
                return Ok(Some(status));
            }

            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }

            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

impl Drop for Process {
    fn drop(&mut self) {
        let _ = self.proc.kill();
        let _ = self.proc.wait();
    }
}

pub struct ConfigFile {
    inner: NamedTempFile,
}

impl ConfigFile {
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let mut file = NamedTempFile::new().context("failed to create temporary file")?;
        file.as_file_mut()
            .write_all(s.as_bytes())
            .context("failed to write config to temporary file")?;

        Ok(Self { inner: file })
    }

    pub fn path(&self) -> &std::path::Path {
        self.inner.path()
    }

    pub fn path_str(&self) -> &str {
        self.path().to_str().expect("path is not valid utf-8")
    }
}
