//! Network-shell command execution
//!
//! Runs commands on the board over `ssh`, attaching to the shared
//! ControlMaster connection from [`super::MuxMaster`] so repeated calls skip
//! renegotiation. Unlike the debug bridge, the full command line reaches a
//! remote shell, so composite syntax is supported. Only the connect timeout
//! bounds a call; established commands run to completion.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;

use super::mux::MuxMaster;
use super::{TransportError, TransportResult};

/// Command channel over the network shell
#[derive(Debug, Clone)]
pub struct SshTransport {
    address: String,
    connect_timeout_secs: u64,
    master: Arc<MuxMaster>,
}

impl SshTransport {
    /// Creates a transport for the given IPv4 address, acquiring the pooled
    /// master connection for it.
    ///
    /// The master start is best-effort; a board that is down surfaces as a
    /// [`TransportError::CommandFailed`] on the first call, not here.
    pub fn new(address: impl Into<String>, connect_timeout_secs: u64, keep_alive_secs: u64) -> Self {
        let address = address.into();
        let master = MuxMaster::acquire(&address, connect_timeout_secs, keep_alive_secs);
        Self {
            address,
            connect_timeout_secs,
            master,
        }
    }

    /// The targeted board address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Runs a command line on the board in one remote shell invocation.
    ///
    /// # Errors
    ///
    /// [`TransportError::CommandFailed`] on a non-zero exit (including
    /// connection failures, which ssh reports the same way) and
    /// [`TransportError::Spawn`] if the local `ssh` binary cannot start.
    pub async fn run(&self, command: &str) -> TransportResult<String> {
        let mut cmd = Command::new("ssh");
        cmd.arg("-T");
        self.apply_options(&mut cmd);
        cmd.arg(format!("root@{}", self.address));
        cmd.arg(command);

        Self::capture(cmd, "ssh", command).await
    }

    /// Copies a path between the host and the board with `scp`, reusing the
    /// multiplexed channel.
    ///
    /// # Errors
    ///
    /// [`TransportError::CommandFailed`] on a non-zero exit and
    /// [`TransportError::Spawn`] if `scp` cannot start.
    pub async fn copy(
        &self,
        src: &str,
        dst: &str,
        recursive: bool,
        to_device: bool,
    ) -> TransportResult<()> {
        let mut cmd = Command::new("scp");
        if recursive {
            cmd.arg("-r");
        }
        self.apply_options(&mut cmd);

        let (src, dst) = if to_device {
            (src.to_string(), format!("root@{}:{}", self.address, dst))
        } else {
            (format!("root@{}:{}", self.address, src), dst.to_string())
        };
        cmd.arg(&src).arg(&dst);

        Self::capture(cmd, "scp", &format!("scp {src} {dst}")).await?;
        Ok(())
    }

    /// Common options: attach to the pooled master, never become one
    fn apply_options(&self, cmd: &mut Command) {
        cmd.args(["-o", "ControlMaster=no"]);
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.master.control_path().display()));
        cmd.args(["-o", "BatchMode=yes"]);
        cmd.arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout_secs));
    }

    async fn capture(
        mut cmd: Command,
        program: &'static str,
        command: &str,
    ) -> TransportResult<String> {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        match cmd.output().await {
            Ok(output) => {
                if output.status.success() {
                    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
                } else {
                    let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if !stderr.trim().is_empty() {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(stderr.trim());
                    }
                    Err(TransportError::CommandFailed {
                        command: command.to_string(),
                        output: text,
                    })
                }
            }
            Err(e) => Err(TransportError::Spawn {
                program,
                reason: e.to_string(),
            }),
        }
    }
}
