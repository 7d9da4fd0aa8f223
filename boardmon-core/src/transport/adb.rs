//! Debug-bridge command execution
//!
//! Runs commands on the board through `adb exec-out`, which executes a
//! single program on the device without spawning a remote shell. Composite
//! commands are therefore limited to simple `&&` conjunction: the command is
//! split on the literal separator and each segment runs as its own
//! invocation, with outputs joined by newlines in segment order.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use super::{TransportError, TransportResult};

/// Device identifier used when no board address is supplied
pub const DEFAULT_DEVICE_ID: &str = "SL16x0";

/// Shell operators `exec-out` cannot interpret (`||` is covered by `|`)
const UNSUPPORTED_OPERATORS: [&str; 6] = ["|", ";", "`", "$(", "<", ">"];

/// Command channel over the USB debug bridge
#[derive(Debug, Clone)]
pub struct AdbTransport {
    device_id: String,
    timeout: Duration,
}

impl AdbTransport {
    /// Creates a transport targeting the given device with a per-invocation
    /// execution timeout.
    pub fn new(device_id: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            device_id: device_id.into(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// The targeted device identifier
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Runs a command on the device and returns its captured output.
    ///
    /// Commands containing shell metacharacters are rejected before anything
    /// is spawned; `&&`-joined segments execute sequentially.
    ///
    /// # Errors
    ///
    /// [`TransportError::UnsupportedSyntax`] for shell metacharacters,
    /// [`TransportError::Timeout`] when a segment exceeds the configured
    /// timeout, and [`TransportError::CommandFailed`] on a non-zero exit.
    pub async fn run(&self, command: &str) -> TransportResult<String> {
        if UNSUPPORTED_OPERATORS.iter().any(|op| command.contains(op)) {
            return Err(TransportError::UnsupportedSyntax {
                command: command.to_string(),
            });
        }

        let mut outputs = Vec::new();
        for segment in command.split("&&").map(str::trim).filter(|s| !s.is_empty()) {
            let mut cmd = Command::new("adb");
            cmd.arg("-s").arg(&self.device_id).arg("exec-out");
            // Quoting is not part of the supported command subset
            cmd.args(segment.split_whitespace());
            outputs.push(self.capture(cmd, segment).await?);
        }
        Ok(outputs.join("\n"))
    }

    /// Copies a file or directory between the host and the device
    /// (`push` when `to_device`, `pull` otherwise).
    ///
    /// # Errors
    ///
    /// [`TransportError::CommandFailed`] on a non-zero exit and
    /// [`TransportError::Timeout`] when the copy exceeds the timeout.
    pub async fn copy(
        &self,
        src: &str,
        dst: &str,
        recursive: bool,
        to_device: bool,
    ) -> TransportResult<()> {
        let mut cmd = Command::new("adb");
        cmd.arg("-s").arg(&self.device_id);
        let description = if to_device {
            cmd.arg("push");
            if recursive {
                cmd.arg("-r");
            }
            format!("adb push {src} {dst}")
        } else {
            // -a preserves file timestamps
            cmd.arg("pull").arg("-a");
            format!("adb pull {src} {dst}")
        };
        cmd.arg(src).arg(dst);

        self.capture(cmd, &description).await?;
        Ok(())
    }

    /// Runs a prepared `adb` invocation under the configured timeout and
    /// maps the exit status onto transport errors.
    async fn capture(&self, mut cmd: Command, command: &str) -> TransportResult<String> {
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => {
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
            Ok(Err(e)) => Err(TransportError::Spawn {
                program: "adb",
                reason: e.to_string(),
            }),
            Err(_) => Err(TransportError::Timeout {
                command: command.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }),
        }
    }
}
