//! Remote command transports for the profiled board
//!
//! A board is reachable either over the USB debug bridge (`adb`) or over the
//! network shell (`ssh` with connection multiplexing). Both variants expose
//! the same capability set: run a command and capture its text output, and
//! copy a file or directory to or from the board. [`Transport::for_address`]
//! classifies a user-supplied address string and picks the variant.

mod adb;
mod mux;
mod ssh;

pub use adb::{AdbTransport, DEFAULT_DEVICE_ID};
pub use mux::MuxMaster;
pub use ssh::SshTransport;

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Errors that can occur while talking to the board
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote command exited with a non-zero status
    #[error("Error running command \"{command}\":\n\t{output}")]
    CommandFailed {
        /// The command that was attempted
        command: String,
        /// Captured stdout/stderr of the failed command
        output: String,
    },

    /// A debug-bridge invocation exceeded its configured timeout
    #[error("Command \"{command}\" timed out after {timeout_secs} seconds")]
    Timeout {
        /// The command that was attempted
        command: String,
        /// The configured timeout in seconds
        timeout_secs: u64,
    },

    /// The command uses shell syntax the debug bridge cannot execute
    #[error("Unsupported shell syntax in command \"{command}\"")]
    UnsupportedSyntax {
        /// The rejected command
        command: String,
    },

    /// The local client binary (`adb`, `ssh`, `scp`) could not be spawned
    #[error("Failed to spawn {program}: {reason}")]
    Spawn {
        /// The client binary that failed to start
        program: &'static str,
        /// The reason for the failure
        reason: String,
    },

    /// The address matched neither a device id nor an IPv4 address
    #[error("Invalid board address format: expected device id or IPv4 address, got '{0}'")]
    InvalidAddress(String),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Debug-bridge device identifier pattern (fixed prefix + numeric suffix)
static DEVICE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^SL16x\d+$").expect("device id pattern is valid"));

/// Strict dotted-quad IPv4 pattern, each octet 0-255
static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:25[0-5]|2[0-4]\d|1\d{2}|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d{2}|[1-9]?\d)$")
        .expect("ipv4 pattern is valid")
});

/// A command channel to the board, one of exactly two kinds
#[derive(Debug)]
pub enum Transport {
    /// USB debug bridge (`adb`)
    Adb(AdbTransport),
    /// Network shell (`ssh` with a multiplexed master connection)
    Ssh(SshTransport),
}

impl Transport {
    /// Selects a transport for the given board address.
    ///
    /// * `None` targets the default debug-bridge device.
    /// * A device id (`SL16x` + digits) targets that device over the bridge.
    /// * A dotted-quad IPv4 address targets the board over the network shell.
    ///
    /// Matching is exact full-string matching, never substring containment.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidAddress`] for anything else.
    pub fn for_address(
        address: Option<&str>,
        timeout_secs: u64,
        keep_alive_secs: u64,
    ) -> TransportResult<Self> {
        match address {
            None => Ok(Self::Adb(AdbTransport::new(DEFAULT_DEVICE_ID, timeout_secs))),
            Some(addr) if DEVICE_ID_PATTERN.is_match(addr) => {
                Ok(Self::Adb(AdbTransport::new(addr, timeout_secs)))
            }
            Some(addr) if IPV4_PATTERN.is_match(addr) => Ok(Self::Ssh(SshTransport::new(
                addr,
                timeout_secs,
                keep_alive_secs,
            ))),
            Some(addr) => Err(TransportError::InvalidAddress(addr.to_string())),
        }
    }

    /// Runs a command on the board and returns its captured text output.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] carrying the attempted command and the
    /// captured diagnostic output if the command fails, times out, or uses
    /// syntax the variant cannot execute.
    pub async fn run(&self, command: &str) -> TransportResult<String> {
        match self {
            Self::Adb(t) => t.run(command).await,
            Self::Ssh(t) => t.run(command).await,
        }
    }

    /// Copies a file or directory between the host and the board.
    ///
    /// With `to_device` the source is local and the destination is on the
    /// board; otherwise the direction is reversed.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the copy fails or times out.
    pub async fn copy(
        &self,
        src: &str,
        dst: &str,
        recursive: bool,
        to_device: bool,
    ) -> TransportResult<()> {
        match self {
            Self::Adb(t) => t.copy(src, dst, recursive, to_device).await,
            Self::Ssh(t) => t.copy(src, dst, recursive, to_device).await,
        }
    }
}
