//! Shared ssh ControlMaster connections
//!
//! One persistent master connection exists per board address, shared by all
//! transports in the process through an in-memory reference-counted pool.
//! The master authenticates once and keeps the channel open for
//! `ControlPersist` seconds after the last use; follow-up `ssh`/`scp` calls
//! attach to it through the control socket instead of renegotiating.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::{Arc, LazyLock, Mutex, Weak};

/// Process-wide registry of live masters, keyed by board address
static POOL: LazyLock<Mutex<HashMap<String, Weak<MuxMaster>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Handle to the persistent master connection for one board address.
///
/// Held via `Arc` by every [`super::SshTransport`] targeting the address;
/// the pool entry is dropped when the last holder goes away.
#[derive(Debug)]
pub struct MuxMaster {
    address: String,
    control_path: PathBuf,
    connect_timeout_secs: u64,
    keep_alive_secs: u64,
}

impl MuxMaster {
    /// Returns the pooled master for `address`, creating and starting it if
    /// no live handle exists.
    pub fn acquire(address: &str, connect_timeout_secs: u64, keep_alive_secs: u64) -> Arc<Self> {
        let mut pool = POOL.lock().unwrap();
        if let Some(existing) = pool.get(address).and_then(Weak::upgrade) {
            return existing;
        }

        let master = Arc::new(Self {
            address: address.to_string(),
            control_path: control_path_for(address),
            connect_timeout_secs,
            keep_alive_secs,
        });
        master.start();
        pool.insert(address.to_string(), Arc::downgrade(&master));
        master
    }

    /// The board address this master serves
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Path of the control socket follow-up calls attach to
    pub fn control_path(&self) -> &Path {
        &self.control_path
    }

    /// Starts the master connection in the background.
    ///
    /// Best-effort: a failure here is logged and deferred to the first
    /// command, which will report the real connection error. The master
    /// auto-expires `keep_alive_secs` after its last use and ssh
    /// re-establishes it lazily on the next call.
    fn start(&self) {
        let result = Command::new("ssh")
            .arg("-MNf")
            .args(["-o", "ControlMaster=yes"])
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg("-o")
            .arg(format!("ControlPersist={}s", self.keep_alive_secs))
            .args(["-o", "BatchMode=yes"])
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.connect_timeout_secs))
            .arg(format!("root@{}", self.address))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match result {
            Ok(mut child) => {
                tracing::debug!(address = %self.address, "started ssh master connection");
                // -f detaches the master itself; the foreground process
                // exits right away and still needs reaping
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => {
                tracing::warn!(
                    address = %self.address,
                    error = %e,
                    "failed to start ssh master connection, deferring to first use"
                );
            }
        }
    }
}

impl Drop for MuxMaster {
    fn drop(&mut self) {
        // Last handle gone: retire the registry entry so a later acquire
        // starts a fresh master.
        if let Ok(mut pool) = POOL.lock() {
            let stale = pool
                .get(&self.address)
                .is_some_and(|w| w.strong_count() == 0);
            if stale {
                pool.remove(&self.address);
            }
        }
    }
}

/// Control socket path for an address, under the system temp directory
fn control_path_for(address: &str) -> PathBuf {
    std::env::temp_dir().join(format!("boardmon_mux_{}", address.replace('.', "_")))
}
