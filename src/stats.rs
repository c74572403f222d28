use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// CSV statistics export (§2.2, §6): one row per successful payment, header
/// written once, appended under the same advisory-lock discipline as the
/// node cache.
pub struct StatsWriter {
    path: PathBuf,
    lock_path: PathBuf,
}

impl StatsWriter {
    pub fn new(path: PathBuf) -> Self {
        let lock_path = path.with_extension("csv.lock");
        Self { path, lock_path }
    }

    pub fn record(&self, from_chan: u64, to_chan: u64, amount_msat: u64, fees_msat: u64) -> Result<()> {
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&self.lock_path)
            .with_context(|| format!("opening stats lock file {}", self.lock_path.display()))?;
        let mut lock = fd_lock::RwLock::new(lock_file);
        let _guard = lock.write().context("acquiring exclusive lock on stats file")?;

        let is_new = !self.path.exists();
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .with_context(|| format!("opening stats file {}", self.path.display()))?;

        if is_new {
            writeln!(file, "timestamp,from_channel,to_channel,amount_msat,fees_msat")?;
        }
        let now = chrono::Utc::now().timestamp();
        writeln!(file, "{},{},{},{},{}", now, from_chan, to_chan, amount_msat, fees_msat)?;
        Ok(())
    }
}
