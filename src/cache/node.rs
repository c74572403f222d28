use crate::client::NodeClient;
use crate::model::{CachedNodeInfo, NodeInfo};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// In-memory node-info cache backed by an optional persisted file, merged
/// across concurrent instances under an advisory file lock (§4.10).
///
/// The lock path is independent of the cache path and deterministic (fixed
/// name in the system temp dir), per §6.
pub struct NodeCache {
    by_pubkey: HashMap<String, CachedNodeInfo>,
    path: Option<PathBuf>,
    lock_path: PathBuf,
    lifetime_minutes: u64,
}

impl NodeCache {
    pub fn new(path: Option<PathBuf>, lifetime_minutes: u64) -> Self {
        Self {
            by_pubkey: HashMap::new(),
            path,
            lock_path: std::env::temp_dir().join("regolancer.lock"),
            lifetime_minutes,
        }
    }

    #[cfg(test)]
    pub fn with_lock_path(path: Option<PathBuf>, lock_path: PathBuf, lifetime_minutes: u64) -> Self {
        Self { by_pubkey: HashMap::new(), path, lock_path, lifetime_minutes }
    }

    fn is_fresh(&self, entry: &CachedNodeInfo, now: i64) -> bool {
        let age_minutes = (now - entry.acquired_at).max(0) / 60;
        self.lifetime_minutes == 0 || age_minutes as u64 <= self.lifetime_minutes
    }

    /// Load the persisted file under a shared (reader) lock, dropping stale
    /// entries. Missing file => empty cache. Decode failure is logged and
    /// treated as empty, never fatal (§4.10, §9).
    pub fn load(&mut self, now: i64) -> Result<()> {
        let Some(path) = self.path.clone() else { return Ok(()) };
        if !path.exists() {
            return Ok(());
        }

        let lock_file = open_lock_file(&self.lock_path)?;
        let mut lock = fd_lock::RwLock::new(lock_file);
        let _guard = lock.read().context("acquiring shared lock on node cache")?;

        let raw = std::fs::read(&path).with_context(|| format!("reading node cache {}", path.display()))?;
        if raw.is_empty() {
            return Ok(());
        }
        match bincode::deserialize::<HashMap<String, CachedNodeInfo>>(&raw) {
            Ok(map) => {
                self.by_pubkey = map.into_iter().filter(|(_, v)| self.is_fresh(v, now)).collect();
            }
            Err(e) => {
                log::warn!("node cache at {} failed to decode ({}), resetting to empty", path.display(), e);
                self.by_pubkey.clear();
            }
        }
        Ok(())
    }

    /// Save under an exclusive (writer) lock: re-read the current on-disk
    /// contents and merge key-by-key, keeping the newer entry by timestamp,
    /// so concurrent instances' writes are preserved (§4.10, §8 scenario 5).
    pub fn save(&self, now: i64) -> Result<()> {
        let Some(path) = self.path.clone() else { return Ok(()) };

        let lock_file = open_lock_file(&self.lock_path)?;
        let mut lock = fd_lock::RwLock::new(lock_file);
        let mut guard = lock.write().context("acquiring exclusive lock on node cache")?;

        let mut on_disk: HashMap<String, CachedNodeInfo> = if path.exists() {
            let raw = std::fs::read(&path).with_context(|| format!("reading node cache {}", path.display()))?;
            if raw.is_empty() {
                HashMap::new()
            } else {
                bincode::deserialize(&raw).unwrap_or_default()
            }
        } else {
            HashMap::new()
        };

        for (k, v) in &self.by_pubkey {
            match on_disk.get(k) {
                Some(existing) if existing.acquired_at >= v.acquired_at => {}
                _ => {
                    on_disk.insert(k.clone(), v.clone());
                }
            }
        }
        let _ = now;

        let encoded = bincode::serialize(&on_disk).context("encoding node cache")?;
        std::fs::write(&path, encoded).with_context(|| format!("writing node cache {}", path.display()))?;
        guard.flush().ok();
        Ok(())
    }

    /// Fetch a node's info, consulting the in-memory cache first, then the
    /// node RPC, recording the acquisition timestamp (§4.10).
    pub async fn get(&mut self, client: &dyn NodeClient, pubkey: &[u8], now: i64) -> Result<NodeInfo> {
        let key = hex_encode(pubkey);
        if let Some(entry) = self.by_pubkey.get(&key) {
            if self.is_fresh(entry, now) {
                return Ok(entry.info.clone());
            }
        }
        let info = client.get_node_info(pubkey).await?;
        self.by_pubkey.insert(key, CachedNodeInfo { info: info.clone(), acquired_at: now });
        Ok(info)
    }

    pub fn len(&self) -> usize {
        self.by_pubkey.len()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn open_lock_file(path: &PathBuf) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening lock file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockNodeClient;
    use crate::model::NodeInfo;
    use tempfile::tempdir;

    fn info(pubkey: &str) -> NodeInfo {
        NodeInfo { pubkey: pubkey.to_string(), alias: "node".into(), num_channels: 1, total_capacity_sat: 1, last_update: 0 }
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let lock = dir.path().join("cache.lock");
        let mut cache = NodeCache::with_lock_path(Some(path), lock, 60);
        cache.load(1_000).unwrap();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn save_then_load_round_trips_fresh_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let lock = dir.path().join("cache.lock");
        let mut cache = NodeCache::with_lock_path(Some(path.clone()), lock.clone(), 0);
        cache.by_pubkey.insert("aa".into(), CachedNodeInfo { info: info("aa"), acquired_at: 1_000 });
        cache.save(1_000).unwrap();

        let mut reloaded = NodeCache::with_lock_path(Some(path), lock, 0);
        reloaded.load(1_000).unwrap();
        assert_eq!(reloaded.len(), 1);
    }

    #[test]
    fn load_drops_stale_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let lock = dir.path().join("cache.lock");
        let mut cache = NodeCache::with_lock_path(Some(path.clone()), lock.clone(), 10);
        cache.by_pubkey.insert("aa".into(), CachedNodeInfo { info: info("aa"), acquired_at: 0 });
        cache.save(0).unwrap();

        let mut reloaded = NodeCache::with_lock_path(Some(path), lock, 10);
        // 1 hour later, lifetime is 10 minutes: entry must be dropped.
        reloaded.load(3_600).unwrap();
        assert_eq!(reloaded.len(), 0);
    }

    #[test]
    fn save_merge_keeps_newer_entry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let lock = dir.path().join("cache.lock");

        // On disk: A@15, B@5.
        let mut seed = NodeCache::with_lock_path(Some(path.clone()), lock.clone(), 0);
        seed.by_pubkey.insert("aa".into(), CachedNodeInfo { info: info("aa"), acquired_at: 15 });
        seed.by_pubkey.insert("bb".into(), CachedNodeInfo { info: info("bb"), acquired_at: 5 });
        seed.save(15).unwrap();

        // In-memory (about to save): A@10 -- older than disk, should lose.
        let mut writer = NodeCache::with_lock_path(Some(path.clone()), lock.clone(), 0);
        writer.by_pubkey.insert("aa".into(), CachedNodeInfo { info: info("aa"), acquired_at: 10 });
        writer.save(10).unwrap();

        let mut reloaded = NodeCache::with_lock_path(Some(path), lock, 0);
        reloaded.load(15).unwrap();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.by_pubkey.get("aa").unwrap().acquired_at, 15);
        assert_eq!(reloaded.by_pubkey.get("bb").unwrap().acquired_at, 5);
    }

    #[tokio::test]
    async fn get_falls_back_to_rpc_on_miss() {
        let dir = tempdir().unwrap();
        let mut cache = NodeCache::with_lock_path(None, dir.path().join("lock"), 60);
        let mock = MockNodeClient::new();
        mock.node_infos.lock().unwrap().insert("aa".into(), info("aa"));

        let result = cache.get(&mock, &[0xaa], 0).await.unwrap();
        assert_eq!(result.pubkey, "aa");
        assert_eq!(cache.len(), 1);
    }
}
