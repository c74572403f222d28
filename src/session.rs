use crate::cache::{EdgeCache, NodeCache};
use crate::client::NodeClient;
use crate::config::Config;
use crate::failure_memory::FailureMemory;
use crate::model::{CandidatePair, InvoiceCache, LocalChannel};
use crate::selector;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// Everything an attempt loop needs that outlives a single attempt: the
/// node's own identity and channel set, the active candidate pairs, and the
/// accumulated failure/edge/invoice caches. Grounded on the ambient stack's
/// node-state snapshot collected once per run.
pub struct Session {
    pub local_pubkey: String,
    pub channels: HashMap<u64, LocalChannel>,
    pub active_pairs: HashMap<String, CandidatePair>,
    pub failure_memory: FailureMemory,
    pub edge_cache: EdgeCache,
    pub node_cache: NodeCache,
    pub invoices: InvoiceCache,
    pub rng: StdRng,
    /// Set once a route has actually been found this session; governs
    /// whether an empty active set means "done" or "reactivate and retry"
    /// (§4.8).
    pub route_found: bool,
}

impl Session {
    /// Collect node identity, channel list, and candidate pairs in one shot
    /// (mirrors the ambient stack's single node-state snapshot at the top of
    /// a run).
    pub async fn collect(client: &dyn NodeClient, config: &Config, now: i64) -> Result<Self> {
        let (identity_pubkey, _block_height) = client.get_info().await?;
        let local_pubkey = hex_encode(&identity_pubkey);

        let raw_channels = client.list_channels().await?;
        let mut channel_age_blocks = HashMap::new();
        let channels: HashMap<u64, LocalChannel> = raw_channels
            .into_iter()
            .filter(|c| c.is_usable())
            .map(|c| {
                channel_age_blocks.insert(c.chan_id, 0);
                (c.chan_id, c)
            })
            .collect();

        let as_vec: Vec<LocalChannel> = channels.values().cloned().collect();
        let active_pairs = selector::select_pairs(&as_vec, &config.selector, &channel_age_blocks)
            .map_err(|e| anyhow::anyhow!(e))?;

        let mut node_cache = NodeCache::new(config.cache.node_cache_path.clone(), config.cache.lifetime_minutes);
        node_cache.load(now)?;

        Ok(Self {
            local_pubkey,
            channels,
            active_pairs,
            failure_memory: FailureMemory::new(),
            edge_cache: EdgeCache::new(),
            node_cache,
            invoices: InvoiceCache::new(),
            rng: StdRng::seed_from_u64(now as u64),
            route_found: false,
        })
    }

    pub fn persist_caches(&self, now: i64) -> Result<()> {
        self.node_cache.save(now)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
