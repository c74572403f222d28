use crate::client::NodeClient;
use crate::model::ChannelEdge;
use anyhow::Result;
use std::collections::HashMap;

/// In-memory channel-edge cache, populated lazily and never expiring within
/// the session (§4.10).
#[derive(Default)]
pub struct EdgeCache {
    by_chan_id: HashMap<u64, ChannelEdge>,
}

impl EdgeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&mut self, client: &dyn NodeClient, chan_id: u64) -> Result<ChannelEdge> {
        if let Some(edge) = self.by_chan_id.get(&chan_id) {
            return Ok(edge.clone());
        }
        let edge = client.get_chan_info(chan_id).await?;
        self.by_chan_id.insert(chan_id, edge.clone());
        Ok(edge)
    }

    pub fn len(&self) -> usize {
        self.by_chan_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_chan_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockNodeClient;
    use crate::model::RoutingPolicy;

    fn edge(chan_id: u64) -> ChannelEdge {
        ChannelEdge {
            chan_id,
            node1_pubkey: "aa".to_string(),
            node2_pubkey: "bb".to_string(),
            node1_policy: RoutingPolicy::default(),
            node2_policy: RoutingPolicy::default(),
        }
    }

    #[tokio::test]
    async fn caches_after_first_fetch() {
        let mock = MockNodeClient::new();
        mock.edges.lock().unwrap().insert(1, edge(1));
        let mut cache = EdgeCache::new();

        cache.get(&mock, 1).await.unwrap();
        cache.get(&mock, 1).await.unwrap();

        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn propagates_missing_channel_error() {
        let mock = MockNodeClient::new();
        let mut cache = EdgeCache::new();
        assert!(cache.get(&mock, 99).await.is_err());
    }
}
