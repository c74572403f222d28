use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 33-byte compressed node identity, kept as hex for logging/keying.
pub type NodeId = String;

/// A channel as reported by `ListChannels`: capacity plus our own local/remote
/// split (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalChannel {
    pub chan_id: u64,
    pub capacity_sat: u64,
    pub local_balance_sat: u64,
    pub remote_balance_sat: u64,
    pub remote_pubkey: NodeId,
    pub active: bool,
    pub public: bool,
}

impl LocalChannel {
    pub fn is_usable(&self) -> bool {
        self.active
    }
}

/// One endpoint's advertised routing policy on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoutingPolicy {
    pub base_fee_msat: u64,
    pub fee_rate_ppm: u64,
    pub max_htlc_msat: u64,
    pub disabled: bool,
}

/// Public graph view of a channel, cached for the process lifetime (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelEdge {
    pub chan_id: u64,
    pub node1_pubkey: NodeId,
    pub node2_pubkey: NodeId,
    pub node1_policy: RoutingPolicy,
    pub node2_policy: RoutingPolicy,
}

impl ChannelEdge {
    /// The routing policy the given counterparty applies, i.e. the policy of
    /// the endpoint that is *not* `local`.
    pub fn counterparty_policy(&self, local: &str) -> RoutingPolicy {
        if self.node1_pubkey == local {
            self.node2_policy
        } else {
            self.node1_policy
        }
    }

    pub fn counterparty_of(&self, local: &str) -> NodeId {
        if self.node1_pubkey == local {
            self.node2_pubkey.clone()
        } else {
            self.node1_pubkey.clone()
        }
    }
}

/// Node-level metadata, cached in-memory and persisted to disk (§3, §4.10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub pubkey: NodeId,
    pub alias: String,
    pub num_channels: u32,
    pub total_capacity_sat: u64,
    pub last_update: i64,
}

/// A `NodeInfo` plus the instant it was fetched, as persisted on disk (§4.10).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedNodeInfo {
    pub info: NodeInfo,
    pub acquired_at: i64,
}

/// Ordered pair of local channels considered for a rebalance (§3).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidatePair {
    pub src_chan_id: u64,
    pub dst_chan_id: u64,
}

impl CandidatePair {
    pub fn key(&self) -> String {
        format!("{}-{}", self.src_chan_id, self.dst_chan_id)
    }
}

/// A pair removed from the active set after a routing failure, with its
/// expiry instant (unix seconds) (§3, §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedPair {
    pub pair: CandidatePair,
    pub expires_at: i64,
}

/// A directed node-to-node hop memorized after a `TEMPORARY_CHANNEL_FAILURE`,
/// along with the amount it failed at (§3, §4.9, §4.10).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FailedHopPair {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedHopAmount {
    pub amt_msat: u64,
}

/// One hop of a route (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    pub chan_id: u64,
    pub next_hop_pubkey: NodeId,
    pub amt_to_forward_msat: u64,
    pub fee_msat: u64,
    pub expiry_delta: u32,
    pub mpp_payment_addr: Vec<u8>,
    pub mpp_total_amt_msat: u64,
}

/// An ordered sequence of hops from the local node back to itself (§3).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Route {
    pub hops: Vec<Hop>,
}

impl Route {
    pub fn total_amt_msat(&self) -> u64 {
        self.hops.last().map(|h| h.amt_to_forward_msat).unwrap_or(0)
    }

    pub fn total_fees_msat(&self) -> u64 {
        self.hops.iter().map(|h| h.fee_msat).sum()
    }

    /// The node identities visited, in order, starting implicitly at the
    /// local node (not included).
    pub fn hop_pubkeys(&self) -> Vec<NodeId> {
        self.hops.iter().map(|h| h.next_hop_pubkey.clone()).collect()
    }
}

/// An invoice minted for a specific amount, cached so repeated attempts at
/// the same amount reuse it (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub amount_sat: u64,
    pub payment_addr: Vec<u8>,
    pub r_hash: Vec<u8>,
}

/// In-memory cache of invoices keyed by amount, with explicit eviction points
/// (success, context timeout, failed probed retry) (§3).
#[derive(Debug, Default)]
pub struct InvoiceCache {
    by_amount: HashMap<u64, Invoice>,
}

impl InvoiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, amount_sat: u64) -> Option<&Invoice> {
        self.by_amount.get(&amount_sat)
    }

    pub fn insert(&mut self, invoice: Invoice) {
        self.by_amount.insert(invoice.amount_sat, invoice);
    }

    pub fn invalidate(&mut self, amount_sat: u64) {
        self.by_amount.remove(&amount_sat);
    }
}
