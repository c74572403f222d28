use anyhow::{Context, Result};
use async_trait::async_trait;
use log::warn;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use tonic::service::interceptor::InterceptedService;
use tonic::service::Interceptor;

use crate::model::{ChannelEdge, LocalChannel, NodeInfo, Route};
use crate::rpc::pb;

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_MS: u64 = 1000;

/// Outcome of a send attempt, trimmed to what the payment-attempt classifier
/// needs (§4.4, §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Succeeded,
    Failed { code: pb::FailureCode, source_index: i32 },
}

/// The node RPC surface this rebalancer depends on (§6). Every method may
/// fail with a transport error; retrying is the real implementation's
/// responsibility, not the caller's.
#[async_trait]
pub trait NodeClient: Send + Sync {
    async fn get_info(&self) -> Result<(Vec<u8>, u32)>;
    async fn list_channels(&self) -> Result<Vec<LocalChannel>>;
    async fn get_chan_info(&self, chan_id: u64) -> Result<ChannelEdge>;
    async fn get_node_info(&self, pubkey: &[u8]) -> Result<NodeInfo>;
    async fn query_routes(
        &self,
        outgoing_chan_id: u64,
        last_hop_pubkey: &[u8],
        amt_msat: u64,
        fee_limit_msat: u64,
        ignored_pairs: &[(Vec<u8>, Vec<u8>)],
        ignored_nodes: &[Vec<u8>],
    ) -> Result<Vec<Route>>;
    async fn build_route(
        &self,
        amt_msat: u64,
        outgoing_chan_id: u64,
        hop_pubkeys: &[Vec<u8>],
    ) -> Result<Route>;
    async fn add_invoice(&self, value_sat: u64, memo: &str) -> Result<(Vec<u8>, Vec<u8>)>;
    async fn send_to_route_v2(&self, payment_hash: &[u8], route: &Route) -> Result<SendOutcome>;
}

/// Attaches a macaroon-equivalent bearer credential to every outgoing call,
/// mirroring how the ambient stack's own client authenticates (API key /
/// cert rather than baking credentials into the channel itself).
#[derive(Clone)]
struct MacaroonInterceptor {
    macaroon_hex: Option<String>,
}

impl Interceptor for MacaroonInterceptor {
    fn call(&mut self, mut req: tonic::Request<()>) -> Result<tonic::Request<()>, tonic::Status> {
        if let Some(macaroon) = &self.macaroon_hex {
            let value = macaroon
                .parse()
                .map_err(|_| tonic::Status::invalid_argument("macaroon is not valid ASCII metadata"))?;
            req.metadata_mut().insert("macaroon", value);
        }
        Ok(req)
    }
}

type AuthedChannel = InterceptedService<tonic::transport::Channel, MacaroonInterceptor>;

/// Real implementation wrapping the generated gRPC client, rate-limited to
/// one in-flight call at a time and retried with exponential backoff —
/// mirroring the ambient stack's own client wrapper.
pub struct RpcNodeClient {
    inner: tokio::sync::Mutex<pb::node_client::NodeClient<AuthedChannel>>,
    rate_limiter: Arc<Semaphore>,
}

impl RpcNodeClient {
    pub fn new(channel: tonic::transport::Channel, macaroon_hex: Option<String>) -> Self {
        let interceptor = MacaroonInterceptor { macaroon_hex };
        Self {
            inner: tokio::sync::Mutex::new(pb::node_client::NodeClient::with_interceptor(channel, interceptor)),
            rate_limiter: Arc::new(Semaphore::new(1)),
        }
    }

    async fn with_retry<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, tonic::Status>>,
    {
        let _permit = self.rate_limiter.acquire().await.context("acquiring rate limiter permit")?;
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(status) if attempt + 1 < MAX_RETRIES => {
                    attempt += 1;
                    let backoff = RETRY_BASE_MS * (1 << (attempt - 1));
                    warn!("rpc call failed ({}), retrying in {}ms", status, backoff);
                    sleep(Duration::from_millis(backoff)).await;
                }
                Err(status) => {
                    return Err(anyhow::anyhow!("rpc call failed after {} attempts: {}", MAX_RETRIES, status))
                }
            }
        }
    }
}

fn pb_route_to_route(r: pb::Route) -> Route {
    Route {
        hops: r
            .hops
            .into_iter()
            .map(|h| crate::model::Hop {
                chan_id: h.chan_id,
                next_hop_pubkey: hex::encode(&h.next_hop_pubkey),
                amt_to_forward_msat: h.amt_to_forward_msat,
                fee_msat: h.fee_msat,
                expiry_delta: h.expiry_delta,
                mpp_payment_addr: h.mpp_payment_addr,
                mpp_total_amt_msat: h.mpp_total_amt_msat,
            })
            .collect(),
    }
}

fn route_to_pb(r: &Route) -> pb::Route {
    pb::Route {
        hops: r
            .hops
            .iter()
            .map(|h| pb::Hop {
                chan_id: h.chan_id,
                next_hop_pubkey: hex_decode(&h.next_hop_pubkey),
                amt_to_forward_msat: h.amt_to_forward_msat,
                fee_msat: h.fee_msat,
                expiry_delta: h.expiry_delta,
                mpp_payment_addr: h.mpp_payment_addr.clone(),
                mpp_total_amt_msat: h.mpp_total_amt_msat,
            })
            .collect(),
        total_amt_msat: r.total_amt_msat(),
        total_fees_msat: r.total_fees_msat(),
        total_time_lock: 0,
    }
}

fn hex_decode(s: &str) -> Vec<u8> {
    hex::decode(s).unwrap_or_default()
}

/// Minimal hex codec so this module does not pull in a dedicated `hex` crate
/// dependency just for logging-friendly pubkey formatting.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, ()> {
        if s.len() % 2 != 0 {
            return Err(());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
            .collect()
    }
}

#[async_trait]
impl NodeClient for RpcNodeClient {
    async fn get_info(&self) -> Result<(Vec<u8>, u32)> {
        let resp = self
            .with_retry(|| async {
                let mut inner = self.inner.lock().await;
                inner.get_info(pb::GetInfoRequest {}).await.map(|r| r.into_inner())
            })
            .await?;
        Ok((resp.identity_pubkey, resp.block_height))
    }

    async fn list_channels(&self) -> Result<Vec<LocalChannel>> {
        let resp = self
            .with_retry(|| async {
                let mut inner = self.inner.lock().await;
                inner
                    .list_channels(pb::ListChannelsRequest {
                        active_only: false,
                        public_only: false,
                        peer: Vec::new(),
                    })
                    .await
                    .map(|r| r.into_inner())
            })
            .await?;
        Ok(resp
            .channels
            .into_iter()
            .map(|c| LocalChannel {
                chan_id: c.chan_id,
                capacity_sat: c.capacity_sat,
                local_balance_sat: c.local_balance_sat,
                remote_balance_sat: c.remote_balance_sat,
                remote_pubkey: hex::encode(&c.remote_pubkey),
                active: c.active,
                public: c.public,
            })
            .collect())
    }

    async fn get_chan_info(&self, chan_id: u64) -> Result<ChannelEdge> {
        let resp = self
            .with_retry(|| async {
                let mut inner = self.inner.lock().await;
                inner.get_chan_info(pb::GetChanInfoRequest { chan_id }).await.map(|r| r.into_inner())
            })
            .await?;
        Ok(ChannelEdge {
            chan_id: resp.chan_id,
            node1_pubkey: hex::encode(&resp.node1_pubkey),
            node2_pubkey: hex::encode(&resp.node2_pubkey),
            node1_policy: resp.node1_policy.map(pb_policy_to_policy).unwrap_or_default(),
            node2_policy: resp.node2_policy.map(pb_policy_to_policy).unwrap_or_default(),
        })
    }

    async fn get_node_info(&self, pubkey: &[u8]) -> Result<NodeInfo> {
        let pubkey = pubkey.to_vec();
        let resp = self
            .with_retry(|| {
                let pubkey = pubkey.clone();
                async move {
                    let mut inner = self.inner.lock().await;
                    inner.get_node_info(pb::GetNodeInfoRequest { pubkey }).await.map(|r| r.into_inner())
                }
            })
            .await?;
        Ok(NodeInfo {
            pubkey: hex::encode(&resp.pubkey),
            alias: resp.alias,
            num_channels: resp.num_channels,
            total_capacity_sat: resp.total_capacity_sat,
            last_update: resp.last_update,
        })
    }

    async fn query_routes(
        &self,
        outgoing_chan_id: u64,
        last_hop_pubkey: &[u8],
        amt_msat: u64,
        fee_limit_msat: u64,
        ignored_pairs: &[(Vec<u8>, Vec<u8>)],
        ignored_nodes: &[Vec<u8>],
    ) -> Result<Vec<Route>> {
        let req = pb::QueryRoutesRequest {
            outgoing_chan_id,
            last_hop_pubkey: last_hop_pubkey.to_vec(),
            amt_msat,
            fee_limit_msat,
            use_mission_control: true,
            ignored_pairs: ignored_pairs
                .iter()
                .map(|(from, to)| pb::NodePair { from: from.clone(), to: to.clone() })
                .collect(),
            ignored_nodes: ignored_nodes.to_vec(),
        };
        let resp = self
            .with_retry(|| {
                let req = req.clone();
                async move {
                    let mut inner = self.inner.lock().await;
                    inner.query_routes(req).await.map(|r| r.into_inner())
                }
            })
            .await?;
        Ok(resp.routes.into_iter().map(pb_route_to_route).collect())
    }

    async fn build_route(&self, amt_msat: u64, outgoing_chan_id: u64, hop_pubkeys: &[Vec<u8>]) -> Result<Route> {
        let req = pb::BuildRouteRequest {
            amt_msat,
            outgoing_chan_id,
            hop_pubkeys: hop_pubkeys.to_vec(),
            final_cltv_delta: 144,
        };
        let resp = self
            .with_retry(|| {
                let req = req.clone();
                async move {
                    let mut inner = self.inner.lock().await;
                    inner.build_route(req).await.map(|r| r.into_inner())
                }
            })
            .await?;
        Ok(pb_route_to_route(resp))
    }

    async fn add_invoice(&self, value_sat: u64, memo: &str) -> Result<(Vec<u8>, Vec<u8>)> {
        let req = pb::AddInvoiceRequest { value_sat, memo: memo.to_string(), expiry_seconds: 86_400 };
        let resp = self
            .with_retry(|| {
                let req = req.clone();
                async move {
                    let mut inner = self.inner.lock().await;
                    inner.add_invoice(req).await.map(|r| r.into_inner())
                }
            })
            .await?;
        Ok((resp.payment_addr, resp.r_hash))
    }

    async fn send_to_route_v2(&self, payment_hash: &[u8], route: &Route) -> Result<SendOutcome> {
        let req = pb::SendToRouteRequest {
            payment_hash: payment_hash.to_vec(),
            route: Some(route_to_pb(route)),
        };
        let resp = self
            .with_retry(|| {
                let req = req.clone();
                async move {
                    let mut inner = self.inner.lock().await;
                    inner.send_to_route_v2(req).await.map(|r| r.into_inner())
                }
            })
            .await?;
        if resp.status == pb::PaymentStatus::Succeeded as i32 {
            Ok(SendOutcome::Succeeded)
        } else {
            let code = match resp.failure_code {
                1 => pb::FailureCode::TemporaryChannelFailure,
                2 => pb::FailureCode::FeeInsufficient,
                3 => pb::FailureCode::IncorrectCltvExpiry,
                4 => pb::FailureCode::IncorrectOrUnknownPaymentDetails,
                5 => pb::FailureCode::MppTimeout,
                _ => pb::FailureCode::UnknownFailure,
            };
            Ok(SendOutcome::Failed { code, source_index: resp.failure_source_index })
        }
    }
}

fn pb_policy_to_policy(p: pb::RoutingPolicy) -> crate::model::RoutingPolicy {
    crate::model::RoutingPolicy {
        base_fee_msat: p.base_fee_msat,
        fee_rate_ppm: p.fee_rate_ppm,
        max_htlc_msat: p.max_htlc_msat,
        disabled: p.disabled,
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records calls the way the ambient stack's own mock client does, so
    /// tests can assert on what was sent without a live node.
    #[derive(Default)]
    pub struct MockNodeClient {
        pub identity_pubkey: Vec<u8>,
        pub block_height: u32,
        pub channels: Mutex<Vec<LocalChannel>>,
        pub edges: Mutex<std::collections::HashMap<u64, ChannelEdge>>,
        pub node_infos: Mutex<std::collections::HashMap<String, NodeInfo>>,
        pub routes_to_return: Mutex<Vec<Route>>,
        pub build_route_result: Mutex<Option<Route>>,
        pub send_results: Mutex<Vec<SendOutcome>>,
        pub invoice_counter: Mutex<u64>,

        pub query_routes_calls: Mutex<Vec<(u64, u64)>>,
        pub send_calls: Mutex<Vec<Vec<u8>>>,
        pub build_route_calls: Mutex<Vec<u64>>,
    }

    impl MockNodeClient {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl NodeClient for MockNodeClient {
        async fn get_info(&self) -> Result<(Vec<u8>, u32)> {
            Ok((self.identity_pubkey.clone(), self.block_height))
        }

        async fn list_channels(&self) -> Result<Vec<LocalChannel>> {
            Ok(self.channels.lock().unwrap().clone())
        }

        async fn get_chan_info(&self, chan_id: u64) -> Result<ChannelEdge> {
            self.edges
                .lock()
                .unwrap()
                .get(&chan_id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no such channel: {}", chan_id))
        }

        async fn get_node_info(&self, pubkey: &[u8]) -> Result<NodeInfo> {
            let key = super::hex::encode(pubkey);
            self.node_infos
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("no such node: {}", key))
        }

        async fn query_routes(
            &self,
            outgoing_chan_id: u64,
            _last_hop_pubkey: &[u8],
            amt_msat: u64,
            _fee_limit_msat: u64,
            _ignored_pairs: &[(Vec<u8>, Vec<u8>)],
            _ignored_nodes: &[Vec<u8>],
        ) -> Result<Vec<Route>> {
            self.query_routes_calls.lock().unwrap().push((outgoing_chan_id, amt_msat));
            Ok(self.routes_to_return.lock().unwrap().clone())
        }

        async fn build_route(&self, _amt_msat: u64, outgoing_chan_id: u64, _hop_pubkeys: &[Vec<u8>]) -> Result<Route> {
            self.build_route_calls.lock().unwrap().push(outgoing_chan_id);
            self.build_route_result
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| anyhow::anyhow!("mock has no build_route_result configured"))
        }

        async fn add_invoice(&self, value_sat: u64, _memo: &str) -> Result<(Vec<u8>, Vec<u8>)> {
            let mut counter = self.invoice_counter.lock().unwrap();
            *counter += 1;
            let addr = format!("addr-{}-{}", value_sat, counter).into_bytes();
            let hash = format!("hash-{}-{}", value_sat, counter).into_bytes();
            Ok((addr, hash))
        }

        async fn send_to_route_v2(&self, payment_hash: &[u8], _route: &Route) -> Result<SendOutcome> {
            self.send_calls.lock().unwrap().push(payment_hash.to_vec());
            let mut results = self.send_results.lock().unwrap();
            if results.is_empty() {
                Ok(SendOutcome::Succeeded)
            } else {
                Ok(results.remove(0))
            }
        }
    }
}
