use crate::client::NodeClient;
use crate::config::FeesConfig;
use crate::error::RebalanceError;
use crate::failure_memory::FailureMemory;
use crate::model::Route;
use tokio::time::Instant;

/// Route fetcher (§4.3): query the node, filter through the validator, and
/// retry (mission control will have learned something new from the ignored
/// pairs we just grew) until a non-empty filtered result or the deadline.
pub async fn get_routes(
    client: &dyn NodeClient,
    failure_memory: &mut FailureMemory,
    from_chan_id: u64,
    last_hop_pubkey: &[u8],
    amt_msat: u64,
    max_fee_msat: u64,
    fail_tolerance_ppm: u32,
    local_pubkey: &str,
    fees: &FeesConfig,
    deadline: Instant,
) -> Result<Vec<Route>, RebalanceError> {
    loop {
        if Instant::now() >= deadline {
            return Err(RebalanceError::RouteTimeout);
        }

        let ignored_pairs: Vec<(Vec<u8>, Vec<u8>)> = failure_memory
            .ignored_pairs()
            .into_iter()
            .map(|(f, t)| (hex_decode(&f), hex_decode(&t)))
            .collect();

        let routes = client
            .query_routes(from_chan_id, last_hop_pubkey, amt_msat, max_fee_msat, &ignored_pairs, &[])
            .await
            .map_err(|e| RebalanceError::Transport(e.to_string()))?;

        let valid: Vec<Route> = routes
            .into_iter()
            .filter(|route| validate_route(route, failure_memory, fail_tolerance_ppm, local_pubkey, fees).is_ok())
            .collect();

        if !valid.is_empty() {
            return Ok(valid);
        }
    }
}

/// Route validator (§4.9): reject any route whose hop matches the failure
/// memory within tolerance, or whose last-hop PPM exceeds the configured
/// ceiling.
pub fn validate_route(
    route: &Route,
    failure_memory: &mut FailureMemory,
    fail_tolerance_ppm: u32,
    local_pubkey: &str,
    fees: &FeesConfig,
) -> Result<(), RebalanceError> {
    let mut prev = local_pubkey.to_string();
    for hop in &route.hops {
        if failure_memory.hop_is_failed(&prev, &hop.next_hop_pubkey, hop.amt_to_forward_msat, fail_tolerance_ppm) {
            return Err(RebalanceError::RouteUsesFailedPair);
        }
        prev = hop.next_hop_pubkey.clone();
    }

    if fees.fee_last_hop_ppm > 0 {
        if let Some(last) = route.hops.last() {
            let ppm = if last.amt_to_forward_msat > 0 {
                (last.fee_msat as u128 * 1_000_000 / last.amt_to_forward_msat as u128) as u32
            } else {
                0
            };
            if ppm > fees.fee_last_hop_ppm {
                return Err(RebalanceError::LastHopFeeExceeded);
            }
        }
    }

    Ok(())
}

fn hex_decode(s: &str) -> Vec<u8> {
    if s.len() % 2 != 0 {
        return Vec::new();
    }
    (0..s.len())
        .step_by(2)
        .filter_map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockNodeClient;
    use crate::model::Hop;
    use std::time::Duration;

    fn hop(chan_id: u64, next: &str, amt_msat: u64, fee_msat: u64) -> Hop {
        Hop {
            chan_id,
            next_hop_pubkey: next.to_string(),
            amt_to_forward_msat: amt_msat,
            fee_msat,
            expiry_delta: 40,
            mpp_payment_addr: vec![],
            mpp_total_amt_msat: amt_msat,
        }
    }

    #[test]
    fn validator_rejects_failed_hop() {
        let mut mem = FailureMemory::new();
        mem.record_hop_failure("local".into(), "mid".into(), 50_000_000);
        let route = Route { hops: vec![hop(1, "mid", 50_000_000, 100), hop(2, "dst", 49_900_000, 50)] };
        let err = validate_route(&route, &mut mem, 1_000, "local", &FeesConfig::default()).unwrap_err();
        assert_eq!(err, RebalanceError::RouteUsesFailedPair);
    }

    #[test]
    fn validator_rejects_excess_last_hop_fee() {
        let mem_fees = FeesConfig { fee_last_hop_ppm: 100, ..FeesConfig::default() };
        let mut mem = FailureMemory::new();
        let route = Route { hops: vec![hop(1, "dst", 1_000_000, 200)] }; // 200ppm > 100ppm
        let err = validate_route(&route, &mut mem, 1_000, "local", &mem_fees).unwrap_err();
        assert_eq!(err, RebalanceError::LastHopFeeExceeded);
    }

    #[test]
    fn validator_accepts_clean_route() {
        let mut mem = FailureMemory::new();
        let route = Route { hops: vec![hop(1, "dst", 1_000_000, 50)] };
        assert!(validate_route(&route, &mut mem, 1_000, "local", &FeesConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn get_routes_returns_filtered_non_empty_result() {
        let mock = MockNodeClient::new();
        *mock.routes_to_return.lock().unwrap() = vec![Route { hops: vec![hop(1, "dst", 1_000_000, 50)] }];
        let mut mem = FailureMemory::new();
        let deadline = Instant::now() + Duration::from_secs(5);
        let routes = get_routes(&mock, &mut mem, 1, b"dst", 1_000_000, 1000, 1_000, "local", &FeesConfig::default(), deadline)
            .await
            .unwrap();
        assert_eq!(routes.len(), 1);
    }

    #[tokio::test]
    async fn get_routes_times_out_when_nothing_valid() {
        let mock = MockNodeClient::new();
        *mock.routes_to_return.lock().unwrap() = vec![];
        let mut mem = FailureMemory::new();
        let deadline = Instant::now() + Duration::from_millis(50);
        let err = get_routes(&mock, &mut mem, 1, b"dst", 1_000_000, 1000, 1_000, "local", &FeesConfig::default(), deadline)
            .await
            .unwrap_err();
        assert_eq!(err, RebalanceError::RouteTimeout);
    }
}
