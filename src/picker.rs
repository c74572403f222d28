use crate::error::RebalanceError;
use crate::failure_memory::FailureMemory;
use crate::model::{CandidatePair, LocalChannel};
use rand::Rng;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickResult {
    pub pair: CandidatePair,
    pub max_amount_sat: u64,
}

/// Channel-pair picker (§4.8): choose a pair uniformly at random from the
/// active set, clamp to the per-side maxima, recurse (via the failure cache)
/// when the pair can't carry `min_amount_sat`, and reactivate expired
/// failures before returning.
#[allow(clippy::too_many_arguments)]
pub fn pick(
    active_pairs: &mut HashMap<String, CandidatePair>,
    failure_memory: &mut FailureMemory,
    channels: &HashMap<u64, LocalChannel>,
    amount_sat: u64,
    min_amount_sat: u64,
    rel_from: f64,
    rel_to: f64,
    route_found: &mut bool,
    rng: &mut impl Rng,
    now: i64,
) -> Result<PickResult, RebalanceError> {
    loop {
        if active_pairs.is_empty() {
            if !*route_found || failure_memory.is_empty() {
                return Err(RebalanceError::NoRoutes);
            }
            for pair in failure_memory.drain_all() {
                active_pairs.insert(pair.key(), pair);
            }
            *route_found = false;
            continue;
        }

        let keys: Vec<String> = active_pairs.keys().cloned().collect();
        let key = keys[rng.gen_range(0..keys.len())].clone();
        let pair = active_pairs.get(&key).cloned().expect("key came from active_pairs");

        let from = channels.get(&pair.src_chan_id).ok_or(RebalanceError::NoRoutes)?;
        let to = channels.get(&pair.dst_chan_id).ok_or(RebalanceError::NoRoutes)?;

        let max_from = if rel_from > 0.0 {
            ((from.capacity_sat as f64 * rel_from) as u64).saturating_sub(from.remote_balance_sat)
        } else {
            from.local_balance_sat
        };
        let max_to = if rel_to > 0.0 {
            ((to.capacity_sat as f64 * rel_to) as u64).saturating_sub(to.local_balance_sat)
        } else {
            to.remote_balance_sat
        };
        let max_amount = if amount_sat > 0 { max_from.min(max_to).min(amount_sat) } else { max_from.min(max_to) };

        if max_amount < min_amount_sat {
            active_pairs.remove(&key);
            failure_memory.fail_pair(pair, now);
            continue;
        }

        for reactivated in failure_memory.reap_expired(now) {
            active_pairs.insert(reactivated.key(), reactivated);
        }

        return Ok(PickResult { pair, max_amount_sat: max_amount });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn chan(id: u64, cap: u64, local: u64, remote: u64) -> LocalChannel {
        LocalChannel {
            chan_id: id,
            capacity_sat: cap,
            local_balance_sat: local,
            remote_balance_sat: remote,
            remote_pubkey: format!("peer{}", id),
            active: true,
            public: true,
        }
    }

    #[test]
    fn clamps_to_min_of_sides_and_amount() {
        let mut active = HashMap::new();
        let pair = CandidatePair { src_chan_id: 1, dst_chan_id: 2 };
        active.insert(pair.key(), pair.clone());
        let mut channels = HashMap::new();
        channels.insert(1, chan(1, 1_000_000, 500_000, 500_000));
        channels.insert(2, chan(2, 1_000_000, 100_000, 900_000));
        let mut mem = FailureMemory::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut route_found = true;

        let result = pick(&mut active, &mut mem, &channels, 1_000_000, 0, 0.0, 0.0, &mut route_found, &mut rng, 0).unwrap();
        assert_eq!(result.max_amount_sat, 500_000); // min(500_000 local, 900_000 remote, 1_000_000 amount)
    }

    #[test]
    fn empty_active_and_empty_failure_cache_is_no_routes() {
        let mut active = HashMap::new();
        let channels = HashMap::new();
        let mut mem = FailureMemory::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut route_found = false;
        let err = pick(&mut active, &mut mem, &channels, 1000, 0, 0.0, 0.0, &mut route_found, &mut rng, 0).unwrap_err();
        assert_eq!(err, RebalanceError::NoRoutes);
    }

    #[test]
    fn below_min_amount_fails_pair_and_recurses() {
        let mut active = HashMap::new();
        let pair = CandidatePair { src_chan_id: 1, dst_chan_id: 2 };
        active.insert(pair.key(), pair);
        let mut channels = HashMap::new();
        channels.insert(1, chan(1, 1_000_000, 1_000, 999_000));
        channels.insert(2, chan(2, 1_000_000, 999_000, 1_000));
        let mut mem = FailureMemory::new();
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut route_found = false;

        let err = pick(&mut active, &mut mem, &channels, 500_000, 100_000, 0.0, 0.0, &mut route_found, &mut rng, 0).unwrap_err();
        assert_eq!(err, RebalanceError::NoRoutes);
        assert!(active.is_empty());
        assert!(!mem.is_empty());
    }

    #[test]
    fn reactivates_failed_pairs_when_active_set_empties() {
        let mut active: HashMap<String, CandidatePair> = HashMap::new();
        let mut mem = FailureMemory::new();
        let pair = CandidatePair { src_chan_id: 1, dst_chan_id: 2 };
        mem.fail_pair(pair, 0);
        let mut channels = HashMap::new();
        channels.insert(1, chan(1, 1_000_000, 500_000, 500_000));
        channels.insert(2, chan(2, 1_000_000, 100_000, 900_000));
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let mut route_found = true;

        let result = pick(&mut active, &mut mem, &channels, 1_000, 0, 0.0, 0.0, &mut route_found, &mut rng, 0).unwrap();
        assert_eq!(result.pair.src_chan_id, 1);
        assert!(!route_found);
    }
}
