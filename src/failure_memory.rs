use crate::model::{CandidatePair, FailedHopPair, FailedPair};
use std::collections::HashMap;

const PAIR_FAILURE_EXPIRY_SECONDS: i64 = 5 * 60;

/// Two kinds of failure memory (§3, §4.9, §4.10): channel-pair cool-down, and
/// per-directed-node-pair penalization with the amount it failed at.
#[derive(Default)]
pub struct FailureMemory {
    failed_pairs: Vec<FailedPair>,
    failed_hops: HashMap<FailedHopPair, u64>,
}

impl FailureMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_pair(&mut self, pair: CandidatePair, now: i64) {
        self.failed_pairs.push(FailedPair { pair, expires_at: now + PAIR_FAILURE_EXPIRY_SECONDS });
    }

    /// Re-activate expired pairs, returning them for the caller to merge back
    /// into the active set (§4.8).
    pub fn reap_expired(&mut self, now: i64) -> Vec<CandidatePair> {
        let mut reactivated = Vec::new();
        self.failed_pairs.retain(|fp| {
            if fp.expires_at <= now {
                reactivated.push(fp.pair.clone());
                false
            } else {
                true
            }
        });
        reactivated
    }

    pub fn is_empty(&self) -> bool {
        self.failed_pairs.is_empty()
    }

    pub fn drain_all(&mut self) -> Vec<CandidatePair> {
        self.failed_pairs.drain(..).map(|fp| fp.pair).collect()
    }

    pub fn record_hop_failure(&mut self, from: String, to: String, amt_msat: u64) {
        self.failed_hops.insert(FailedHopPair { from, to }, amt_msat);
    }

    /// §4.9: reject a hop whose amount is within `fail_tolerance_ppm` of the
    /// remembered failing amount for this directed pair. Per §4.9 the ratio's
    /// denominator is specifically the remembered failing amount `fp`, not a
    /// symmetric measure (see `absolute_delta_ppm` for the symmetric utility).
    pub fn hop_is_failed(&self, from: &str, to: &str, amt_msat: u64, fail_tolerance_ppm: u32) -> bool {
        match self.failed_hops.get(&FailedHopPair { from: from.to_string(), to: to.to_string() }) {
            Some(&failed_amt) if failed_amt > 0 => {
                let delta = failed_amt.abs_diff(amt_msat);
                ((delta as u128 * 1_000_000) / failed_amt as u128) < fail_tolerance_ppm as u128
            }
            _ => false,
        }
    }

    pub fn ignored_pairs(&self) -> Vec<(String, String)> {
        self.failed_hops.keys().map(|p| (p.from.clone(), p.to.clone())).collect()
    }
}

/// Symmetric relative-difference-in-PPM utility (§8: `absoluteDeltaPPM(a, b)
/// == absoluteDeltaPPM(b, a)` for `a, b > 0`), denominated against the larger
/// of the two amounts so swapping the arguments cannot change the result.
pub fn absolute_delta_ppm(a: u64, b: u64) -> u64 {
    let denom = a.max(b);
    if denom == 0 {
        return 0;
    }
    let delta = a.abs_diff(b);
    ((delta as u128 * 1_000_000) / denom as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaps_only_expired_pairs() {
        let mut mem = FailureMemory::new();
        let pair = CandidatePair { src_chan_id: 1, dst_chan_id: 2 };
        mem.fail_pair(pair.clone(), 0);
        assert!(mem.reap_expired(10).is_empty());
        let reaped = mem.reap_expired(1_000);
        assert_eq!(reaped, vec![pair]);
        assert!(mem.is_empty());
    }

    #[test]
    fn hop_failure_within_tolerance_is_rejected() {
        let mut mem = FailureMemory::new();
        mem.record_hop_failure("a".into(), "b".into(), 50_000_000);
        assert!(mem.hop_is_failed("a", "b", 50_010_000, 1_000));
        assert!(!mem.hop_is_failed("a", "b", 60_000_000, 1_000));
        assert!(!mem.hop_is_failed("b", "a", 50_000_000, 1_000));
    }

    #[test]
    fn delta_ppm_is_symmetric() {
        assert_eq!(absolute_delta_ppm(100, 110), absolute_delta_ppm(110, 100));
        assert_eq!(absolute_delta_ppm(100, 100), 0);
    }
}
