use crate::config::SelectorConfig;
use crate::error::RebalanceError;
use crate::model::{CandidatePair, LocalChannel};
use std::collections::HashMap;

/// Candidate selector (§4.1): classify local channels into source/target
/// candidates and emit the cross-product of pairs, excluding same-peer pairs.
pub fn select_pairs(
    channels: &[LocalChannel],
    config: &SelectorConfig,
    channel_age_blocks: &HashMap<u64, u32>,
) -> Result<HashMap<String, CandidatePair>, RebalanceError> {
    let only_from = config.only_from_ids().unwrap_or_default();
    let only_to = config.only_to_ids().unwrap_or_default();
    let exclude_from = config.exclude_from_ids().unwrap_or_default();
    let exclude_to = config.exclude_to_ids().unwrap_or_default();
    let exclude_both = config.exclude_both_ids().unwrap_or_default();

    let mut sources = Vec::new();
    let mut targets = Vec::new();

    for c in channels {
        if exclude_both.contains(&c.chan_id) {
            continue;
        }
        if config.exclude_channel_age > 0 {
            if let Some(&age) = channel_age_blocks.get(&c.chan_id) {
                if age < config.exclude_channel_age {
                    continue;
                }
            }
        }

        let is_target = !exclude_to.contains(&c.chan_id)
            && (c.local_balance_sat as f64) < (c.capacity_sat as f64) * config.to_pct / 100.0
            && (only_to.is_empty() || only_to.contains(&c.chan_id));
        if is_target {
            targets.push(c);
        }

        let is_source = !exclude_from.contains(&c.chan_id)
            && (c.remote_balance_sat as f64) < (c.capacity_sat as f64) * config.from_pct / 100.0
            && (only_from.is_empty() || only_from.contains(&c.chan_id));
        if is_source {
            sources.push(c);
        }
    }

    let mut pairs = HashMap::new();
    for src in &sources {
        for dst in &targets {
            if src.chan_id == dst.chan_id {
                continue;
            }
            if src.remote_pubkey == dst.remote_pubkey {
                continue;
            }
            let pair = CandidatePair { src_chan_id: src.chan_id, dst_chan_id: dst.chan_id };
            pairs.insert(pair.key(), pair);
        }
    }

    if pairs.is_empty() {
        return Err(RebalanceError::NoCandidatePairs);
    }

    Ok(pairs)
}
