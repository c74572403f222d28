use crate::cache::EdgeCache;
use crate::client::NodeClient;
use crate::config::Config;
use crate::error::RebalanceError;
use crate::payment::{self, PayParams, PaymentOutcome};
use crate::picker;
use crate::rapid;
use crate::routes;
use crate::session::Session;
use crate::stats::StatsWriter;
use crate::ui;
use crate::fees;
use tokio::time::{sleep_until, Duration, Instant};

/// Totals accumulated across a whole rebalance session (§4.7, §6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResult {
    pub successful_attempts: u32,
    pub failed_attempts: u32,
    pub successful_amt_sat: u64,
    pub paid_fee_msat: u64,
}

impl SessionResult {
    fn absorb(&mut self, other: &SessionResult) {
        self.successful_attempts += other.successful_attempts;
        self.failed_attempts += other.failed_attempts;
        self.successful_amt_sat += other.successful_amt_sat;
        self.paid_fee_msat += other.paid_fee_msat;
    }
}

/// Outer controller (§4.7): nested session/attempt/route-query deadlines.
/// Crossing the session deadline ends the loop; crossing an attempt deadline
/// cancels that attempt's in-flight work via `tokio::select!` and counts as
/// one failed attempt; an exhausted candidate set ends the loop early.
pub async fn run(client: &dyn NodeClient, config: &Config, session: &mut Session, stats: Option<&StatsWriter>, now: i64) -> SessionResult {
    let session_deadline = Instant::now() + Duration::from_secs(config.timeouts.timeout_rebalance_minutes * 60);
    let mut total = SessionResult::default();

    loop {
        if Instant::now() >= session_deadline {
            break;
        }
        let attempt_deadline = std::cmp::min(
            Instant::now() + Duration::from_secs(config.timeouts.timeout_attempt_minutes * 60),
            session_deadline,
        );

        let attempt = run_one_attempt(client, config, session, stats, now, attempt_deadline);
        let result = tokio::select! {
            res = attempt => res,
            _ = sleep_until(attempt_deadline) => Err(RebalanceError::AttemptTimeout),
        };

        match result {
            Ok(r) => {
                session.route_found = true;
                total.absorb(&r);
                break;
            }
            Err(RebalanceError::NoRoutes) | Err(RebalanceError::NoCandidatePairs) => {
                log::info!("no further candidate pairs, ending session");
                ui::session_ended("no further candidate pairs");
                break;
            }
            Err(e) => {
                log::warn!("attempt failed: {}", e);
                ui::attempt_failed(&e.to_string());
                total.failed_attempts += 1;
            }
        }
    }

    total
}

#[allow(clippy::too_many_arguments)]
async fn run_one_attempt(
    client: &dyn NodeClient,
    config: &Config,
    session: &mut Session,
    stats: Option<&StatsWriter>,
    now: i64,
    attempt_deadline: Instant,
) -> Result<SessionResult, RebalanceError> {
    let pick = picker::pick(
        &mut session.active_pairs,
        &mut session.failure_memory,
        &session.channels,
        config.amount.amount_sat,
        config.amount.min_amount_sat,
        config.amount.rel_from,
        config.amount.rel_to,
        &mut session.route_found,
        &mut session.rng,
        now,
    )?;

    let amount_sat = if config.amount.amount_sat > 0 {
        config.amount.amount_sat.min(pick.max_amount_sat)
    } else {
        pick.max_amount_sat
    };

    let src_edge = fetch_edge(client, &mut session.edge_cache, pick.pair.src_chan_id).await?;
    let dst_edge = fetch_edge(client, &mut session.edge_cache, pick.pair.dst_chan_id).await?;
    let p_from = src_edge.counterparty_policy(&session.local_pubkey);
    let p_to = dst_edge.counterparty_policy(&session.local_pubkey);
    let last_hop_pubkey = dst_edge.counterparty_of(&session.local_pubkey);
    let last_hop_pubkey_bytes = hex_decode(&last_hop_pubkey);

    let fee_for = |amt_sat: u64| -> Result<u64, RebalanceError> {
        fees::compute(amt_sat * 1000, p_to, Some(p_from), &config.fees).map(|b| b.max_fee_msat)
    };

    let fee_budget = fees::compute(amount_sat * 1000, p_to, Some(p_from), &config.fees)?;

    let route_deadline = std::cmp::min(Instant::now() + Duration::from_secs(config.timeouts.timeout_route_seconds), attempt_deadline);
    let candidate_routes = routes::get_routes(
        client,
        &mut session.failure_memory,
        pick.pair.src_chan_id,
        &last_hop_pubkey_bytes,
        amount_sat * 1000,
        fee_budget.max_fee_msat,
        config.general.fail_tolerance_ppm,
        &session.local_pubkey,
        &config.fees,
        route_deadline,
    )
    .await?;

    let route = candidate_routes.into_iter().next().ok_or(RebalanceError::NoRoutes)?;

    let params = PayParams {
        amount_sat,
        min_amount_sat: config.amount.min_amount_sat,
        max_fee_msat: fee_budget.max_fee_msat,
        route: &route,
        src_chan_id: pick.pair.src_chan_id,
        local_pubkey: &session.local_pubkey,
        probe_steps: config.general.probe_steps,
        fail_tolerance_ppm: config.general.fail_tolerance_ppm,
        dry_run: config.general.dry_run,
    };

    let outcome = payment::pay(client, &mut session.invoices, &mut session.failure_memory, stats, &mut session.rng, &params, &fee_for).await?;

    let (final_route, final_amount, paid_fee) = match outcome {
        PaymentOutcome::Success => {
            let paid = route.total_fees_msat();
            (route, amount_sat, paid)
        }
        PaymentOutcome::RetryWith { amount_sat: probed } => {
            let hop_pubkeys: Vec<Vec<u8>> = params.route.hops.iter().map(|h| h.next_hop_pubkey.as_bytes().to_vec()).collect();
            let rebuilt = client
                .build_route(probed * 1000, pick.pair.src_chan_id, &hop_pubkeys)
                .await
                .map_err(|e| RebalanceError::Transport(e.to_string()))?;
            let retry_fee_budget = fees::compute(probed * 1000, p_to, Some(p_from), &config.fees)?;
            let retry_params = PayParams {
                amount_sat: probed,
                min_amount_sat: config.amount.min_amount_sat,
                max_fee_msat: retry_fee_budget.max_fee_msat,
                route: &rebuilt,
                src_chan_id: pick.pair.src_chan_id,
                local_pubkey: &session.local_pubkey,
                probe_steps: 0,
                fail_tolerance_ppm: config.general.fail_tolerance_ppm,
                dry_run: config.general.dry_run,
            };
            payment::pay(client, &mut session.invoices, &mut session.failure_memory, stats, &mut session.rng, &retry_params, &fee_for).await?;
            let fee = rebuilt.total_fees_msat();
            (rebuilt, probed, fee)
        }
    };

    ui::attempt_succeeded(pick.pair.src_chan_id, pick.pair.dst_chan_id, final_amount, paid_fee);

    let mut result = SessionResult {
        successful_attempts: 1,
        failed_attempts: 0,
        successful_amt_sat: final_amount,
        paid_fee_msat: paid_fee,
    };

    if config.rapid.enabled {
        // Approximate the route's ceiling with the last hop's advertised
        // max_htlc_msat; a tighter bound would require fetching every hop's
        // channel edge, which the route query already filtered on.
        let max_amount_on_route_msat = p_to.max_htlc_msat;
        let rapid_result = rapid::run(
            client,
            &mut session.invoices,
            &mut session.failure_memory,
            stats,
            &mut session.rng,
            &final_route,
            final_amount,
            paid_fee,
            pick.pair.src_chan_id,
            &session.local_pubkey,
            max_amount_on_route_msat,
            config.amount.min_amount_sat,
            config.general.fail_tolerance_ppm,
            &fee_for,
            config.general.dry_run,
            attempt_deadline,
        )
        .await;
        result.successful_attempts = rapid_result.successful_attempts;
        result.failed_attempts = rapid_result.failed_attempts;
        result.successful_amt_sat = rapid_result.successful_amt_sat;
        result.paid_fee_msat = rapid_result.paid_fee_msat;
    }

    Ok(result)
}

async fn fetch_edge(client: &dyn NodeClient, edge_cache: &mut EdgeCache, chan_id: u64) -> Result<crate::model::ChannelEdge, RebalanceError> {
    edge_cache.get(client, chan_id).await.map_err(|e| RebalanceError::Transport(e.to_string()))
}

fn hex_decode(s: &str) -> Vec<u8> {
    if s.len() % 2 != 0 {
        return Vec::new();
    }
    (0..s.len()).step_by(2).filter_map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
}
