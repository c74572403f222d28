use crate::client::{NodeClient, SendOutcome};
use crate::error::RebalanceError;
use crate::failure_memory::FailureMemory;
use crate::model::{InvoiceCache, Invoice, Route};
use crate::probe;
use crate::rpc::pb::FailureCode;
use crate::stats::StatsWriter;
use rand::Rng;

/// Outcome of a single `pay` call the attempt loop must act on (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success,
    /// Probe found a smaller feasible amount; caller should rebuild the
    /// route at this amount and retry with probing disabled.
    RetryWith { amount_sat: u64 },
}

pub struct PayParams<'a> {
    pub amount_sat: u64,
    pub min_amount_sat: u64,
    pub max_fee_msat: u64,
    pub route: &'a Route,
    pub src_chan_id: u64,
    pub local_pubkey: &'a str,
    pub probe_steps: u32,
    pub fail_tolerance_ppm: u32,
    pub dry_run: bool,
}

/// Payment attempt (§4.4): mint-or-reuse an invoice, dispatch along the
/// route, classify any HTLC failure, and decide retry/probe/abort.
#[allow(clippy::too_many_arguments)]
pub async fn pay(
    client: &dyn NodeClient,
    invoices: &mut InvoiceCache,
    failure_memory: &mut FailureMemory,
    stats: Option<&StatsWriter>,
    rng: &mut impl Rng,
    params: &PayParams<'_>,
    fee_for: &dyn Fn(u64) -> Result<u64, RebalanceError>,
) -> Result<PaymentOutcome, RebalanceError> {
    pay_inner(client, invoices, failure_memory, stats, rng, params, fee_for, false).await
}

#[allow(clippy::too_many_arguments)]
async fn pay_inner(
    client: &dyn NodeClient,
    invoices: &mut InvoiceCache,
    failure_memory: &mut FailureMemory,
    stats: Option<&StatsWriter>,
    rng: &mut impl Rng,
    params: &PayParams<'_>,
    fee_for: &dyn Fn(u64) -> Result<u64, RebalanceError>,
    already_retried_policy: bool,
) -> Result<PaymentOutcome, RebalanceError> {
    let route_fee = params.route.total_fees_msat();
    if route_fee > params.max_fee_msat {
        return Err(RebalanceError::FeeExceeded { route_fee_msat: route_fee, max_fee_msat: params.max_fee_msat });
    }

    let invoice = ensure_invoice(client, invoices, params.amount_sat)
        .await
        .map_err(|e| RebalanceError::Transport(e.to_string()))?;

    if params.dry_run {
        return Ok(PaymentOutcome::Success);
    }

    let outcome = client
        .send_to_route_v2(&invoice.r_hash, params.route)
        .await
        .map_err(|e| RebalanceError::Transport(e.to_string()))?;

    match outcome {
        SendOutcome::Succeeded => {
            invoices.invalidate(params.amount_sat);
            if let Some(stats) = stats {
                let _ = stats.record(params.src_chan_id, dst_chan_hint(params.route), params.amount_sat * 1000, route_fee);
            }
            Ok(PaymentOutcome::Success)
        }
        SendOutcome::Failed { code, source_index } => {
            let hops = &params.route.hops;
            if source_index < 0 || source_index as usize >= hops.len() {
                return Err(RebalanceError::MalformedFailure { index: source_index, hops: hops.len() });
            }
            let idx = source_index as usize;
            let from = if idx == 0 { params.local_pubkey.to_string() } else { hops[idx - 1].next_hop_pubkey.clone() };
            let to = hops[idx].next_hop_pubkey.clone();
            let amt_msat = hops[idx].amt_to_forward_msat;

            match code {
                FailureCode::FeeInsufficient | FailureCode::IncorrectCltvExpiry if !already_retried_policy => {
                    let rebuilt = client
                        .build_route(params.amount_sat * 1000, params.src_chan_id, &hop_pubkeys_bytes(params.route))
                        .await
                        .map_err(|e| RebalanceError::Transport(e.to_string()))?;
                    if route_materially_differs(params.route, &rebuilt) {
                        let mut next_params = PayParams { route: &rebuilt, ..clone_params_shallow(params) };
                        next_params.route = &rebuilt;
                        return Box::pin(pay_inner(client, invoices, failure_memory, stats, rng, &next_params, fee_for, true)).await;
                    }
                    Err(RebalanceError::HopFailure { code: code.as_str_name().to_string(), index: source_index })
                }
                FailureCode::TemporaryChannelFailure => {
                    failure_memory.record_hop_failure(from, to, amt_msat);
                    let is_second_to_last = idx + 2 == hops.len();
                    if is_second_to_last && params.probe_steps > 0 {
                        let probed = probe::run(
                            client,
                            params.route,
                            params.amount_sat,
                            params.min_amount_sat,
                            params.src_chan_id,
                            params.probe_steps,
                            params.fail_tolerance_ppm,
                            fee_for,
                            rng,
                        )
                        .await?;
                        invoices.invalidate(params.amount_sat);
                        Ok(PaymentOutcome::RetryWith { amount_sat: probed })
                    } else {
                        Err(RebalanceError::HopFailure { code: code.as_str_name().to_string(), index: source_index })
                    }
                }
                other => Err(RebalanceError::HopFailure { code: other.as_str_name().to_string(), index: source_index }),
            }
        }
    }
}

async fn ensure_invoice(client: &dyn NodeClient, invoices: &mut InvoiceCache, amount_sat: u64) -> anyhow::Result<Invoice> {
    if let Some(inv) = invoices.get(amount_sat) {
        return Ok(inv.clone());
    }
    let (payment_addr, r_hash) = client.add_invoice(amount_sat, "rebalance").await?;
    let invoice = Invoice { amount_sat, payment_addr, r_hash };
    invoices.insert(invoice.clone());
    Ok(invoice)
}

fn hop_pubkeys_bytes(route: &Route) -> Vec<Vec<u8>> {
    route.hops.iter().map(|h| h.next_hop_pubkey.as_bytes().to_vec()).collect()
}

fn route_materially_differs(a: &Route, b: &Route) -> bool {
    a.hops.len() != b.hops.len()
        || a.hops.iter().zip(b.hops.iter()).any(|(x, y)| {
            x.chan_id != y.chan_id || x.fee_msat != y.fee_msat || x.expiry_delta != y.expiry_delta
        })
}

fn dst_chan_hint(route: &Route) -> u64 {
    route.hops.last().map(|h| h.chan_id).unwrap_or(0)
}

fn clone_params_shallow<'a>(p: &PayParams<'a>) -> PayParams<'a> {
    PayParams {
        amount_sat: p.amount_sat,
        min_amount_sat: p.min_amount_sat,
        max_fee_msat: p.max_fee_msat,
        route: p.route,
        src_chan_id: p.src_chan_id,
        local_pubkey: p.local_pubkey,
        probe_steps: p.probe_steps,
        fail_tolerance_ppm: p.fail_tolerance_ppm,
        dry_run: p.dry_run,
    }
}
