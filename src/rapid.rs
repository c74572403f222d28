use crate::client::NodeClient;
use crate::config::ABS_MIN_RAPID_MIN_AMOUNT_SAT;
use crate::error::RebalanceError;
use crate::failure_memory::FailureMemory;
use crate::model::{InvoiceCache, Route};
use crate::payment::{self, PayParams, PaymentOutcome};
use crate::stats::StatsWriter;
use rand::Rng;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Increase,
    Decrease,
}

/// Geometric amount schedule (§4.6): doubles on the way up until the
/// route's max-HTLC cap or a failure ("hitting the wall"), then halves on
/// the way down until falling below the floor.
struct Schedule {
    base_amt_sat: u64,
    accelerator: f64,
    strategy: Strategy,
    hitting_the_wall: bool,
    cap_reached: bool,
    max_amount_on_route_sat: u64,
    min_amount_sat: u64,
}

impl Schedule {
    fn new(base_amt_sat: u64, max_amount_on_route_msat: u64, min_amount_sat: u64) -> Self {
        Self {
            base_amt_sat,
            accelerator: 1.0,
            strategy: Strategy::Increase,
            hitting_the_wall: false,
            cap_reached: false,
            max_amount_on_route_sat: (max_amount_on_route_msat / 1000).max(base_amt_sat),
            min_amount_sat: min_amount_sat.max(ABS_MIN_RAPID_MIN_AMOUNT_SAT),
        }
    }

    fn next(&mut self) -> Option<u64> {
        match self.strategy {
            Strategy::Increase => {
                if self.hitting_the_wall {
                    self.hitting_the_wall = false;
                    // Halve past every accelerator level the increase phase
                    // climbed through without emitting an attempt at any of
                    // them; only the first amount below the wall is tried.
                    loop {
                        self.accelerator /= 2.0;
                        if self.accelerator < 1.0 {
                            self.strategy = Strategy::Decrease;
                            self.accelerator = 2.0;
                            return self.decrease_amount();
                        }
                    }
                }

                if !self.cap_reached {
                    self.accelerator *= 2.0;
                }

                let mut amt = (self.accelerator * self.base_amt_sat as f64) as u64;
                if amt >= self.max_amount_on_route_sat {
                    amt = self.max_amount_on_route_sat;
                    self.cap_reached = true;
                }
                Some(amt)
            }
            Strategy::Decrease => {
                self.accelerator *= 2.0;
                self.decrease_amount()
            }
        }
    }

    fn decrease_amount(&self) -> Option<u64> {
        let amt = (self.base_amt_sat as f64 / self.accelerator) as u64;
        if amt < self.min_amount_sat {
            None
        } else {
            Some(amt)
        }
    }

    fn mark_failed(&mut self) {
        match self.strategy {
            Strategy::Increase => self.hitting_the_wall = true,
            Strategy::Decrease => {}
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RapidResult {
    pub successful_attempts: u32,
    pub failed_attempts: u32,
    pub successful_amt_sat: u64,
    pub paid_fee_msat: u64,
}

/// Rapid rebalance (§4.6): after a successful seeding payment, keep paying
/// along the same route topology at a geometrically scaled amount until the
/// schedule exhausts itself or the attempt deadline trips.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    client: &dyn NodeClient,
    invoices: &mut InvoiceCache,
    failure_memory: &mut FailureMemory,
    stats: Option<&StatsWriter>,
    rng: &mut impl Rng,
    base_route: &Route,
    base_amount_sat: u64,
    base_fee_msat: u64,
    src_chan_id: u64,
    local_pubkey: &str,
    max_amount_on_route_msat: u64,
    min_amount_sat: u64,
    fail_tolerance_ppm: u32,
    fee_for: impl Fn(u64) -> Result<u64, RebalanceError>,
    dry_run: bool,
    deadline: Instant,
) -> RapidResult {
    let mut schedule = Schedule::new(base_amount_sat, max_amount_on_route_msat, min_amount_sat);
    let mut result = RapidResult {
        successful_attempts: 1,
        failed_attempts: 0,
        successful_amt_sat: base_amount_sat,
        paid_fee_msat: base_fee_msat,
    };

    let hop_pubkeys: Vec<Vec<u8>> = base_route.hops.iter().map(|h| h.next_hop_pubkey.as_bytes().to_vec()).collect();

    loop {
        if Instant::now() >= deadline {
            break;
        }
        let Some(amt) = schedule.next() else { break };

        let rebuilt = match client.build_route(amt * 1000, src_chan_id, &hop_pubkeys).await {
            Ok(r) => r,
            Err(_) => {
                result.failed_attempts += 1;
                schedule.mark_failed();
                continue;
            }
        };

        let max_fee_msat = match fee_for(amt) {
            Ok(f) => f,
            Err(_) => {
                result.failed_attempts += 1;
                schedule.mark_failed();
                continue;
            }
        };

        let params = PayParams {
            amount_sat: amt,
            min_amount_sat,
            max_fee_msat,
            route: &rebuilt,
            src_chan_id,
            local_pubkey,
            probe_steps: 0,
            fail_tolerance_ppm,
            dry_run,
        };

        match payment::pay(client, invoices, failure_memory, stats, rng, &params, &fee_for).await {
            Ok(PaymentOutcome::Success) => {
                result.successful_attempts += 1;
                result.successful_amt_sat += amt;
                result.paid_fee_msat += rebuilt.total_fees_msat();
            }
            Ok(PaymentOutcome::RetryWith { .. }) => {
                // Rapid rebalance runs with probing disabled; this should
                // not occur, but treat it as a failed iteration if it does.
                result.failed_attempts += 1;
                schedule.mark_failed();
            }
            Err(RebalanceError::FeeExceeded { .. }) if schedule.strategy == Strategy::Decrease => {
                // Smaller amounts cost relatively more in base fees; further
                // shrinking won't help.
                break;
            }
            Err(_) => {
                result.failed_attempts += 1;
                schedule.mark_failed();
            }
        }
    }

    result
}
