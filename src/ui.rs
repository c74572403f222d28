use colored::Colorize;

/// Colored human-readable summary lines (§2.1), kept separate from the
/// structured `log` output: one line per attempt outcome, paid fee shown in
/// both sat and PPM of the amount moved.
pub fn attempt_succeeded(from_chan_id: u64, to_chan_id: u64, amount_sat: u64, fee_msat: u64) {
    let fee_sat = fee_msat / 1000;
    let ppm = if amount_sat > 0 { fee_msat * 1_000_000 / (amount_sat * 1000) } else { 0 };
    println!(
        "{} {}→{}: moved {} sat, paid {} sat ({} ppm)",
        "ok".green().bold(),
        from_chan_id,
        to_chan_id,
        amount_sat,
        fee_sat,
        ppm
    );
}

pub fn attempt_failed(reason: &str) {
    println!("{} {}", "failed".red().bold(), reason);
}

pub fn session_ended(reason: &str) {
    println!("{} {}", "session".yellow().bold(), reason);
}
