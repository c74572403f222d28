//! Short channel id parsing (§6, §2.2 supplemented feature).
//!
//! Channel ids may be given either as a plain decimal `u64` or as the human
//! `block×tx×output` triple, packed 24/24/16 bits (block, tx index, output
//! index) high-to-low into a single u64, matching the on-chain scid layout.

use anyhow::{bail, Result};

pub fn parse_scid(s: &str) -> Result<u64> {
    if let Some((block, rest)) = s.split_once('x').or_else(|| s.split_once('X')) {
        let (tx, output) = rest
            .split_once('x')
            .or_else(|| rest.split_once('X'))
            .ok_or_else(|| anyhow::anyhow!("malformed scid triple: {}", s))?;
        let block: u64 = block.parse()?;
        let tx: u64 = tx.parse()?;
        let output: u64 = output.parse()?;
        if block >= (1 << 24) || tx >= (1 << 24) || output >= (1 << 16) {
            bail!("scid component out of range in {}", s);
        }
        Ok((block << 40) | (tx << 16) | output)
    } else {
        Ok(s.parse()?)
    }
}

pub fn format_scid(scid: u64) -> String {
    let block = scid >> 40;
    let tx = (scid >> 16) & 0xFF_FFFF;
    let output = scid & 0xFFFF;
    format!("{}x{}x{}", block, tx, output)
}
