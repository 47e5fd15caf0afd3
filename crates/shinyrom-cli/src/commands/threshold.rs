//! Threshold command implementation.

use anyhow::Result;
use shinyrom::parse_odds;

pub fn run(odds: &str) -> Result<()> {
    let byte = parse_odds(odds);
    println!("Odds input:     {}", odds.trim());
    println!("Patch byte:     {} ({})", byte, byte.value());
    println!("Effective odds: 1 in {}", byte.effective_odds());
    Ok(())
}
