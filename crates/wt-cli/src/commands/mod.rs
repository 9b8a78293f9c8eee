//! Subcommand implementations.

pub mod roll;
pub mod table;

use std::sync::Arc;

use wt_dice::{StatBlock, StatValue};
use wt_table::{InstantOracle, OracleLink, RollLog, Roller, TableConfig};

/// Parse `NAME=RAW` / `NAME=RAW:mod` stat flags into a stat block.
///
/// The `:mod` suffix marks the stat for the ability-modifier transform
/// (`floor((raw-10)/2)`) instead of raw substitution.
pub fn parse_stats(specs: &[String]) -> Result<StatBlock, String> {
    let mut stats = StatBlock::new();
    for spec in specs {
        let (name, value) = spec
            .split_once('=')
            .ok_or_else(|| format!("invalid stat '{spec}', expected NAME=RAW or NAME=RAW:mod"))?;
        let (raw, use_ability_modifier) = match value.strip_suffix(":mod") {
            Some(raw) => (raw, true),
            None => (value, false),
        };
        let raw: i32 = raw
            .parse()
            .map_err(|_| format!("invalid stat value in '{spec}'"))?;
        stats.set(
            name,
            StatValue {
                raw,
                use_ability_modifier,
            },
        );
    }
    Ok(stats)
}

/// Wire up a roller backed by the instant oracle and a fresh room log.
pub fn build_roller(seed: Option<u64>, animation: bool, log: Arc<RollLog>) -> Roller {
    let seed = seed.unwrap_or_else(rand::random);
    let (link, requests) = OracleLink::channel();
    InstantOracle::spawn(requests, link.resolver(), seed.wrapping_add(1));
    let config = TableConfig::default()
        .with_seed(seed)
        .with_animation(animation);
    Roller::new(link, config, log)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_raw_and_modifier_stats() {
        let stats =
            parse_stats(&["FOR=14:mod".to_owned(), "Contact=5".to_owned()]).expect("parse");
        assert_eq!(stats.get("FOR").map(StatValue::effective), Some(2));
        assert_eq!(stats.get("CONTACT").map(StatValue::effective), Some(5));
    }

    #[test]
    fn reject_malformed_stat_flags() {
        assert!(parse_stats(&["FOR".to_owned()]).is_err());
        assert!(parse_stats(&["FOR=abc".to_owned()]).is_err());
    }
}
