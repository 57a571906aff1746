use anyhow::{Result, bail};
use std::collections::HashSet;

/// Seed metadata used for logic and playability analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedInfo {
    pub seed: u64,
}

impl SeedInfo {
    #[must_use]
    pub const fn from_numeric(seed: u64) -> Self {
        Self { seed }
    }
}

pub const DEFAULT_SEED: u64 = 1337;

/// Resolve a list of CLI seed arguments into canonical seed metadata.
///
/// Accepts decimal integers (negative values use their magnitude) and
/// `0x`-prefixed hex. Duplicates are dropped, first occurrence wins.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<SeedInfo>> {
    let mut seen = HashSet::new();
    let mut seeds = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }
        let seed = parse_seed(token)?;
        if seen.insert(seed) {
            seeds.push(SeedInfo::from_numeric(seed));
        }
    }

    if seeds.is_empty() {
        seeds.push(SeedInfo::from_numeric(DEFAULT_SEED));
    }

    Ok(seeds)
}

fn parse_seed(token: &str) -> Result<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        && let Ok(value) = u64::from_str_radix(hex, 16)
    {
        return Ok(value);
    }
    if let Ok(value) = token.parse::<u64>() {
        return Ok(value);
    }
    if let Ok(value) = token.parse::<i64>() {
        return Ok(value.unsigned_abs());
    }
    bail!("Unrecognized seed token: {token}");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn parses_decimal_hex_and_negative() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "0xff", "-7"])).unwrap();
        let values: Vec<u64> = seeds.iter().map(|s| s.seed).collect();
        assert_eq!(values, vec![42, 255, 7]);
    }

    #[test]
    fn large_unsigned_seeds_survive() {
        let seeds = resolve_seed_inputs(&tokens(&["18446744073709551615"])).unwrap();
        assert_eq!(seeds[0].seed, u64::MAX);
    }

    #[test]
    fn duplicates_are_dropped_in_order() {
        let seeds = resolve_seed_inputs(&tokens(&["3", "1", "3", "0x1"])).unwrap();
        let values: Vec<u64> = seeds.iter().map(|s| s.seed).collect();
        assert_eq!(values, vec![3, 1]);
    }

    #[test]
    fn empty_input_defaults() {
        let seeds = resolve_seed_inputs(&[]).unwrap();
        assert_eq!(seeds, vec![SeedInfo::from_numeric(DEFAULT_SEED)]);
    }

    #[test]
    fn rejects_words() {
        let err = resolve_seed_inputs(&tokens(&["pumpkin"])).unwrap_err();
        assert!(err.to_string().contains("pumpkin"));
    }
}
