use serde::{Deserialize, Serialize};
use tradefin_types::SECS_PER_DAY;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgaParams {
    /// Seconds financiers have to vote on a new application.
    #[serde(default = "default_voting_period")]
    pub voting_period: u64,

    /// Share of the eligible financier power that approves a guarantee.
    #[serde(default = "default_approval_bps")]
    pub approval_bps: u32,

    /// Shortest guarantee duration, in seconds.
    #[serde(default = "default_min_duration")]
    pub min_duration: u64,

    /// Fee on the guarantee amount, paid with the collateral and kept by the pool.
    #[serde(default)]
    pub issuance_fee_bps: u32,

    /// Seconds after completion during which the buyer may still dispute.
    #[serde(default = "default_dispute_grace_period")]
    pub dispute_grace_period: u64,

    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
}

fn default_voting_period() -> u64 {
    3 * SECS_PER_DAY
}

fn default_approval_bps() -> u32 {
    5_100
}

fn default_min_duration() -> u64 {
    30 * SECS_PER_DAY
}

fn default_dispute_grace_period() -> u64 {
    7 * SECS_PER_DAY
}

fn default_max_text_len() -> usize {
    1_000
}

impl Default for PgaParams {
    fn default() -> Self {
        Self {
            voting_period: default_voting_period(),
            approval_bps: default_approval_bps(),
            min_duration: default_min_duration(),
            issuance_fee_bps: 0,
            dispute_grace_period: default_dispute_grace_period(),
            max_text_len: default_max_text_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let params: PgaParams = toml::from_str("issuance_fee_bps = 50\napproval_bps = 6000").unwrap();
        assert_eq!(params.issuance_fee_bps, 50);
        assert_eq!(params.approval_bps, 6_000);
        assert_eq!(params.min_duration, 30 * SECS_PER_DAY);
    }
}
