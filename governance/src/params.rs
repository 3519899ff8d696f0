//! Governance parameters.

use serde::{Deserialize, Serialize};
use tradefin_types::amount::decimal_string;
use tradefin_types::{Amount, SECS_PER_DAY, TOKEN_UNIT};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Voting power needed to open a proposal.
    #[serde(default = "default_proposal_threshold", with = "decimal_string")]
    pub proposal_threshold: Amount,

    /// Seconds a proposal stays open.
    #[serde(default = "default_voting_period")]
    pub voting_period: u64,

    /// Share of the eligible power that must vote, in basis points.
    #[serde(default = "default_quorum_bps")]
    pub quorum_bps: u32,

    /// Financier approvals needed to execute a multisig proposal.
    #[serde(default = "default_multisig_quorum")]
    pub multisig_quorum: u32,

    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,

    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,

    #[serde(default = "default_request_voting_period")]
    pub request_voting_period: u64,

    #[serde(default = "default_request_quorum_bps")]
    pub request_quorum_bps: u32,
}

fn default_proposal_threshold() -> Amount {
    1_000 * TOKEN_UNIT
}

fn default_voting_period() -> u64 {
    7 * SECS_PER_DAY
}

fn default_quorum_bps() -> u32 {
    1_000
}

fn default_multisig_quorum() -> u32 {
    3
}

fn default_max_title_len() -> usize {
    200
}

fn default_max_description_len() -> usize {
    5_000
}

fn default_request_voting_period() -> u64 {
    3 * SECS_PER_DAY
}

fn default_request_quorum_bps() -> u32 {
    2_000
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            proposal_threshold: default_proposal_threshold(),
            voting_period: default_voting_period(),
            quorum_bps: default_quorum_bps(),
            multisig_quorum: default_multisig_quorum(),
            max_title_len: default_max_title_len(),
            max_description_len: default_max_description_len(),
            request_voting_period: default_request_voting_period(),
            request_quorum_bps: default_request_quorum_bps(),
        }
    }
}
