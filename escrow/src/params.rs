use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowParams {
    #[serde(default = "default_max_milestones")]
    pub max_milestones: usize,

    /// Limit for milestone descriptions and dispute reasons.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,

    #[serde(default = "default_max_sub_wallets")]
    pub max_sub_wallets: usize,
}

fn default_max_milestones() -> usize {
    20
}

fn default_max_text_len() -> usize {
    1_000
}

fn default_max_sub_wallets() -> usize {
    10
}

impl Default for EscrowParams {
    fn default() -> Self {
        Self {
            max_milestones: default_max_milestones(),
            max_text_len: default_max_text_len(),
            max_sub_wallets: default_max_sub_wallets(),
        }
    }
}
