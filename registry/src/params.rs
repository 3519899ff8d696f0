use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryParams {
    #[serde(default = "default_max_number_len")]
    pub max_number_len: usize,

    /// Limit for invoice descriptions and document metadata URIs.
    #[serde(default = "default_max_text_len")]
    pub max_text_len: usize,
}

fn default_max_number_len() -> usize {
    64
}

fn default_max_text_len() -> usize {
    1_000
}

impl Default for RegistryParams {
    fn default() -> Self {
        Self {
            max_number_len: default_max_number_len(),
            max_text_len: default_max_text_len(),
        }
    }
}
