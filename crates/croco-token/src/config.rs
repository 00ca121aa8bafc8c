use referral_module::DEFAULT_REFERRAL_PERMILS;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::units::DECIMALS;

/// Deployment parameters of a token. Missing keys take the defaults.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub referral_permils: Vec<u32>,
    pub referral_active: bool,
    pub referral_pool: Option<Address>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            name: "Croco".to_string(),
            symbol: "CRCO".to_string(),
            decimals: DECIMALS,
            referral_permils: DEFAULT_REFERRAL_PERMILS.to_vec(),
            referral_active: false,
            referral_pool: None,
        }
    }
}
