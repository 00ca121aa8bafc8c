use serde::{Deserialize, Serialize};

use crate::error::ReferralError;

/// Rates are expressed in parts per 10 000.
pub const PERMIL_DENOMINATOR: u32 = 10_000;

/// Direct referrer, second level, third level.
pub const DEFAULT_REFERRAL_PERMILS: [u32; 3] = [300, 200, 100];

/// Reward rate per referral depth, index 0 being the direct referrer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PermilTable {
    values: Vec<u32>,
}

impl Default for PermilTable {
    fn default() -> Self {
        Self {
            values: DEFAULT_REFERRAL_PERMILS.to_vec(),
        }
    }
}

impl PermilTable {
    pub fn new(values: Vec<u32>) -> Result<Self, ReferralError> {
        validate(&values)?;
        Ok(Self { values })
    }

    /// Swap in a whole new table. The old table is kept on error.
    pub fn replace(&mut self, values: Vec<u32>) -> Result<(), ReferralError> {
        validate(&values)?;
        self.values = values;
        Ok(())
    }

    pub fn get(&self, depth: usize) -> Option<u32> {
        self.values.get(depth).copied()
    }

    /// Number of levels paid out.
    pub fn depth(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.values
    }

    /// `floor(amount * permil / 10000)` for the given depth; zero past the
    /// end of the table.
    pub fn share(&self, amount: u128, depth: usize) -> u128 {
        self.get(depth).map_or(0, |permil| apply_permil(amount, permil))
    }
}

/// Floor of `amount * permil / 10000` without the intermediate product, so
/// any `u128` amount is accepted. `permil` must not exceed
/// [`PERMIL_DENOMINATOR`].
pub fn apply_permil(amount: u128, permil: u32) -> u128 {
    let denom = PERMIL_DENOMINATOR as u128;
    let permil = permil as u128;
    (amount / denom) * permil + (amount % denom) * permil / denom
}

fn validate(values: &[u32]) -> Result<(), ReferralError> {
    match values
        .iter()
        .enumerate()
        .find(|&(_, &v)| v > PERMIL_DENOMINATOR)
    {
        Some((index, &value)) => Err(ReferralError::PermilOutOfRange {
            index,
            value,
            max: PERMIL_DENOMINATOR,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_matches_floor_division() {
        let table = PermilTable::new(vec![600, 10, 10]).unwrap();
        let amount = 100 * 10u128.pow(18);
        assert_eq!(table.share(amount, 0), amount * 600 / 10_000);
        assert_eq!(table.share(12_345, 1), 12_345 * 10 / 10_000);
        assert_eq!(table.share(12_345, 3), 0);
    }

    #[test]
    fn share_does_not_overflow() {
        assert_eq!(apply_permil(u128::MAX, PERMIL_DENOMINATOR), u128::MAX);
        assert!(apply_permil(u128::MAX, 9_999) < u128::MAX);
    }

    #[test]
    fn replace_rejects_rates_above_denominator() {
        let mut table = PermilTable::default();
        let err = table.replace(vec![100, 10_001]).unwrap_err();
        assert_eq!(
            err,
            ReferralError::PermilOutOfRange {
                index: 1,
                value: 10_001,
                max: PERMIL_DENOMINATOR
            }
        );
        assert_eq!(table.as_slice(), &DEFAULT_REFERRAL_PERMILS);
    }
}
