use crate::error::UnitsError;

pub const DECIMALS: u8 = 18;

/// `whole` tokens expressed in base units, at the default 18 decimals.
pub fn tokens(whole: u128) -> u128 {
    whole * 10u128.pow(DECIMALS as u32)
}

/// Parse a decimal token amount such as `"100"` or `"0.25"` into base units.
pub fn parse_units(s: &str, decimals: u8) -> Result<u128, UnitsError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err(UnitsError::InvalidDigit(s.to_string()));
    }
    if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(UnitsError::InvalidDigit(s.to_string()));
    }
    if frac.len() > decimals as usize {
        return Err(UnitsError::TooManyDecimals { decimals });
    }

    let scale = 10u128
        .checked_pow(decimals as u32)
        .ok_or(UnitsError::Overflow)?;
    let whole_units = digits_to_u128(whole)?
        .checked_mul(scale)
        .ok_or(UnitsError::Overflow)?;
    let frac_scale = 10u128.pow((decimals as usize - frac.len()) as u32);
    let frac_units = digits_to_u128(frac)?
        .checked_mul(frac_scale)
        .ok_or(UnitsError::Overflow)?;
    whole_units
        .checked_add(frac_units)
        .ok_or(UnitsError::Overflow)
}

/// Render base units as a decimal string, trimming trailing zeros.
pub fn format_units(amount: u128, decimals: u8) -> String {
    let Some(scale) = 10u128.checked_pow(decimals as u32) else {
        return amount.to_string();
    };
    let whole = amount / scale;
    let frac = amount % scale;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

fn digits_to_u128(digits: &str) -> Result<u128, UnitsError> {
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse::<u128>().map_err(|_| UnitsError::Overflow)
}

/// Serde adapter writing `u128` amounts as decimal strings. Used inside
/// tagged enums, where serde cannot buffer 128-bit integers.
pub mod serde_amount {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        encoded.parse().map_err(D::Error::custom)
    }
}
