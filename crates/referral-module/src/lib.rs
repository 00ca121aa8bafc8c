//! Referral graph accounting and payout helpers.
//!
//! The crate is independent of the token that uses it: every structure is
//! generic over the account identifier, so the same tree can be driven by
//! hex addresses, strings or integer ids.
//!
//! * [`tree`] — the referrer registry and the downline counters.
//! * [`permil`] — the per-depth reward table expressed in parts per 10 000.
//! * [`payout`] — walks the referrer chain and prices each level.

pub mod payout;
pub mod permil;
pub mod tree;

mod error;

pub use error::ReferralError;
pub use payout::{ReferralBonus, ReferralEngine};
pub use permil::{PermilTable, DEFAULT_REFERRAL_PERMILS, PERMIL_DENOMINATOR};
pub use tree::{Linked, ReferralTree};
