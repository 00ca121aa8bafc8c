use thiserror::Error;

/// Failures raised while editing the referral graph or its reward table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferralError {
    /// An account tried to become its own referrer.
    #[error("Can not add self as referrer")]
    SelfReferral,

    /// The new edge would close a loop in the referrer chain.
    #[error("Referred can not refer its referrer")]
    ReferrerCycle,

    /// A reward rate above 100 %.
    #[error("permil at depth {index} is {value}, maximum is {max}")]
    PermilOutOfRange { index: usize, value: u32, max: u32 },
}
