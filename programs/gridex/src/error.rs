use thiserror::Error;

/// Failures reported by an [`AssetLedger`](crate::ledger::AssetLedger).
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerError {
    #[error("insufficient balance: {available} < {required}")]
    InsufficientBalance { available: u64, required: u64 },
    #[error("insufficient allowance: {available} < {required}")]
    InsufficientAllowance { available: u64, required: u64 },
    #[error("balance overflow")]
    Overflow,
}

#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GridError {
    // validation
    #[error("invalid price or ratio")]
    InvalidPriceOrRatio,
    #[error("invalid order count")]
    InvalidCount,
    #[error("ask ratio must be above parity")]
    AskRatioTooLow,
    #[error("bid ratio must be below parity")]
    BidRatioTooHigh,
    #[error("ask side implies a zero quote amount")]
    AskZeroQuote,
    #[error("bid side implies a zero quote amount")]
    BidZeroQuote,
    #[error("strategy parameters could not be decoded")]
    InvalidParams,
    #[error("fee outside of configured bounds")]
    InvalidFee,
    #[error("strategy is not allowlisted")]
    StrategyNotAllowed,
    #[error("base and quote must differ")]
    InvalidPair,
    #[error("pair exists with the opposite asset ordering")]
    PairOrderMismatch,
    #[error("zero amount")]
    ZeroAmount,
    #[error("invalid order id")]
    InvalidOrderId,
    #[error("invalid batch")]
    InvalidBatch,
    #[error("native value attached to a pair without a native leg")]
    InvalidNativeValue,
    #[error("invalid configuration")]
    InvalidConfig,

    // state
    #[error("order canceled")]
    OrderCanceled,
    #[error("oneshot order cannot be filled on its reversed side")]
    FillReversedOneShotOrder,
    #[error("grid not found")]
    GridNotFound,
    #[error("order not found")]
    OrderNotFound,
    #[error("pair not found")]
    PairNotFound,
    #[error("caller is not the grid owner")]
    NotGridOwner,
    #[error("caller is not the admin")]
    NotAdmin,
    #[error("caller is not authorized")]
    Unauthorized,
    #[error("grid canceled")]
    GridCanceled,
    #[error("already exists")]
    AlreadyExists,
    #[error("no profits to withdraw")]
    NoProfits,
    #[error("oneshot grid fee cannot be modified")]
    OneshotFeeImmutable,
    #[error("exchange paused")]
    Paused,
    #[error("pair paused")]
    PairPaused,

    // settlement
    #[error("insufficient payment")]
    InsufficientPayment,
    #[error("slippage")]
    Slippage,
    #[error("native transfer failed")]
    NativeTransferFailed,
    #[error("no settlement callback in progress")]
    NoActiveSettlement,
    #[error("asset transfer failed: {0}")]
    Asset(#[from] LedgerError),

    // concurrency
    #[error("reentrant call")]
    Reentrancy,

    // arithmetic
    #[error("math overflow")]
    MathOverflow,
}

impl GridError {
    /// Stable numeric code for hosts that surface errors as integers.
    pub fn code(&self) -> u32 {
        match self {
            GridError::InvalidPriceOrRatio => 1,
            GridError::InvalidCount => 2,
            GridError::AskRatioTooLow => 3,
            GridError::BidRatioTooHigh => 4,
            GridError::AskZeroQuote => 5,
            GridError::BidZeroQuote => 6,
            GridError::InvalidParams => 7,
            GridError::InvalidFee => 8,
            GridError::StrategyNotAllowed => 9,
            GridError::InvalidPair => 10,
            GridError::PairOrderMismatch => 11,
            GridError::ZeroAmount => 12,
            GridError::InvalidOrderId => 13,
            GridError::InvalidBatch => 14,
            GridError::InvalidNativeValue => 15,
            GridError::InvalidConfig => 16,
            GridError::OrderCanceled => 20,
            GridError::FillReversedOneShotOrder => 21,
            GridError::GridNotFound => 22,
            GridError::OrderNotFound => 23,
            GridError::PairNotFound => 24,
            GridError::NotGridOwner => 25,
            GridError::NotAdmin => 26,
            GridError::Unauthorized => 27,
            GridError::GridCanceled => 28,
            GridError::AlreadyExists => 29,
            GridError::NoProfits => 30,
            GridError::OneshotFeeImmutable => 31,
            GridError::Paused => 32,
            GridError::PairPaused => 33,
            GridError::InsufficientPayment => 40,
            GridError::Slippage => 41,
            GridError::NativeTransferFailed => 42,
            GridError::Asset(_) => 43,
            GridError::NoActiveSettlement => 44,
            GridError::Reentrancy => 50,
            GridError::MathOverflow => 60,
        }
    }
}

pub type Result<T> = core::result::Result<T, GridError>;
