use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    BPS_DENOMINATOR, DEFAULT_MAX_FEE_PPM, DEFAULT_MAX_ORDERS_PER_SIDE, DEFAULT_MIN_FEE_PPM, DEFAULT_ONESHOT_FEE_PPM,
    DEFAULT_PROTOCOL_FEE_SHARE_BPS, FEE_DENOMINATOR,
};
use crate::state::Address;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Exchange-wide parameters owned by the administrative component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Account allowed to pause, tune fees and manage strategies.
    pub admin: Address,
    /// Ledger account holding every grid's funds.
    pub engine: Address,
    /// Receiver of the protocol share of fees.
    pub vault: Address,
    #[serde(default = "default_min_fee_ppm")]
    pub min_fee_ppm: u32,
    #[serde(default = "default_max_fee_ppm")]
    pub max_fee_ppm: u32,
    /// Fixed fee applied to every oneshot grid.
    #[serde(default = "default_oneshot_fee_ppm")]
    pub oneshot_fee_ppm: u32,
    #[serde(default = "default_protocol_fee_share_bps")]
    pub protocol_fee_share_bps: u16,
    #[serde(default = "default_max_orders_per_side")]
    pub max_orders_per_side: u32,
}

fn default_min_fee_ppm() -> u32 {
    DEFAULT_MIN_FEE_PPM
}

fn default_max_fee_ppm() -> u32 {
    DEFAULT_MAX_FEE_PPM
}

fn default_oneshot_fee_ppm() -> u32 {
    DEFAULT_ONESHOT_FEE_PPM
}

fn default_protocol_fee_share_bps() -> u16 {
    DEFAULT_PROTOCOL_FEE_SHARE_BPS
}

fn default_max_orders_per_side() -> u32 {
    DEFAULT_MAX_ORDERS_PER_SIDE
}

impl ExchangeConfig {
    pub fn new(admin: Address, engine: Address, vault: Address) -> Self {
        Self {
            admin,
            engine,
            vault,
            min_fee_ppm: DEFAULT_MIN_FEE_PPM,
            max_fee_ppm: DEFAULT_MAX_FEE_PPM,
            oneshot_fee_ppm: DEFAULT_ONESHOT_FEE_PPM,
            protocol_fee_share_bps: DEFAULT_PROTOCOL_FEE_SHARE_BPS,
            max_orders_per_side: DEFAULT_MAX_ORDERS_PER_SIDE,
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ExchangeConfig = toml::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_fee_ppm > self.max_fee_ppm {
            return Err(ConfigError::InvalidValue {
                field: "min_fee_ppm",
                reason: format!("{} exceeds max_fee_ppm {}", self.min_fee_ppm, self.max_fee_ppm),
            });
        }
        if self.max_fee_ppm as u64 > FEE_DENOMINATOR {
            return Err(ConfigError::InvalidValue {
                field: "max_fee_ppm",
                reason: format!("must not exceed {FEE_DENOMINATOR}"),
            });
        }
        if self.oneshot_fee_ppm as u64 > FEE_DENOMINATOR {
            return Err(ConfigError::InvalidValue {
                field: "oneshot_fee_ppm",
                reason: format!("must not exceed {FEE_DENOMINATOR}"),
            });
        }
        if self.protocol_fee_share_bps as u64 > BPS_DENOMINATOR {
            return Err(ConfigError::InvalidValue {
                field: "protocol_fee_share_bps",
                reason: format!("must not exceed {BPS_DENOMINATOR}"),
            });
        }
        if self.max_orders_per_side == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_orders_per_side",
                reason: "must be positive".to_string(),
            });
        }
        if self.engine == self.vault {
            return Err(ConfigError::InvalidValue {
                field: "vault",
                reason: "must differ from the engine account".to_string(),
            });
        }
        Ok(())
    }

    pub fn fee_in_bounds(&self, fee_ppm: u32) -> bool {
        fee_ppm >= self.min_fee_ppm && fee_ppm <= self.max_fee_ppm
    }
}
