//! Engine configuration.
//!
//! Loaded from JSON. Decimal values are written as strings
//! (`"fee_rate": "0.02"`) and resolved once into [`EngineParams`], the
//! fixed-point form the engine runs on.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{OpenmarketError, Result, UserId, Wad, constants};

fn default_fee_rate() -> Decimal {
    parse_const(constants::DEFAULT_FEE_RATE)
}

fn default_payout_per_share() -> Decimal {
    parse_const(constants::DEFAULT_PAYOUT_PER_SHARE)
}

fn default_min_initial_liquidity() -> Decimal {
    parse_const(constants::DEFAULT_MIN_INITIAL_LIQUIDITY)
}

fn default_min_duration_secs() -> i64 {
    constants::DEFAULT_MIN_DURATION_SECS
}

fn default_max_duration_secs() -> i64 {
    constants::DEFAULT_MAX_DURATION_SECS
}

fn default_cooldown_secs() -> i64 {
    constants::DEFAULT_EARLY_RESOLUTION_COOLDOWN_SECS
}

fn default_require_validation() -> bool {
    true
}

fn parse_const(s: &str) -> Decimal {
    s.parse().unwrap_or(Decimal::ZERO)
}

/// Deployment configuration for the market engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Custody account holding every market's liquidity and fees.
    pub vault: UserId,
    /// Trading fee as a fraction of the raw trade amount.
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Tokens paid per winning share.
    #[serde(default = "default_payout_per_share")]
    pub payout_per_share: Decimal,
    /// Smallest seed a creator may provide.
    #[serde(default = "default_min_initial_liquidity")]
    pub min_initial_liquidity: Decimal,
    #[serde(default = "default_min_duration_secs")]
    pub min_duration_secs: i64,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: i64,
    /// Time after creation before an early-resolution market may resolve.
    #[serde(default = "default_cooldown_secs")]
    pub early_resolution_cooldown_secs: i64,
    /// When false, new markets skip the validation gate.
    #[serde(default = "default_require_validation")]
    pub require_validation: bool,
}

impl EngineConfig {
    /// Defaults for every field, with `vault` as the custody account.
    #[must_use]
    pub fn with_vault(vault: UserId) -> Self {
        Self {
            vault,
            fee_rate: default_fee_rate(),
            payout_per_share: default_payout_per_share(),
            min_initial_liquidity: default_min_initial_liquidity(),
            min_duration_secs: default_min_duration_secs(),
            max_duration_secs: default_max_duration_secs(),
            early_resolution_cooldown_secs: default_cooldown_secs(),
            require_validation: default_require_validation(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject incoherent settings.
    pub fn validate(&self) -> Result<()> {
        let max_fee = parse_const(constants::MAX_FEE_RATE);
        if self.fee_rate.is_sign_negative() || self.fee_rate > max_fee {
            return Err(OpenmarketError::Configuration(format!(
                "fee_rate {} outside [0, {max_fee}]",
                self.fee_rate
            )));
        }
        if self.payout_per_share <= Decimal::ZERO {
            return Err(OpenmarketError::Configuration(format!(
                "payout_per_share must be positive, got {}",
                self.payout_per_share
            )));
        }
        if self.min_initial_liquidity.is_sign_negative() {
            return Err(OpenmarketError::Configuration(format!(
                "min_initial_liquidity must not be negative, got {}",
                self.min_initial_liquidity
            )));
        }
        if self.min_duration_secs <= 0 || self.max_duration_secs < self.min_duration_secs {
            return Err(OpenmarketError::Configuration(format!(
                "duration bounds [{}, {}] are incoherent",
                self.min_duration_secs, self.max_duration_secs
            )));
        }
        if self.early_resolution_cooldown_secs < 0 {
            return Err(OpenmarketError::Configuration(
                "early_resolution_cooldown_secs must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate and convert to fixed point.
    pub fn params(&self) -> Result<EngineParams> {
        self.validate()?;
        Ok(EngineParams {
            vault: self.vault,
            fee_rate: Wad::from_decimal(self.fee_rate)?,
            payout_per_share: Wad::from_decimal(self.payout_per_share)?,
            min_initial_liquidity: Wad::from_decimal(self.min_initial_liquidity)?,
            min_duration_secs: self.min_duration_secs,
            max_duration_secs: self.max_duration_secs,
            early_resolution_cooldown_secs: self.early_resolution_cooldown_secs,
            require_validation: self.require_validation,
        })
    }
}

/// [`EngineConfig`] resolved to fixed point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineParams {
    pub vault: UserId,
    pub fee_rate: Wad,
    pub payout_per_share: Wad,
    pub min_initial_liquidity: Wad,
    pub min_duration_secs: i64,
    pub max_duration_secs: i64,
    pub early_resolution_cooldown_secs: i64,
    pub require_validation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let cfg = EngineConfig::with_vault(UserId::new());
        let params = cfg.params().unwrap();
        assert_eq!(params.fee_rate, Wad::from_ratio(2, 100));
        assert_eq!(params.payout_per_share, Wad::ONE);
        assert_eq!(params.min_initial_liquidity, Wad::from_units(100));
        assert_eq!(params.min_duration_secs, 3_600);
        assert!(params.require_validation);
    }

    #[test]
    fn json_with_only_vault_uses_defaults() {
        let vault = UserId::from_bytes([7; 16]);
        let json = format!(r#"{{ "vault": "{vault}" }}"#);
        let cfg = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, EngineConfig::with_vault(vault));
    }

    #[test]
    fn json_overrides() {
        let vault = UserId::from_bytes([7; 16]);
        let json = format!(
            r#"{{ "vault": "{vault}", "fee_rate": "0.05", "require_validation": false }}"#
        );
        let cfg = EngineConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg.fee_rate, Decimal::new(5, 2));
        assert!(!cfg.require_validation);
    }

    #[test]
    fn rejects_excessive_fee() {
        let mut cfg = EngineConfig::with_vault(UserId::new());
        cfg.fee_rate = Decimal::new(11, 2);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().starts_with("OMK_ERR_700"));
    }

    #[test]
    fn rejects_zero_payout_and_bad_durations() {
        let mut cfg = EngineConfig::with_vault(UserId::new());
        cfg.payout_per_share = Decimal::ZERO;
        assert!(cfg.validate().is_err());

        let mut cfg = EngineConfig::with_vault(UserId::new());
        cfg.max_duration_secs = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = EngineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, OpenmarketError::Configuration(_)));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = EngineConfig::with_vault(UserId::new());
        let json = serde_json::to_string(&cfg).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
