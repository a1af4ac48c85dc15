//! Chain parameters consumed by admission.

use serde::{Deserialize, Serialize};
use sidechain_core::{Fixed64, ProgramHash, PREFIX_STANDARD, TOKEN_PRECISION};

use crate::error::ConfigError;

/// Read-only chain configuration.
///
/// Loaded from JSON; missing fields take their defaults. The foundation
/// address is written in its address form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainParams {
    /// Upper bound on a transaction's encoded size.
    pub max_block_size: usize,
    /// Minimum native fee, in native units.
    pub min_tx_fee: i64,
    /// Minimum native fee for cross-chain transactions.
    pub min_cross_chain_tx_fee: i64,
    /// Main-chain to side-chain conversion rate.
    pub exchange_rate: f64,
    /// Confirmations a coinbase output needs before it can be spent.
    pub spend_coinbase_span: u32,
    pub min_precision: u8,
    pub max_precision: u8,
    #[serde(with = "address")]
    pub foundation_address: ProgramHash,
    /// Reject transfer-cross-chain transactions whose payload check fails.
    /// When false the failure is logged and the remaining checks decide.
    pub strict_transfer_cross_chain: bool,
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            max_block_size: 8_000_000,
            min_tx_fee: 100,
            min_cross_chain_tx_fee: 10_000,
            exchange_rate: 1.0,
            spend_coinbase_span: 100,
            min_precision: 0,
            max_precision: TOKEN_PRECISION,
            foundation_address: ProgramHash::from_parts(PREFIX_STANDARD, &[0u8; 20]),
            strict_transfer_cross_chain: true,
        }
    }
}

impl ChainParams {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_block_size == 0 {
            return Err(invalid("max_block_size", "must be positive"));
        }
        if self.min_tx_fee < 0 {
            return Err(invalid("min_tx_fee", "must not be negative"));
        }
        if self.min_cross_chain_tx_fee < 0 {
            return Err(invalid("min_cross_chain_tx_fee", "must not be negative"));
        }
        if !self.exchange_rate.is_finite() {
            return Err(invalid("exchange_rate", "must be finite"));
        }
        if self.min_precision > self.max_precision {
            return Err(invalid(
                "min_precision",
                format!("{} exceeds max_precision {}", self.min_precision, self.max_precision),
            ));
        }
        if self.max_precision > TOKEN_PRECISION {
            return Err(invalid(
                "max_precision",
                format!("must not exceed {}", TOKEN_PRECISION),
            ));
        }
        Ok(())
    }

    pub fn min_tx_fee(&self) -> Fixed64 {
        Fixed64::from_raw(self.min_tx_fee)
    }

    pub fn min_cross_chain_tx_fee(&self) -> Fixed64 {
        Fixed64::from_raw(self.min_cross_chain_tx_fee)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

mod address {
    use serde::de::Error as _;
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use sidechain_core::ProgramHash;

    pub fn serialize<S: Serializer>(hash: &ProgramHash, serializer: S) -> Result<S::Ok, S::Error> {
        let address = hash.to_address().map_err(S::Error::custom)?;
        serializer.serialize_str(&address)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ProgramHash, D::Error> {
        let address = String::deserialize(deserializer)?;
        ProgramHash::from_address(&address).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidechain_core::Keypair;

    #[test]
    fn test_defaults_are_valid() {
        ChainParams::default().validate().unwrap();
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let params = ChainParams::from_json(r#"{"exchange_rate": 0.5, "min_tx_fee": 7}"#).unwrap();
        assert_eq!(params.exchange_rate, 0.5);
        assert_eq!(params.min_tx_fee(), Fixed64::from_raw(7));
        assert_eq!(params.max_block_size, ChainParams::default().max_block_size);
        assert!(params.strict_transfer_cross_chain);
    }

    #[test]
    fn test_foundation_address_round_trips_as_string() {
        let foundation = Keypair::from_seed(&[9u8; 32]).program_hash();
        let params = ChainParams {
            foundation_address: foundation,
            ..ChainParams::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains(&foundation.to_address().unwrap()));
        assert_eq!(ChainParams::from_json(&json).unwrap().foundation_address, foundation);
    }

    #[test]
    fn test_rejects_bad_address() {
        let err = ChainParams::from_json(r#"{"foundation_address": "zz"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_inverted_precision_bounds() {
        let err = ChainParams::from_json(r#"{"min_precision": 9, "max_precision": 4}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "min_precision", .. }));
    }

    #[test]
    fn test_rejects_negative_fee() {
        let params = ChainParams {
            min_cross_chain_tx_fee: -1,
            ..ChainParams::default()
        };
        assert!(params.validate().is_err());
    }
}
