//! Engine configuration: built-in defaults used when no explicit rule covers
//! a case, plus the carrier constants the derived weights depend on.

use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use shipdesk_core::{DomainError, DomainResult};

use crate::context::{DEFAULT_VOLUMETRIC_DIVISOR, Dimensions};

pub const OVERSIZE_SURCHARGE_ENV: &str = "SHIPDESK_OVERSIZE_SURCHARGE";
pub const SEASONAL_DISCOUNT_ENV: &str = "SHIPDESK_SEASONAL_DISCOUNT_PERCENT";
pub const VOLUMETRIC_DIVISOR_ENV: &str = "SHIPDESK_VOLUMETRIC_DIVISOR";

/// Largest supported money scale (rust_decimal's own limit).
const MAX_MONEY_SCALE: u32 = 28;

/// Pricing engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Added to oversized parcels when no dimension rule matches.
    pub default_oversize_surcharge: Decimal,
    /// Applied for a recognized seasonal period when no seasonal rule matches.
    pub default_seasonal_discount_percent: Decimal,
    /// Dimensional divisor for chargeable weight (cm³/kg).
    pub volumetric_divisor: Decimal,
    /// Parcels exceeding this envelope in any dimension are oversized.
    pub oversize_envelope: Dimensions,
    /// Decimal places money adjustments are rounded to.
    pub money_scale: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_oversize_surcharge: Decimal::new(1500, 2),
            default_seasonal_discount_percent: Decimal::TEN,
            volumetric_divisor: DEFAULT_VOLUMETRIC_DIVISOR,
            oversize_envelope: Dimensions::standard_envelope(),
            money_scale: 2,
        }
    }
}

impl PricingConfig {
    /// Defaults overridden by `SHIPDESK_*` environment variables.
    ///
    /// Unset variables keep the default; unparsable or out-of-range ones are
    /// logged and ignored, so the result always passes [`Self::validate`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: Decimal, accept: fn(Decimal) -> bool, range: &str| {
            let Some(raw) = lookup(key) else {
                return fallback;
            };
            match Decimal::from_str(raw.trim()) {
                Ok(value) if accept(value) => value,
                Ok(_) => {
                    tracing::warn!(
                        %key,
                        value = %raw,
                        expected = range,
                        "pricing setting out of range; using default"
                    );
                    fallback
                }
                Err(e) => {
                    tracing::warn!(
                        %key,
                        value = %raw,
                        error = %e,
                        "invalid pricing setting; using default"
                    );
                    fallback
                }
            }
        };

        Self {
            default_oversize_surcharge: read(
                OVERSIZE_SURCHARGE_ENV,
                defaults.default_oversize_surcharge,
                |v| v >= Decimal::ZERO,
                ">= 0",
            ),
            default_seasonal_discount_percent: read(
                SEASONAL_DISCOUNT_ENV,
                defaults.default_seasonal_discount_percent,
                |v| (Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&v),
                "0..=100",
            ),
            volumetric_divisor: read(
                VOLUMETRIC_DIVISOR_ENV,
                defaults.volumetric_divisor,
                |v| v > Decimal::ZERO,
                "> 0",
            ),
            ..defaults
        }
    }

    pub fn with_default_oversize_surcharge(mut self, amount: Decimal) -> Self {
        self.default_oversize_surcharge = amount;
        self
    }

    pub fn with_default_seasonal_discount_percent(mut self, percent: Decimal) -> Self {
        self.default_seasonal_discount_percent = percent;
        self
    }

    pub fn with_volumetric_divisor(mut self, divisor: Decimal) -> Self {
        self.volumetric_divisor = divisor;
        self
    }

    pub fn with_oversize_envelope(mut self, envelope: Dimensions) -> Self {
        self.oversize_envelope = envelope;
        self
    }

    pub fn with_money_scale(mut self, scale: u32) -> Self {
        self.money_scale = scale;
        self
    }

    /// Reject settings the engine cannot price with.
    pub fn validate(&self) -> DomainResult<()> {
        if self.default_oversize_surcharge < Decimal::ZERO {
            return Err(DomainError::invalid_setting(
                "default_oversize_surcharge",
                "must be non-negative",
            ));
        }
        if self.default_seasonal_discount_percent < Decimal::ZERO
            || self.default_seasonal_discount_percent > Decimal::ONE_HUNDRED
        {
            return Err(DomainError::invalid_setting(
                "default_seasonal_discount_percent",
                "must be between 0 and 100",
            ));
        }
        if self.volumetric_divisor <= Decimal::ZERO {
            return Err(DomainError::invalid_setting(
                "volumetric_divisor",
                "must be positive",
            ));
        }
        let envelope = &self.oversize_envelope;
        if [envelope.length_cm, envelope.width_cm, envelope.height_cm]
            .iter()
            .any(|d| *d <= Decimal::ZERO)
        {
            return Err(DomainError::invalid_setting(
                "oversize_envelope",
                "dimensions must be positive",
            ));
        }
        if self.money_scale > MAX_MONEY_SCALE {
            return Err(DomainError::invalid_setting(
                "money_scale",
                format!("must not exceed {MAX_MONEY_SCALE}"),
            ));
        }
        Ok(())
    }

    /// Round a money amount to `money_scale`, midpoint away from zero.
    pub fn round_money(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.money_scale, RoundingStrategy::MidpointAwayFromZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn defaults_are_valid_and_positive() {
        let cfg = PricingConfig::default();
        cfg.validate().unwrap();
        assert!(cfg.default_oversize_surcharge > Decimal::ZERO);
        assert!(cfg.default_seasonal_discount_percent > Decimal::ZERO);
        assert_eq!(cfg.volumetric_divisor, dec("5000"));
        assert_eq!(cfg.oversize_envelope, Dimensions::standard_envelope());
    }

    #[test]
    fn lookup_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (OVERSIZE_SURCHARGE_ENV, "22.50"),
            (SEASONAL_DISCOUNT_ENV, "ten percent"),
            (VOLUMETRIC_DIVISOR_ENV, " 6000 "),
        ]);
        let cfg = PricingConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.default_oversize_surcharge, dec("22.50"));
        assert_eq!(
            cfg.default_seasonal_discount_percent,
            PricingConfig::default().default_seasonal_discount_percent
        );
        assert_eq!(cfg.volumetric_divisor, dec("6000"));
    }

    #[test]
    fn lookup_rejects_out_of_range_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (OVERSIZE_SURCHARGE_ENV, "-5"),
            (SEASONAL_DISCOUNT_ENV, "250"),
            (VOLUMETRIC_DIVISOR_ENV, "0"),
        ]);
        let cfg = PricingConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(cfg, PricingConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad = [
            PricingConfig::default().with_default_oversize_surcharge(dec("-1")),
            PricingConfig::default().with_default_seasonal_discount_percent(dec("101")),
            PricingConfig::default().with_volumetric_divisor(Decimal::ZERO),
            PricingConfig::default()
                .with_oversize_envelope(Dimensions::new(dec("0"), dec("80"), dec("80"))),
            PricingConfig::default().with_money_scale(29),
        ];
        let expected = [
            "default_oversize_surcharge",
            "default_seasonal_discount_percent",
            "volumetric_divisor",
            "oversize_envelope",
            "money_scale",
        ];
        for (cfg, name) in bad.into_iter().zip(expected) {
            match cfg.validate() {
                Err(DomainError::InvalidSetting { setting, .. }) => assert_eq!(setting, name),
                other => panic!("Expected invalid setting for {cfg:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rounds_half_away_from_zero() {
        let cfg = PricingConfig::default();
        assert_eq!(cfg.round_money(dec("4.705")), dec("4.71"));
        assert_eq!(cfg.round_money(dec("4.704")), dec("4.70"));
    }

    #[test]
    fn deserializes_partial_config() {
        let cfg: PricingConfig =
            serde_json::from_str(r#"{ "default_oversize_surcharge": "30.00" }"#).unwrap();
        assert_eq!(cfg.default_oversize_surcharge, dec("30.00"));
        assert_eq!(cfg.money_scale, 2);
    }
}
