//! Shipment pricing rule engine.
//!
//! Given a [`RuleContext`] describing one shipment, the [`PricingRuleEngine`]
//! fetches the applicable rules from its sources, validates them and applies
//! weight, dimension, seasonal, promotional and customer rules in that order,
//! producing a [`RuleResult`] with a full audit trail.
//!
//! The crate is pure domain logic: rule storage sits behind the traits in
//! [`source`], and nothing here performs IO of its own.

pub mod config;
pub mod context;
pub mod engine;
pub mod result;
pub mod rule;
pub mod source;
pub mod validator;

pub use config::PricingConfig;
pub use context::{DEFAULT_VOLUMETRIC_DIVISOR, Dimensions, RuleContext, volumetric_weight};
pub use engine::PricingRuleEngine;
pub use result::{AppliedRule, RuleResult};
pub use rule::{
    ALL_ZONES, Adjustment, CustomerRule, DimensionRule, DiscountRule, PricingRule,
    PromotionalRule, RuleDefinition, RuleKind, RuleSet, SeasonalPeriod, SeasonalRule,
    ValidityWindow, WeightCharge, WeightRule, ZoneScope,
};
pub use source::{
    CustomerPricingCatalog, InMemoryCustomerPricingCatalog, InMemoryPromotionalCatalog,
    InMemoryRuleCatalog, PromotionalCatalog, RuleCatalog, RuleSourceError,
};
pub use validator::{MAX_RULE_AMOUNT, MAX_SURCHARGE_PERCENT, RuleValidator};
