//! Pricing rule engine.
//!
//! Pipeline per request:
//! 1. fetch rule definitions from the three sources (fresh every call),
//! 2. validate them; problems are recorded on the result, never fatal,
//! 3. apply categories in a fixed order: weight, dimension, seasonal,
//!    promotional, customer,
//! 4. floor the final price at zero.
//!
//! Promotional and customer discounts stack unless an exclusive rule applies.
//! An exclusive rule is then the only discount of the two categories; an
//! exclusive customer rule outranks an exclusive promotion.
//!
//! Only source failures are returned as errors: a pricing problem must not
//! block checkout.

use std::collections::HashSet;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, warn};

use shipdesk_core::DomainResult;

use crate::config::PricingConfig;
use crate::context::{RuleContext, volumetric_weight};
use crate::result::RuleResult;
use crate::rule::{
    ALL_ZONES, Adjustment, CustomerRule, DimensionRule, DiscountRule, PromotionalRule,
    RuleDefinition,
    RuleKind, RuleSet, SeasonalPeriod, SeasonalRule, WeightCharge, WeightRule,
};
use crate::source::{CustomerPricingCatalog, PromotionalCatalog, RuleCatalog, RuleSourceError};
use crate::validator::RuleValidator;

/// Orchestrates rule lookup, validation and application.
///
/// Holds no mutable state; share it behind an `Arc` across request handlers.
#[derive(Debug, Clone)]
pub struct PricingRuleEngine<C, P, U> {
    catalog: C,
    promotions: P,
    customer_pricing: U,
    validator: RuleValidator,
    config: PricingConfig,
}

impl<C, P, U> PricingRuleEngine<C, P, U>
where
    C: RuleCatalog,
    P: PromotionalCatalog,
    U: CustomerPricingCatalog,
{
    pub fn new(catalog: C, promotions: P, customer_pricing: U) -> Self {
        Self {
            catalog,
            promotions,
            customer_pricing,
            validator: RuleValidator::new(),
            config: PricingConfig::default(),
        }
    }

    /// Replace the configuration; rejected if it fails [`PricingConfig::validate`].
    pub fn with_config(mut self, config: PricingConfig) -> DomainResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Price a shipment.
    pub fn apply_rules(&self, context: &RuleContext) -> Result<RuleResult, RuleSourceError> {
        let definitions = self.fetch_definitions(context)?;

        let (rules, errors) = self.validator.parse_rules(&definitions);
        if !errors.is_empty() {
            warn!(
                zone = context.zone_code(),
                service = context.service_type(),
                error_count = errors.len(),
                errors = ?errors,
                "malformed pricing rules skipped"
            );
        }
        let rules: RuleSet = rules.into_iter().collect();

        let state = RuleResult::for_context(context).with_errors(errors);
        let state = self.apply_weight_rules(&rules.weight, context, state);
        let state = self.apply_dimension_rules(&rules.dimension, context, state);
        let state = self.apply_seasonal_rules(&rules.seasonal, context, state);
        let state = self.apply_promotional_rules(&rules.promotional, context, state);
        let state = self.apply_customer_rules(&rules.customer, context, state);
        let result = state.clamped();

        debug!(
            zone = context.zone_code(),
            service = context.service_type(),
            rules = rules.len(),
            original = %result.original_price(),
            final_price = %result.final_price(),
            discount = %result.total_discount(),
            "shipment priced"
        );

        Ok(result)
    }

    fn fetch_definitions(
        &self,
        context: &RuleContext,
    ) -> Result<Vec<RuleDefinition>, RuleSourceError> {
        let zone = context.zone_code();
        let mut definitions = self
            .catalog
            .rules_for_context(zone, context.service_type())?;

        let mut promotions = self.promotions.find_active_promotions(zone)?;
        if !zone.trim().eq_ignore_ascii_case(ALL_ZONES) {
            promotions.extend(self.promotions.find_active_promotions(ALL_ZONES)?);
        }
        // a store may already fold all-zone promotions into the zone query
        let mut seen = HashSet::new();
        promotions.retain(|p| p.id.as_ref().is_none_or(|id| seen.insert(id.clone())));
        definitions.extend(promotions);

        if let Some(customer) = context.customer() {
            definitions.extend(self.customer_pricing.find_active_for_customer(customer)?);
        }

        Ok(definitions)
    }

    /// The single bracket containing the chargeable weight: lowest priority
    /// wins, ties by list order. A price replaces the running price, a
    /// surcharge adds to it.
    pub fn apply_weight_rules(
        &self,
        rules: &[WeightRule],
        context: &RuleContext,
        state: RuleResult,
    ) -> RuleResult {
        let weight = context.chargeable_weight_with(self.config.volumetric_divisor);
        let Some(rule) = rules
            .iter()
            .filter(|r| r.contains(weight))
            .min_by_key(|r| r.priority)
        else {
            debug!(%weight, "no weight bracket matched");
            return state;
        };

        let bracket = format!("{}-{} kg", rule.weight_from, rule.weight_to);
        match rule.charge {
            WeightCharge::Price(price) => state.with_price(
                self.config.round_money(price),
                RuleKind::Weight,
                rule.id.as_deref(),
                format!("weight bracket {bracket}: price {price}"),
            ),
            WeightCharge::Surcharge(amount) => state.with_surcharge(
                self.config.round_money(amount),
                RuleKind::Weight,
                rule.id.as_deref(),
                format!("weight bracket {bracket}: surcharge {amount}"),
            ),
        }
    }

    /// Oversized parcels only. A matching dimension rule supplies the
    /// surcharge; otherwise the configured default applies.
    pub fn apply_dimension_rules(
        &self,
        rules: &[DimensionRule],
        context: &RuleContext,
        state: RuleResult,
    ) -> RuleResult {
        if !context.is_oversized_for(&self.config.oversize_envelope) {
            return state;
        }

        let matching = rules
            .iter()
            .filter(|r| r.is_exceeded_by(context.dimensions()))
            .min_by_key(|r| r.priority);

        match matching {
            Some(rule) => {
                let Some(amount) = rule.surcharge.amount_on(state.final_price()) else {
                    return state.with_overflow(RuleKind::Dimension, rule.id.as_deref());
                };
                let amount = self.config.round_money(amount);
                state.with_surcharge(
                    amount,
                    RuleKind::Dimension,
                    rule.id.as_deref(),
                    format!("oversize surcharge {}", rule.surcharge),
                )
            }
            None => {
                let amount = self.config.round_money(self.config.default_oversize_surcharge);
                state.with_surcharge(
                    amount,
                    RuleKind::Dimension,
                    None,
                    format!("default oversize surcharge {amount}"),
                )
            }
        }
    }

    /// Recognized seasonal periods only. An explicit rule for the period
    /// overrides the configured default percentage.
    pub fn apply_seasonal_rules(
        &self,
        rules: &[SeasonalRule],
        context: &RuleContext,
        state: RuleResult,
    ) -> RuleResult {
        let Some(raw) = context.seasonal_period() else {
            return state;
        };
        let period = match raw.parse::<SeasonalPeriod>() {
            Ok(period) => period,
            Err(_) => {
                debug!(period = raw, "unrecognized seasonal period ignored");
                return state.with_errors([format!("unrecognized seasonal period '{raw}'")]);
            }
        };

        let explicit = rules
            .iter()
            .filter(|r| r.period == period)
            .min_by_key(|r| r.priority);

        let (percent, rule_id) = match explicit {
            Some(rule) => (rule.discount_percent, rule.id.as_deref()),
            None => (self.config.default_seasonal_discount_percent, None),
        };
        let Some(amount) = Adjustment::Percent(percent).amount_on(state.final_price()) else {
            return state.with_overflow(RuleKind::Seasonal, rule_id);
        };
        let amount = self.config.round_money(amount);
        let origin = if explicit.is_some() { "" } else { "default " };

        state.with_discount(
            amount,
            RuleKind::Seasonal,
            rule_id,
            format!("{origin}{period} discount {percent}%"),
        )
    }

    /// Zone promotions stack. An applicable exclusive promotion is taken on
    /// its own and blocks customer discounts.
    pub fn apply_promotional_rules(
        &self,
        rules: &[PromotionalRule],
        context: &RuleContext,
        state: RuleResult,
    ) -> RuleResult {
        let applicable = applicable_in_order(rules, context);
        self.take_discounts(RuleKind::Promotional, &applicable, state)
    }

    /// Customer overrides stack on top of promotions, unless an exclusive
    /// promotion was taken. An applicable exclusive customer rule replaces
    /// every promotional discount and is taken on its own.
    pub fn apply_customer_rules(
        &self,
        rules: &[CustomerRule],
        context: &RuleContext,
        state: RuleResult,
    ) -> RuleResult {
        let applicable = applicable_in_order(rules, context);

        if applicable.iter().any(|r| r.is_exclusive()) {
            let state = state.without_discounts(RuleKind::Promotional);
            return self.take_discounts(RuleKind::Customer, &applicable, state);
        }
        if state.exclusive_discount_applied() && !applicable.is_empty() {
            debug!(
                skipped = applicable.len(),
                "exclusive promotion in effect; customer discounts not stacked"
            );
            return state;
        }
        self.take_discounts(RuleKind::Customer, &applicable, state)
    }

    /// `rules` must already be filtered and in priority order.
    fn take_discounts<R: DiscountRule>(
        &self,
        kind: RuleKind,
        rules: &[&R],
        state: RuleResult,
    ) -> RuleResult {
        match rules.iter().find(|r| r.is_exclusive()) {
            Some(exclusive) => {
                debug!(%kind, rule = exclusive.id(), "exclusive discount taken alone");
                self.take_discount(kind, *exclusive, state).with_exclusive_discount()
            }
            None => rules
                .iter()
                .fold(state, |state, rule| self.take_discount(kind, *rule, state)),
        }
    }

    fn take_discount<R: DiscountRule>(
        &self,
        kind: RuleKind,
        rule: &R,
        state: RuleResult,
    ) -> RuleResult {
        let discount = rule.discount();
        let Some(amount) = discount.amount_on(state.final_price()) else {
            return state.with_overflow(kind, rule.id());
        };
        let amount = self.config.round_money(amount);
        let description = if rule.is_exclusive() {
            format!("{kind} discount {discount} (exclusive)")
        } else {
            format!("{kind} discount {discount}")
        };
        state.with_discount(amount, kind, rule.id(), description)
    }

    /// `(l × w × h) / divisor`, for callers that need volumetric weight
    /// without a full pricing run (e.g. carrier selection).
    pub fn calculate_volumetric_weight(
        length_cm: Decimal,
        width_cm: Decimal,
        height_cm: Decimal,
        divisor: Decimal,
    ) -> Decimal {
        volumetric_weight(length_cm, width_cm, height_cm, divisor)
    }

    /// Total discount of a full pricing run, rounded to cents.
    pub fn calculate_discount(&self, context: &RuleContext) -> Result<Decimal, RuleSourceError> {
        let result = self.apply_rules(context)?;
        Ok(result
            .total_discount()
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    /// True iff every definition is structurally valid.
    pub fn validate_rules(&self, rules: &[RuleDefinition]) -> bool {
        self.validator.validate_rules(rules).is_empty()
    }

    /// Stable ascending sort by priority.
    pub fn get_priority_rules(rules: &[RuleDefinition]) -> Vec<RuleDefinition> {
        let mut sorted = rules.to_vec();
        sorted.sort_by_key(|r| r.priority);
        sorted
    }
}

/// Rules that apply to `context`, lowest priority first (ties keep order).
fn applicable_in_order<'r, R: DiscountRule>(rules: &'r [R], context: &RuleContext) -> Vec<&'r R> {
    let mut applicable: Vec<&R> = rules.iter().filter(|r| r.applies_to(context)).collect();
    applicable.sort_by_key(|r| r.priority());
    applicable
}
