//! Pricing outcome threaded through the pipeline.
//!
//! Every transition consumes the previous [`RuleResult`] and returns a new one,
//! so each category step can be tested on its own.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shipdesk_core::ValueObject;

use crate::context::RuleContext;
use crate::rule::RuleKind;

/// Audit entry for one rule that changed (or was considered to change) the price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedRule {
    pub rule_type: RuleKind,
    /// `None` for built-in defaults.
    pub rule_id: Option<String>,
    pub description: String,
    /// Signed change to the running price.
    pub adjustment: Decimal,
}

/// Price breakdown for one pricing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResult {
    original_price: Decimal,
    final_price: Decimal,
    total_discount: Decimal,
    applied_rules: Vec<AppliedRule>,
    errors: Vec<String>,
    /// Set once an exclusive promotional or customer discount was taken.
    #[serde(default)]
    exclusive_discount: bool,
}

impl ValueObject for RuleResult {}

impl RuleResult {
    /// Starting state: nothing applied yet.
    pub fn new(original_price: Decimal) -> Self {
        Self {
            original_price,
            final_price: original_price,
            total_discount: Decimal::ZERO,
            applied_rules: Vec::new(),
            errors: Vec::new(),
            exclusive_discount: false,
        }
    }

    pub fn for_context(context: &RuleContext) -> Self {
        Self::new(context.base_price())
    }

    pub fn original_price(&self) -> Decimal {
        self.original_price
    }

    pub fn final_price(&self) -> Decimal {
        self.final_price
    }

    pub fn total_discount(&self) -> Decimal {
        self.total_discount
    }

    pub fn applied_rules(&self) -> &[AppliedRule] {
        &self.applied_rules
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// True once an exclusive discount is in effect; no other promotional or
    /// customer discount may stack with it.
    pub fn exclusive_discount_applied(&self) -> bool {
        self.exclusive_discount
    }

    pub fn with_exclusive_discount(mut self) -> Self {
        self.exclusive_discount = true;
        self
    }

    /// Record non-fatal problems.
    pub fn with_errors(mut self, errors: impl IntoIterator<Item = String>) -> Self {
        self.errors.extend(errors);
        self
    }

    /// Replace the running price (e.g. an absolute weight-bracket price).
    pub fn with_price(
        mut self,
        price: Decimal,
        rule_type: RuleKind,
        rule_id: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        let Some(adjustment) = price.checked_sub(self.final_price) else {
            return self.with_overflow(rule_type, rule_id);
        };
        self.final_price = price;
        self.record(rule_type, rule_id, description, adjustment)
    }

    /// Add a surcharge to the running price. Negative amounts are ignored.
    pub fn with_surcharge(
        mut self,
        amount: Decimal,
        rule_type: RuleKind,
        rule_id: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        let amount = amount.max(Decimal::ZERO);
        let Some(price) = self.final_price.checked_add(amount) else {
            return self.with_overflow(rule_type, rule_id);
        };
        self.final_price = price;
        self.record(rule_type, rule_id, description, amount)
    }

    /// Take a discount off the running price.
    ///
    /// The discount is capped at the running price, so the price never goes
    /// below zero and `total_discount` only counts what was actually taken off.
    pub fn with_discount(
        mut self,
        amount: Decimal,
        rule_type: RuleKind,
        rule_id: Option<&str>,
        description: impl Into<String>,
    ) -> Self {
        let taken = amount
            .max(Decimal::ZERO)
            .min(self.final_price.max(Decimal::ZERO));
        let Some(total) = self.total_discount.checked_add(taken) else {
            return self.with_overflow(rule_type, rule_id);
        };
        self.final_price -= taken;
        self.total_discount = total;
        self.record(rule_type, rule_id, description, -taken)
    }

    /// Record a rule that was skipped because its amount left the decimal
    /// range. The running price is untouched.
    pub fn with_overflow(self, rule_type: RuleKind, rule_id: Option<&str>) -> Self {
        let rule = rule_id.unwrap_or("default");
        self.with_errors([format!(
            "{rule_type} rule '{rule}' skipped: amount overflows the running price"
        )])
    }

    /// Give back every discount of `rule_type` and drop its audit entries.
    ///
    /// Only exact while no later step has built on those discounts, i.e. when
    /// called right after the step that took them.
    pub fn without_discounts(mut self, rule_type: RuleKind) -> Self {
        let (reverted, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.applied_rules)
            .into_iter()
            .partition(|a| a.rule_type == rule_type && a.adjustment < Decimal::ZERO);
        let restored: Decimal = reverted.iter().map(|a| -a.adjustment).sum();

        self.final_price += restored;
        self.total_discount -= restored;
        self.applied_rules = kept;
        self
    }

    /// Enforce `final_price >= 0`.
    pub fn clamped(mut self) -> Self {
        if self.final_price < Decimal::ZERO {
            self.final_price = Decimal::ZERO;
        }
        self
    }

    fn record(
        mut self,
        rule_type: RuleKind,
        rule_id: Option<&str>,
        description: impl Into<String>,
        adjustment: Decimal,
    ) -> Self {
        self.applied_rules.push(AppliedRule {
            rule_type,
            rule_id: rule_id.map(str::to_string),
            description: description.into(),
            adjustment,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn new_result_is_unchanged_price() {
        let r = RuleResult::new(dec("25.00"));
        assert_eq!(r.final_price(), dec("25.00"));
        assert_eq!(r.total_discount(), Decimal::ZERO);
        assert!(r.applied_rules().is_empty());
        assert!(!r.has_errors());
    }

    #[test]
    fn transitions_record_audit_trail_in_order() {
        let r = RuleResult::new(dec("25.00"))
            .with_price(dec("30.00"), RuleKind::Weight, Some("w1"), "bracket 0-5kg")
            .with_surcharge(dec("15.00"), RuleKind::Dimension, None, "default oversize")
            .with_discount(dec("4.50"), RuleKind::Seasonal, None, "black_friday 10%");

        assert_eq!(r.final_price(), dec("40.50"));
        assert_eq!(r.total_discount(), dec("4.50"));

        let adjustments: Vec<_> = r.applied_rules().iter().map(|a| a.adjustment).collect();
        assert_eq!(adjustments, vec![dec("5.00"), dec("15.00"), dec("-4.50")]);
        assert_eq!(r.applied_rules()[0].rule_id.as_deref(), Some("w1"));
        assert_eq!(r.applied_rules()[1].rule_id, None);
    }

    #[test]
    fn discount_is_capped_at_running_price() {
        let r = RuleResult::new(dec("10.00")).with_discount(
            dec("15.00"),
            RuleKind::Promotional,
            Some("p1"),
            "flat 15",
        );
        assert_eq!(r.final_price(), Decimal::ZERO);
        assert_eq!(r.total_discount(), dec("10.00"));
    }

    #[test]
    fn clamped_floors_negative_prices() {
        let r = RuleResult::new(dec("-5.00")).clamped();
        assert_eq!(r.final_price(), Decimal::ZERO);
        assert_eq!(r.original_price(), dec("-5.00"));
    }

    #[test]
    fn surcharge_overflow_skips_rule_and_records_error() {
        let r = RuleResult::new(dec("25.00")).with_surcharge(
            Decimal::MAX,
            RuleKind::Weight,
            Some("w-huge"),
            "surcharge",
        );
        assert_eq!(r.final_price(), dec("25.00"));
        assert!(r.applied_rules().is_empty());
        assert_eq!(
            r.errors(),
            ["weight rule 'w-huge' skipped: amount overflows the running price".to_string()]
        );
    }

    #[test]
    fn price_replacement_overflow_keeps_running_price() {
        let r = RuleResult::new(dec("-1.00")).with_price(Decimal::MAX, RuleKind::Weight, None, "p");
        assert_eq!(r.final_price(), dec("-1.00"));
        assert!(r.has_errors());
    }

    #[test]
    fn without_discounts_restores_only_that_category() {
        let r = RuleResult::new(dec("40.00"))
            .with_surcharge(dec("10.00"), RuleKind::Dimension, None, "oversize")
            .with_discount(dec("5.00"), RuleKind::Seasonal, None, "season")
            .with_discount(dec("4.00"), RuleKind::Promotional, Some("p1"), "promo")
            .with_discount(dec("2.00"), RuleKind::Promotional, Some("p2"), "promo")
            .without_discounts(RuleKind::Promotional);

        assert_eq!(r.final_price(), dec("45.00"));
        assert_eq!(r.total_discount(), dec("5.00"));
        let kinds: Vec<_> = r.applied_rules().iter().map(|a| a.rule_type).collect();
        assert_eq!(kinds, vec![RuleKind::Dimension, RuleKind::Seasonal]);
    }

    #[test]
    fn exclusive_flag_is_sticky() {
        let r = RuleResult::new(Decimal::ONE);
        assert!(!r.exclusive_discount_applied());
        assert!(r.with_exclusive_discount().exclusive_discount_applied());
    }

    #[test]
    fn errors_accumulate() {
        let r = RuleResult::new(Decimal::ONE)
            .with_errors(vec!["Rule 0: a".to_string()])
            .with_errors(vec!["Rule 3: b".to_string()]);
        assert!(r.has_errors());
        assert_eq!(r.errors().len(), 2);
    }
}
