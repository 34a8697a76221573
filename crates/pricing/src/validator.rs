//! Structural validation of raw rule definitions.
//!
//! Validation collects every problem instead of stopping at the first one, so
//! an admin screen can show a complete report. Parsing and validation are the
//! same pass: a definition that yields no problems is converted into a typed
//! [`PricingRule`].

use rust_decimal::Decimal;

use shipdesk_core::CustomerId;

use crate::rule::{
    Adjustment, CustomerRule, DimensionRule, PricingRule, PromotionalRule, RuleDefinition,
    RuleKind, SeasonalPeriod, SeasonalRule, ValidityWindow, WeightCharge, WeightRule, ZoneScope,
};

/// Largest money amount a rule may carry (price, surcharge, discount).
pub const MAX_RULE_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Largest percentage surcharge a dimension rule may carry.
pub const MAX_SURCHARGE_PERCENT: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

/// Validates raw rule definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleValidator;

impl RuleValidator {
    pub fn new() -> Self {
        Self
    }

    /// All problems across `rules`, each formatted as `"Rule <index>: <message>"`.
    ///
    /// Empty means every definition is well-formed.
    pub fn validate_rules(&self, rules: &[RuleDefinition]) -> Vec<String> {
        rules
            .iter()
            .enumerate()
            .flat_map(|(index, rule)| self.validate_rule(index, rule))
            .collect()
    }

    /// Problems of a single definition, labelled with `index`.
    pub fn validate_rule(&self, index: usize, rule: &RuleDefinition) -> Vec<String> {
        match parse_definition(rule) {
            Ok(_) => Vec::new(),
            Err(problems) => label(index, problems),
        }
    }

    /// Split definitions into typed rules and the labelled problems of the
    /// ones that could not be converted.
    pub fn parse_rules(&self, rules: &[RuleDefinition]) -> (Vec<PricingRule>, Vec<String>) {
        let mut parsed = Vec::with_capacity(rules.len());
        let mut errors = Vec::new();

        for (index, rule) in rules.iter().enumerate() {
            match parse_definition(rule) {
                Ok(rule) => parsed.push(rule),
                Err(problems) => errors.extend(label(index, problems)),
            }
        }

        (parsed, errors)
    }
}

fn label(index: usize, problems: Vec<String>) -> Vec<String> {
    problems
        .into_iter()
        .map(|msg| format!("Rule {index}: {msg}"))
        .collect()
}

/// Problem collector used while interpreting one definition.
#[derive(Debug, Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, msg: impl Into<String>) {
        self.0.push(msg.into());
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn non_negative(&mut self, field: &str, value: Decimal) -> Decimal {
        if value.is_sign_negative() && !value.is_zero() {
            self.push(format!("{field} must be non-negative"));
        }
        value
    }

    fn required(&mut self, field: &str, value: Option<Decimal>) -> Option<Decimal> {
        match value {
            Some(v) => Some(self.non_negative(field, v)),
            None => {
                self.push(format!("missing required field '{field}'"));
                None
            }
        }
    }

    fn optional(&mut self, field: &str, value: Option<Decimal>) -> Option<Decimal> {
        value.map(|v| self.non_negative(field, v))
    }

    fn at_most(&mut self, field: &str, value: Decimal, max: Decimal) -> Decimal {
        let value = self.non_negative(field, value);
        if value > max {
            self.push(format!("{field} must not exceed {max}"));
        }
        value
    }

    fn amount(&mut self, field: &str, value: Decimal) -> Decimal {
        self.at_most(field, value, MAX_RULE_AMOUNT)
    }

    fn percent(&mut self, field: &str, value: Decimal) -> Decimal {
        self.at_most(field, value, Decimal::ONE_HUNDRED)
    }

    fn required_text<'a>(&mut self, field: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v),
            None => {
                self.push(format!("missing required field '{field}'"));
                None
            }
        }
    }

    /// Exactly one of an amount or a percentage.
    fn adjustment(
        &mut self,
        (amount_field, amount): (&str, Option<Decimal>),
        (percent_field, percent): (&str, Option<Decimal>),
        cap_percent: bool,
    ) -> Option<Adjustment> {
        match (amount, percent) {
            (Some(a), None) => Some(Adjustment::Amount(self.amount(amount_field, a))),
            (None, Some(p)) if cap_percent => Some(Adjustment::Percent(self.percent(percent_field, p))),
            (None, Some(p)) => Some(Adjustment::Percent(self.at_most(
                percent_field,
                p,
                MAX_SURCHARGE_PERCENT,
            ))),
            (None, None) => {
                self.push(format!("requires either {amount_field} or {percent_field}"));
                None
            }
            (Some(_), Some(_)) => {
                self.push(format!(
                    "must define either {amount_field} or {percent_field}, not both"
                ));
                None
            }
        }
    }

    fn window(&mut self, rule: &RuleDefinition) -> ValidityWindow {
        if let (Some(from), Some(until)) = (rule.valid_from, rule.valid_until) {
            if from > until {
                self.push("valid_from must not be after valid_until");
            }
        }
        ValidityWindow {
            from: rule.valid_from,
            until: rule.valid_until,
        }
    }
}

/// Interpret one definition; `Err` carries every problem found (unlabelled).
pub(crate) fn parse_definition(rule: &RuleDefinition) -> Result<PricingRule, Vec<String>> {
    let mut problems = Problems::default();

    let priority = if rule.priority < 0 {
        problems.push("priority must be non-negative");
        0
    } else {
        u32::try_from(rule.priority).unwrap_or_else(|_| {
            problems.push(format!("priority must not exceed {}", u32::MAX));
            0
        })
    };

    let parsed = match rule.kind.parse::<RuleKind>() {
        Ok(RuleKind::Weight) => parse_weight(rule, priority, &mut problems),
        Ok(RuleKind::Dimension) => parse_dimension(rule, priority, &mut problems),
        Ok(RuleKind::Seasonal) => parse_seasonal(rule, priority, &mut problems),
        Ok(RuleKind::Promotional) => parse_promotional(rule, priority, &mut problems),
        Ok(RuleKind::Customer) => parse_customer(rule, priority, &mut problems),
        Err(_) if rule.kind.trim().is_empty() => {
            problems.push("missing required field 'kind'");
            None
        }
        Err(_) => {
            problems.push(format!("unknown rule kind '{}'", rule.kind.trim()));
            None
        }
    };

    match parsed {
        Some(parsed) if problems.is_empty() => Ok(parsed),
        _ => {
            if problems.is_empty() {
                problems.push("rule could not be interpreted");
            }
            Err(problems.0)
        }
    }
}

fn parse_weight(rule: &RuleDefinition, priority: u32, p: &mut Problems) -> Option<PricingRule> {
    let from = p.required("weight_from", rule.weight_from);
    let to = p.required("weight_to", rule.weight_to);
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            p.push("weight_from must not exceed weight_to");
        }
    }

    let charge = match (rule.price, rule.surcharge) {
        (Some(price), None) => Some(WeightCharge::Price(p.amount("price", price))),
        (None, Some(s)) => Some(WeightCharge::Surcharge(p.amount("surcharge", s))),
        (None, None) => {
            p.push("requires either price or surcharge");
            None
        }
        (Some(_), Some(_)) => {
            p.push("must define either price or surcharge, not both");
            None
        }
    };

    Some(PricingRule::Weight(WeightRule {
        id: rule.id.clone(),
        weight_from: from?,
        weight_to: to?,
        charge: charge?,
        priority,
    }))
}

fn parse_dimension(rule: &RuleDefinition, priority: u32, p: &mut Problems) -> Option<PricingRule> {
    let max_length = p.optional("max_length", rule.max_length);
    let max_width = p.optional("max_width", rule.max_width);
    let max_height = p.optional("max_height", rule.max_height);
    if max_length.is_none() && max_width.is_none() && max_height.is_none() {
        p.push("requires at least one of max_length, max_width, max_height");
    }

    let surcharge = p.adjustment(
        ("surcharge_amount", rule.surcharge_amount),
        ("surcharge_percent", rule.surcharge_percent),
        false,
    );

    Some(PricingRule::Dimension(DimensionRule {
        id: rule.id.clone(),
        max_length,
        max_width,
        max_height,
        surcharge: surcharge?,
        priority,
    }))
}

fn parse_seasonal(rule: &RuleDefinition, priority: u32, p: &mut Problems) -> Option<PricingRule> {
    let period = match p.required_text("season_period", rule.season_period.as_deref()) {
        Some(name) => match name.parse::<SeasonalPeriod>() {
            Ok(period) => Some(period),
            Err(_) => {
                p.push(format!("unknown seasonal period '{name}'"));
                None
            }
        },
        None => None,
    };

    let discount_percent = match rule.discount_percent {
        Some(percent) => Some(p.percent("discount_percent", percent)),
        None => {
            p.push("missing required field 'discount_percent'");
            None
        }
    };

    Some(PricingRule::Seasonal(SeasonalRule {
        id: rule.id.clone(),
        period: period?,
        discount_percent: discount_percent?,
        priority,
    }))
}

fn parse_promotional(rule: &RuleDefinition, priority: u32, p: &mut Problems) -> Option<PricingRule> {
    let zone = p.required_text("zone", rule.zone.as_deref()).map(ZoneScope::parse);
    let discount = p.adjustment(
        ("discount_amount", rule.discount_amount),
        ("discount_percent", rule.discount_percent),
        true,
    );
    let validity = p.window(rule);

    Some(PricingRule::Promotional(PromotionalRule {
        id: rule.id.clone(),
        zone: zone?,
        discount: discount?,
        validity,
        exclusive: rule.exclusive,
        active: rule.active,
        priority,
    }))
}

fn parse_customer(rule: &RuleDefinition, priority: u32, p: &mut Problems) -> Option<PricingRule> {
    let customer_id = match p.required_text("customer_id", rule.customer_id.as_deref()) {
        Some(raw) => match raw.parse::<CustomerId>() {
            Ok(id) => Some(id),
            Err(e) => {
                p.push(format!("customer_id is not a valid identifier ({e})"));
                None
            }
        },
        None => None,
    };
    let discount = p.adjustment(
        ("discount_amount", rule.discount_amount),
        ("discount_percent", rule.discount_percent),
        true,
    );
    let validity = p.window(rule);

    Some(PricingRule::Customer(CustomerRule {
        id: rule.id.clone(),
        customer_id: customer_id?,
        discount: discount?,
        validity,
        exclusive: rule.exclusive,
        active: rule.active,
        priority,
    }))
}
