//! Pricing rule definitions.
//!
//! Rules arrive from catalogs as loosely-shaped [`RuleDefinition`] records
//! (admin forms, JSON imports). The validator turns well-formed records into
//! the typed [`PricingRule`] sum type, which is what the pipeline consumes.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shipdesk_core::{CustomerId, DomainError};

use crate::context::{Dimensions, RuleContext};

/// Zone literal that makes a promotion apply to every zone.
pub const ALL_ZONES: &str = "ALL";

/// Rule category. Categories are applied in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Weight,
    Dimension,
    Seasonal,
    Promotional,
    Customer,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Weight => "weight",
            RuleKind::Dimension => "dimension",
            RuleKind::Seasonal => "seasonal",
            RuleKind::Promotional => "promotional",
            RuleKind::Customer => "customer",
        }
    }
}

impl core::fmt::Display for RuleKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weight" => Ok(RuleKind::Weight),
            "dimension" => Ok(RuleKind::Dimension),
            "seasonal" => Ok(RuleKind::Seasonal),
            "promotional" => Ok(RuleKind::Promotional),
            "customer" => Ok(RuleKind::Customer),
            other => Err(DomainError::validation(format!("unknown rule kind '{other}'"))),
        }
    }
}

/// Named sales periods that carry seasonal pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalPeriod {
    BlackFriday,
    CyberMonday,
    Christmas,
    NewYear,
    SummerSale,
}

impl SeasonalPeriod {
    pub const ALL: [SeasonalPeriod; 5] = [
        SeasonalPeriod::BlackFriday,
        SeasonalPeriod::CyberMonday,
        SeasonalPeriod::Christmas,
        SeasonalPeriod::NewYear,
        SeasonalPeriod::SummerSale,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SeasonalPeriod::BlackFriday => "black_friday",
            SeasonalPeriod::CyberMonday => "cyber_monday",
            SeasonalPeriod::Christmas => "christmas",
            SeasonalPeriod::NewYear => "new_year",
            SeasonalPeriod::SummerSale => "summer_sale",
        }
    }
}

impl core::fmt::Display for SeasonalPeriod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeasonalPeriod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SeasonalPeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("unknown seasonal period '{s}'")))
    }
}

/// Raw rule record as stored by a catalog or entered by an admin.
///
/// Every kind-specific field is optional so that incomplete input can be
/// represented and reported; see [`crate::RuleValidator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDefinition {
    pub id: Option<String>,
    pub kind: String,
    /// Lower is applied first within a category. Signed so that bad input is
    /// representable.
    pub priority: i64,

    // weight brackets
    pub weight_from: Option<Decimal>,
    pub weight_to: Option<Decimal>,
    pub price: Option<Decimal>,
    pub surcharge: Option<Decimal>,

    // dimension thresholds (cm)
    pub max_length: Option<Decimal>,
    pub max_width: Option<Decimal>,
    pub max_height: Option<Decimal>,
    pub surcharge_amount: Option<Decimal>,
    pub surcharge_percent: Option<Decimal>,

    // seasonal
    pub season_period: Option<String>,

    // discounts (seasonal uses the percent only)
    pub discount_percent: Option<Decimal>,
    pub discount_amount: Option<Decimal>,

    // promotional / customer scoping
    pub zone: Option<String>,
    pub customer_id: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub exclusive: bool,
    pub active: bool,
}

impl Default for RuleDefinition {
    fn default() -> Self {
        Self {
            id: None,
            kind: String::new(),
            priority: 0,
            weight_from: None,
            weight_to: None,
            price: None,
            surcharge: None,
            max_length: None,
            max_width: None,
            max_height: None,
            surcharge_amount: None,
            surcharge_percent: None,
            season_period: None,
            discount_percent: None,
            discount_amount: None,
            zone: None,
            customer_id: None,
            valid_from: None,
            valid_until: None,
            exclusive: false,
            active: true,
        }
    }
}

impl RuleDefinition {
    /// Empty definition of the given kind.
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_weight_range(mut self, from: Decimal, to: Decimal) -> Self {
        self.weight_from = Some(from);
        self.weight_to = Some(to);
        self
    }

    pub fn with_price(mut self, price: Decimal) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_surcharge(mut self, surcharge: Decimal) -> Self {
        self.surcharge = Some(surcharge);
        self
    }

    pub fn with_max_dimensions(
        mut self,
        length: Option<Decimal>,
        width: Option<Decimal>,
        height: Option<Decimal>,
    ) -> Self {
        self.max_length = length;
        self.max_width = width;
        self.max_height = height;
        self
    }

    pub fn with_surcharge_amount(mut self, amount: Decimal) -> Self {
        self.surcharge_amount = Some(amount);
        self
    }

    pub fn with_surcharge_percent(mut self, percent: Decimal) -> Self {
        self.surcharge_percent = Some(percent);
        self
    }

    pub fn with_season_period(mut self, period: impl Into<String>) -> Self {
        self.season_period = Some(period.into());
        self
    }

    pub fn with_discount_percent(mut self, percent: Decimal) -> Self {
        self.discount_percent = Some(percent);
        self
    }

    pub fn with_discount_amount(mut self, amount: Decimal) -> Self {
        self.discount_amount = Some(amount);
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_customer(mut self, customer_id: CustomerId) -> Self {
        self.customer_id = Some(customer_id.to_string());
        self
    }

    pub fn with_validity(
        mut self,
        from: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = from;
        self.valid_until = until;
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Fixed amount or percentage of the running price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum Adjustment {
    Amount(Decimal),
    Percent(Decimal),
}

impl Adjustment {
    /// Money value of this adjustment against `price` (unrounded).
    ///
    /// `None` when the percentage overflows the decimal range.
    pub fn amount_on(&self, price: Decimal) -> Option<Decimal> {
        match self {
            Adjustment::Amount(amount) => Some(*amount),
            Adjustment::Percent(percent) => price
                .checked_mul(*percent)?
                .checked_div(Decimal::ONE_HUNDRED),
        }
    }
}

impl core::fmt::Display for Adjustment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Adjustment::Amount(amount) => write!(f, "{amount}"),
            Adjustment::Percent(percent) => write!(f, "{percent}%"),
        }
    }
}

/// What a matching weight bracket does to the running price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "value")]
pub enum WeightCharge {
    /// Replaces the running price.
    Price(Decimal),
    /// Added on top of the running price.
    Surcharge(Decimal),
}

/// Inclusive validity window; an open end is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| from <= at) && self.until.is_none_or(|until| at <= until)
    }
}

/// Zone targeting of a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneScope {
    All,
    Zone(String),
}

impl ZoneScope {
    pub fn parse(zone: &str) -> Self {
        let zone = zone.trim();
        if zone.eq_ignore_ascii_case(ALL_ZONES) {
            ZoneScope::All
        } else {
            ZoneScope::Zone(zone.to_string())
        }
    }

    pub fn matches(&self, zone_code: &str) -> bool {
        match self {
            ZoneScope::All => true,
            ZoneScope::Zone(zone) => zone.eq_ignore_ascii_case(zone_code.trim()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightRule {
    pub id: Option<String>,
    pub weight_from: Decimal,
    pub weight_to: Decimal,
    pub charge: WeightCharge,
    pub priority: u32,
}

impl WeightRule {
    pub fn contains(&self, weight_kg: Decimal) -> bool {
        self.weight_from <= weight_kg && weight_kg <= self.weight_to
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionRule {
    pub id: Option<String>,
    pub max_length: Option<Decimal>,
    pub max_width: Option<Decimal>,
    pub max_height: Option<Decimal>,
    pub surcharge: Adjustment,
    pub priority: u32,
}

impl DimensionRule {
    /// True when the parcel exceeds at least one of this rule's thresholds.
    pub fn is_exceeded_by(&self, parcel: &Dimensions) -> bool {
        let over = |max: Option<Decimal>, actual: Decimal| max.is_some_and(|m| actual > m);
        over(self.max_length, parcel.length_cm)
            || over(self.max_width, parcel.width_cm)
            || over(self.max_height, parcel.height_cm)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonalRule {
    pub id: Option<String>,
    pub period: SeasonalPeriod,
    pub discount_percent: Decimal,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionalRule {
    pub id: Option<String>,
    pub zone: ZoneScope,
    pub discount: Adjustment,
    pub validity: ValidityWindow,
    pub exclusive: bool,
    pub active: bool,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRule {
    pub id: Option<String>,
    pub customer_id: CustomerId,
    pub discount: Adjustment,
    pub validity: ValidityWindow,
    pub exclusive: bool,
    pub active: bool,
    pub priority: u32,
}

/// A stacking discount: every applicable rule contributes, in priority order,
/// until an exclusive one applies.
pub trait DiscountRule {
    fn id(&self) -> Option<&str>;
    fn priority(&self) -> u32;
    fn discount(&self) -> Adjustment;
    fn is_exclusive(&self) -> bool;
    fn applies_to(&self, context: &RuleContext) -> bool;
}

impl DiscountRule for PromotionalRule {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn discount(&self) -> Adjustment {
        self.discount
    }

    fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    fn applies_to(&self, context: &RuleContext) -> bool {
        self.active
            && self.validity.contains(context.priced_at())
            && self.zone.matches(context.zone_code())
    }
}

impl DiscountRule for CustomerRule {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn discount(&self) -> Adjustment {
        self.discount
    }

    fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    fn applies_to(&self, context: &RuleContext) -> bool {
        self.active
            && self.validity.contains(context.priced_at())
            && context.customer() == Some(self.customer_id)
    }
}

/// A structurally valid pricing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum PricingRule {
    Weight(WeightRule),
    Dimension(DimensionRule),
    Seasonal(SeasonalRule),
    Promotional(PromotionalRule),
    Customer(CustomerRule),
}

impl PricingRule {
    pub fn kind(&self) -> RuleKind {
        match self {
            PricingRule::Weight(_) => RuleKind::Weight,
            PricingRule::Dimension(_) => RuleKind::Dimension,
            PricingRule::Seasonal(_) => RuleKind::Seasonal,
            PricingRule::Promotional(_) => RuleKind::Promotional,
            PricingRule::Customer(_) => RuleKind::Customer,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            PricingRule::Weight(r) => r.id.as_deref(),
            PricingRule::Dimension(r) => r.id.as_deref(),
            PricingRule::Seasonal(r) => r.id.as_deref(),
            PricingRule::Promotional(r) => r.id.as_deref(),
            PricingRule::Customer(r) => r.id.as_deref(),
        }
    }

    pub fn priority(&self) -> u32 {
        match self {
            PricingRule::Weight(r) => r.priority,
            PricingRule::Dimension(r) => r.priority,
            PricingRule::Seasonal(r) => r.priority,
            PricingRule::Promotional(r) => r.priority,
            PricingRule::Customer(r) => r.priority,
        }
    }
}

impl TryFrom<&RuleDefinition> for PricingRule {
    /// Every structural problem found, unindexed.
    type Error = Vec<String>;

    fn try_from(definition: &RuleDefinition) -> Result<Self, Self::Error> {
        crate::validator::parse_definition(definition)
    }
}

/// Rules partitioned by category, each category in ascending priority order
/// (ties keep their original order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub weight: Vec<WeightRule>,
    pub dimension: Vec<DimensionRule>,
    pub seasonal: Vec<SeasonalRule>,
    pub promotional: Vec<PromotionalRule>,
    pub customer: Vec<CustomerRule>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.weight.is_empty()
            && self.dimension.is_empty()
            && self.seasonal.is_empty()
            && self.promotional.is_empty()
            && self.customer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.weight.len()
            + self.dimension.len()
            + self.seasonal.len()
            + self.promotional.len()
            + self.customer.len()
    }
}

impl FromIterator<PricingRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = PricingRule>>(iter: I) -> Self {
        let mut set = RuleSet::default();
        for rule in iter {
            match rule {
                PricingRule::Weight(r) => set.weight.push(r),
                PricingRule::Dimension(r) => set.dimension.push(r),
                PricingRule::Seasonal(r) => set.seasonal.push(r),
                PricingRule::Promotional(r) => set.promotional.push(r),
                PricingRule::Customer(r) => set.customer.push(r),
            }
        }

        set.weight.sort_by_key(|r| r.priority);
        set.dimension.sort_by_key(|r| r.priority);
        set.seasonal.sort_by_key(|r| r.priority);
        set.promotional.sort_by_key(|r| r.priority);
        set.customer.sort_by_key(|r| r.priority);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn kind_and_period_parse_case_insensitively() {
        assert_eq!("Weight".parse::<RuleKind>().unwrap(), RuleKind::Weight);
        assert_eq!(" PROMOTIONAL ".parse::<RuleKind>().unwrap(), RuleKind::Promotional);
        assert_eq!(
            "Black_Friday".parse::<SeasonalPeriod>().unwrap(),
            SeasonalPeriod::BlackFriday
        );
        assert!("easter".parse::<SeasonalPeriod>().is_err());
        match "bogus".parse::<RuleKind>().unwrap_err() {
            DomainError::Validation(msg) if msg.contains("bogus") => {}
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn percent_adjustment_scales_with_price() {
        assert_eq!(Adjustment::Percent(dec("10")).amount_on(dec("50.00")), Some(dec("5")));
        assert_eq!(Adjustment::Amount(dec("3.50")).amount_on(dec("50.00")), Some(dec("3.50")));
    }

    #[test]
    fn percent_adjustment_reports_overflow() {
        assert_eq!(Adjustment::Percent(Decimal::MAX).amount_on(dec("40.00")), None);
        assert_eq!(Adjustment::Percent(dec("10")).amount_on(Decimal::MAX), None);
    }

    #[test]
    fn validity_window_is_inclusive_and_open_ended() {
        let start = Utc.with_ymd_and_hms(2026, 11, 27, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 11, 30, 23, 59, 59).unwrap();
        let window = ValidityWindow {
            from: Some(start),
            until: Some(end),
        };
        assert!(window.contains(start));
        assert!(window.contains(end));
        assert!(!window.contains(end + chrono::Duration::seconds(1)));
        assert!(ValidityWindow::default().contains(start));
    }

    #[test]
    fn zone_scope_matches_all_or_exact_zone() {
        assert_eq!(ZoneScope::parse("all"), ZoneScope::All);
        assert!(ZoneScope::All.matches("eu"));
        assert!(ZoneScope::parse("EU").matches("eu"));
        assert!(!ZoneScope::parse("domestic").matches("eu"));
    }

    #[test]
    fn dimension_rule_checks_only_configured_thresholds() {
        let rule = DimensionRule {
            id: None,
            max_length: Some(dec("150")),
            max_width: None,
            max_height: None,
            surcharge: Adjustment::Amount(dec("20")),
            priority: 0,
        };
        let long = Dimensions::new(dec("160"), dec("10"), dec("10"));
        let wide = Dimensions::new(dec("100"), dec("500"), dec("10"));
        assert!(rule.is_exceeded_by(&long));
        assert!(!rule.is_exceeded_by(&wide));
    }

    #[test]
    fn rule_set_sorts_each_category_stably() {
        let weight = |id: &str, priority| {
            PricingRule::Weight(WeightRule {
                id: Some(id.to_string()),
                weight_from: Decimal::ZERO,
                weight_to: dec("10"),
                charge: WeightCharge::Surcharge(Decimal::ONE),
                priority,
            })
        };
        let set: RuleSet = vec![weight("a", 100), weight("b", 10), weight("c", 10)]
            .into_iter()
            .collect();

        let ids: Vec<_> = set.weight.iter().map(|r| r.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn definition_deserializes_with_defaults() {
        let def: RuleDefinition = serde_json::from_str(
            r#"{ "id": "promo-bf", "kind": "promotional", "zone": "ALL", "discount_percent": "15" }"#,
        )
        .unwrap();
        assert!(def.active);
        assert!(!def.exclusive);
        assert_eq!(def.priority, 0);
        assert_eq!(def.discount_percent, Some(dec("15")));
    }
}
