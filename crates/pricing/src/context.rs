//! Shipment snapshot priced by the engine, plus the weight/size math derived
//! from it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shipdesk_core::{CustomerId, ValueObject};

/// Default dimensional divisor (cm³ per kg).
pub const DEFAULT_VOLUMETRIC_DIVISOR: Decimal = Decimal::from_parts(5000, 0, 0, false, 0);

/// Parcel dimensions in centimetres. Also used for carrier size envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length_cm: Decimal,
    pub width_cm: Decimal,
    pub height_cm: Decimal,
}

impl ValueObject for Dimensions {}

impl Dimensions {
    pub const fn new(length_cm: Decimal, width_cm: Decimal, height_cm: Decimal) -> Self {
        Self {
            length_cm,
            width_cm,
            height_cm,
        }
    }

    /// Standard carrier envelope: 120 × 80 × 80 cm.
    pub const fn standard_envelope() -> Self {
        Self::new(
            Decimal::from_parts(120, 0, 0, false, 0),
            Decimal::from_parts(80, 0, 0, false, 0),
            Decimal::from_parts(80, 0, 0, false, 0),
        )
    }

    /// True if any dimension is larger than the matching envelope dimension.
    pub fn exceeds(&self, envelope: &Dimensions) -> bool {
        self.length_cm > envelope.length_cm
            || self.width_cm > envelope.width_cm
            || self.height_cm > envelope.height_cm
    }

    pub fn volume_cm3(&self) -> Decimal {
        self.length_cm
            .saturating_mul(self.width_cm)
            .saturating_mul(self.height_cm)
    }
}

/// `(length × width × height) / divisor`, exact in fixed point.
///
/// A zero divisor yields zero.
pub fn volumetric_weight(
    length_cm: Decimal,
    width_cm: Decimal,
    height_cm: Decimal,
    divisor: Decimal,
) -> Decimal {
    Dimensions::new(length_cm, width_cm, height_cm)
        .volume_cm3()
        .checked_div(divisor)
        .unwrap_or(Decimal::ZERO)
}

/// Immutable snapshot of one pricing request.
///
/// No validation happens here: odd inputs (zero dimensions, negative weight)
/// flow through the arithmetic as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleContext {
    weight_kg: Decimal,
    dimensions: Dimensions,
    service_type: String,
    zone_code: String,
    base_price: Decimal,
    customer: Option<CustomerId>,
    seasonal_period: Option<String>,
    priced_at: DateTime<Utc>,
}

impl ValueObject for RuleContext {}

impl RuleContext {
    #[allow(clippy::too_many_arguments)]
    pub fn from_shipment_data(
        weight_kg: Decimal,
        length_cm: Decimal,
        width_cm: Decimal,
        height_cm: Decimal,
        service_type: impl Into<String>,
        zone_code: impl Into<String>,
        base_price: Decimal,
        customer: Option<CustomerId>,
        seasonal_period: Option<String>,
    ) -> Self {
        Self {
            weight_kg,
            dimensions: Dimensions::new(length_cm, width_cm, height_cm),
            service_type: service_type.into(),
            zone_code: zone_code.into(),
            base_price,
            customer,
            seasonal_period,
            priced_at: Utc::now(),
        }
    }

    /// Same shipment, priced as of `priced_at` (promotion windows are checked
    /// against this instant).
    pub fn with_priced_at(self, priced_at: DateTime<Utc>) -> Self {
        Self { priced_at, ..self }
    }

    pub fn weight_kg(&self) -> Decimal {
        self.weight_kg
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }

    pub fn length_cm(&self) -> Decimal {
        self.dimensions.length_cm
    }

    pub fn width_cm(&self) -> Decimal {
        self.dimensions.width_cm
    }

    pub fn height_cm(&self) -> Decimal {
        self.dimensions.height_cm
    }

    pub fn service_type(&self) -> &str {
        &self.service_type
    }

    pub fn zone_code(&self) -> &str {
        &self.zone_code
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    pub fn customer(&self) -> Option<CustomerId> {
        self.customer
    }

    pub fn seasonal_period(&self) -> Option<&str> {
        self.seasonal_period.as_deref()
    }

    pub fn priced_at(&self) -> DateTime<Utc> {
        self.priced_at
    }

    /// Volumetric weight with the default 5000 cm³/kg divisor.
    pub fn volumetric_weight(&self) -> Decimal {
        self.volumetric_weight_with(DEFAULT_VOLUMETRIC_DIVISOR)
    }

    /// Volumetric weight with a carrier-specific divisor (e.g. 6000).
    pub fn volumetric_weight_with(&self, divisor: Decimal) -> Decimal {
        volumetric_weight(
            self.dimensions.length_cm,
            self.dimensions.width_cm,
            self.dimensions.height_cm,
            divisor,
        )
    }

    /// `max(actual weight, volumetric weight)` with the default divisor.
    pub fn chargeable_weight(&self) -> Decimal {
        self.chargeable_weight_with(DEFAULT_VOLUMETRIC_DIVISOR)
    }

    pub fn chargeable_weight_with(&self, divisor: Decimal) -> Decimal {
        self.weight_kg.max(self.volumetric_weight_with(divisor))
    }

    /// Oversized against the standard 120 × 80 × 80 cm envelope.
    pub fn is_oversized(&self) -> bool {
        self.is_oversized_for(&Dimensions::standard_envelope())
    }

    pub fn is_oversized_for(&self, envelope: &Dimensions) -> bool {
        self.dimensions.exceeds(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;
    use proptest::prelude::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn parcel(weight: &str, l: &str, w: &str, h: &str) -> RuleContext {
        RuleContext::from_shipment_data(
            dec(weight),
            dec(l),
            dec(w),
            dec(h),
            "standard",
            "domestic",
            dec("25.00"),
            None,
            None,
        )
    }

    #[test]
    fn volumetric_weight_uses_divisor() {
        assert_eq!(volumetric_weight(dec("50"), dec("40"), dec("30"), dec("5000")), dec("12"));
        assert_eq!(volumetric_weight(dec("50"), dec("40"), dec("30"), dec("6000")), dec("10"));
    }

    #[test]
    fn zero_divisor_yields_zero() {
        assert_eq!(volumetric_weight(dec("50"), dec("40"), dec("30"), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn zero_dimension_parcel_has_no_volumetric_weight() {
        let ctx = parcel("2.5", "0", "20", "15");
        assert_eq!(ctx.volumetric_weight(), Decimal::ZERO);
        assert_eq!(ctx.chargeable_weight(), dec("2.5"));
    }

    #[test]
    fn bulky_light_parcel_is_charged_by_volume() {
        let ctx = parcel("1.0", "50", "40", "30");
        assert_eq!(ctx.chargeable_weight(), dec("12"));
        assert_eq!(ctx.chargeable_weight_with(dec("6000")), dec("10"));
    }

    #[test]
    fn oversize_checks_each_dimension_against_envelope() {
        assert!(!parcel("1", "120", "80", "80").is_oversized());
        assert!(parcel("1", "121", "10", "10").is_oversized());
        assert!(parcel("1", "10", "81", "10").is_oversized());
        assert!(parcel("1", "10", "10", "80.5").is_oversized());

        let small_envelope = Dimensions::new(dec("60"), dec("40"), dec("40"));
        assert!(parcel("1", "61", "10", "10").is_oversized_for(&small_envelope));
    }

    #[test]
    fn with_priced_at_keeps_shipment_fields() {
        let ctx = parcel("2.5", "30", "20", "15");
        let at = DateTime::parse_from_rfc3339("2026-11-27T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let moved = ctx.clone().with_priced_at(at);
        assert_eq!(moved.priced_at(), at);
        assert_eq!(moved.weight_kg(), ctx.weight_kg());
        assert_eq!(moved.dimensions(), ctx.dimensions());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: volumetric weight is exactly (l*w*h)/divisor and stable
        /// across repeated calls.
        #[test]
        fn volumetric_weight_is_exact(
            l in 0u32..500,
            w in 0u32..500,
            h in 0u32..500,
            divisor in 1u32..10_000,
        ) {
            let (l, w, h, d) = (
                Decimal::from(l),
                Decimal::from(w),
                Decimal::from(h),
                Decimal::from(divisor),
            );
            let first = volumetric_weight(l, w, h, d);
            let second = volumetric_weight(l, w, h, d);
            prop_assert_eq!(first, (l * w * h) / d);
            prop_assert_eq!(first, second);
        }

        /// Property: chargeable weight is the max of actual and volumetric weight.
        #[test]
        fn chargeable_weight_is_max(
            grams in 0u32..100_000,
            l in 0u32..300,
            w in 0u32..300,
            h in 0u32..300,
        ) {
            let ctx = RuleContext::from_shipment_data(
                Decimal::new(grams as i64, 3),
                Decimal::from(l),
                Decimal::from(w),
                Decimal::from(h),
                "standard",
                "domestic",
                Decimal::ONE,
                None,
                None,
            );
            let expected = ctx.weight_kg().max(ctx.volumetric_weight());
            prop_assert_eq!(ctx.chargeable_weight(), expected);
        }
    }
}
