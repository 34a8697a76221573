//! Value object trait: equality by value, not identity.
//!
//! Pricing inputs and outputs (shipment snapshots, price breakdowns, parcel
//! envelopes) have **no identity**: two with the same attributes are the
//! same value.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one from the old (consuming `with_*` style methods).
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq)]
/// struct Envelope {
///     length_cm: Decimal,
///     width_cm: Decimal,
///     height_cm: Decimal,
/// }
///
/// impl ValueObject for Envelope {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
