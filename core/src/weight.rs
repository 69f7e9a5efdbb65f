//! Weights and the fixed retail bag sizes.
//!
//! All quantity arithmetic is done in whole grams so that sums over many
//! orders are exact. Kilograms only appear at the edges: when reading the
//! persisted `total_quantity_kg` column and when presenting a total.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// A non-negative weight in grams.
///
/// Serialized as a floating point number of kilograms.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "f64", from = "f64")]
pub struct Weight(u64);

impl Weight {
    /// Zero grams.
    pub const ZERO: Self = Self(0);

    /// Creates a weight from whole grams.
    #[must_use]
    pub const fn from_grams(grams: u64) -> Self {
        Self(grams)
    }

    /// Creates a weight from a kilogram value, rounded to the nearest gram.
    ///
    /// Non-finite and non-positive inputs yield [`Weight::ZERO`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // guarded by the finite/positive check
    pub fn from_kg(kg: f64) -> Self {
        if !kg.is_finite() || kg <= 0.0 {
            return Self::ZERO;
        }
        Self((kg * 1000.0).round() as u64)
    }

    /// Weight of `count` packages of `unit` each.
    #[must_use]
    #[allow(clippy::cast_lossless)] // `u64::from` is not const
    pub const fn of_bags(count: u32, unit: BagSize) -> Self {
        Self((count as u64).saturating_mul(unit.weight().0))
    }

    /// Returns the value in grams.
    #[must_use]
    pub const fn grams(&self) -> u64 {
        self.0
    }

    /// Returns the value in kilograms.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // gram totals stay far below 2^53
    pub fn kg(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Returns `true` for zero grams.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Add for Weight {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Weight {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sum for Weight {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<Weight> for f64 {
    fn from(weight: Weight) -> Self {
        weight.kg()
    }
}

impl From<f64> for Weight {
    fn from(kg: f64) -> Self {
        Self::from_kg(kg)
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} kg", self.kg())
    }
}

/// A `total_quantity_kg` value exactly as it was persisted.
///
/// Unlike [`Weight`] this keeps negative, sub-gram and NaN values, so a bad
/// stored total can be reported as it is. Equality compares bit patterns,
/// which makes a NaN equal to itself.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredKg(f64);

impl StoredKg {
    /// Wraps a persisted value. Zero of either sign means "no stored total";
    /// NaN is kept.
    #[must_use]
    pub fn new(kg: f64) -> Option<Self> {
        (kg != 0.0).then_some(Self(kg))
    }

    /// The raw kilogram value.
    #[must_use]
    pub const fn kg(self) -> f64 {
        self.0
    }

    /// The part of the value that can be counted as a weight. Zero for
    /// negative and non-finite values.
    #[must_use]
    pub fn usable(self) -> Weight {
        Weight::from_kg(self.0)
    }
}

impl PartialEq for StoredKg {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for StoredKg {}

impl fmt::Display for StoredKg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kg", self.0)
    }
}

/// Retail package sizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BagSize {
    /// 200g bag
    Small,
    /// 500g bag
    Medium,
    /// 1kg bag
    Large,
}

impl BagSize {
    /// Weight of one package of this size.
    #[must_use]
    pub const fn weight(self) -> Weight {
        match self {
            Self::Small => SMALL_BAG,
            Self::Medium => MEDIUM_BAG,
            Self::Large => LARGE_BAG,
        }
    }
}

/// Weight of a small bag.
pub const SMALL_BAG: Weight = Weight::from_grams(200);

/// Weight of a medium bag.
pub const MEDIUM_BAG: Weight = Weight::from_grams(500);

/// Weight of a large bag.
pub const LARGE_BAG: Weight = Weight::from_grams(1000);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bag_constants() {
        assert_eq!(SMALL_BAG.grams(), 200);
        assert_eq!(MEDIUM_BAG.grams(), 500);
        assert_eq!(LARGE_BAG.grams(), 1000);
        assert_eq!(BagSize::Medium.weight(), MEDIUM_BAG);
    }

    #[test]
    fn from_kg_rounds_to_grams() {
        assert_eq!(Weight::from_kg(1.8).grams(), 1800);
        assert_eq!(Weight::from_kg(0.2 + 0.1).grams(), 300);
        assert_eq!(Weight::from_kg(2.0004).grams(), 2000);
    }

    #[test]
    fn from_kg_rejects_garbage() {
        assert_eq!(Weight::from_kg(-1.0), Weight::ZERO);
        assert_eq!(Weight::from_kg(f64::NAN), Weight::ZERO);
        assert_eq!(Weight::from_kg(f64::INFINITY), Weight::ZERO);
    }

    #[test]
    fn zero_is_positive_zero() {
        let kg = Weight::ZERO.kg();
        assert_eq!(kg, 0.0);
        assert!(kg.is_sign_positive());
        assert!(!kg.is_nan());
    }

    #[test]
    fn of_bags() {
        assert_eq!(Weight::of_bags(9, BagSize::Small).kg(), 1.8);
        assert_eq!(Weight::of_bags(3, BagSize::Medium).grams(), 1500);
        assert_eq!(Weight::of_bags(0, BagSize::Large), Weight::ZERO);
    }

    #[test]
    fn sum_is_exact() {
        let total: Weight = std::iter::repeat_n(SMALL_BAG, 10).sum();
        assert_eq!(total.kg(), 2.0);
    }

    #[test]
    fn serializes_as_kg() {
        let json = serde_json::to_string(&Weight::from_grams(1800)).unwrap_or_default();
        assert_eq!(json, "1.8");
        let back: Weight = serde_json::from_str("3.6").unwrap_or_default();
        assert_eq!(back.grams(), 3600);
    }

    #[test]
    fn stored_kg_keeps_what_weight_drops() {
        assert_eq!(StoredKg::new(0.0), None);
        assert_eq!(StoredKg::new(-0.0), None);

        let negative = StoredKg::new(-1.8);
        assert_eq!(negative.map(StoredKg::kg), Some(-1.8));
        assert_eq!(negative.map(StoredKg::usable), Some(Weight::ZERO));

        let tiny = StoredKg::new(0.0004);
        assert_eq!(tiny.map(StoredKg::usable), Some(Weight::ZERO));
        assert_eq!(StoredKg::new(1.8).map(StoredKg::usable), Some(Weight::from_grams(1800)));

        let nan = StoredKg::new(f64::NAN);
        assert!(nan.is_some());
        assert_eq!(nan, StoredKg::new(f64::NAN));
        assert_eq!(nan.map(StoredKg::usable), Some(Weight::ZERO));
    }

    #[test]
    fn display() {
        assert_eq!(Weight::from_grams(1500).to_string(), "1.500 kg");
    }
}
