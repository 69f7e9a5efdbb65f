//! Bag normalizer.
//!
//! Turns one persisted [`OrderLineItem`] into canonical bag counts and a
//! weight. Every caller that needs a quantity for a line item goes through
//! [`normalize_line_item`]; nothing else reads the raw count columns.
//!
//! # Small bag precedence
//!
//! Rows written before the espresso/filter split only carry
//! `small_bags_legacy`. Rows written after it carry the split columns. The
//! rule, applied in order:
//!
//! 1. any split count above zero: use the split counts, ignore the legacy count
//! 2. legacy count above zero: attribute all of it to espresso
//! 3. otherwise: no small bags
//!
//! Attributing legacy bags to espresso is lossy and is kept on purpose so that
//! historical reports do not move.

use crate::types::OrderLineItem;
use crate::weight::{BagSize, StoredKg, Weight};
use serde::{Deserialize, Serialize};

/// Which columns supplied the small bag counts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmallBagSource {
    /// `small_bags_espresso` / `small_bags_filter`
    Split,
    /// `small_bags_legacy`, attributed to espresso
    Legacy,
    /// No small bags on this item
    None,
}

/// What to do with a stored total when the bag counts add up to zero.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoredTotalPolicy {
    /// Count the item as zero. The item is still reported as ambiguous.
    #[default]
    Ignore,
    /// Count the stored total instead.
    FallbackToStored,
}

/// Canonical quantities for one line item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    /// 200g espresso bags
    pub espresso_bags_small: u32,
    /// 200g filter bags
    pub filter_bags_small: u32,
    /// 500g espresso bags
    pub espresso_bags_medium: u32,
    /// 500g filter bags
    pub filter_bags_medium: u32,
    /// 1kg bags
    pub large_bags: u32,
    /// Which precedence branch produced the small bag counts
    pub small_bag_source: SmallBagSource,
    /// `total_quantity_kg` as stored, if non-zero. Negative and NaN values
    /// are kept so they can be reported.
    #[serde(rename = "stored_total_kg")]
    pub stored_total: Option<StoredKg>,
}

impl NormalizedItem {
    /// Small bags of both kinds.
    #[must_use]
    pub const fn small_bags(&self) -> u32 {
        self.espresso_bags_small.saturating_add(self.filter_bags_small)
    }

    /// Medium bags of both kinds.
    #[must_use]
    pub const fn medium_bags(&self) -> u32 {
        self.espresso_bags_medium.saturating_add(self.filter_bags_medium)
    }

    /// Weight of the small espresso bags.
    #[must_use]
    pub const fn espresso_weight(&self) -> Weight {
        Weight::of_bags(self.espresso_bags_small, BagSize::Small)
    }

    /// Weight of the small filter bags.
    #[must_use]
    pub const fn filter_weight(&self) -> Weight {
        Weight::of_bags(self.filter_bags_small, BagSize::Small)
    }

    /// Weight of all medium bags.
    #[must_use]
    pub const fn medium_weight(&self) -> Weight {
        Weight::of_bags(self.medium_bags(), BagSize::Medium)
    }

    /// Weight of the large bags.
    #[must_use]
    pub const fn large_weight(&self) -> Weight {
        Weight::of_bags(self.large_bags, BagSize::Large)
    }

    /// Weight implied by the bag counts alone.
    #[must_use]
    pub fn bag_weight(&self) -> Weight {
        self.espresso_weight() + self.filter_weight() + self.medium_weight() + self.large_weight()
    }

    /// [`Self::bag_weight`] in kilograms.
    #[must_use]
    pub fn total_kg(&self) -> f64 {
        self.bag_weight().kg()
    }

    /// Bag counts are all zero but a stored total says otherwise.
    ///
    /// Any non-zero stored value counts, including ones that cannot become a
    /// [`Weight`] (negative, NaN, under half a gram).
    #[must_use]
    pub fn is_ambiguous(&self) -> bool {
        self.bag_weight().is_zero() && self.stored_total.is_some()
    }

    /// Weight this item contributes under `policy`.
    ///
    /// The fallback clamps the stored value: garbage counts as zero.
    #[must_use]
    pub fn resolve_weight(&self, policy: StoredTotalPolicy) -> Weight {
        match (policy, self.stored_total) {
            (StoredTotalPolicy::FallbackToStored, Some(stored)) if self.is_ambiguous() => {
                stored.usable()
            }
            _ => self.bag_weight(),
        }
    }

    /// The part of [`Self::resolve_weight`] not backed by bag counts.
    #[must_use]
    pub fn unattributed_weight(&self, policy: StoredTotalPolicy) -> Weight {
        match (policy, self.stored_total) {
            (StoredTotalPolicy::FallbackToStored, Some(stored)) if self.is_ambiguous() => {
                stored.usable()
            }
            _ => Weight::ZERO,
        }
    }
}

/// Null and negative counts read as zero.
fn count(value: Option<i32>) -> u32 {
    value.map_or(0, |n| n.max(0).unsigned_abs())
}

/// Normalize one line item. Pure; never fails.
#[must_use]
pub fn normalize_line_item(item: &OrderLineItem) -> NormalizedItem {
    let espresso = count(item.small_bags_espresso);
    let filter = count(item.small_bags_filter);
    let legacy = count(item.small_bags_legacy);

    let (espresso_bags_small, filter_bags_small, small_bag_source) = if espresso > 0 || filter > 0 {
        (espresso, filter, SmallBagSource::Split)
    } else if legacy > 0 {
        (legacy, 0, SmallBagSource::Legacy)
    } else {
        (0, 0, SmallBagSource::None)
    };

    let stored_total = item.total_quantity_kg.and_then(StoredKg::new);

    NormalizedItem {
        espresso_bags_small,
        filter_bags_small,
        espresso_bags_medium: count(item.medium_bags_espresso),
        filter_bags_medium: count(item.medium_bags_filter),
        large_bags: count(item.large_bags),
        small_bag_source,
        stored_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CoffeeRef;

    fn item() -> OrderLineItem {
        OrderLineItem::for_coffee(CoffeeRef::new("c1", "Bedecho"))
    }

    #[test]
    fn legacy_counts_become_espresso() {
        let n = normalize_line_item(&OrderLineItem {
            small_bags_legacy: Some(9),
            small_bags_espresso: Some(0),
            small_bags_filter: Some(0),
            ..item()
        });
        assert_eq!(n.espresso_bags_small, 9);
        assert_eq!(n.filter_bags_small, 0);
        assert_eq!(n.small_bag_source, SmallBagSource::Legacy);
        assert_eq!(n.total_kg(), 1.8);
    }

    #[test]
    fn split_counts_win_over_legacy() {
        let n = normalize_line_item(&OrderLineItem {
            small_bags_legacy: Some(9),
            small_bags_espresso: Some(3),
            small_bags_filter: Some(2),
            ..item()
        });
        assert_eq!(n.espresso_bags_small, 3);
        assert_eq!(n.filter_bags_small, 2);
        assert_eq!(n.small_bag_source, SmallBagSource::Split);
        assert_eq!(n.total_kg(), 1.0);
    }

    #[test]
    fn filter_only_split_still_wins() {
        let n = normalize_line_item(&OrderLineItem {
            small_bags_legacy: Some(4),
            small_bags_filter: Some(1),
            ..item()
        });
        assert_eq!((n.espresso_bags_small, n.filter_bags_small), (0, 1));
    }

    #[test]
    fn all_sizes_weigh_in() {
        let n = normalize_line_item(&OrderLineItem {
            small_bags_espresso: Some(1),
            small_bags_filter: Some(1),
            medium_bags_espresso: Some(2),
            medium_bags_filter: Some(1),
            large_bags: Some(3),
            ..item()
        });
        assert_eq!(n.bag_weight().grams(), 400 + 1500 + 3000);
        assert_eq!(n.medium_weight().grams(), 1500);
        assert_eq!(n.medium_bags(), 3);
    }

    #[test]
    fn nulls_and_negatives_are_zero() {
        let n = normalize_line_item(&OrderLineItem {
            small_bags_espresso: Some(-3),
            small_bags_legacy: Some(-1),
            large_bags: Some(i32::MIN),
            ..item()
        });
        assert_eq!(n.small_bag_source, SmallBagSource::None);
        assert_eq!(n.large_bags, 0);
        assert_eq!(n.bag_weight(), Weight::ZERO);
    }

    #[test]
    fn zero_counts_weigh_exactly_zero() {
        let n = normalize_line_item(&item());
        let kg = n.total_kg();
        assert_eq!(kg, 0.0);
        assert!(kg.is_sign_positive());
        assert!(!n.is_ambiguous());
    }

    #[test]
    fn stored_total_without_bags_is_ambiguous() {
        let n = normalize_line_item(&OrderLineItem {
            total_quantity_kg: Some(1.8),
            ..item()
        });
        assert!(n.is_ambiguous());
        assert_eq!(n.bag_weight(), Weight::ZERO);
        assert_eq!(n.stored_total, StoredKg::new(1.8));
        assert_eq!(n.resolve_weight(StoredTotalPolicy::Ignore), Weight::ZERO);
        assert_eq!(
            n.resolve_weight(StoredTotalPolicy::FallbackToStored),
            Weight::from_grams(1800)
        );
        assert_eq!(
            n.unattributed_weight(StoredTotalPolicy::FallbackToStored),
            Weight::from_grams(1800)
        );
    }

    #[test]
    fn stored_total_never_overrides_bag_counts() {
        let n = normalize_line_item(&OrderLineItem {
            large_bags: Some(1),
            total_quantity_kg: Some(5.0),
            ..item()
        });
        assert!(!n.is_ambiguous());
        assert_eq!(n.resolve_weight(StoredTotalPolicy::FallbackToStored), Weight::from_grams(1000));
    }

    proptest::proptest! {
        #[test]
        fn precedence_is_exclusive(
            legacy in proptest::option::of(-5..50i32),
            espresso in proptest::option::of(-5..50i32),
            filter in proptest::option::of(-5..50i32),
        ) {
            let n = normalize_line_item(&OrderLineItem {
                small_bags_legacy: legacy,
                small_bags_espresso: espresso,
                small_bags_filter: filter,
                ..item()
            });
            match n.small_bag_source {
                SmallBagSource::Split => {
                    proptest::prop_assert_eq!(n.espresso_bags_small, count(espresso));
                    proptest::prop_assert_eq!(n.filter_bags_small, count(filter));
                }
                SmallBagSource::Legacy => {
                    proptest::prop_assert_eq!(n.small_bags(), count(legacy));
                    proptest::prop_assert_eq!(n.filter_bags_small, 0);
                }
                SmallBagSource::None => proptest::prop_assert_eq!(n.small_bags(), 0),
            }
            proptest::prop_assert_eq!(n.bag_weight().grams(), 200 * u64::from(n.small_bags()));
        }
    }

    #[test]
    fn zero_stored_total_is_absent() {
        let n = normalize_line_item(&OrderLineItem {
            total_quantity_kg: Some(0.0),
            ..item()
        });
        assert_eq!(n.stored_total, None);
    }

    #[test]
    fn unusable_stored_totals_are_still_ambiguous() {
        for kg in [-1.8, 0.0004, f64::NAN, f64::INFINITY] {
            let n = normalize_line_item(&OrderLineItem {
                total_quantity_kg: Some(kg),
                ..item()
            });
            assert!(n.is_ambiguous(), "stored {kg} should be ambiguous");
            assert_eq!(n.resolve_weight(StoredTotalPolicy::Ignore), Weight::ZERO);
            assert_eq!(n.resolve_weight(StoredTotalPolicy::FallbackToStored), Weight::ZERO);
            assert_eq!(n.unattributed_weight(StoredTotalPolicy::FallbackToStored), Weight::ZERO);
        }
    }

    proptest::proptest! {
        #[test]
        fn nonzero_stored_total_without_bags_is_ambiguous(
            kg in proptest::prop_oneof![
                proptest::num::f64::ANY,
                -50.0..50.0f64,
                0.0..0.0005f64,
            ],
        ) {
            let n = normalize_line_item(&OrderLineItem {
                total_quantity_kg: Some(kg),
                ..item()
            });
            proptest::prop_assert_eq!(n.is_ambiguous(), kg != 0.0);
        }
    }
}
