//! Weighted historical pricing analytics
//!
//! Per-category average unit prices over stored cost sheets. Won jobs
//! count `WON_WEIGHT` times in the weighted average to bias the benchmark
//! toward prices that closed.

use crate::model::{Category, CostSheet, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weight of a Won sheet in the weighted averages (Lost/Unknown = 1)
pub const WON_WEIGHT: f64 = 3.0;

/// Running sums for one unit-price metric
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: f64,
    weighted_sum: f64,
    weighted_count: f64,
    samples: usize,
}

impl Accumulator {
    fn add(&mut self, price: Option<f64>, outcome: Outcome) {
        let price = match price {
            Some(p) if p.is_finite() && p > 0.0 => p,
            _ => return,
        };
        let weight = outcome_weight(outcome);
        self.sum += price;
        self.count += 1.0;
        self.weighted_sum += price * weight;
        self.weighted_count += weight;
        self.samples += 1;
    }

    fn finish(&self) -> PriceAverages {
        PriceAverages {
            average: (self.count > 0.0).then(|| self.sum / self.count),
            weighted_average: (self.weighted_count > 0.0).then(|| self.weighted_sum / self.weighted_count),
            samples: self.samples,
        }
    }
}

pub fn outcome_weight(outcome: Outcome) -> f64 {
    match outcome {
        Outcome::Won => WON_WEIGHT,
        Outcome::Lost | Outcome::Unknown => 1.0,
    }
}

/// Unweighted and won-weighted average of one metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAverages {
    pub average: Option<f64>,
    pub weighted_average: Option<f64>,
    /// Sheets that recorded this metric
    pub samples: usize,
}

/// Derived, never stored
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPricingStats {
    pub category: Category,
    pub job_count: usize,
    pub won_count: usize,
    pub lost_count: usize,
    pub unknown_count: usize,
    pub pre_delivery_sq_ft: PriceAverages,
    pub pre_delivery_linear_ft: PriceAverages,
    pub final_sq_ft: PriceAverages,
    pub final_linear_ft: PriceAverages,
}

#[derive(Default)]
struct CategoryAccumulator {
    job_count: usize,
    won_count: usize,
    lost_count: usize,
    unknown_count: usize,
    pre_sq_ft: Accumulator,
    pre_linear_ft: Accumulator,
    final_sq_ft: Accumulator,
    final_linear_ft: Accumulator,
}

/// Stats per category, keyed by the category name
///
/// Trashed sheets are skipped. Categories without sheets are absent.
pub fn category_pricing_stats<'a, I>(
    sheets: I,
    category: Option<Category>,
) -> BTreeMap<String, CategoryPricingStats>
where
    I: IntoIterator<Item = &'a CostSheet>,
{
    let mut groups: BTreeMap<Category, CategoryAccumulator> = BTreeMap::new();

    for sheet in sheets {
        if sheet.is_trashed() {
            continue;
        }
        if category.is_some_and(|c| c != sheet.category) {
            continue;
        }

        let acc = groups.entry(sheet.category).or_default();
        acc.job_count += 1;
        match sheet.outcome {
            Outcome::Won => acc.won_count += 1,
            Outcome::Lost => acc.lost_count += 1,
            Outcome::Unknown => acc.unknown_count += 1,
        }

        let prices = &sheet.totals.unit_prices;
        acc.pre_sq_ft.add(prices.pre_delivery_per_sq_ft, sheet.outcome);
        acc.pre_linear_ft.add(prices.pre_delivery_per_linear_ft, sheet.outcome);
        acc.final_sq_ft.add(prices.final_per_sq_ft, sheet.outcome);
        acc.final_linear_ft.add(prices.final_per_linear_ft, sheet.outcome);
    }

    groups
        .into_iter()
        .map(|(category, acc)| {
            let stats = CategoryPricingStats {
                category,
                job_count: acc.job_count,
                won_count: acc.won_count,
                lost_count: acc.lost_count,
                unknown_count: acc.unknown_count,
                pre_delivery_sq_ft: acc.pre_sq_ft.finish(),
                pre_delivery_linear_ft: acc.pre_linear_ft.finish(),
                final_sq_ft: acc.final_sq_ft.finish(),
                final_linear_ft: acc.final_linear_ft.finish(),
            };
            (category.to_string(), stats)
        })
        .collect()
}

/// Position of a quote relative to the weighted benchmark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "position", rename_all = "camelCase")]
pub enum Guardrail {
    Below { benchmark: f64, deviation: f64 },
    Within { benchmark: f64, deviation: f64 },
    Above { benchmark: f64, deviation: f64 },
    /// No weighted average for this category
    NoBenchmark,
}

/// Compare a candidate pre-delivery $/sqft to the category's weighted average
///
/// `tolerance` is a fraction (0.15 = +/-15%).
pub fn check_guardrail(stats: &CategoryPricingStats, price_per_sq_ft: f64, tolerance: f64) -> Guardrail {
    let benchmark = match stats.pre_delivery_sq_ft.weighted_average {
        Some(b) if b > 0.0 => b,
        _ => return Guardrail::NoBenchmark,
    };
    let deviation = (price_per_sq_ft - benchmark) / benchmark;
    let tolerance = tolerance.abs();

    if deviation < -tolerance {
        Guardrail::Below { benchmark, deviation }
    } else if deviation > tolerance {
        Guardrail::Above { benchmark, deviation }
    } else {
        Guardrail::Within { benchmark, deviation }
    }
}
