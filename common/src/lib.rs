//! Estimator Common Library
//!
//! Cost model, line-item calculators, pricing engine and historical
//! pricing analytics. Everything here is pure and synchronous.

pub mod model;
pub mod calc;
pub mod pricing;
pub mod analytics;
pub mod validation;
pub mod permissions;
pub mod error;
pub mod export;

pub use model::{
    Category, CostSheet, CostSheetDraft, Dimensions, DriveTime, FabricLine, Hotel, LaborLine,
    Lifecycle, LineItems, MaterialLine, Mileage, Outcome, RateOverrides, RateSettings, RecapLine,
    SheetStatus, SheetTotals, SiteCosts, UnitPrices,
};
pub use pricing::{compute_totals, price_per_linear_ft, price_per_sq_ft, PricingEngine};
pub use analytics::{category_pricing_stats, check_guardrail, CategoryPricingStats, Guardrail, PriceAverages, WON_WEIGHT};
pub use validation::{clear_non_finite, find_negative_inputs, NegativeInput, NegativeInputPolicy};
pub use permissions::{Capability, PermissionDenied, Role};
pub use error::{Error, Result};
