//! Aggregation & pricing engine
//!
//! Sums line items into category totals, applies markup to the whole
//! subtotal, and derives per-square-foot / per-linear-foot prices in a
//! "pre-delivery" (shop) and a "final" (client) variant.
//!
//! ## Order of operations
//! 1. materials + fabric + labor -> subtotal before markup
//! 2. subtotal * (1 + markup) -> total with markup (pre-delivery)
//! 3. + other requirements (site costs) -> grand total
//! 4. + discount/increase -> price to client (final)

use crate::calc::{
    drive_time_total, fabric_line_total, hotel_total, labor_line_total, material_line_total,
    mileage_total, num,
};
use crate::model::{
    CostSheet, CostSheetDraft, FabricLine, LaborLine, LineItems, MaterialLine, RateSettings,
    RecapLine, SheetTotals, SiteCosts, UnitPrices,
};
use crate::validation::clear_non_finite;
use chrono::{DateTime, Utc};

pub fn material_total(line: &MaterialLine, rates: &RateSettings) -> f64 {
    material_line_total(line.quantity, line.unit_price, rates.sales_tax_rate, line.freight)
}

pub fn fabric_total(line: &FabricLine, rates: &RateSettings) -> f64 {
    fabric_line_total(line.yards, line.price_per_yard, rates.sales_tax_rate, line.freight)
}

pub fn labor_total(line: &LaborLine, rates: &RateSettings) -> f64 {
    labor_line_total(line.hours, line.people, line.rate.unwrap_or(rates.labor_rate))
}

/// (fabrication, installation)
pub fn labor_split(labor: &[LaborLine], rates: &RateSettings) -> (f64, f64) {
    labor.iter().fold((0.0, 0.0), |(fab, install), line| {
        let total = labor_total(line, rates);
        if line.is_fabrication {
            (fab + total, install)
        } else {
            (fab, install + total)
        }
    })
}

/// Permit + engineering + equipment + drive time + mileage + hotel + food
pub fn other_requirements_total(site: &SiteCosts, rates: &RateSettings) -> f64 {
    let drive = drive_time_total(
        site.drive_time.trips,
        site.drive_time.hours,
        site.drive_time.people,
        rates.drive_time_rate,
    );
    let mileage = mileage_total(site.mileage.miles, site.mileage.trips, rates.mileage_rate);
    let hotel = hotel_total(site.hotel.nights, site.hotel.people, rates.hotel_rate);

    num(site.permit) + num(site.engineering) + num(site.equipment) + drive + mileage + hotel + num(site.food)
}

/// `total / footage` when footage is a positive number, otherwise `None`
pub fn price_per_unit(total: f64, footage: Option<f64>) -> Option<f64> {
    match footage {
        Some(f) if f.is_finite() && f > 0.0 => Some(num(total) / f),
        _ => None,
    }
}

pub fn price_per_sq_ft(total: f64, square_feet: Option<f64>) -> Option<f64> {
    price_per_unit(total, square_feet)
}

pub fn price_per_linear_ft(total: f64, linear_feet: Option<f64>) -> Option<f64> {
    price_per_unit(total, linear_feet)
}

/// (square feet, linear feet)
///
/// Sum over recap lines when present, otherwise width x projection / width.
pub fn footage(sheet: &CostSheet) -> (f64, f64) {
    if sheet.recap.is_empty() {
        let d = &sheet.dimensions;
        return (num(d.width) * num(d.projection), num(d.width));
    }
    recap_footage(&sheet.recap)
}

pub fn recap_footage(recap: &[RecapLine]) -> (f64, f64) {
    recap.iter().fold((0.0, 0.0), |(sq, lf), line| {
        (sq + num(line.square_feet), lf + num(line.linear_feet))
    })
}

/// Every derived total of a sheet; reads nothing but the sheet
pub fn compute_totals(sheet: &CostSheet) -> SheetTotals {
    let rates = &sheet.rates;

    let total_materials: f64 = sheet.materials.iter().map(|l| material_total(l, rates)).sum();
    let total_fabric: f64 = sheet.fabric.iter().map(|l| fabric_total(l, rates)).sum();
    let (total_fabrication_labor, total_installation_labor) = labor_split(&sheet.labor, rates);
    let total_labor = total_fabrication_labor + total_installation_labor;

    let subtotal_before_markup = total_materials + total_fabric + total_labor;
    let total_with_markup = subtotal_before_markup * (1.0 + num(rates.markup));
    let total_other_requirements = other_requirements_total(&sheet.site, rates);
    let grand_total = total_with_markup + total_other_requirements;
    let discount_increase = num(sheet.discount_increase);
    let total_price_to_client = grand_total + discount_increase;

    let (square_feet, linear_feet) = footage(sheet);
    let unit_prices = UnitPrices {
        pre_delivery_per_sq_ft: price_per_sq_ft(total_with_markup, Some(square_feet)),
        pre_delivery_per_linear_ft: price_per_linear_ft(total_with_markup, Some(linear_feet)),
        final_per_sq_ft: price_per_sq_ft(total_price_to_client, Some(square_feet)),
        final_per_linear_ft: price_per_linear_ft(total_price_to_client, Some(linear_feet)),
    };

    SheetTotals {
        total_materials,
        total_fabric,
        total_fabrication_labor,
        total_installation_labor,
        total_labor,
        subtotal_before_markup,
        total_with_markup,
        total_other_requirements,
        grand_total,
        discount_increase,
        total_price_to_client,
        square_feet,
        linear_feet,
        unit_prices,
    }
}

impl CostSheet {
    /// Recompute every line total and the sheet totals from inputs
    pub fn reprice(&mut self) {
        clear_non_finite(self);
        let rates = self.rates.clone();
        for line in &mut self.materials {
            line.total = material_total(line, &rates);
        }
        for line in &mut self.fabric {
            line.total = fabric_total(line, &rates);
        }
        for line in &mut self.labor {
            line.total = labor_total(line, &rates);
        }
        self.totals = compute_totals(self);
    }

    /// Swap all four line collections wholesale, then reprice
    pub fn replace_lines(&mut self, lines: LineItems) {
        self.materials = lines.materials;
        self.fabric = lines.fabric;
        self.labor = lines.labor;
        self.recap = lines.recap;
        self.reprice();
    }
}

/// Builds priced sheets from drafts using explicit admin default rates
#[derive(Debug, Clone, Default)]
pub struct PricingEngine {
    defaults: RateSettings,
}

impl PricingEngine {
    pub fn new(defaults: RateSettings) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &RateSettings {
        &self.defaults
    }

    pub fn build(&self, draft: CostSheetDraft, now: DateTime<Utc>) -> CostSheet {
        let mut sheet = CostSheet::from_draft(draft, &self.defaults, now);
        sheet.reprice();
        sheet
    }
}
