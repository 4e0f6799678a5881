//! Line-item calculators
//!
//! Pure money functions. Missing or non-numeric inputs count as 0;
//! negative inputs pass through unchanged (see `validation`).

/// NaN / infinity -> 0
#[inline]
pub fn num(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// `qty*unit_price + qty*unit_price*tax_rate + freight`
pub fn material_line_total(qty: f64, unit_price: f64, tax_rate: f64, freight: Option<f64>) -> f64 {
    let base = num(qty) * num(unit_price);
    base + base * num(tax_rate) + num(freight.unwrap_or(0.0))
}

/// Same shape as materials, with yards for quantity
pub fn fabric_line_total(yards: f64, price_per_yard: f64, tax_rate: f64, freight: Option<f64>) -> f64 {
    material_line_total(yards, price_per_yard, tax_rate, freight)
}

/// Labor is never taxed
pub fn labor_line_total(hours: f64, people: f64, rate: f64) -> f64 {
    num(hours) * num(people) * num(rate)
}

pub fn drive_time_total(trips: f64, hours: f64, people: f64, rate: f64) -> f64 {
    num(trips) * num(hours) * num(people) * num(rate)
}

pub fn mileage_total(miles: f64, trips: f64, rate_per_mile: f64) -> f64 {
    num(miles) * num(trips) * num(rate_per_mile)
}

pub fn hotel_total(nights: f64, people: f64, rate_per_night: f64) -> f64 {
    num(nights) * num(people) * num(rate_per_night)
}
