//! Negative-input reporting
//!
//! The calculators accept negative numbers. Whether a negative quantity,
//! price or rate is a deliberate credit or a typo is decided by the
//! configured `NegativeInputPolicy`, not by the calculators.

use crate::error::{Error, Result};
use crate::model::CostSheet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NegativeInputPolicy {
    /// Accept silently
    Allow,
    /// Accept and report
    #[default]
    Warn,
    /// Refuse to store the sheet
    Reject,
}

impl std::str::FromStr for NegativeInputPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(NegativeInputPolicy::Allow),
            "warn" => Ok(NegativeInputPolicy::Warn),
            "reject" => Ok(NegativeInputPolicy::Reject),
            _ => Err(format!("Unknown policy: {}. Use allow, warn, or reject", s)),
        }
    }
}

impl std::fmt::Display for NegativeInputPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegativeInputPolicy::Allow => write!(f, "allow"),
            NegativeInputPolicy::Warn => write!(f, "warn"),
            NegativeInputPolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NegativeInput {
    /// e.g. `materials[2].unitPrice`
    pub field: String,
    pub value: f64,
}

impl std::fmt::Display for NegativeInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.field, self.value)
    }
}

/// Every negative input value on the sheet (`discountIncrease` is signed and never listed)
pub fn find_negative_inputs(sheet: &CostSheet) -> Vec<NegativeInput> {
    let mut found = Vec::new();
    let mut check = |field: String, value: f64| {
        if value < 0.0 {
            found.push(NegativeInput { field, value });
        }
    };

    let d = &sheet.dimensions;
    check("dimensions.width".into(), d.width);
    check("dimensions.projection".into(), d.projection);
    check("dimensions.height".into(), d.height);
    check("dimensions.valance".into(), d.valance);

    for (i, line) in sheet.materials.iter().enumerate() {
        check(format!("materials[{}].quantity", i), line.quantity);
        check(format!("materials[{}].unitPrice", i), line.unit_price);
        check(format!("materials[{}].freight", i), line.freight.unwrap_or(0.0));
    }
    for (i, line) in sheet.fabric.iter().enumerate() {
        check(format!("fabric[{}].yards", i), line.yards);
        check(format!("fabric[{}].pricePerYard", i), line.price_per_yard);
        check(format!("fabric[{}].freight", i), line.freight.unwrap_or(0.0));
    }
    for (i, line) in sheet.labor.iter().enumerate() {
        check(format!("labor[{}].hours", i), line.hours);
        check(format!("labor[{}].people", i), line.people);
        check(format!("labor[{}].rate", i), line.rate.unwrap_or(0.0));
    }
    for (i, line) in sheet.recap.iter().enumerate() {
        check(format!("recap[{}].width", i), line.width);
        check(format!("recap[{}].length", i), line.length);
        check(format!("recap[{}].fabricYards", i), line.fabric_yards);
        check(format!("recap[{}].squareFeet", i), line.square_feet);
        check(format!("recap[{}].linearFeet", i), line.linear_feet);
    }

    let r = &sheet.rates;
    check("rates.salesTaxRate".into(), r.sales_tax_rate);
    check("rates.markup".into(), r.markup);
    check("rates.laborRate".into(), r.labor_rate);
    check("rates.driveTimeRate".into(), r.drive_time_rate);
    check("rates.mileageRate".into(), r.mileage_rate);
    check("rates.hotelRate".into(), r.hotel_rate);

    let s = &sheet.site;
    check("site.permit".into(), s.permit);
    check("site.engineering".into(), s.engineering);
    check("site.equipment".into(), s.equipment);
    check("site.food".into(), s.food);
    check("site.driveTime.trips".into(), s.drive_time.trips);
    check("site.driveTime.hours".into(), s.drive_time.hours);
    check("site.driveTime.people".into(), s.drive_time.people);
    check("site.mileage.miles".into(), s.mileage.miles);
    check("site.mileage.trips".into(), s.mileage.trips);
    check("site.hotel.nights".into(), s.hotel.nights);
    check("site.hotel.people".into(), s.hotel.people);

    found
}

/// Zero every NaN / infinite input in place and return the field names.
/// JSON has no encoding for them, so a stored non-finite value would make
/// the store unreadable.
pub fn clear_non_finite(sheet: &mut CostSheet) -> Vec<String> {
    let mut cleared = Vec::new();
    let mut fix = |field: &dyn Fn() -> String, value: &mut f64| {
        if !value.is_finite() {
            *value = 0.0;
            cleared.push(field());
        }
    };

    let d = &mut sheet.dimensions;
    fix(&|| "dimensions.width".into(), &mut d.width);
    fix(&|| "dimensions.projection".into(), &mut d.projection);
    fix(&|| "dimensions.height".into(), &mut d.height);
    fix(&|| "dimensions.valance".into(), &mut d.valance);

    for (i, line) in sheet.materials.iter_mut().enumerate() {
        fix(&|| format!("materials[{}].quantity", i), &mut line.quantity);
        fix(&|| format!("materials[{}].unitPrice", i), &mut line.unit_price);
        if let Some(freight) = line.freight.as_mut() {
            fix(&|| format!("materials[{}].freight", i), freight);
        }
    }
    for (i, line) in sheet.fabric.iter_mut().enumerate() {
        fix(&|| format!("fabric[{}].yards", i), &mut line.yards);
        fix(&|| format!("fabric[{}].pricePerYard", i), &mut line.price_per_yard);
        if let Some(freight) = line.freight.as_mut() {
            fix(&|| format!("fabric[{}].freight", i), freight);
        }
    }
    for (i, line) in sheet.labor.iter_mut().enumerate() {
        fix(&|| format!("labor[{}].hours", i), &mut line.hours);
        fix(&|| format!("labor[{}].people", i), &mut line.people);
        if let Some(rate) = line.rate.as_mut() {
            fix(&|| format!("labor[{}].rate", i), rate);
        }
    }
    for (i, line) in sheet.recap.iter_mut().enumerate() {
        fix(&|| format!("recap[{}].width", i), &mut line.width);
        fix(&|| format!("recap[{}].length", i), &mut line.length);
        fix(&|| format!("recap[{}].fabricYards", i), &mut line.fabric_yards);
        fix(&|| format!("recap[{}].squareFeet", i), &mut line.square_feet);
        fix(&|| format!("recap[{}].linearFeet", i), &mut line.linear_feet);
    }

    let r = &mut sheet.rates;
    fix(&|| "rates.salesTaxRate".into(), &mut r.sales_tax_rate);
    fix(&|| "rates.markup".into(), &mut r.markup);
    fix(&|| "rates.laborRate".into(), &mut r.labor_rate);
    fix(&|| "rates.driveTimeRate".into(), &mut r.drive_time_rate);
    fix(&|| "rates.mileageRate".into(), &mut r.mileage_rate);
    fix(&|| "rates.hotelRate".into(), &mut r.hotel_rate);

    let s = &mut sheet.site;
    fix(&|| "site.permit".into(), &mut s.permit);
    fix(&|| "site.engineering".into(), &mut s.engineering);
    fix(&|| "site.equipment".into(), &mut s.equipment);
    fix(&|| "site.food".into(), &mut s.food);
    fix(&|| "site.driveTime.trips".into(), &mut s.drive_time.trips);
    fix(&|| "site.driveTime.hours".into(), &mut s.drive_time.hours);
    fix(&|| "site.driveTime.people".into(), &mut s.drive_time.people);
    fix(&|| "site.mileage.miles".into(), &mut s.mileage.miles);
    fix(&|| "site.mileage.trips".into(), &mut s.mileage.trips);
    fix(&|| "site.hotel.nights".into(), &mut s.hotel.nights);
    fix(&|| "site.hotel.people".into(), &mut s.hotel.people);

    fix(&|| "discountIncrease".into(), &mut sheet.discount_increase);

    cleared
}

/// Apply the policy: `Reject` fails on the first finding, otherwise findings are returned
pub fn enforce(sheet: &CostSheet, policy: NegativeInputPolicy) -> Result<Vec<NegativeInput>> {
    let found = find_negative_inputs(sheet);
    match policy {
        NegativeInputPolicy::Allow => Ok(Vec::new()),
        NegativeInputPolicy::Warn => Ok(found),
        NegativeInputPolicy::Reject => match found.into_iter().next() {
            Some(first) => Err(Error::NegativeInput {
                field: first.field,
                value: first.value,
            }),
            None => Ok(Vec::new()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CostSheetDraft, LaborLine, LineItems, MaterialLine, RateSettings, RecapLine};
    use chrono::Utc;

    fn sheet_with_credit() -> CostSheet {
        let draft = CostSheetDraft {
            lines: LineItems {
                materials: vec![
                    MaterialLine {
                        quantity: 2.0,
                        unit_price: 10.0,
                        ..Default::default()
                    },
                    MaterialLine {
                        description: "Returned hardware".into(),
                        quantity: -1.0,
                        unit_price: 35.0,
                        ..Default::default()
                    },
                ],
                labor: vec![LaborLine {
                    hours: 2.0,
                    people: 1.0,
                    rate: Some(-5.0),
                    ..Default::default()
                }],
                ..Default::default()
            },
            discount_increase: -200.0,
            ..Default::default()
        };
        CostSheet::from_draft(draft, &RateSettings::default(), Utc::now())
    }

    #[test]
    fn test_find_negative_inputs() {
        let found = find_negative_inputs(&sheet_with_credit());
        let fields: Vec<&str> = found.iter().map(|n| n.field.as_str()).collect();
        assert_eq!(fields, vec!["materials[1].quantity", "labor[0].rate"]);
    }

    #[test]
    fn test_discount_is_not_reported() {
        let found = find_negative_inputs(&sheet_with_credit());
        assert!(found.iter().all(|n| !n.field.contains("discount")));
    }

    #[test]
    fn test_enforce_policies() {
        let sheet = sheet_with_credit();
        assert!(enforce(&sheet, NegativeInputPolicy::Allow).unwrap().is_empty());
        assert_eq!(enforce(&sheet, NegativeInputPolicy::Warn).unwrap().len(), 2);

        let err = enforce(&sheet, NegativeInputPolicy::Reject).unwrap_err();
        assert!(matches!(err, Error::NegativeInput { ref field, .. } if field == "materials[1].quantity"));
    }

    #[test]
    fn test_clean_sheet_passes_reject() {
        let sheet = CostSheet::from_draft(CostSheetDraft::default(), &RateSettings::default(), Utc::now());
        assert!(enforce(&sheet, NegativeInputPolicy::Reject).unwrap().is_empty());
    }

    #[test]
    fn test_negative_recap_dimensions_are_reported() {
        let mut sheet = CostSheet::from_draft(CostSheetDraft::default(), &RateSettings::default(), Utc::now());
        sheet.recap = vec![RecapLine {
            width: -12.0,
            length: 4.0,
            fabric_yards: -3.0,
            ..Default::default()
        }];
        let fields: Vec<String> = find_negative_inputs(&sheet).into_iter().map(|n| n.field).collect();
        assert_eq!(fields, vec!["recap[0].width", "recap[0].fabricYards"]);
    }

    #[test]
    fn test_clear_non_finite() {
        let mut sheet = sheet_with_credit();
        sheet.rates.markup = f64::INFINITY;
        sheet.materials[0].quantity = f64::NAN;
        sheet.labor[0].rate = Some(f64::NEG_INFINITY);
        sheet.discount_increase = f64::NAN;

        let cleared = clear_non_finite(&mut sheet);
        assert_eq!(
            cleared,
            vec!["materials[0].quantity", "labor[0].rate", "rates.markup", "discountIncrease"]
        );
        assert_eq!(sheet.rates.markup, 0.0);
        assert_eq!(sheet.labor[0].rate, Some(0.0));
        assert_eq!(sheet.materials[1].quantity, -1.0);
        assert!(clear_non_finite(&mut sheet).is_empty());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Reject".parse::<NegativeInputPolicy>().unwrap(), NegativeInputPolicy::Reject);
        assert!("strict".parse::<NegativeInputPolicy>().is_err());
    }
}
