//! Excel generation (shared library)
//!
//! - `generate_sheet_workbook`: one cost sheet laid out like the shop's paper form
//! - `generate_history_workbook`: one row per sheet plus the category stats

use crate::analytics::{CategoryPricingStats, PriceAverages};
use crate::error::Result;
use crate::model::CostSheet;
use rust_xlsxwriter::*;
use std::collections::BTreeMap;

const MONEY: &str = "$#,##0.00";
const NOT_APPLICABLE: &str = "n/a";

struct Formats {
    title: Format,
    section: Format,
    label: Format,
    header: Format,
    money: Format,
    money_bold: Format,
    number: Format,
    percent: Format,
}

impl Formats {
    fn new() -> Self {
        Self {
            title: Format::new().set_bold().set_font_size(14.0),
            section: Format::new()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Color::RGB(0x2F5597)),
            label: Format::new().set_bold().set_font_color(Color::RGB(0x555555)),
            header: Format::new()
                .set_bold()
                .set_background_color(Color::RGB(0xF2F2F2))
                .set_border(FormatBorder::Thin)
                .set_border_color(Color::RGB(0xAAAAAA)),
            money: Format::new().set_num_format(MONEY),
            money_bold: Format::new().set_num_format(MONEY).set_bold(),
            number: Format::new().set_num_format("#,##0.00"),
            percent: Format::new().set_num_format("0.00%"),
        }
    }
}

fn write_optional_money(ws: &mut Worksheet, row: u32, col: u16, value: Option<f64>, fmt: &Format) -> Result<()> {
    match value {
        Some(v) => ws.write_number_with_format(row, col, v, fmt)?,
        None => ws.write_string(row, col, NOT_APPLICABLE)?,
    };
    Ok(())
}

fn write_labeled_money(ws: &mut Worksheet, row: u32, label: &str, value: f64, f: &Formats, bold: bool) -> Result<()> {
    ws.write_string_with_format(row, 0, label, &f.label)?;
    let fmt = if bold { &f.money_bold } else { &f.money };
    ws.write_number_with_format(row, 1, value, fmt)?;
    Ok(())
}

fn write_table_header(ws: &mut Worksheet, row: u32, headers: &[&str], f: &Formats) -> Result<()> {
    for (col, header) in headers.iter().enumerate() {
        ws.write_string_with_format(row, col as u16, *header, &f.header)?;
    }
    Ok(())
}

/// Cost sheet workbook into a buffer
pub fn generate_sheet_workbook(sheet: &CostSheet) -> Result<Vec<u8>> {
    let f = Formats::new();
    let mut workbook = Workbook::new();
    let ws = workbook.add_worksheet();
    ws.set_name(format!("Sheet {}", sheet.id))?;
    ws.set_column_width(0, 32.0)?;
    for col in 1..=5 {
        ws.set_column_width(col, 14.0)?;
    }

    let mut row: u32 = 0;
    ws.write_string_with_format(row, 0, format!("Cost Sheet #{} - {}", sheet.id, sheet.category), &f.title)?;
    row += 2;

    // Header fields
    let header_fields = [
        ("Customer", sheet.customer.as_str()),
        ("Project", sheet.project.as_str()),
        ("Job Site", sheet.job_site.as_str()),
        ("Estimator", sheet.estimator.as_str()),
    ];
    for (label, value) in header_fields {
        ws.write_string_with_format(row, 0, label, &f.label)?;
        ws.write_string(row, 1, value)?;
        row += 1;
    }
    ws.write_string_with_format(row, 0, "Status", &f.label)?;
    ws.write_string(row, 1, sheet.status.to_string())?;
    ws.write_string_with_format(row, 2, "Outcome", &f.label)?;
    ws.write_string(row, 3, sheet.outcome.to_string())?;
    row += 1;

    let d = &sheet.dimensions;
    let dims = [("Width", d.width), ("Projection", d.projection), ("Height", d.height), ("Valance", d.valance)];
    for (label, value) in dims {
        ws.write_string_with_format(row, 0, label, &f.label)?;
        ws.write_number_with_format(row, 1, value, &f.number)?;
        row += 1;
    }
    row += 1;

    // Materials
    ws.write_string_with_format(row, 0, "MATERIALS", &f.section)?;
    row += 1;
    write_table_header(ws, row, &["Description", "Qty", "Unit Price", "Freight", "Total"], &f)?;
    row += 1;
    for line in &sheet.materials {
        ws.write_string(row, 0, &line.description)?;
        ws.write_number_with_format(row, 1, line.quantity, &f.number)?;
        ws.write_number_with_format(row, 2, line.unit_price, &f.money)?;
        ws.write_number_with_format(row, 3, line.freight.unwrap_or(0.0), &f.money)?;
        ws.write_number_with_format(row, 4, line.total, &f.money)?;
        row += 1;
    }
    row += 1;

    // Fabric
    ws.write_string_with_format(row, 0, "FABRIC", &f.section)?;
    row += 1;
    write_table_header(ws, row, &["Description", "Yards", "Price/Yard", "Freight", "Total"], &f)?;
    row += 1;
    for line in &sheet.fabric {
        ws.write_string(row, 0, &line.description)?;
        ws.write_number_with_format(row, 1, line.yards, &f.number)?;
        ws.write_number_with_format(row, 2, line.price_per_yard, &f.money)?;
        ws.write_number_with_format(row, 3, line.freight.unwrap_or(0.0), &f.money)?;
        ws.write_number_with_format(row, 4, line.total, &f.money)?;
        row += 1;
    }
    row += 1;

    // Labor
    ws.write_string_with_format(row, 0, "LABOR", &f.section)?;
    row += 1;
    write_table_header(ws, row, &["Description", "Hours", "People", "Rate", "Type", "Total"], &f)?;
    row += 1;
    for line in &sheet.labor {
        ws.write_string(row, 0, &line.description)?;
        ws.write_number_with_format(row, 1, line.hours, &f.number)?;
        ws.write_number_with_format(row, 2, line.people, &f.number)?;
        ws.write_number_with_format(row, 3, line.rate.unwrap_or(sheet.rates.labor_rate), &f.money)?;
        ws.write_string(row, 4, if line.is_fabrication { "Fabrication" } else { "Installation" })?;
        ws.write_number_with_format(row, 5, line.total, &f.money)?;
        row += 1;
    }
    row += 1;

    if !sheet.recap.is_empty() {
        ws.write_string_with_format(row, 0, "RECAP", &f.section)?;
        row += 1;
        write_table_header(ws, row, &["Description", "Width", "Length", "Fabric Yds", "Linear Ft", "Sq Ft"], &f)?;
        row += 1;
        for line in &sheet.recap {
            ws.write_string(row, 0, &line.description)?;
            ws.write_number_with_format(row, 1, line.width, &f.number)?;
            ws.write_number_with_format(row, 2, line.length, &f.number)?;
            ws.write_number_with_format(row, 3, line.fabric_yards, &f.number)?;
            ws.write_number_with_format(row, 4, line.linear_feet, &f.number)?;
            ws.write_number_with_format(row, 5, line.square_feet, &f.number)?;
            row += 1;
        }
        row += 1;
    }

    // Pricing
    let t = &sheet.totals;
    ws.write_string_with_format(row, 0, "PRICING", &f.section)?;
    row += 1;
    ws.write_string_with_format(row, 0, "Sales Tax Rate", &f.label)?;
    ws.write_number_with_format(row, 1, sheet.rates.sales_tax_rate, &f.percent)?;
    row += 1;
    ws.write_string_with_format(row, 0, "Markup", &f.label)?;
    ws.write_number_with_format(row, 1, sheet.rates.markup, &f.percent)?;
    row += 1;

    let money_rows = [
        ("Total Materials", t.total_materials, false),
        ("Total Fabric", t.total_fabric, false),
        ("Fabrication Labor", t.total_fabrication_labor, false),
        ("Installation Labor", t.total_installation_labor, false),
        ("Total Labor", t.total_labor, false),
        ("Subtotal Before Markup", t.subtotal_before_markup, true),
        ("Total With Markup", t.total_with_markup, true),
        ("Other Requirements", t.total_other_requirements, false),
        ("Grand Total", t.grand_total, true),
        ("Discount / Increase", t.discount_increase, false),
        ("Total Price To Client", t.total_price_to_client, true),
    ];
    for (label, value, bold) in money_rows {
        write_labeled_money(ws, row, label, value, &f, bold)?;
        row += 1;
    }
    row += 1;

    ws.write_string_with_format(row, 0, "Square Feet", &f.label)?;
    ws.write_number_with_format(row, 1, t.square_feet, &f.number)?;
    ws.write_string_with_format(row, 2, "Linear Feet", &f.label)?;
    ws.write_number_with_format(row, 3, t.linear_feet, &f.number)?;
    row += 1;

    write_table_header(ws, row, &["Unit Price", "Pre-Delivery", "Final"], &f)?;
    row += 1;
    let up = &t.unit_prices;
    ws.write_string_with_format(row, 0, "Per Sq Ft", &f.label)?;
    write_optional_money(ws, row, 1, up.pre_delivery_per_sq_ft, &f.money)?;
    write_optional_money(ws, row, 2, up.final_per_sq_ft, &f.money)?;
    row += 1;
    ws.write_string_with_format(row, 0, "Per Linear Ft", &f.label)?;
    write_optional_money(ws, row, 1, up.pre_delivery_per_linear_ft, &f.money)?;
    write_optional_money(ws, row, 2, up.final_per_linear_ft, &f.money)?;

    Ok(workbook.save_to_buffer()?)
}

fn write_averages(ws: &mut Worksheet, row: u32, col: u16, averages: &PriceAverages, f: &Formats) -> Result<()> {
    write_optional_money(ws, row, col, averages.average, &f.money)?;
    write_optional_money(ws, row, col + 1, averages.weighted_average, &f.money)?;
    Ok(())
}

/// History workbook: "Sheets" + "Category Stats"
pub fn generate_history_workbook(
    sheets: &[CostSheet],
    stats: &BTreeMap<String, CategoryPricingStats>,
) -> Result<Vec<u8>> {
    let f = Formats::new();
    let mut workbook = Workbook::new();

    {
        let ws = workbook.add_worksheet();
        ws.set_name("Sheets")?;
        let headers = [
            "ID", "Category", "Customer", "Project", "Status", "Outcome", "Sq Ft", "Linear Ft",
            "Total With Markup", "Price To Client", "Pre-Delivery $/SqFt", "Pre-Delivery $/LF",
            "Final $/SqFt", "Final $/LF",
        ];
        write_table_header(ws, 0, &headers, &f)?;
        ws.set_column_width(2, 24.0)?;
        ws.set_column_width(3, 24.0)?;

        for (i, sheet) in sheets.iter().enumerate() {
            let row = i as u32 + 1;
            let t = &sheet.totals;
            ws.write_number(row, 0, sheet.id as f64)?;
            ws.write_string(row, 1, sheet.category.as_str())?;
            ws.write_string(row, 2, &sheet.customer)?;
            ws.write_string(row, 3, &sheet.project)?;
            ws.write_string(row, 4, sheet.status.to_string())?;
            ws.write_string(row, 5, sheet.outcome.to_string())?;
            ws.write_number_with_format(row, 6, t.square_feet, &f.number)?;
            ws.write_number_with_format(row, 7, t.linear_feet, &f.number)?;
            ws.write_number_with_format(row, 8, t.total_with_markup, &f.money)?;
            ws.write_number_with_format(row, 9, t.total_price_to_client, &f.money)?;
            write_optional_money(ws, row, 10, t.unit_prices.pre_delivery_per_sq_ft, &f.money)?;
            write_optional_money(ws, row, 11, t.unit_prices.pre_delivery_per_linear_ft, &f.money)?;
            write_optional_money(ws, row, 12, t.unit_prices.final_per_sq_ft, &f.money)?;
            write_optional_money(ws, row, 13, t.unit_prices.final_per_linear_ft, &f.money)?;
        }
    }

    {
        let ws = workbook.add_worksheet();
        ws.set_name("Category Stats")?;
        let headers = [
            "Category", "Jobs", "Won", "Lost", "Unknown",
            "Avg $/SqFt", "Won-Wtd $/SqFt", "Avg $/LF", "Won-Wtd $/LF",
            "Final Avg $/SqFt", "Final Won-Wtd $/SqFt", "Final Avg $/LF", "Final Won-Wtd $/LF",
        ];
        write_table_header(ws, 0, &headers, &f)?;
        ws.set_column_width(0, 16.0)?;

        for (i, (name, s)) in stats.iter().enumerate() {
            let row = i as u32 + 1;
            ws.write_string(row, 0, name)?;
            ws.write_number(row, 1, s.job_count as f64)?;
            ws.write_number(row, 2, s.won_count as f64)?;
            ws.write_number(row, 3, s.lost_count as f64)?;
            ws.write_number(row, 4, s.unknown_count as f64)?;
            write_averages(ws, row, 5, &s.pre_delivery_sq_ft, &f)?;
            write_averages(ws, row, 7, &s.pre_delivery_linear_ft, &f)?;
            write_averages(ws, row, 9, &s.final_sq_ft, &f)?;
            write_averages(ws, row, 11, &s.final_linear_ft, &f)?;
        }
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::category_pricing_stats;
    use crate::model::{CostSheetDraft, Dimensions, LaborLine, LineItems, MaterialLine, RecapLine};
    use crate::pricing::PricingEngine;
    use chrono::Utc;

    fn priced_sheet(id: u64) -> CostSheet {
        let draft = CostSheetDraft {
            customer: "Marina Point HOA".into(),
            dimensions: Dimensions {
                width: 12.0,
                projection: 4.0,
                ..Default::default()
            },
            lines: LineItems {
                materials: vec![MaterialLine {
                    description: "1\" sq tube".into(),
                    quantity: 6.0,
                    unit_price: 18.0,
                    freight: Some(25.0),
                    ..Default::default()
                }],
                labor: vec![LaborLine {
                    description: "Weld frame".into(),
                    hours: 5.0,
                    people: 1.0,
                    is_fabrication: true,
                    ..Default::default()
                }],
                recap: vec![RecapLine {
                    description: "Front".into(),
                    width: 12.0,
                    length: 4.0,
                    square_feet: 48.0,
                    linear_feet: 12.0,
                    ..Default::default()
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let mut sheet = PricingEngine::default().build(draft, Utc::now());
        sheet.id = id;
        sheet
    }

    fn is_zip(buffer: &[u8]) -> bool {
        buffer.len() > 4 && &buffer[0..2] == b"PK"
    }

    #[test]
    fn test_generate_sheet_workbook() {
        let buffer = generate_sheet_workbook(&priced_sheet(7)).expect("workbook generation failed");
        assert!(is_zip(&buffer));
    }

    #[test]
    fn test_generate_sheet_workbook_without_footage() {
        let mut sheet = priced_sheet(8);
        sheet.recap.clear();
        sheet.dimensions = Dimensions::default();
        sheet.reprice();
        assert!(sheet.totals.unit_prices.final_per_sq_ft.is_none());
        let buffer = generate_sheet_workbook(&sheet).expect("workbook generation failed");
        assert!(is_zip(&buffer));
    }

    #[test]
    fn test_generate_history_workbook() {
        let sheets: Vec<CostSheet> = (1..=3).map(priced_sheet).collect();
        let stats = category_pricing_stats(&sheets, None);
        let buffer = generate_history_workbook(&sheets, &stats).expect("workbook generation failed");
        assert!(is_zip(&buffer));
    }

    #[test]
    fn test_generate_history_workbook_empty() {
        let buffer = generate_history_workbook(&[], &BTreeMap::new()).expect("workbook generation failed");
        assert!(is_zip(&buffer));
    }
}
