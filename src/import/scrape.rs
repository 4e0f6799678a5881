//! Cell-scraping importer
//!
//! Best effort: labeled header cells are located by substring match inside
//! a bounded window and the value is read from the right. Line tables start
//! at an ALL-CAPS section cell (`MATERIALS`, `FABRIC`, `LABOR`,
//! `FABRICATION LABOR`, `INSTALLATION LABOR`, `RECAP`), followed by a header
//! row and data rows up to a blank row, a "total" row or the next section.
//! Anything that cannot be located is defaulted and reported.

use super::grid::{Cell, Grid};
use estimator_common::{
    Category, CostSheetDraft, Dimensions, DriveTime, FabricLine, Hotel, LaborLine, LineItems,
    MaterialLine, Mileage, Outcome, RateOverrides, RecapLine, SiteCosts,
};
use std::collections::HashSet;

pub const MAX_SCAN_ROWS: usize = 80;
pub const MAX_SCAN_COLS: usize = 16;
/// Columns to the right of a label searched for its value
const VALUE_LOOKAHEAD: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ImportWarning {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct Scraped {
    pub draft: CostSheetDraft,
    pub warnings: Vec<ImportWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SectionKind {
    Materials,
    Fabric,
    /// Some(true) = fabrication, Some(false) = installation
    Labor(Option<bool>),
    Recap,
}

fn section_kind(cell: &Cell) -> Option<SectionKind> {
    let text = match cell {
        Cell::Text(s) => s.trim(),
        _ => return None,
    };
    if text.is_empty() || text != text.to_uppercase() {
        return None;
    }
    if text.contains("LABOR") {
        let flag = if text.contains("FABRICATION") || text.contains("SHOP") {
            Some(true)
        } else if text.contains("INSTALL") {
            Some(false)
        } else {
            None
        };
        return Some(SectionKind::Labor(flag));
    }
    if text.starts_with("FABRICATION") {
        Some(SectionKind::Labor(Some(true)))
    } else if text.starts_with("INSTALL") {
        Some(SectionKind::Labor(Some(false)))
    } else if text.starts_with("MATERIAL") {
        Some(SectionKind::Materials)
    } else if text.starts_with("FABRIC") {
        Some(SectionKind::Fabric)
    } else if text.starts_with("RECAP") {
        Some(SectionKind::Recap)
    } else {
        None
    }
}

fn normalize(text: &str) -> String {
    text.trim().trim_end_matches(':').trim().to_lowercase()
}

fn matches_label(text: &str, needles: &[&str], excludes: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n)) && !excludes.iter().any(|e| text.contains(e))
}

struct Section {
    kind: SectionKind,
    /// Normalized header text by column
    headers: Vec<(usize, String)>,
    base_col: usize,
    data_rows: Vec<usize>,
}

impl Section {
    fn column(&self, needles: &[&str], excludes: &[&str]) -> Option<usize> {
        self.headers
            .iter()
            .find(|(_, h)| matches_label(h, needles, excludes))
            .map(|(c, _)| *c)
    }
}

struct Scraper<'a> {
    grid: &'a Grid,
    table_rows: HashSet<usize>,
    warnings: Vec<ImportWarning>,
}

impl<'a> Scraper<'a> {
    fn new(grid: &'a Grid) -> Self {
        Self {
            grid,
            table_rows: HashSet::new(),
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, field: &str, message: impl Into<String>) {
        let warning = ImportWarning {
            field: field.to_string(),
            message: message.into(),
        };
        tracing::warn!("import: {}", warning);
        self.warnings.push(warning);
    }

    fn scan_rows(&self) -> usize {
        self.grid.height().min(MAX_SCAN_ROWS)
    }

    // ----- sections -----

    fn find_sections(&mut self) -> Vec<Section> {
        let grid = self.grid;
        let mut sections = Vec::new();
        let rows = self.scan_rows();
        let mut r = 0;

        while r < rows {
            let start = self
                .grid
                .first_filled(r, MAX_SCAN_COLS)
                .and_then(|(c, cell)| section_kind(cell).map(|kind| (c, kind)));
            let (base_col, kind) = match start {
                Some(s) => s,
                None => {
                    r += 1;
                    continue;
                }
            };
            self.table_rows.insert(r);

            let header_row = r + 1;
            let headers: Vec<(usize, String)> = (base_col..grid.width(header_row).min(MAX_SCAN_COLS))
                .filter_map(|c| {
                    let cell = grid.get(header_row, c);
                    (!cell.is_empty()).then(|| (c, normalize(&cell.text())))
                })
                .collect();
            self.table_rows.insert(header_row);

            let mut data_rows = Vec::new();
            let mut row = header_row + 1;
            while row < rows {
                let first = match grid.first_filled(row, MAX_SCAN_COLS) {
                    Some((_, cell)) => cell,
                    None => break,
                };
                if section_kind(first).is_some() {
                    break;
                }
                self.table_rows.insert(row);
                if normalize(&first.text()).contains("total") {
                    row += 1;
                    break;
                }
                data_rows.push(row);
                row += 1;
            }

            tracing::debug!("import: {:?} section at row {} with {} rows", kind, r + 1, data_rows.len());
            sections.push(Section {
                kind,
                headers,
                base_col,
                data_rows,
            });
            r = row;
        }

        sections
    }

    fn required_column(&mut self, section: &Section, field: &str, needles: &[&str], excludes: &[&str]) -> Option<usize> {
        let col = section.column(needles, excludes);
        if col.is_none() && !section.data_rows.is_empty() {
            self.warn(field, "column not found, defaulting to 0");
        }
        col
    }

    fn description(&self, section: &Section, col: Option<usize>, row: usize) -> String {
        self.grid.get(row, col.unwrap_or(section.base_col)).text()
    }

    fn number_at(&self, col: Option<usize>, row: usize) -> f64 {
        col.and_then(|c| self.grid.get(row, c).number()).unwrap_or(0.0)
    }

    fn materials(&mut self, section: &Section) -> Vec<MaterialLine> {
        let desc = section.column(&["desc", "item", "material"], &[]);
        let qty = self.required_column(section, "materials.quantity", &["qty", "quantity"], &[]);
        let price = self.required_column(section, "materials.unitPrice", &["price", "cost"], &["total"]);
        let freight = section.column(&["freight", "shipping"], &[]);

        section
            .data_rows
            .iter()
            .map(|&row| MaterialLine {
                description: self.description(section, desc, row),
                quantity: self.number_at(qty, row),
                unit_price: self.number_at(price, row),
                freight: freight.and_then(|c| self.grid.get(row, c).number()),
                total: 0.0,
            })
            .filter(|l| !l.description.is_empty() || l.quantity != 0.0 || l.unit_price != 0.0)
            .collect()
    }

    fn fabric(&mut self, section: &Section) -> Vec<FabricLine> {
        let desc = section.column(&["desc", "fabric", "item"], &["yard", "yds", "price"]);
        let yards = self.required_column(section, "fabric.yards", &["yards", "yds", "yardage"], &["price", "$", "/"]);
        let price = self.required_column(section, "fabric.pricePerYard", &["price", "per yard", "$/yd"], &["total"]);
        let freight = section.column(&["freight", "shipping"], &[]);

        section
            .data_rows
            .iter()
            .map(|&row| FabricLine {
                description: self.description(section, desc, row),
                yards: self.number_at(yards, row),
                price_per_yard: self.number_at(price, row),
                freight: freight.and_then(|c| self.grid.get(row, c).number()),
                total: 0.0,
            })
            .filter(|l| !l.description.is_empty() || l.yards != 0.0 || l.price_per_yard != 0.0)
            .collect()
    }

    fn labor(&mut self, section: &Section, section_flag: Option<bool>) -> Vec<LaborLine> {
        let desc = section.column(&["desc", "task", "labor"], &["rate", "hour"]);
        let hours = self.required_column(section, "labor.hours", &["hours", "hrs"], &[]);
        let people = self.required_column(section, "labor.people", &["people", "crew", "men", "workers", "qty"], &[]);
        let rate = section.column(&["rate"], &[]);
        let kind = section.column(&["type", "fab/install", "shop/site"], &[]);

        if section_flag.is_none() && kind.is_none() && !section.data_rows.is_empty() {
            self.warn("labor.isFabrication", "no type column, assuming installation labor");
        }

        section
            .data_rows
            .iter()
            .map(|&row| {
                let is_fabrication = kind
                    .and_then(|c| labor_kind(&self.grid.get(row, c).text()))
                    .or(section_flag)
                    .unwrap_or(false);
                LaborLine {
                    description: self.description(section, desc, row),
                    hours: self.number_at(hours, row),
                    people: self.number_at(people, row),
                    rate: rate.and_then(|c| self.grid.get(row, c).number()),
                    is_fabrication,
                    total: 0.0,
                }
            })
            .filter(|l| !l.description.is_empty() || l.hours != 0.0)
            .collect()
    }

    fn recap(&mut self, section: &Section) -> Vec<RecapLine> {
        let desc = section.column(&["desc", "unit", "location"], &[]);
        let width = section.column(&["width"], &[]);
        let length = section.column(&["length", "projection"], &[]);
        let yards = section.column(&["yard", "yds"], &[]);
        let linear = self.required_column(section, "recap.linearFeet", &["linear", "lin", "lf"], &[]);
        let square = self.required_column(section, "recap.squareFeet", &["sq", "square", "area"], &[]);

        section
            .data_rows
            .iter()
            .map(|&row| RecapLine {
                description: self.description(section, desc, row),
                width: self.number_at(width, row),
                length: self.number_at(length, row),
                fabric_yards: self.number_at(yards, row),
                linear_feet: self.number_at(linear, row),
                square_feet: self.number_at(square, row),
            })
            .filter(|l| l.square_feet != 0.0 || l.linear_feet != 0.0)
            .collect()
    }

    // ----- header fields -----

    fn find_label(&self, needles: &[&str], excludes: &[&str]) -> Option<(usize, usize)> {
        for r in 0..self.scan_rows() {
            if self.table_rows.contains(&r) {
                continue;
            }
            for c in 0..self.grid.width(r).min(MAX_SCAN_COLS) {
                if let Cell::Text(text) = self.grid.get(r, c) {
                    if matches_label(&normalize(text), needles, excludes) {
                        return Some((r, c));
                    }
                }
            }
        }
        None
    }

    fn value_for(&self, needles: &[&str], excludes: &[&str]) -> Option<&'a Cell> {
        let (r, c) = self.find_label(needles, excludes)?;
        let grid = self.grid;
        (c + 1..=c + VALUE_LOOKAHEAD)
            .map(|col| grid.get(r, col))
            .find(|cell| !cell.is_empty())
    }

    fn text(&mut self, field: &str, needles: &[&str], excludes: &[&str]) -> String {
        match self.value_for(needles, excludes) {
            Some(cell) => cell.text(),
            None => {
                self.warn(field, "not found, left blank");
                String::new()
            }
        }
    }

    fn number(&mut self, field: &str, needles: &[&str], excludes: &[&str]) -> f64 {
        match self.value_for(needles, excludes).map(|cell| (cell, cell.number())) {
            Some((_, Some(n))) => n,
            Some((cell, None)) => {
                self.warn(field, format!("'{}' is not a number, defaulting to 0", cell.text()));
                0.0
            }
            None => {
                self.warn(field, "not found, defaulting to 0");
                0.0
            }
        }
    }

    /// `None` keeps the admin default
    fn rate(&mut self, field: &str, needles: &[&str], excludes: &[&str], percent_above: Option<f64>) -> Option<f64> {
        let value = self.value_for(needles, excludes).map(|cell| {
            let parsed = match percent_above {
                Some(limit) => cell.rate(limit),
                None => cell.number(),
            };
            (cell, parsed)
        });
        match value {
            Some((_, Some(v))) => Some(v),
            Some((cell, None)) => {
                self.warn(field, format!("'{}' is not a rate, using default", cell.text()));
                None
            }
            None => {
                self.warn(field, "not found, using default");
                None
            }
        }
    }

    fn category(&mut self) -> Category {
        let text = self.text("category", &["category", "product type", "product"], &[]);
        if text.is_empty() {
            return Category::Other;
        }
        match text.parse::<Category>() {
            Ok(category) => category,
            Err(_) => {
                self.warn("category", format!("unknown category '{}', using Other", text));
                Category::Other
            }
        }
    }

    fn outcome(&mut self) -> Outcome {
        let text = match self.value_for(&["outcome", "won/lost", "result"], &[]) {
            Some(cell) => cell.text(),
            None => return Outcome::Unknown,
        };
        match text.parse::<Outcome>() {
            Ok(outcome) => outcome,
            Err(_) => {
                self.warn("outcome", format!("unknown outcome '{}', using Unknown", text));
                Outcome::Unknown
            }
        }
    }
}

fn labor_kind(text: &str) -> Option<bool> {
    let text = text.to_lowercase();
    if text.contains("fab") || text.contains("shop") {
        Some(true)
    } else if text.contains("inst") || text.contains("site") || text.contains("field") {
        Some(false)
    } else {
        None
    }
}

pub fn scrape(grid: &Grid) -> Scraped {
    let mut scraper = Scraper::new(grid);

    let mut lines = LineItems::default();
    let sections = scraper.find_sections();
    for section in &sections {
        match section.kind {
            SectionKind::Materials => lines.materials.extend(scraper.materials(section)),
            SectionKind::Fabric => lines.fabric.extend(scraper.fabric(section)),
            SectionKind::Labor(flag) => lines.labor.extend(scraper.labor(section, flag)),
            SectionKind::Recap => lines.recap.extend(scraper.recap(section)),
        }
    }
    if sections.is_empty() {
        scraper.warn("lines", "no MATERIALS / FABRIC / LABOR sections found");
    }

    let category = scraper.category();
    let customer = scraper.text("customer", &["customer", "client"], &[]);
    let project = scraper.text("project", &["project", "job name"], &["projection"]);
    let job_site = scraper.text("jobSite", &["job site", "site address", "address"], &[]);
    let estimator = scraper.text("estimator", &["estimator", "estimated by", "salesperson"], &[]);

    let dimensions = Dimensions {
        width: scraper.number("dimensions.width", &["width"], &["rate"]),
        projection: scraper.number("dimensions.projection", &["projection"], &[]),
        height: scraper.number("dimensions.height", &["height"], &[]),
        valance: scraper.number("dimensions.valance", &["valance"], &[]),
    };

    let rates = RateOverrides {
        sales_tax_rate: scraper.rate("rates.salesTaxRate", &["sales tax", "tax rate", "tax"], &[], Some(1.0)),
        markup: scraper.rate("rates.markup", &["markup"], &[], Some(5.0)),
        labor_rate: scraper.rate("rates.laborRate", &["labor rate", "shop rate"], &[], None),
        drive_time_rate: scraper.rate("rates.driveTimeRate", &["drive time rate", "drive rate"], &[], None),
        mileage_rate: scraper.rate("rates.mileageRate", &["mileage rate", "rate per mile"], &[], None),
        hotel_rate: scraper.rate("rates.hotelRate", &["hotel rate", "per night"], &[], None),
    };

    let trips = scraper.number("site.trips", &["trips"], &[]);
    let crew = scraper.number("site.crew", &["crew size", "installers", "people"], &[]);
    let site = SiteCosts {
        permit: scraper.number("site.permit", &["permit"], &[]),
        engineering: scraper.number("site.engineering", &["engineering"], &[]),
        equipment: scraper.number("site.equipment", &["equipment", "lift"], &[]),
        drive_time: DriveTime {
            trips,
            hours: scraper.number("site.driveTime.hours", &["drive time hours", "drive hours", "hours each way"], &["rate"]),
            people: crew,
        },
        mileage: Mileage {
            miles: scraper.number("site.mileage.miles", &["miles", "distance"], &["rate"]),
            trips,
        },
        hotel: Hotel {
            nights: scraper.number("site.hotel.nights", &["hotel nights", "nights"], &["rate"]),
            people: crew,
        },
        food: scraper.number("site.food", &["food", "per diem", "meals"], &[]),
    };

    let discount_increase = scraper.number("discountIncrease", &["discount", "increase", "adjustment"], &[]);
    let outcome = scraper.outcome();

    Scraped {
        draft: CostSheetDraft {
            category,
            customer,
            project,
            job_site,
            estimator,
            dimensions,
            lines,
            rates,
            site,
            discount_increase,
            outcome,
        },
        warnings: scraper.warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> Grid {
        Grid::from_text_rows(&[
            &["Customer:", "Bayside Marina"],
            &["Project", "Dock canopy"],
            &["Job Site", "12 Harbor Rd"],
            &["Estimator", "", "K. Ruiz"],
            &["Category", "Canopy"],
            &["Width", "20", "", "Projection", "10"],
            &["Sales Tax", "7%", "", "Markup", "80%"],
            &["Labor Rate", "$48.00"],
            &["Permit", "$250"],
            &["Miles", "35", "", "Trips", "2"],
            &["Crew Size", "3", "", "Drive Hours", "0.75"],
            &["Outcome", "Won"],
            &[""],
            &["MATERIALS"],
            &["Description", "Qty", "Unit Price", "Freight", "Total"],
            &["2\" sq tube", "8", "$22.50", "$40", "$220.00"],
            &["Hardware kit", "2", "15"],
            &["Total Materials", "", "", "", "$250.00"],
            &[""],
            &["FABRIC"],
            &["Fabric", "Yards", "Price/Yard"],
            &["Sunbrella Navy", "24", "13.75"],
            &[""],
            &["FABRICATION LABOR"],
            &["Task", "Hours", "People"],
            &["Sew cover", "6", "1"],
            &["Weld frame", "4", "2"],
            &["INSTALLATION LABOR"],
            &["Task", "Hours", "People", "Rate"],
            &["Mount", "5", "3", "55"],
        ])
    }

    #[test]
    fn test_scrape_header_fields() {
        let scraped = scrape(&sample_grid());
        let d = &scraped.draft;
        assert_eq!(d.customer, "Bayside Marina");
        assert_eq!(d.project, "Dock canopy");
        assert_eq!(d.job_site, "12 Harbor Rd");
        assert_eq!(d.estimator, "K. Ruiz");
        assert_eq!(d.category, Category::Canopy);
        assert_eq!(d.dimensions.width, 20.0);
        assert_eq!(d.dimensions.projection, 10.0);
        assert_eq!(d.rates.sales_tax_rate, Some(0.07));
        assert_eq!(d.rates.markup, Some(0.8));
        assert_eq!(d.rates.labor_rate, Some(48.0));
        assert_eq!(d.site.permit, 250.0);
        assert_eq!(d.site.mileage.miles, 35.0);
        assert_eq!(d.site.mileage.trips, 2.0);
        assert_eq!(d.site.drive_time.hours, 0.75);
        assert_eq!(d.site.drive_time.people, 3.0);
        assert_eq!(d.outcome, Outcome::Won);
    }

    #[test]
    fn test_scrape_line_sections() {
        let scraped = scrape(&sample_grid());
        let lines = &scraped.draft.lines;

        assert_eq!(lines.materials.len(), 2);
        assert_eq!(lines.materials[0].description, "2\" sq tube");
        assert_eq!(lines.materials[0].quantity, 8.0);
        assert_eq!(lines.materials[0].unit_price, 22.5);
        assert_eq!(lines.materials[0].freight, Some(40.0));
        assert_eq!(lines.materials[1].freight, None);

        assert_eq!(lines.fabric.len(), 1);
        assert_eq!(lines.fabric[0].description, "Sunbrella Navy");
        assert_eq!(lines.fabric[0].yards, 24.0);
        assert_eq!(lines.fabric[0].price_per_yard, 13.75);

        assert_eq!(lines.labor.len(), 3);
        assert!(lines.labor[0].is_fabrication);
        assert!(lines.labor[1].is_fabrication);
        assert!(!lines.labor[2].is_fabrication);
        assert_eq!(lines.labor[2].rate, Some(55.0));
        assert_eq!(lines.labor[0].rate, None);
    }

    #[test]
    fn test_scrape_warns_on_missing_fields() {
        let scraped = scrape(&sample_grid());
        let fields: Vec<&str> = scraped.warnings.iter().map(|w| w.field.as_str()).collect();
        assert!(fields.contains(&"site.engineering"));
        assert!(fields.contains(&"rates.hotelRate"));
        assert!(!fields.contains(&"customer"));
        assert!(!fields.contains(&"dimensions.width"));
    }

    #[test]
    fn test_total_rows_are_not_lines() {
        let scraped = scrape(&sample_grid());
        assert!(scraped
            .draft
            .lines
            .materials
            .iter()
            .all(|l| !l.description.to_lowercase().contains("total")));
    }

    #[test]
    fn test_projection_label_is_not_the_project() {
        let grid = Grid::from_text_rows(&[
            &["Width", "20", "", "Projection", "10"],
            &["Project", "Dock canopy"],
        ]);
        let d = scrape(&grid).draft;
        assert_eq!(d.project, "Dock canopy");
        assert_eq!(d.dimensions.projection, 10.0);
    }

    #[test]
    fn test_overflowing_quantity_defaults_to_zero() {
        let digits = "9".repeat(400);
        let grid = Grid::from_text_rows(&[
            &["MATERIALS"],
            &["Description", "Qty", "Unit Price"],
            &["Tube", digits.as_str(), "12"],
        ]);
        let materials = scrape(&grid).draft.lines.materials;
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].quantity, 0.0);
        assert_eq!(materials[0].unit_price, 12.0);
    }

    #[test]
    fn test_unknown_category_warns() {
        let grid = Grid::from_text_rows(&[&["Category", "Tent"]]);
        let scraped = scrape(&grid);
        assert_eq!(scraped.draft.category, Category::Other);
        assert!(scraped.warnings.iter().any(|w| w.field == "category" && w.message.contains("Tent")));
    }

    #[test]
    fn test_non_numeric_value_warns() {
        let grid = Grid::from_text_rows(&[&["Width", "about twenty"]]);
        let scraped = scrape(&grid);
        assert_eq!(scraped.draft.dimensions.width, 0.0);
        assert!(scraped
            .warnings
            .iter()
            .any(|w| w.field == "dimensions.width" && w.message.contains("not a number")));
    }

    #[test]
    fn test_empty_grid_defaults_everything() {
        let scraped = scrape(&Grid::default());
        assert_eq!(scraped.draft.lines, LineItems::default());
        assert_eq!(scraped.draft.outcome, Outcome::Unknown);
        assert!(scraped.warnings.iter().any(|w| w.field == "lines"));
    }

    #[test]
    fn test_labels_outside_window_ignored() {
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); MAX_SCAN_ROWS];
        rows.push(vec![Cell::Text("Customer".into()), Cell::Text("Too Far".into())]);
        let scraped = scrape(&Grid::new(rows));
        assert_eq!(scraped.draft.customer, "");
    }

    #[test]
    fn test_labor_type_column() {
        let grid = Grid::from_text_rows(&[
            &["LABOR"],
            &["Task", "Hours", "People", "Type"],
            &["Cut fabric", "2", "1", "Shop"],
            &["Install", "3", "2", "Field"],
        ]);
        let labor = scrape(&grid).draft.lines.labor;
        assert!(labor[0].is_fabrication);
        assert!(!labor[1].is_fabrication);
    }
}
