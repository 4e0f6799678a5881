//! Cost model
//!
//! Value types describing one job estimate (a cost sheet):
//! - line items: materials, fabric, labor, recap units
//! - site-specific add-ons (drive time, mileage, hotel, food, permits)
//! - resolved rate settings and computed totals
//! - outcome / status / lifecycle tags

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product type of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Awning,
    Canopy,
    Cabana,
    #[serde(rename = "Shade Sail")]
    ShadeSail,
    Umbrella,
    Pergola,
    Recover,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Awning,
        Category::Canopy,
        Category::Cabana,
        Category::ShadeSail,
        Category::Umbrella,
        Category::Pergola,
        Category::Recover,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Awning => "Awning",
            Category::Canopy => "Canopy",
            Category::Cabana => "Cabana",
            Category::ShadeSail => "Shade Sail",
            Category::Umbrella => "Umbrella",
            Category::Pergola => "Pergola",
            Category::Recover => "Recover",
            Category::Other => "Other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "awning" | "awnings" => Ok(Category::Awning),
            "canopy" | "canopies" => Ok(Category::Canopy),
            "cabana" | "cabanas" => Ok(Category::Cabana),
            "shadesail" | "sail" | "shadesails" => Ok(Category::ShadeSail),
            "umbrella" | "umbrellas" => Ok(Category::Umbrella),
            "pergola" | "pergolas" => Ok(Category::Pergola),
            "recover" | "recovers" => Ok(Category::Recover),
            "other" => Ok(Category::Other),
            _ => Err(format!(
                "Unknown category: {}. Use awning, canopy, cabana, shade sail, umbrella, pergola, recover, or other",
                s
            )),
        }
    }
}

/// Won / Lost / Unknown tag on a historical sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Outcome {
    Won,
    Lost,
    #[default]
    Unknown,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Won => write!(f, "Won"),
            Outcome::Lost => write!(f, "Lost"),
            Outcome::Unknown => write!(f, "Unknown"),
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "won" | "win" | "w" => Ok(Outcome::Won),
            "lost" | "loss" | "l" => Ok(Outcome::Lost),
            "unknown" | "pending" | "" => Ok(Outcome::Unknown),
            _ => Err(format!("Unknown outcome: {}. Use won, lost, or unknown", s)),
        }
    }
}

/// Draft / Final status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SheetStatus {
    #[default]
    Draft,
    Final,
}

impl std::fmt::Display for SheetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetStatus::Draft => write!(f, "DRAFT"),
            SheetStatus::Final => write!(f, "FINAL"),
        }
    }
}

/// Soft-delete state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum Lifecycle {
    #[default]
    Active,
    Trashed { at: DateTime<Utc> },
}

impl Lifecycle {
    fn name(&self) -> &'static str {
        match self {
            Lifecycle::Active => "active",
            Lifecycle::Trashed { .. } => "trashed",
        }
    }

    /// Active -> Trashed
    pub fn trash(self, at: DateTime<Utc>) -> Result<Self> {
        match self {
            Lifecycle::Active => Ok(Lifecycle::Trashed { at }),
            other => Err(Error::InvalidTransition {
                action: "trash",
                state: other.name(),
            }),
        }
    }

    /// Trashed -> Active
    pub fn restore(self) -> Result<Self> {
        match self {
            Lifecycle::Trashed { .. } => Ok(Lifecycle::Active),
            other => Err(Error::InvalidTransition {
                action: "restore",
                state: other.name(),
            }),
        }
    }

    pub fn is_trashed(&self) -> bool {
        matches!(self, Lifecycle::Trashed { .. })
    }

    pub fn trashed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Lifecycle::Trashed { at } => Some(*at),
            Lifecycle::Active => None,
        }
    }
}

/// Job dimensions in feet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dimensions {
    pub width: f64,
    pub projection: f64,
    pub height: f64,
    pub valance: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterialLine {
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freight: Option<f64>,
    /// Derived; overwritten on reprice
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FabricLine {
    pub description: String,
    pub yards: f64,
    pub price_per_yard: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freight: Option<f64>,
    /// Derived; overwritten on reprice
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaborLine {
    pub description: String,
    pub hours: f64,
    pub people: f64,
    /// Hourly rate; the sheet labor rate applies when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    /// Shop labor (true) vs installation labor (false)
    pub is_fabrication: bool,
    /// Derived; overwritten on reprice
    pub total: f64,
}

/// Per-unit dimensional breakdown when one sheet covers several awnings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecapLine {
    pub description: String,
    pub width: f64,
    pub length: f64,
    pub fabric_yards: f64,
    pub linear_feet: f64,
    pub square_feet: f64,
}

/// The four line-item collections, replaced wholesale on edit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItems {
    pub materials: Vec<MaterialLine>,
    pub fabric: Vec<FabricLine>,
    pub labor: Vec<LaborLine>,
    pub recap: Vec<RecapLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveTime {
    pub trips: f64,
    pub hours: f64,
    pub people: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mileage {
    pub miles: f64,
    pub trips: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hotel {
    pub nights: f64,
    pub people: f64,
}

/// Site-specific "other requirements"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteCosts {
    pub permit: f64,
    pub engineering: f64,
    pub equipment: f64,
    pub drive_time: DriveTime,
    pub mileage: Mileage,
    pub hotel: Hotel,
    pub food: f64,
}

/// Resolved rates stored on a sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateSettings {
    pub sales_tax_rate: f64,
    pub markup: f64,
    pub labor_rate: f64,
    pub drive_time_rate: f64,
    pub mileage_rate: f64,
    pub hotel_rate: f64,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            sales_tax_rate: 0.0825,
            markup: 0.8,
            labor_rate: 45.0,
            drive_time_rate: 45.0,
            mileage_rate: 0.67,
            hotel_rate: 150.0,
        }
    }
}

/// Per-sheet rate overrides, resolved against the admin defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RateOverrides {
    pub sales_tax_rate: Option<f64>,
    pub markup: Option<f64>,
    pub labor_rate: Option<f64>,
    pub drive_time_rate: Option<f64>,
    pub mileage_rate: Option<f64>,
    pub hotel_rate: Option<f64>,
}

impl RateOverrides {
    pub fn resolve(&self, defaults: &RateSettings) -> RateSettings {
        RateSettings {
            sales_tax_rate: self.sales_tax_rate.unwrap_or(defaults.sales_tax_rate),
            markup: self.markup.unwrap_or(defaults.markup),
            labor_rate: self.labor_rate.unwrap_or(defaults.labor_rate),
            drive_time_rate: self.drive_time_rate.unwrap_or(defaults.drive_time_rate),
            mileage_rate: self.mileage_rate.unwrap_or(defaults.mileage_rate),
            hotel_rate: self.hotel_rate.unwrap_or(defaults.hotel_rate),
        }
    }
}

/// Unit prices; `None` means "not applicable" (no footage)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnitPrices {
    pub pre_delivery_per_sq_ft: Option<f64>,
    pub pre_delivery_per_linear_ft: Option<f64>,
    pub final_per_sq_ft: Option<f64>,
    pub final_per_linear_ft: Option<f64>,
}

/// Every derived figure of a sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SheetTotals {
    pub total_materials: f64,
    pub total_fabric: f64,
    pub total_fabrication_labor: f64,
    pub total_installation_labor: f64,
    pub total_labor: f64,
    pub subtotal_before_markup: f64,
    pub total_with_markup: f64,
    pub total_other_requirements: f64,
    pub grand_total: f64,
    pub discount_increase: f64,
    pub total_price_to_client: f64,
    pub square_feet: f64,
    pub linear_feet: f64,
    pub unit_prices: UnitPrices,
}

/// Estimator input for a new sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CostSheetDraft {
    pub category: Category,
    pub customer: String,
    pub project: String,
    pub job_site: String,
    pub estimator: String,
    pub dimensions: Dimensions,
    #[serde(flatten)]
    pub lines: LineItems,
    pub rates: RateOverrides,
    pub site: SiteCosts,
    pub discount_increase: f64,
    pub outcome: Outcome,
}

/// One job estimate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostSheet {
    pub id: u64,
    pub category: Category,
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub job_site: String,
    #[serde(default)]
    pub estimator: String,
    #[serde(default)]
    pub dimensions: Dimensions,
    #[serde(default)]
    pub materials: Vec<MaterialLine>,
    #[serde(default)]
    pub fabric: Vec<FabricLine>,
    #[serde(default)]
    pub labor: Vec<LaborLine>,
    #[serde(default)]
    pub recap: Vec<RecapLine>,
    #[serde(default)]
    pub rates: RateSettings,
    #[serde(default)]
    pub site: SiteCosts,
    /// Signed adjustment applied after the grand total
    #[serde(default)]
    pub discount_increase: f64,
    #[serde(default)]
    pub totals: SheetTotals,
    #[serde(default)]
    pub outcome: Outcome,
    #[serde(default)]
    pub status: SheetStatus,
    #[serde(default)]
    pub lifecycle: Lifecycle,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// SHA-256 of the workbook this sheet was imported from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
}

impl CostSheet {
    /// Build an unpriced sheet from a draft; call `reprice` afterwards
    pub fn from_draft(draft: CostSheetDraft, defaults: &RateSettings, now: DateTime<Utc>) -> Self {
        let rates = draft.rates.resolve(defaults);
        Self {
            id: 0,
            category: draft.category,
            customer: draft.customer,
            project: draft.project,
            job_site: draft.job_site,
            estimator: draft.estimator,
            dimensions: draft.dimensions,
            materials: draft.lines.materials,
            fabric: draft.lines.fabric,
            labor: draft.lines.labor,
            recap: draft.lines.recap,
            rates,
            site: draft.site,
            discount_increase: draft.discount_increase,
            totals: SheetTotals::default(),
            outcome: draft.outcome,
            status: SheetStatus::Draft,
            lifecycle: Lifecycle::Active,
            created_at: now,
            updated_at: now,
            source_hash: None,
        }
    }

    pub fn lines(&self) -> LineItems {
        LineItems {
            materials: self.materials.clone(),
            fabric: self.fabric.clone(),
            labor: self.labor.clone(),
            recap: self.recap.clone(),
        }
    }

    pub fn is_final(&self) -> bool {
        self.status == SheetStatus::Final
    }

    pub fn is_trashed(&self) -> bool {
        self.lifecycle.is_trashed()
    }

    /// Draft -> Final
    pub fn finalize(&mut self) -> Result<()> {
        if self.is_final() {
            return Err(Error::InvalidTransition {
                action: "finalize",
                state: "final",
            });
        }
        self.status = SheetStatus::Final;
        Ok(())
    }

    /// Final -> Draft
    pub fn reopen(&mut self) -> Result<()> {
        if !self.is_final() {
            return Err(Error::InvalidTransition {
                action: "reopen",
                state: "draft",
            });
        }
        self.status = SheetStatus::Draft;
        Ok(())
    }

    pub fn trash(&mut self, at: DateTime<Utc>) -> Result<()> {
        self.lifecycle = self.lifecycle.trash(at)?;
        Ok(())
    }

    pub fn restore(&mut self) -> Result<()> {
        self.lifecycle = self.lifecycle.restore()?;
        Ok(())
    }
}
