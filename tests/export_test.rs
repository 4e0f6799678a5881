//! Excel export integration tests

use awning_estimator::export::excel::{export_history, export_sheet, sheet_title};
use calamine::{open_workbook_auto, Reader};
use chrono::Utc;
use estimator_common::{category_pricing_stats, Category, CostSheet, CostSheetDraft, PricingEngine};
use tempfile::tempdir;

fn create_test_sheet(id: u64, customer: &str) -> CostSheet {
    let mut sheet = PricingEngine::default().build(
        CostSheetDraft {
            category: Category::ShadeSail,
            customer: customer.to_string(),
            ..Default::default()
        },
        Utc::now(),
    );
    sheet.id = id;
    sheet
}

#[test]
fn test_export_sheet_to_directory() {
    let dir = tempdir().expect("Failed to create temp dir");
    let sheet = create_test_sheet(4, "Pool Deck LLC");

    let path = export_sheet(&sheet, dir.path()).expect("export failed");
    assert_eq!(path, dir.path().join("Cost Sheet 4 Pool Deck LLC.xlsx"));
    assert!(std::fs::metadata(&path).unwrap().len() > 0);
}

#[test]
fn test_export_sheet_to_file_path() {
    let dir = tempdir().expect("Failed to create temp dir");
    let target = dir.path().join("quotes").join("q.xlsx");

    let path = export_sheet(&create_test_sheet(1, ""), &target).expect("export failed");
    assert_eq!(path, target);
    assert!(path.exists());
}

#[test]
fn test_history_workbook_readable() {
    let dir = tempdir().expect("Failed to create temp dir");
    let sheets = vec![create_test_sheet(1, "Alpha"), create_test_sheet(2, "Beta")];
    let stats = category_pricing_stats(&sheets, None);

    let path = export_history(&sheets, &stats, dir.path()).expect("export failed");
    let workbook = open_workbook_auto(&path).expect("calamine could not open export");
    let names = workbook.sheet_names();
    assert_eq!(names, vec!["Sheets".to_string(), "Category Stats".to_string()]);
}

#[test]
fn test_sheet_title() {
    assert_eq!(sheet_title(&create_test_sheet(9, "  ")), "Cost Sheet 9");
    assert_eq!(sheet_title(&create_test_sheet(9, "Acme")), "Cost Sheet 9 Acme");
}
