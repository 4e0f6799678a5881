use awning_estimator::{cli, config, error, export, import, integrations, store};
use chrono::Utc;
use clap::Parser;
use cli::{Cli, Commands};
use config::Settings;
use dialoguer::Confirm;
use error::{EstimatorError, Result};
use estimator_common::validation::enforce;
use estimator_common::{
    category_pricing_stats, check_guardrail, CostSheet, CostSheetDraft, Guardrail, LineItems,
    PriceAverages, PricingEngine,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use store::{ListFilter, SheetStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut settings = Settings::load()?;
    let role = cli.role.unwrap_or(settings.role);
    for capability in cli.command.required_capabilities() {
        role.require(capability)?;
    }
    tracing::debug!("running as {}", role);

    let store_path = match &cli.store {
        Some(path) => path.clone(),
        None => settings.resolved_store_path()?,
    };
    let engine = PricingEngine::new(settings.rates.clone());

    match cli.command {
        Commands::Create { input } => {
            let draft: CostSheetDraft = read_json(&input)?;
            let sheet = engine.build(draft, Utc::now());
            check_negative_inputs(&sheet, &settings)?;

            let mut store = SheetStore::open(&store_path)?;
            let id = store.insert(sheet);
            store.save()?;
            println!("✔ Created cost sheet #{}", id);
            print_sheet(store.get(id)?);
        }

        Commands::Import { path, force } => {
            let mut store = SheetStore::open(&store_path)?;
            if path.is_dir() {
                import_folder(&mut store, &engine, &settings, &path, force)?;
            } else {
                match import_one(&mut store, &engine, &settings, &path, force)? {
                    Some(id) => println!("✔ Imported {} as #{}", path.display(), id),
                    None => println!("Already imported: {} (use --force to import again)", path.display()),
                }
            }
            store.save()?;
        }

        Commands::Show { id, json } => {
            let store = SheetStore::open(&store_path)?;
            let sheet = store.get(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(sheet)?);
            } else {
                print_sheet(sheet);
            }
        }

        Commands::List { category, trashed, all } => {
            let store = SheetStore::open(&store_path)?;
            let sheets = store.list(ListFilter {
                category,
                include_trashed: all,
                only_trashed: trashed,
            });
            if sheets.is_empty() {
                println!("No cost sheets");
            }
            for sheet in sheets {
                println!(
                    "#{:<5} {:<10} {:<7} {:<8} {:<28} {:>12}{}",
                    sheet.id,
                    sheet.category,
                    sheet.status,
                    sheet.outcome,
                    truncate(&sheet.customer, 28),
                    money(sheet.totals.total_price_to_client),
                    if sheet.is_trashed() { "  (trashed)" } else { "" },
                );
            }
        }

        Commands::Edit { id, input } => {
            let lines: LineItems = read_json(&input)?;
            let mut store = SheetStore::open(&store_path)?;

            check_negative_inputs(&store.preview_lines(id, lines.clone())?, &settings)?;

            let sheet = store.replace_lines(id, lines, Utc::now())?;
            println!("✔ Updated line items of #{}", id);
            print_sheet(sheet);
            store.save()?;
        }

        Commands::Outcome { id, outcome } => {
            let mut store = SheetStore::open(&store_path)?;
            store.set_outcome(id, outcome, Utc::now())?;
            store.save()?;
            println!("✔ #{} tagged {}", id, outcome);
        }

        Commands::Finalize { id, reopen } => {
            let mut store = SheetStore::open(&store_path)?;
            if reopen {
                store.reopen(id, Utc::now())?;
                println!("✔ #{} reopened as DRAFT", id);
            } else {
                store.finalize(id, Utc::now())?;
                println!("✔ #{} is FINAL", id);
            }
            store.save()?;
        }

        Commands::Trash { id } => {
            let mut store = SheetStore::open(&store_path)?;
            store.trash(id, Utc::now())?;
            store.save()?;
            println!("✔ #{} moved to trash", id);
        }

        Commands::Restore { id } => {
            let mut store = SheetStore::open(&store_path)?;
            store.restore(id, Utc::now())?;
            store.save()?;
            println!("✔ #{} restored", id);
        }

        Commands::Delete { id, yes } => {
            let mut store = SheetStore::open(&store_path)?;
            let sheet = store.get(id)?;
            let confirmed = yes
                || Confirm::new()
                    .with_prompt(format!(
                        "Permanently delete #{} ({} for {})? This cannot be undone",
                        id, sheet.category, sheet.customer
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| EstimatorError::Io(std::io::Error::other(e)))?;
            if !confirmed {
                println!("Cancelled");
                return Ok(());
            }
            store.hard_delete(id)?;
            store.save()?;
            println!("✔ #{} deleted", id);
        }

        Commands::Stats { category, check } => {
            let store = SheetStore::open(&store_path)?;
            let stats = category_pricing_stats(store.all(), category);
            if stats.is_empty() {
                println!("No priced sheets yet");
            }
            for (name, s) in &stats {
                println!("{} ({} jobs: {} won, {} lost, {} unknown)", name, s.job_count, s.won_count, s.lost_count, s.unknown_count);
                print_averages("Pre-delivery $/sq ft", &s.pre_delivery_sq_ft);
                print_averages("Pre-delivery $/LF", &s.pre_delivery_linear_ft);
                print_averages("Final $/sq ft", &s.final_sq_ft);
                print_averages("Final $/LF", &s.final_linear_ft);
            }

            if let (Some(price), Some(category)) = (check, category) {
                let tolerance = settings.guardrail_tolerance;
                let result = match stats.get(category.as_str()) {
                    Some(s) => check_guardrail(s, price, tolerance),
                    None => Guardrail::NoBenchmark,
                };
                print_guardrail(price, tolerance, &result);
            }
        }

        Commands::Export { id, output } => {
            let store = SheetStore::open(&store_path)?;
            let output = output.unwrap_or_else(|| PathBuf::from("."));
            let path = match id {
                Some(id) => export::excel::export_sheet(store.get(id)?, &output)?,
                None => {
                    let sheets: Vec<CostSheet> = store.list(ListFilter::default()).into_iter().cloned().collect();
                    let stats = category_pricing_stats(&sheets, None);
                    export::excel::export_history(&sheets, &stats, &output)?
                }
            };
            println!("✔ Excel written: {}", path.display());
        }

        Commands::Distance { to, from, sheet, trips } => {
            let origin = from.unwrap_or_else(|| settings.shop_address.clone());
            if origin.trim().is_empty() {
                return Err(EstimatorError::Config(
                    "no origin: pass --from or set shopAddress with `estimator config --set shopAddress=...`".into(),
                ));
            }
            let client = integrations::MapsClient::new(settings.google_maps_api_key()?, settings.timeout_seconds)?;
            let route = client.route(&origin, &to).await?;
            println!("{} -> {}", origin, to);
            println!("  {:.1} miles, {:.2} hours one way", route.miles, route.hours);

            if let Some(id) = sheet {
                let mut store = SheetStore::open(&store_path)?;
                let mut site = store.get(id)?.site.clone();
                route.apply_to(&mut site, trips);
                check_negative_inputs(&store.preview_site(id, site.clone())?, &settings)?;

                let updated = store.replace_site(id, site, Utc::now())?;
                println!(
                    "✔ #{} travel set for {} round trip(s); other requirements now {}",
                    id,
                    trips,
                    money(updated.totals.total_other_requirements)
                );
                store.save()?;
            }
        }

        Commands::Customer { query } => {
            let client = integrations::HubSpotClient::new(settings.hubspot_access_token()?, settings.timeout_seconds)?;
            let records = client.search_companies(&query).await?;
            if records.is_empty() {
                println!("No HubSpot companies match '{}'", query);
            }
            for record in records {
                println!("{}  {}", record.id, record.name);
                let site = record.job_site();
                if !site.is_empty() {
                    println!("    {}", site);
                }
                if !record.phone.is_empty() {
                    println!("    {}", record.phone);
                }
            }
        }

        Commands::Config { set, show } => {
            for arg in &set {
                let (key, value) = cli::parse_setting(arg).map_err(EstimatorError::Config)?;
                settings.set(key, value)?;
                println!("✔ {} updated", key);
            }
            if !set.is_empty() {
                settings.save()?;
            }

            if show || set.is_empty() {
                print_settings(&settings, &store_path)?;
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,estimator=debug,awning_estimator=debug,estimator_common=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(EstimatorError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Applies the configured policy; warnings are printed, `reject` aborts
fn check_negative_inputs(sheet: &CostSheet, settings: &Settings) -> Result<()> {
    for finding in enforce(sheet, settings.negative_inputs)? {
        tracing::warn!("negative input {}", finding);
        println!("⚠ Negative input: {}", finding);
    }
    Ok(())
}

/// `Ok(None)` when the file was imported before and `force` is off
fn import_one(
    store: &mut SheetStore,
    engine: &PricingEngine,
    settings: &Settings,
    path: &Path,
    force: bool,
) -> Result<Option<u64>> {
    let hash = import::file_hash(path)?;
    if !force {
        if let Some(existing) = store.find_by_hash(&hash) {
            tracing::debug!("{} matches #{}", path.display(), existing.id);
            return Ok(None);
        }
    }

    let imported = import::import_workbook(path)?;
    for warning in &imported.warnings {
        println!("  ⚠ {}", warning);
    }

    let mut sheet = engine.build(imported.draft, Utc::now());
    sheet.source_hash = Some(imported.hash);
    check_negative_inputs(&sheet, settings)?;
    Ok(Some(store.insert(sheet)))
}

fn import_folder(
    store: &mut SheetStore,
    engine: &PricingEngine,
    settings: &Settings,
    folder: &Path,
    force: bool,
) -> Result<()> {
    let paths = import::collect_workbooks(folder)?;
    println!("Found {} workbooks in {}", paths.len(), folder.display());

    let bar = ProgressBar::new(paths.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }

    let (mut imported, mut skipped, mut failed) = (0usize, 0usize, 0usize);
    for path in &paths {
        bar.set_message(path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default());
        match import_one(store, engine, settings, path, force) {
            Ok(Some(_)) => imported += 1,
            Ok(None) => skipped += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!("import of {} failed: {}", path.display(), e);
                bar.println(format!("✘ {}: {}", path.display(), e));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    println!("✔ Imported {}, skipped {} already imported, {} failed", imported, skipped, failed);
    Ok(())
}

fn money(value: f64) -> String {
    if value < 0.0 {
        format!("-${:.2}", -value)
    } else {
        format!("${:.2}", value)
    }
}

fn optional_money(value: Option<f64>) -> String {
    value.map(money).unwrap_or_else(|| "n/a".to_string())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn print_sheet(sheet: &CostSheet) {
    let t = &sheet.totals;
    println!("Cost sheet #{} [{}] {} / {}", sheet.id, sheet.status, sheet.category, sheet.outcome);
    println!("  Customer:    {}", sheet.customer);
    println!("  Project:     {}", sheet.project);
    println!("  Job site:    {}", sheet.job_site);
    println!("  Estimator:   {}", sheet.estimator);
    println!(
        "  Size:        {} ft x {} ft ({} sq ft, {} linear ft)",
        sheet.dimensions.width, sheet.dimensions.projection, t.square_feet, t.linear_feet
    );
    println!(
        "  Lines:       {} materials, {} fabric, {} labor, {} recap",
        sheet.materials.len(),
        sheet.fabric.len(),
        sheet.labor.len(),
        sheet.recap.len()
    );
    println!("  Materials:              {:>12}", money(t.total_materials));
    println!("  Fabric:                 {:>12}", money(t.total_fabric));
    println!("  Fabrication labor:      {:>12}", money(t.total_fabrication_labor));
    println!("  Installation labor:     {:>12}", money(t.total_installation_labor));
    println!("  Subtotal before markup: {:>12}", money(t.subtotal_before_markup));
    println!("  Total with markup:      {:>12}", money(t.total_with_markup));
    println!("  Other requirements:     {:>12}", money(t.total_other_requirements));
    println!("  Grand total:            {:>12}", money(t.grand_total));
    println!("  Discount / increase:    {:>12}", money(t.discount_increase));
    println!("  Price to client:        {:>12}", money(t.total_price_to_client));
    let u = &t.unit_prices;
    println!(
        "  Pre-delivery: {} /sq ft, {} /LF",
        optional_money(u.pre_delivery_per_sq_ft),
        optional_money(u.pre_delivery_per_linear_ft)
    );
    println!(
        "  Final:        {} /sq ft, {} /LF",
        optional_money(u.final_per_sq_ft),
        optional_money(u.final_per_linear_ft)
    );
    if let Some(at) = sheet.lifecycle.trashed_at() {
        println!("  Trashed at {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
}

fn print_averages(label: &str, averages: &PriceAverages) {
    println!(
        "  {:<22} avg {:>10}  weighted {:>10}  ({} samples)",
        label,
        optional_money(averages.average),
        optional_money(averages.weighted_average),
        averages.samples
    );
}

fn print_guardrail(price: f64, tolerance: f64, result: &Guardrail) {
    let pct = |d: f64| format!("{:+.1}%", d * 100.0);
    match result {
        Guardrail::Within { benchmark, deviation } => println!(
            "✔ {} /sq ft is within ±{:.0}% of the {} benchmark ({})",
            money(price), tolerance * 100.0, money(*benchmark), pct(*deviation)
        ),
        Guardrail::Below { benchmark, deviation } => println!(
            "⚠ {} /sq ft is below the {} benchmark ({})",
            money(price), money(*benchmark), pct(*deviation)
        ),
        Guardrail::Above { benchmark, deviation } => println!(
            "⚠ {} /sq ft is above the {} benchmark ({})",
            money(price), money(*benchmark), pct(*deviation)
        ),
        Guardrail::NoBenchmark => println!("No benchmark yet for this category"),
    }
}

fn mask(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "set"
    } else {
        "not set"
    }
}

fn print_settings(settings: &Settings, store_path: &Path) -> Result<()> {
    let r = &settings.rates;
    println!("Settings ({}):", Settings::settings_path()?.display());
    println!("  salesTaxRate:       {}", r.sales_tax_rate);
    println!("  markup:             {}", r.markup);
    println!("  laborRate:          {}", r.labor_rate);
    println!("  driveTimeRate:      {}", r.drive_time_rate);
    println!("  mileageRate:        {}", r.mileage_rate);
    println!("  hotelRate:          {}", r.hotel_rate);
    println!("  role:               {}", settings.role);
    println!("  negativeInputs:     {}", settings.negative_inputs);
    println!("  guardrailTolerance: {}", settings.guardrail_tolerance);
    println!("  shopAddress:        {}", settings.shop_address);
    println!("  googleMapsApiKey:   {}", mask(&settings.google_maps_api_key));
    println!("  hubspotAccessToken: {}", mask(&settings.hubspot_access_token));
    println!("  timeoutSeconds:     {}", settings.timeout_seconds);
    println!("  store:              {}", store_path.display());
    Ok(())
}
