mod bootstrap;

use std::fs::File;

use anyhow::{anyhow, Context, Result};
use badger_core::models::{months_window, PeriodKey, UsageRecord};
use badger_core::settings::Settings;
use badger_core::units::format_count;
use badger_data::client::MetabaseClient;
use badger_data::export::{write_csv, ExportTableBuilder};
use badger_data::pipeline::{available_months, Dashboard};
use badger_data::series::token_points;
use badger_runtime::DataManager;
use clap::Parser;

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Badger v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("View: {}, window: {} months", settings.view, settings.window);

    let api_key = settings.require_api_key()?;
    let client = MetabaseClient::new(
        settings.base_url.clone(),
        api_key,
        settings.bandwidth_card_id,
        settings.tokens_card_id,
    );
    let mut manager = DataManager::new(
        client,
        badger_runtime::data_manager::DEFAULT_CACHE_TTL_SECS,
        settings.window as usize,
        settings.trend_threshold,
    );

    let dashboard = manager
        .get_dashboard(false)
        .cloned()
        .ok_or_else(|| {
            anyhow!(
                "failed to fetch data: {}",
                manager.last_error().unwrap_or("unknown error")
            )
        })?;

    match settings.view.as_str() {
        "bandwidth" => render_bandwidth(&dashboard),
        "company" => render_company(&dashboard),
        "trends" => render_trends(&dashboard),
        "tokens" => render_tokens(&dashboard, settings.window),
        "export" => run_export(&dashboard, &settings)?,
        // Unreachable: clap validates the view name.
        unknown => tracing::error!("unknown view: {unknown}"),
    }

    Ok(())
}

// ── Views ─────────────────────────────────────────────────────────────────────

/// Per-publisher bandwidth tables, grouped under publishing houses.
fn render_bandwidth(dashboard: &Dashboard) {
    for (house, publishers) in &dashboard.houses {
        println!("\n━━━ {house} ━━━");
        for publisher in publishers {
            let Some(series) = dashboard.series_by_publisher.get(&publisher.name) else {
                continue;
            };
            println!(
                "\n{} ({})  [{}]",
                publisher.name,
                publisher.domain_url,
                series.trend.label()
            );
            if series.points.is_empty() {
                println!("  no data");
                continue;
            }
            println!(
                "  {:<8} {:>10} {:>10} {:>10} {:>10} {:>10}",
                "Month", "Host GB", "Image GB", "Gumlet GB", "Fastly GB", "Total GB"
            );
            for point in &series.points {
                println!(
                    "  {:<8} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                    point.label,
                    point.host_gb,
                    point.image_gb,
                    point.gumlet_gb,
                    point.fastly_gb,
                    point.total_gb
                );
            }
        }
    }
}

/// Company-wide monthly totals in TB.
fn render_company(dashboard: &Dashboard) {
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "Month", "Host TB", "Image TB", "Gumlet TB", "Fastly TB", "Total TB"
    );
    for totals in &dashboard.company {
        println!(
            "{:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            totals.period.short_label(),
            totals.host_tb,
            totals.image_tb,
            totals.gumlet_tb,
            totals.fastly_tb,
            totals.total_tb
        );
    }
}

/// All publishers ordered by trend slope, steepest gainers first.
fn render_trends(dashboard: &Dashboard) {
    let mut series: Vec<_> = dashboard.series_by_publisher.values().collect();
    series.sort_by(|a, b| b.slope.total_cmp(&a.slope));

    println!("{:<40} {:>16} {:>9}", "Publisher", "GB/period", "Trend");
    for s in series {
        println!(
            "{:<40} {:>16.2} {:>9}",
            s.publisher,
            s.slope / 1e9,
            s.trend.label()
        );
    }
}

/// Per-publisher token usage over a fixed calendar window.
fn render_tokens(dashboard: &Dashboard, window: u32) {
    let all_tokens: Vec<UsageRecord> = dashboard
        .token_records_by_publisher
        .values()
        .flatten()
        .cloned()
        .collect();
    let Some(latest) = all_tokens.iter().map(|r| r.period.clone()).max() else {
        println!("no token usage recorded");
        return;
    };
    let months = months_window(&latest, window);

    let mut publishers: Vec<&String> = dashboard.token_records_by_publisher.keys().collect();
    publishers.sort();

    for publisher in publishers {
        println!("\n{publisher}");
        println!(
            "  {:<8} {:>14} {:>14} {:>14}",
            "Month", "Translation", "Generation", "Total"
        );
        let records = &dashboard.token_records_by_publisher[publisher];
        for point in token_points(records, &months) {
            println!(
                "  {:<8} {:>14} {:>14} {:>14}",
                point.label,
                format_count(point.translation),
                format_count(point.generation),
                format_count(point.total)
            );
        }
    }
}

/// Build the flat export table and write it as CSV to the configured path.
fn run_export(dashboard: &Dashboard, settings: &Settings) -> Result<()> {
    let metrics = settings.selected_metrics()?;

    let mut periods: Vec<PeriodKey> = settings.selected_months()?;
    if periods.is_empty() {
        let all_records: Vec<UsageRecord> = dashboard
            .records_by_publisher
            .values()
            .flatten()
            .cloned()
            .collect();
        periods = available_months(&all_records);
    }
    if periods.is_empty() {
        return Err(anyhow!("no months available to export"));
    }

    let rows = ExportTableBuilder::build(
        &dashboard.houses,
        &dashboard.records_by_publisher,
        &periods,
        &metrics,
    );

    let file = File::create(&settings.output)
        .with_context(|| format!("creating {}", settings.output.display()))?;
    write_csv(&rows, &metrics, file)?;

    tracing::info!(
        path = %settings.output.display(),
        months = periods.len(),
        metrics = metrics.len(),
        "export written"
    );
    println!("export written to {}", settings.output.display());
    Ok(())
}
