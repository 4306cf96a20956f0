use super::ui;
use crate::sync::{BatchRefresh, RefreshReport};
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

pub async fn run(refresh: &BatchRefresh) -> Result<RefreshReport> {
    let pb = ui::new_spinner("Refreshing pair histories");
    let report = refresh.run().await;
    pb.finish_and_clear();
    let report = report.context("History refresh failed")?;

    display(&report);
    Ok(report)
}

pub fn display(report: &RefreshReport) {
    println!(
        "\n{}",
        ui::style_text(
            &format!("Refreshed {} to {}", report.start, report.end),
            ui::StyleType::Title
        )
    );
    println!("{}", report_table(report));

    for (pair, reason) in &report.failed {
        println!(
            "{}",
            ui::style_text(&format!("{pair}: {reason}"), ui::StyleType::Error)
        );
    }
}

fn report_table(report: &RefreshReport) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Count")]);
    table.add_row(vec![
        Cell::new("Pairs refreshed"),
        ui::count_cell(report.pairs_refreshed),
    ]);
    table.add_row(vec![Cell::new("Series fetched"), ui::count_cell(report.series_fetched)]);
    table.add_row(vec![Cell::new("Records added"), ui::count_cell(report.inserted)]);
    table.add_row(vec![
        Cell::new("Records kept"),
        ui::count_cell(report.already_present),
    ]);
    table.add_row(vec![Cell::new("Pairs failed"), ui::count_cell(report.failed.len())]);
    table
}
