use super::ui;
use crate::core::CurrencyPair;
use crate::store::{HistoryStore, RateRecord};
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

pub async fn run(store: &dyn HistoryStore, pair: &CurrencyPair) -> Result<()> {
    let records = store
        .history(pair)
        .await
        .with_context(|| format!("Failed to read history for {pair}"))?;

    if records.is_empty() {
        println!("No history stored for {pair}. Run `fxsync quote` or `fxsync sync` first.");
        return Ok(());
    }

    println!(
        "\n{}",
        ui::style_text(&format!("History for {pair}"), ui::StyleType::Title)
    );
    println!("{}", history_table(&records));
    Ok(())
}

fn history_table(records: &[RateRecord]) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Rate")]);
    for record in records {
        table.add_row(vec![Cell::new(record.date), ui::rate_cell(record.rate)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_history_table_keeps_record_order() {
        let pair: CurrencyPair = "EURUSD".parse().unwrap();
        let records = vec![
            RateRecord {
                pair: pair.clone(),
                date: NaiveDate::from_ymd_opt(2024, 12, 2).unwrap(),
                rate: 1.05,
            },
            RateRecord {
                pair,
                date: NaiveDate::from_ymd_opt(2024, 12, 3).unwrap(),
                rate: 1.0625,
            },
        ];

        let rendered = history_table(&records).to_string();
        let first = rendered.find("2024-12-02").unwrap();
        let second = rendered.find("2024-12-03").unwrap();
        assert!(first < second);
        assert!(rendered.contains("1.0625"));
    }
}
