use super::ui;
use crate::core::calendar::business_day;
use crate::core::{CurrencyTable, RateFetcher};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table};

pub async fn run(fetcher: &dyn RateFetcher, today: NaiveDate) -> Result<()> {
    let date = business_day(today);
    let pb = ui::new_spinner(&format!("Fetching rate table for {date}"));
    let table = fetcher.fetch_table(date).await;
    pb.finish_and_clear();
    let table = table.with_context(|| format!("Failed to fetch rate table for {date}"))?;

    println!(
        "\n{}",
        ui::style_text(
            &format!("Rates on {} (in PLN)", table.effective_date()),
            ui::StyleType::Title
        )
    );
    println!("{}", rates_table(&table));
    Ok(())
}

fn rates_table(rates: &CurrencyTable) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Bid")]);
    for (code, rate) in rates.iter() {
        table.add_row(vec![Cell::new(code), ui::rate_cell(rate)]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_rates_table_lists_every_currency() {
        let rates = BTreeMap::from([("USD".parse().unwrap(), 4.0512)]);
        let table = CurrencyTable::new(NaiveDate::from_ymd_opt(2024, 12, 6).unwrap(), rates);

        let rendered = rates_table(&table).to_string();
        assert!(rendered.contains("USD"));
        assert!(rendered.contains("4.0512"));
        assert!(rendered.contains("PLN"));
        assert!(rendered.contains("1.0000"));
    }
}
