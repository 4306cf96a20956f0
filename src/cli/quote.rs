use super::ui;
use crate::lookup::PairQuote;
use crate::sync::TriggerOutcome;

pub fn display(quote: &PairQuote) {
    println!(
        "{} {} {}",
        ui::style_text(&quote.pair.to_string(), ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.4}", quote.rate), ui::StyleType::TotalValue),
        ui::style_text(&format!("({})", quote.date), ui::StyleType::Subtle),
    );
    println!("{}", ui::style_text(refresh_note(quote.refresh), ui::StyleType::Subtle));
}

fn refresh_note(outcome: TriggerOutcome) -> &'static str {
    match outcome {
        TriggerOutcome::Scheduled => "History refresh scheduled.",
        TriggerOutcome::LockBusy => "History refresh already scheduled recently.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_note() {
        assert!(refresh_note(TriggerOutcome::Scheduled).contains("scheduled"));
        assert!(refresh_note(TriggerOutcome::LockBusy).contains("already"));
    }
}
