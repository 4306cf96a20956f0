pub mod currencies;
pub mod history;
pub mod quote;
pub mod setup;
pub mod sync;
pub mod ui;
