pub mod calculator;

pub use calculator::{
    suggest, TariffBreakdown, TariffInput, TariffRange, TariffRates, TariffSuggestion,
};
