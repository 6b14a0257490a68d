//! Tariff suggestion calculator
//!
//! Deterministic linear model over distance and duration. Coefficients come
//! from configuration; everything here is pure so the math stays testable.

use serde::Deserialize;

use crate::domain::{DomainError, DomainResult};

/// Configured coefficients, COP-denominated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TariffRates {
    /// Flat boarding component.
    pub base_boarding: i64,
    /// COP per kilometre.
    pub per_km: f64,
    /// COP per minute.
    pub per_minute: f64,
    /// Half-width of the accepted band around the suggestion, e.g. 0.25.
    pub tolerance_pct: f64,
}

impl Default for TariffRates {
    fn default() -> Self {
        Self {
            base_boarding: 1500,
            per_km: 350.0,
            per_minute: 80.0,
            tolerance_pct: 0.25,
        }
    }
}

/// Caller-supplied inputs of one suggestion.
#[derive(Debug, Clone, Copy)]
pub struct TariffInput {
    pub distance_km: f64,
    pub duration_minutes: f64,
    /// Surge multiplier, ≥ 1 when present.
    pub demand_factor: Option<f64>,
    /// Paying passengers sharing the fare, ≥ 1 when present.
    pub occupancy: Option<u32>,
}

/// Per-term decomposition of the suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TariffBreakdown {
    pub base_boarding: i64,
    pub distance_component: i64,
    pub duration_component: i64,
}

/// Accepted band for `price_per_seat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TariffRange {
    pub min: i64,
    pub max: i64,
}

impl TariffRange {
    pub fn contains(&self, price: i64) -> bool {
        (self.min..=self.max).contains(&price)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TariffSuggestion {
    pub suggested_tariff: i64,
    pub breakdown: TariffBreakdown,
    pub range: TariffRange,
}

/// `round((base + per_km·d + per_min·t) × demand / max(1, occupancy))`.
pub fn suggest(rates: &TariffRates, input: TariffInput) -> DomainResult<TariffSuggestion> {
    if !input.distance_km.is_finite()
        || !input.duration_minutes.is_finite()
        || input.distance_km < 0.0
        || input.duration_minutes < 0.0
    {
        return Err(DomainError::validation("TARIFF_INVALID_INPUT"));
    }
    let demand = input.demand_factor.unwrap_or(1.0);
    if !demand.is_finite() || demand < 1.0 {
        return Err(DomainError::validation("TARIFF_INVALID_INPUT"));
    }
    let occupancy = match input.occupancy {
        Some(0) => return Err(DomainError::validation("TARIFF_INVALID_INPUT")),
        Some(n) => n.max(1) as f64,
        None => 1.0,
    };

    let distance_raw = rates.per_km * input.distance_km;
    let duration_raw = rates.per_minute * input.duration_minutes;
    let suggested =
        ((rates.base_boarding as f64 + distance_raw + duration_raw) * demand / occupancy).round()
            as i64;

    let tolerance = rates.tolerance_pct.max(0.0);
    Ok(TariffSuggestion {
        suggested_tariff: suggested,
        breakdown: TariffBreakdown {
            base_boarding: rates.base_boarding,
            distance_component: distance_raw.round() as i64,
            duration_component: duration_raw.round() as i64,
        },
        range: TariffRange {
            min: (suggested as f64 * (1.0 - tolerance)).round() as i64,
            max: (suggested as f64 * (1.0 + tolerance)).round() as i64,
        },
    })
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> TariffRates {
        TariffRates::default()
    }

    #[test]
    fn base_case_sums_components() {
        let s = suggest(
            &rates(),
            TariffInput {
                distance_km: 10.0,
                duration_minutes: 30.0,
                demand_factor: None,
                occupancy: None,
            },
        )
        .unwrap();

        // 1500 + 3500 + 2400
        assert_eq!(s.suggested_tariff, 7400);
        assert_eq!(s.breakdown.base_boarding, 1500);
        assert_eq!(s.breakdown.distance_component, 3500);
        assert_eq!(s.breakdown.duration_component, 2400);
        assert_eq!(s.range, TariffRange { min: 5550, max: 9250 });
        assert!(s.range.contains(s.suggested_tariff));
    }

    #[test]
    fn demand_factor_scales_and_occupancy_divides() {
        let s = suggest(
            &rates(),
            TariffInput {
                distance_km: 10.0,
                duration_minutes: 30.0,
                demand_factor: Some(1.5),
                occupancy: Some(2),
            },
        )
        .unwrap();
        // 7400 * 1.5 / 2 = 5550
        assert_eq!(s.suggested_tariff, 5550);
    }

    #[test]
    fn zero_trip_is_just_the_boarding_fee() {
        let s = suggest(
            &rates(),
            TariffInput {
                distance_km: 0.0,
                duration_minutes: 0.0,
                demand_factor: None,
                occupancy: None,
            },
        )
        .unwrap();
        assert_eq!(s.suggested_tariff, 1500);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let bad = [
            TariffInput {
                distance_km: -1.0,
                duration_minutes: 10.0,
                demand_factor: None,
                occupancy: None,
            },
            TariffInput {
                distance_km: 1.0,
                duration_minutes: -0.1,
                demand_factor: None,
                occupancy: None,
            },
            TariffInput {
                distance_km: 1.0,
                duration_minutes: 1.0,
                demand_factor: Some(0.5),
                occupancy: None,
            },
            TariffInput {
                distance_km: 1.0,
                duration_minutes: 1.0,
                demand_factor: None,
                occupancy: Some(0),
            },
            TariffInput {
                distance_km: f64::NAN,
                duration_minutes: 1.0,
                demand_factor: None,
                occupancy: None,
            },
        ];
        for input in bad {
            let err = suggest(&rates(), input).unwrap_err();
            assert_eq!(err.code(), "TARIFF_INVALID_INPUT");
        }
    }
}
