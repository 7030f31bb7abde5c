use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::layer::Layer;

/// Reference year length for proration. Annual premiums are quoted against
/// a 365-day year regardless of leap days.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// A resolved window covering at least this fraction of a year counts as
/// full-term. The tolerance absorbs calendar rounding (364 vs 365 days)
/// without classifying it as a short placement.
pub const FULL_TERM_FRACTION: f64 = 0.96;

/// An effective date window. `start` and `end` are policy inception and
/// expiration; the day count excludes the expiration day so that a
/// Jan 1 → Jan 1 annual term is exactly 365 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TermWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        TermWindow { start, end }
    }

    /// Calendar days covered by this window. Negative when `end` precedes
    /// `start` (malformed override — downstream proration clamps at zero).
    pub fn days(&self) -> i64 {
        days_between(self.start, self.end)
    }

    /// Fraction of a 365-day year this window covers.
    pub fn year_fraction(&self) -> f64 {
        self.days() as f64 / DAYS_PER_YEAR
    }

    /// True when the window is short enough to be pro-rateable.
    pub fn is_short(&self) -> bool {
        self.year_fraction() < FULL_TERM_FRACTION
    }
}

/// The single day-count authority. Every proration in the engine goes
/// through this function so day-count conventions cannot diverge between
/// components.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days()
}

/// Resolve a layer's effective window: layer override first, then the
/// structure-level term. The structure term handed in already reflects the
/// structure → submission inheritance owned by the quote collaborator.
/// Overriding only the start date is the common real case — a mid-term
/// excess placement joining an in-force program inherits its expiration.
pub fn resolve_term(layer: &Layer, structure_term: TermWindow) -> TermWindow {
    TermWindow {
        start: layer.term_start.unwrap_or(structure_term.start),
        end: layer.term_end.unwrap_or(structure_term.end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::PremiumBasis;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bare_layer() -> Layer {
        Layer {
            carrier: "Acme Specialty".to_string(),
            limit: 1_000_000,
            attachment: 0,
            retention: None,
            quota_share: None,
            annual_premium: None,
            actual_premium: None,
            basis: PremiumBasis::Annual,
            term_start: None,
            term_end: None,
        }
    }

    // ── days_between ──────────────────────────────────────────────────────────

    #[test]
    fn annual_term_is_365_days() {
        assert_eq!(days_between(date(2023, 1, 1), date(2024, 1, 1)), 365);
    }

    #[test]
    fn leap_year_term_is_366_days() {
        assert_eq!(days_between(date(2024, 1, 1), date(2025, 1, 1)), 366);
    }

    #[test]
    fn half_year_is_182_days() {
        assert_eq!(days_between(date(2024, 1, 1), date(2024, 7, 1)), 182);
    }

    #[test]
    fn inverted_window_is_negative() {
        assert_eq!(days_between(date(2024, 7, 1), date(2024, 1, 1)), -182);
    }

    // ── is_short ──────────────────────────────────────────────────────────────

    #[test]
    fn full_year_is_not_short() {
        let w = TermWindow::new(date(2023, 1, 1), date(2024, 1, 1));
        assert!(!w.is_short());
    }

    #[test]
    fn rounding_day_364_is_not_short() {
        // 364/365 = 0.997 — within the full-term tolerance.
        let w = TermWindow::new(date(2023, 1, 1), date(2023, 12, 31));
        assert_eq!(w.days(), 364);
        assert!(!w.is_short());
    }

    #[test]
    fn half_year_is_short() {
        let w = TermWindow::new(date(2024, 1, 1), date(2024, 7, 1));
        assert!(w.is_short(), "182-day window must be pro-rateable");
    }

    #[test]
    fn eleven_months_is_short() {
        // 334/365 = 0.915 < 0.96.
        let w = TermWindow::new(date(2023, 2, 1), date(2024, 1, 1));
        assert!(w.is_short());
    }

    // ── resolve_term ──────────────────────────────────────────────────────────

    #[test]
    fn no_override_inherits_structure_term() {
        let structure = TermWindow::new(date(2023, 1, 1), date(2024, 1, 1));
        let resolved = resolve_term(&bare_layer(), structure);
        assert_eq!(resolved, structure);
    }

    #[test]
    fn start_override_keeps_structure_expiration() {
        let structure = TermWindow::new(date(2023, 1, 1), date(2024, 1, 1));
        let mut layer = bare_layer();
        layer.term_start = Some(date(2023, 7, 1));
        let resolved = resolve_term(&layer, structure);
        assert_eq!(resolved.start, date(2023, 7, 1));
        assert_eq!(resolved.end, date(2024, 1, 1), "expiration must come from the structure");
        assert!(resolved.is_short());
    }

    #[test]
    fn full_override_ignores_structure_entirely() {
        let structure = TermWindow::new(date(2023, 1, 1), date(2024, 1, 1));
        let mut layer = bare_layer();
        layer.term_start = Some(date(2023, 4, 1));
        layer.term_end = Some(date(2023, 10, 1));
        let resolved = resolve_term(&layer, structure);
        assert_eq!(resolved, TermWindow::new(date(2023, 4, 1), date(2023, 10, 1)));
    }
}
