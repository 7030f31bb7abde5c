use crate::layer::{Layer, PremiumBasis};
use crate::term::{DAYS_PER_YEAR, TermWindow};

/// The pro-rata value of an annual premium over a window: day-count
/// fraction of a 365-day year, rounded half-up to the nearest currency
/// unit. Always derivable on demand regardless of the stored basis —
/// callers use it for display and comparison even when the basis is an
/// override. Inverted windows clamp to zero days.
pub fn theoretical_pro_rata(annual_premium: Option<u64>, window: TermWindow) -> Option<u64> {
    let annual = annual_premium?;
    let days = window.days().max(0);
    Some((annual as f64 * days as f64 / DAYS_PER_YEAR).round() as u64)
}

/// The premium actually owed for a layer's resolved window under its
/// current basis. The single source of truth for `actual_premium` — no
/// other component writes that field.
///
/// A null annual premium yields null under every basis except `Flat`,
/// which depends only on its own override. A declared override whose
/// value is missing (`Minimum`/`Flat` with `None`) is indeterminate, not
/// an error: the result stays null until the value is supplied.
pub fn actual_premium(layer: &Layer, window: TermWindow) -> Option<u64> {
    match layer.basis {
        PremiumBasis::Annual => layer.annual_premium,
        PremiumBasis::ProRata => theoretical_pro_rata(layer.annual_premium, window),
        PremiumBasis::Minimum { minimum_premium } => {
            let pro_rata = theoretical_pro_rata(layer.annual_premium, window)?;
            let Some(floor) = minimum_premium else {
                log::debug!(
                    "layer ({}): minimum basis with no floor set, actual premium indeterminate",
                    layer.carrier
                );
                return None;
            };
            Some(pro_rata.max(floor))
        }
        PremiumBasis::Flat { flat_premium } => {
            if flat_premium.is_none() {
                log::debug!(
                    "layer ({}): flat basis with no amount set, actual premium indeterminate",
                    layer.carrier
                );
            }
            flat_premium
        }
    }
}
