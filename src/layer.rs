use chrono::NaiveDate;

use crate::error::{TowerError, TowerResult};
use crate::persist::{BasisTag, PersistedLayer};

/// How a layer's charged premium relates to its annual reference premium.
/// Each basis carries only the override it needs; a declared override whose
/// value has not been supplied yet is a valid indeterminate state
/// (`Minimum { minimum_premium: None }`) and yields a null actual premium
/// until the value arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PremiumBasis {
    /// Full annual premium charged regardless of term length.
    Annual,
    /// Day-count proration of the annual premium.
    ProRata,
    /// Pro-rata, floored at a contractually guaranteed minimum.
    Minimum { minimum_premium: Option<u64> },
    /// Negotiated fixed charge unrelated to term length.
    Flat { flat_premium: Option<u64> },
}

impl PremiumBasis {
    pub fn tag(&self) -> BasisTag {
        match self {
            PremiumBasis::Annual => BasisTag::Annual,
            PremiumBasis::ProRata => BasisTag::ProRata,
            PremiumBasis::Minimum { .. } => BasisTag::Minimum,
            PremiumBasis::Flat { .. } => BasisTag::Flat,
        }
    }

    /// Fold the loose persisted fields (basis tag + sibling override columns)
    /// into the variant. A missing tag defaults to `Annual`.
    pub fn from_persisted(
        tag: Option<BasisTag>,
        minimum_premium: Option<u64>,
        flat_premium: Option<u64>,
    ) -> Self {
        match tag {
            None | Some(BasisTag::Annual) => PremiumBasis::Annual,
            Some(BasisTag::ProRata) => PremiumBasis::ProRata,
            Some(BasisTag::Minimum) => PremiumBasis::Minimum { minimum_premium },
            Some(BasisTag::Flat) => PremiumBasis::Flat { flat_premium },
        }
    }

    /// The minimum-premium override, when this basis carries one.
    pub fn minimum_premium(&self) -> Option<u64> {
        match self {
            PremiumBasis::Minimum { minimum_premium } => *minimum_premium,
            _ => None,
        }
    }

    /// The flat-premium override, when this basis carries one.
    pub fn flat_premium(&self) -> Option<u64> {
        match self {
            PremiumBasis::Flat { flat_premium } => *flat_premium,
            _ => None,
        }
    }
}

/// One carrier's participation in the program.
/// All monetary fields are in minor currency units (cents).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub carrier: String,
    /// Capacity of this layer. Always > 0 after normalization.
    pub limit: u64,
    /// Point at which this layer's capacity begins to respond. Derived by
    /// the attachment resolver and persisted as a cache — never hand-edited.
    pub attachment: u64,
    /// Deductible. Meaningful only for the first layer of a primary tower.
    pub retention: Option<u64>,
    /// Combined capacity of the quota-share block this layer co-participates
    /// in. Present on every member of the block; absent on stacking layers.
    pub quota_share: Option<u64>,
    /// Reference premium for a full 12-month term at this limit.
    pub annual_premium: Option<u64>,
    /// Premium owed for the layer's real term window. Derived by the premium
    /// allocator — the single source of truth for this field.
    pub actual_premium: Option<u64>,
    pub basis: PremiumBasis,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
}

/// Canonicalize raw persisted layers into the model the engine computes on.
///
/// Older records carry a single `premium` field; it migrates into the dual
/// annual/actual model (`annual = actual = premium`, basis `Annual`). A
/// missing limit is an error surfaced to the caller, never defaulted. Pure
/// and idempotent: normalizing an already-normalized tower changes nothing.
pub fn normalize(raw: &[PersistedLayer]) -> TowerResult<Vec<Layer>> {
    raw.iter()
        .enumerate()
        .map(|(index, r)| {
            let limit = r.limit.ok_or(TowerError::MissingLimit { index })?;
            if limit == 0 {
                log::warn!("layer {index} ({}): rejected non-positive limit", r.carrier);
                return Err(TowerError::NonPositiveLimit { index });
            }

            let (annual_premium, actual_premium) =
                match (r.annual_premium, r.actual_premium, r.premium) {
                    (None, None, Some(p)) => {
                        log::debug!(
                            "layer {index} ({}): migrated legacy premium {p} to annual/actual",
                            r.carrier
                        );
                        (Some(p), Some(p))
                    }
                    (annual, actual, _) => (annual, actual),
                };

            Ok(Layer {
                carrier: r.carrier.clone(),
                limit,
                attachment: r.attachment.unwrap_or(0),
                retention: r.retention,
                quota_share: r.quota_share,
                annual_premium,
                actual_premium,
                basis: PremiumBasis::from_persisted(
                    r.premium_basis,
                    r.minimum_premium,
                    r.flat_premium,
                ),
                term_start: r.term_start,
                term_end: r.term_end,
            })
        })
        .collect()
}
