use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::layer::Layer;

/// Persisted premium-basis tag. Kept separate from the computed
/// `PremiumBasis` variant so the stored shape stays a flat record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasisTag {
    Annual,
    ProRata,
    Minimum,
    Flat,
}

/// The storage shape of a layer — also the raw input the normalizer
/// consumes. Every field except `carrier` is optional: records written
/// before the dual-premium model carry only the legacy `premium` field,
/// and partially entered layers are legitimate.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedLayer {
    pub carrier: String,
    pub limit: Option<u64>,
    pub attachment: Option<u64>,
    pub retention: Option<u64>,
    pub quota_share: Option<u64>,
    /// Legacy single-premium field. Mirrored from `actual_premium` on every
    /// write so old readers keep working; never read back as authoritative
    /// once the dual fields are present.
    pub premium: Option<u64>,
    pub annual_premium: Option<u64>,
    pub actual_premium: Option<u64>,
    pub premium_basis: Option<BasisTag>,
    pub minimum_premium: Option<u64>,
    pub flat_premium: Option<u64>,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
}

/// Convert a computed tower back into the persisted shape, writing the
/// derived attachment, both premium fields, and the legacy mirror.
pub fn serialize(layers: &[Layer]) -> Vec<PersistedLayer> {
    layers
        .iter()
        .map(|l| PersistedLayer {
            carrier: l.carrier.clone(),
            limit: Some(l.limit),
            attachment: Some(l.attachment),
            retention: l.retention,
            quota_share: l.quota_share,
            premium: l.actual_premium,
            annual_premium: l.annual_premium,
            actual_premium: l.actual_premium,
            premium_basis: Some(l.basis.tag()),
            minimum_premium: l.basis.minimum_premium(),
            flat_premium: l.basis.flat_premium(),
            term_start: l.term_start,
            term_end: l.term_end,
        })
        .collect()
}
