use chrono::NaiveDate;

use crate::attachment;
use crate::error::{TowerError, TowerResult};
use crate::grouping::{self, DateConfig, DateGroup};
use crate::layer::{self, Layer, PremiumBasis};
use crate::metrics;
use crate::persist::{self, PersistedLayer};
use crate::premium;
use crate::term::{self, TermWindow};

/// Whether the tower sits directly above the insured's retention or
/// excess of underlying programs. Only a primary tower's first layer
/// carries a meaningful retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Primary,
    Excess,
}

/// Caller-supplied fields for a new layer. Attachment and actual premium
/// are never accepted from the caller; both are derived on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDraft {
    pub carrier: String,
    pub limit: u64,
    pub retention: Option<u64>,
    pub quota_share: Option<u64>,
    pub annual_premium: Option<u64>,
    pub basis: PremiumBasis,
    pub term_start: Option<NaiveDate>,
    pub term_end: Option<NaiveDate>,
}

/// A fully-derived read model of one layer: everything the stored record
/// holds plus the computed figures a pricing screen shows alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerView {
    pub carrier: String,
    pub limit: u64,
    pub attachment: u64,
    /// Populated only where a retention is meaningful; suppressed on
    /// excess towers and on every layer above the first.
    pub retention: Option<u64>,
    pub quota_share: Option<u64>,
    pub annual_premium: Option<u64>,
    pub actual_premium: Option<u64>,
    pub theoretical_pro_rata: Option<u64>,
    pub basis: PremiumBasis,
    pub term: TermWindow,
    pub short_term: bool,
    pub rpm: Option<f64>,
    pub ilf: Option<u32>,
}

/// A structural inconsistency found by [`Tower::validate`]. Violations are
/// diagnostics over possibly hand-edited stored data, not hard errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TowerViolation {
    #[error("layer {index}: cached attachment {cached} differs from derived {computed}")]
    AttachmentCacheDrift { index: usize, cached: u64, computed: u64 },
    #[error(
        "quota-share group at attachment {attachment}: declared capacity {declared} \
         but member limits total {members_total}"
    )]
    QuotaShareCapacityMismatch { attachment: u64, declared: u64, members_total: u64 },
    #[error("layer {index}: retention declared outside the first layer of a primary tower")]
    MisplacedRetention { index: usize },
    #[error("layer {index}: basis declares an override but carries no value")]
    MissingBasisPayload { index: usize },
    #[error("layer {index}: stored actual premium {stored:?} differs from derived {derived:?}")]
    ActualPremiumDrift { index: usize, stored: Option<u64>, derived: Option<u64> },
}

/// An insurance program tower: an ordered stack of layers under one
/// structure-level term. All derived fields (attachments, actual
/// premiums) are recomputed after every edit, so the stored layers are
/// always internally consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct Tower {
    layers: Vec<Layer>,
    term: TermWindow,
    date_config: Option<DateConfig>,
    position: Position,
}

impl Tower {
    pub fn new(term: TermWindow, position: Position) -> Self {
        Tower { layers: Vec::new(), term, date_config: None, position }
    }

    /// Build a tower from stored records: order check, normalization,
    /// then a full recompute of attachments and premiums. Stored records
    /// must arrive ascending by cached attachment; everything else about
    /// them may be stale and is re-derived.
    pub fn load(
        raw: &[PersistedLayer],
        term: TermWindow,
        date_config: Option<DateConfig>,
        position: Position,
    ) -> TowerResult<Self> {
        check_stored_order(raw)?;
        let mut tower = Tower { layers: layer::normalize(raw)?, term, date_config, position };
        tower.recompute()?;
        Ok(tower)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn term(&self) -> TermWindow {
        self.term
    }

    pub fn position(&self) -> Position {
        self.position
    }

    // ── edits ─────────────────────────────────────────────────────────────────

    /// Insert a layer at `index`, shifting everything above it up.
    pub fn insert_layer(&mut self, index: usize, draft: LayerDraft) -> TowerResult<()> {
        if index > self.layers.len() {
            return Err(TowerError::LayerIndexOutOfBounds { index, len: self.layers.len() });
        }
        if draft.limit == 0 {
            log::warn!("layer {index} ({}): rejected non-positive limit", draft.carrier);
            return Err(TowerError::NonPositiveLimit { index });
        }
        self.layers.insert(
            index,
            Layer {
                carrier: draft.carrier,
                limit: draft.limit,
                attachment: 0,
                retention: draft.retention,
                quota_share: draft.quota_share,
                annual_premium: draft.annual_premium,
                actual_premium: None,
                basis: draft.basis,
                term_start: draft.term_start,
                term_end: draft.term_end,
            },
        );
        self.recompute()
    }

    /// Remove and return the layer at `index`; the layers above close the
    /// gap and re-attach lower.
    pub fn remove_layer(&mut self, index: usize) -> TowerResult<Layer> {
        self.check_index(index)?;
        let removed = self.layers.remove(index);
        self.recompute()?;
        Ok(removed)
    }

    pub fn set_limit(&mut self, index: usize, limit: u64) -> TowerResult<()> {
        self.check_index(index)?;
        if limit == 0 {
            log::warn!(
                "layer {index} ({}): rejected non-positive limit",
                self.layers[index].carrier
            );
            return Err(TowerError::NonPositiveLimit { index });
        }
        self.layers[index].limit = limit;
        self.recompute()
    }

    pub fn set_quota_share(&mut self, index: usize, quota_share: Option<u64>) -> TowerResult<()> {
        self.check_index(index)?;
        self.layers[index].quota_share = quota_share;
        self.recompute()
    }

    /// Update the annual reference premium. The basis is sticky: the
    /// charged premium is re-derived under whatever basis the layer
    /// already has.
    pub fn set_annual_premium(&mut self, index: usize, annual: Option<u64>) -> TowerResult<()> {
        self.check_index(index)?;
        self.layers[index].annual_premium = annual;
        self.reallocate_layer(index);
        Ok(())
    }

    pub fn set_basis(&mut self, index: usize, basis: PremiumBasis) -> TowerResult<()> {
        self.check_index(index)?;
        self.layers[index].basis = basis;
        self.reallocate_layer(index);
        Ok(())
    }

    /// Override one layer's effective window. `None` components fall back
    /// to the structure term.
    pub fn set_term_override(
        &mut self,
        index: usize,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> TowerResult<()> {
        self.check_index(index)?;
        self.layers[index].term_start = start;
        self.layers[index].term_end = end;
        self.reallocate_layer(index);
        Ok(())
    }

    /// Move the structure-level term. Every layer without a full override
    /// inherits some part of it, so all premiums are re-derived.
    pub fn set_term(&mut self, term: TermWindow) {
        self.term = term;
        for index in 0..self.layers.len() {
            self.reallocate_layer(index);
        }
    }

    pub fn set_date_config(&mut self, config: Option<DateConfig>) {
        self.date_config = config;
    }

    // ── derived views ─────────────────────────────────────────────────────────

    /// The full read model, one view per layer.
    pub fn computed(&self) -> Vec<LayerView> {
        self.layers
            .iter()
            .enumerate()
            .map(|(index, l)| {
                let window = term::resolve_term(l, self.term);
                let retention_applies = index == 0 && self.position == Position::Primary;
                LayerView {
                    carrier: l.carrier.clone(),
                    limit: l.limit,
                    attachment: l.attachment,
                    retention: if retention_applies { l.retention } else { None },
                    quota_share: l.quota_share,
                    annual_premium: l.annual_premium,
                    actual_premium: l.actual_premium,
                    theoretical_pro_rata: premium::theoretical_pro_rata(l.annual_premium, window),
                    basis: l.basis,
                    term: window,
                    short_term: window.is_short(),
                    rpm: metrics::rpm(l),
                    ilf: metrics::ilf(&self.layers, index),
                }
            })
            .collect()
    }

    /// Contiguous runs of layers sharing an effective start date. The
    /// structure inception is the fallback for unconfigured attachments.
    pub fn date_groups(&self) -> Vec<DateGroup> {
        grouping::group_by_effective_date(&self.layers, self.date_config.as_ref(), self.term.start)
    }

    /// The storage shape of the current tower, legacy mirror included.
    pub fn serialize(&self) -> Vec<PersistedLayer> {
        persist::serialize(&self.layers)
    }

    /// Index of the first layer written by the named carrier.
    pub fn layer_for_carrier(&self, carrier: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.carrier == carrier)
    }

    // ── totals ────────────────────────────────────────────────────────────────

    /// Vertical height of the tower: the point where the top layer's
    /// capacity is exhausted. Quota-share capacity counts once per group.
    pub fn total_limit(&self) -> u64 {
        self.layers
            .last()
            .map(|l| l.attachment + l.quota_share.unwrap_or(l.limit))
            .unwrap_or(0)
    }

    /// Sum of annual premiums across priced layers; null when nothing in
    /// the tower is priced yet.
    pub fn total_annual_premium(&self) -> Option<u64> {
        sum_priced(self.layers.iter().map(|l| l.annual_premium))
    }

    /// Sum of charged premiums across priced layers; null when nothing in
    /// the tower is priced yet.
    pub fn total_actual_premium(&self) -> Option<u64> {
        sum_priced(self.layers.iter().map(|l| l.actual_premium))
    }

    /// Whole-program rate per million: total annual premium against total
    /// vertical limit.
    pub fn blended_rpm(&self) -> Option<f64> {
        let total = self.total_annual_premium()?;
        let height = self.total_limit();
        if height == 0 {
            return None;
        }
        Some(total as f64 / (height as f64 / 1_000_000.0))
    }

    // ── validation ────────────────────────────────────────────────────────────

    /// Sweep the stored layers for inconsistencies an editor or an older
    /// writer may have left behind. Returns every violation found rather
    /// than stopping at the first.
    pub fn validate(&self) -> Vec<TowerViolation> {
        let mut violations = Vec::new();

        if let Ok(derived) = attachment::recalculate(&self.layers) {
            for (index, (stored, fresh)) in self.layers.iter().zip(&derived).enumerate() {
                if stored.attachment != fresh.attachment {
                    violations.push(TowerViolation::AttachmentCacheDrift {
                        index,
                        cached: stored.attachment,
                        computed: fresh.attachment,
                    });
                }
            }
        }

        self.check_quota_share_groups(&mut violations);

        for (index, l) in self.layers.iter().enumerate() {
            let retention_allowed = index == 0 && self.position == Position::Primary;
            if l.retention.is_some() && !retention_allowed {
                violations.push(TowerViolation::MisplacedRetention { index });
            }

            match l.basis {
                PremiumBasis::Minimum { minimum_premium: None }
                | PremiumBasis::Flat { flat_premium: None } => {
                    violations.push(TowerViolation::MissingBasisPayload { index });
                }
                _ => {}
            }

            let derived = premium::actual_premium(l, term::resolve_term(l, self.term));
            if l.actual_premium != derived {
                violations.push(TowerViolation::ActualPremiumDrift {
                    index,
                    stored: l.actual_premium,
                    derived,
                });
            }
        }

        violations
    }

    fn check_quota_share_groups(&self, violations: &mut Vec<TowerViolation>) {
        let mut i = 0;
        while i < self.layers.len() {
            let Some(declared) = self.layers[i].quota_share else {
                i += 1;
                continue;
            };
            let attachment = self.layers[i].attachment;
            let mut members_total = 0u64;
            while i < self.layers.len() && self.layers[i].quota_share == Some(declared) {
                members_total += self.layers[i].limit;
                i += 1;
            }
            if members_total != declared {
                violations.push(TowerViolation::QuotaShareCapacityMismatch {
                    attachment,
                    declared,
                    members_total,
                });
            }
        }
    }

    // ── internals ─────────────────────────────────────────────────────────────

    fn check_index(&self, index: usize) -> TowerResult<()> {
        if index >= self.layers.len() {
            return Err(TowerError::LayerIndexOutOfBounds { index, len: self.layers.len() });
        }
        Ok(())
    }

    /// Re-derive every attachment, then every charged premium.
    fn recompute(&mut self) -> TowerResult<()> {
        self.layers = attachment::recalculate(&self.layers)?;
        for index in 0..self.layers.len() {
            self.reallocate_layer(index);
        }
        Ok(())
    }

    fn reallocate_layer(&mut self, index: usize) {
        let window = term::resolve_term(&self.layers[index], self.term);
        let actual = premium::actual_premium(&self.layers[index], window);
        self.layers[index].actual_premium = actual;
    }
}

/// Stored records must arrive ascending by their cached attachment.
/// Records that have never been through the resolver carry no cache and
/// are skipped; a genuine inversion means the rows were reordered outside
/// the engine and re-deriving would silently re-price the program.
fn check_stored_order(raw: &[PersistedLayer]) -> TowerResult<()> {
    let mut prev: Option<u64> = None;
    for (index, r) in raw.iter().enumerate() {
        let Some(cached) = r.attachment else { continue };
        if let Some(p) = prev {
            if cached < p {
                log::warn!(
                    "layer {index} ({}): cached attachment {cached} below predecessor {p}",
                    r.carrier
                );
                return Err(TowerError::NonAscendingAttachment { index, prev: p, found: cached });
            }
        }
        prev = Some(cached);
    }
    Ok(())
}

fn sum_priced(values: impl Iterator<Item = Option<u64>>) -> Option<u64> {
    let mut total = 0u64;
    let mut any = false;
    for v in values.flatten() {
        total += v;
        any = true;
    }
    any.then_some(total)
}
