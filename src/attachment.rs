use crate::error::{TowerError, TowerResult};
use crate::layer::Layer;

/// Compute the attachment point for every layer with a single running
/// cumulative floor, in stored (ascending) order.
///
/// A stacking layer sits at the current floor and advances it by its own
/// limit. Quota-share co-participants — contiguous layers declaring the
/// same combined capacity — all sit at the current floor, which advances
/// once, by the declared combined capacity, after the last member.
fn floors(layers: &[Layer]) -> TowerResult<Vec<u64>> {
    for (index, l) in layers.iter().enumerate() {
        if l.limit == 0 {
            log::warn!("layer {index} ({}): rejected non-positive limit", l.carrier);
            return Err(TowerError::NonPositiveLimit { index });
        }
    }

    let mut result = Vec::with_capacity(layers.len());
    let mut floor: u64 = 0;
    let mut i = 0;
    while i < layers.len() {
        match layers[i].quota_share {
            None => {
                result.push(floor);
                floor += layers[i].limit;
                i += 1;
            }
            Some(group_capacity) => {
                while i < layers.len() && layers[i].quota_share == Some(group_capacity) {
                    result.push(floor);
                    i += 1;
                }
                floor += group_capacity;
            }
        }
    }
    Ok(result)
}

/// Attachment point of the layer at `index`, derived from scratch.
pub fn attachment_of(layers: &[Layer], index: usize) -> TowerResult<u64> {
    if index >= layers.len() {
        return Err(TowerError::LayerIndexOutOfBounds { index, len: layers.len() });
    }
    Ok(floors(layers)?[index])
}

/// Re-derive every layer's cached attachment, returning a new tower value.
/// Called after insert, delete, limit change, or group-membership change.
/// Never reorders — the caller keeps layers ascending by intended
/// attachment. Rejects rather than returning a partial result.
pub fn recalculate(layers: &[Layer]) -> TowerResult<Vec<Layer>> {
    let floors = floors(layers)?;
    let mut out = layers.to_vec();
    for (layer, floor) in out.iter_mut().zip(floors) {
        layer.attachment = floor;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::layer::PremiumBasis;

    fn layer(limit: u64, quota_share: Option<u64>) -> Layer {
        Layer {
            carrier: "Acme Specialty".to_string(),
            limit,
            attachment: 0,
            retention: None,
            quota_share,
            annual_premium: None,
            actual_premium: None,
            basis: PremiumBasis::Annual,
            term_start: None,
            term_end: None,
        }
    }

    fn attachments(layers: &[Layer]) -> Vec<u64> {
        recalculate(layers).unwrap().iter().map(|l| l.attachment).collect()
    }

    // ── stacking ──────────────────────────────────────────────────────────────

    #[test]
    fn first_layer_attaches_at_zero() {
        assert_eq!(attachments(&[layer(1_000_000, None)]), vec![0]);
    }

    #[test]
    fn stacking_layers_accumulate_limits() {
        let tower = [
            layer(1_000_000, None),
            layer(4_000_000, None),
            layer(10_000_000, None),
        ];
        assert_eq!(attachments(&tower), vec![0, 1_000_000, 5_000_000]);
    }

    // ── quota share ───────────────────────────────────────────────────────────

    #[test]
    fn quota_share_members_share_one_attachment() {
        let tower = [
            layer(1_000_000, None),
            layer(5_000_000, Some(5_000_000)),
            layer(5_000_000, Some(5_000_000)),
        ];
        assert_eq!(attachments(&tower), vec![0, 1_000_000, 1_000_000]);
    }

    #[test]
    fn quota_share_capacity_counted_once_not_per_member() {
        // Two 5M participants splitting a 5M block above a 1M primary:
        // the next layer up attaches at 6M, not 11M.
        let tower = [
            layer(1_000_000, None),
            layer(5_000_000, Some(5_000_000)),
            layer(5_000_000, Some(5_000_000)),
            layer(10_000_000, None),
        ];
        assert_eq!(attachments(&tower), vec![0, 1_000_000, 1_000_000, 6_000_000]);
    }

    #[test]
    fn distinct_capacities_form_distinct_groups() {
        let tower = [
            layer(2_000_000, Some(4_000_000)),
            layer(2_000_000, Some(4_000_000)),
            layer(3_000_000, Some(6_000_000)),
            layer(3_000_000, Some(6_000_000)),
        ];
        assert_eq!(attachments(&tower), vec![0, 0, 4_000_000, 4_000_000]);
    }

    #[test]
    fn quota_share_group_at_the_top_of_the_tower() {
        let tower = [
            layer(1_000_000, None),
            layer(2_500_000, Some(5_000_000)),
            layer(2_500_000, Some(5_000_000)),
        ];
        assert_eq!(attachments(&tower), vec![0, 1_000_000, 1_000_000]);
    }

    // ── attachment_of ─────────────────────────────────────────────────────────

    #[test]
    fn attachment_of_matches_recalculate() {
        let tower = [
            layer(1_000_000, None),
            layer(5_000_000, Some(5_000_000)),
            layer(5_000_000, Some(5_000_000)),
            layer(10_000_000, None),
        ];
        let recalculated = recalculate(&tower).unwrap();
        for i in 0..tower.len() {
            assert_eq!(attachment_of(&tower, i).unwrap(), recalculated[i].attachment);
        }
    }

    #[test]
    fn attachment_of_out_of_bounds() {
        let tower = [layer(1_000_000, None)];
        assert_eq!(
            attachment_of(&tower, 3),
            Err(TowerError::LayerIndexOutOfBounds { index: 3, len: 1 })
        );
    }

    // ── rejection ─────────────────────────────────────────────────────────────

    #[test]
    fn zero_limit_rejects_whole_tower() {
        let tower = [layer(1_000_000, None), layer(0, None)];
        assert_eq!(recalculate(&tower), Err(TowerError::NonPositiveLimit { index: 1 }));
    }

    #[test]
    fn recalculate_does_not_mutate_input() {
        let tower = vec![layer(1_000_000, None), layer(4_000_000, None)];
        let before = tower.clone();
        let _ = recalculate(&tower).unwrap();
        assert_eq!(tower, before);
    }

    // ── properties ────────────────────────────────────────────────────────────

    fn stacking_tower() -> impl Strategy<Value = Vec<Layer>> {
        proptest::collection::vec(1u64..=50_000_000, 1..12)
            .prop_map(|limits| limits.into_iter().map(|l| layer(l, None)).collect())
    }

    fn mixed_tower() -> impl Strategy<Value = Vec<Layer>> {
        // Each entry is (limit, member_count): member_count == 1 is a
        // stacking layer; > 1 is a quota-share group of that many members
        // splitting `limit` as combined capacity.
        proptest::collection::vec((1u64..=50_000_000, 1usize..=3), 1..8).prop_map(|entries| {
            entries
                .into_iter()
                .flat_map(|(limit, members)| {
                    let quota_share = (members > 1).then_some(limit);
                    let member_limit = (limit / members as u64).max(1);
                    std::iter::repeat_with(move || layer(member_limit, quota_share))
                        .take(members)
                })
                .collect()
        })
    }

    proptest! {
        /// attachment[i] equals the sum of limits strictly below — the §3
        /// invariant, exact for towers without quota share.
        #[test]
        fn attachment_equals_sum_of_lower_limits(tower in stacking_tower()) {
            let resolved = recalculate(&tower).unwrap();
            for (i, l) in resolved.iter().enumerate() {
                let below: u64 = resolved
                    .iter()
                    .filter(|other| other.attachment < l.attachment)
                    .map(|other| other.limit)
                    .sum();
                prop_assert_eq!(l.attachment, below);
            }
            // Strictly ascending with no quota share present.
            for pair in resolved.windows(2) {
                prop_assert!(pair[0].attachment < pair[1].attachment);
            }
        }

        /// Recalculating twice is bit-identical to recalculating once.
        #[test]
        fn recalculate_is_idempotent(tower in mixed_tower()) {
            let once = recalculate(&tower).unwrap();
            let twice = recalculate(&once).unwrap();
            prop_assert_eq!(once, twice);
        }

        /// Quota-share siblings always share identical attachment values.
        #[test]
        fn quota_share_siblings_share_attachment(tower in mixed_tower()) {
            let resolved = recalculate(&tower).unwrap();
            for pair in resolved.windows(2) {
                if pair[0].quota_share.is_some() && pair[0].quota_share == pair[1].quota_share {
                    prop_assert_eq!(pair[0].attachment, pair[1].attachment);
                }
            }
        }

        /// Attachments never descend, with or without quota share.
        #[test]
        fn attachments_never_descend(tower in mixed_tower()) {
            let resolved = recalculate(&tower).unwrap();
            for pair in resolved.windows(2) {
                prop_assert!(pair[0].attachment <= pair[1].attachment);
            }
        }
    }
}
