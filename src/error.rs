use thiserror::Error;

/// Structural errors reject the whole operation synchronously — the engine
/// never repairs a malformed tower. Indeterminate values (unpriced layers,
/// undetermined dates, missing basis overrides) are not errors; they travel
/// as `None` through every dependent computation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TowerError {
    #[error("layer {index}: limit must be positive")]
    NonPositiveLimit { index: usize },

    #[error("layer {index}: limit is missing")]
    MissingLimit { index: usize },

    #[error("layer {index}: stored attachment {found} is below preceding attachment {prev}")]
    NonAscendingAttachment { index: usize, prev: u64, found: u64 },

    #[error("layer index {index} out of bounds (tower has {len} layers)")]
    LayerIndexOutOfBounds { index: usize, len: usize },
}

pub type TowerResult<T> = Result<T, TowerError>;
