//! Premium allocation engine for layered insurance program towers.

pub mod attachment;
pub mod error;
pub mod grouping;
pub mod layer;
pub mod metrics;
pub mod persist;
pub mod premium;
pub mod term;
pub mod tower;

pub use error::{TowerError, TowerResult};
pub use grouping::{DateConfig, DateEntry, DateGroup};
pub use layer::{Layer, PremiumBasis};
pub use persist::{BasisTag, PersistedLayer};
pub use term::TermWindow;
pub use tower::{LayerDraft, LayerView, Position, Tower, TowerViolation};
