pub mod engine;
pub mod gaps;
pub mod manager;

pub use engine::{partition, Partition, SyncEngine, SyncStats};
pub use gaps::{GapReport, GapSynthesizer, GLOBAL_GAP_COUNT, TOP_GAP_COUNT};
pub use manager::{SyncManager, SyncReport};

pub mod prelude {
    pub use super::{GapSynthesizer, SyncEngine, SyncManager, SyncStats};
    pub use kb_core::{ArticleRecord, Error, Result};
}
