// Services module for the TrustScan backend
// Business logic layer: aggregation, scoring, caching and the analysis boundary

pub mod aggregator;
pub mod analysis;
pub mod verdict_cache;
pub mod verdict_engine;

// Re-export commonly used services
pub use aggregator::{AggregationError, Aggregator};
pub use analysis::{AnalysisEnvelope, AnalysisService};
pub use verdict_cache::{CacheError, VerdictCache, VerdictStore};
pub use verdict_engine::{VerdictEngine, MAXIMAL_TRUST_SUMMARY};
