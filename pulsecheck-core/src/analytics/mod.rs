//! Analytics pipeline for pulsecheck
//!
//! Each stage is a set of pure functions over parsed messages or over the
//! output of earlier stages:
//!
//! ```text
//! messages ─► metrics ──────────────┬─► benchmarks ─┐
//!    │                              │               ├─► recommendations
//!    ├──────► topics ─► trends ─────┴───────────────┘
//!    └─────────────────────▲
//! ```
//!
//! - [`metrics`]: activity, engagement and contributor metrics plus scores
//! - [`topics`]: TF-IDF keyword clustering
//! - [`trends`]: week-over-week comparison
//! - [`benchmarks`]: threshold classification and server comparison
//! - [`recommendations`]: rule-based suggestions
//!
//! [`crate::report`] composes the stages into a single report.

pub mod benchmarks;
pub mod metrics;
pub mod recommendations;
pub mod topics;
pub mod trends;

pub use benchmarks::{
    compare_reports, compare_to_benchmarks, CustomThresholds, ReportComparison, Threshold,
    DEFAULT_BENCHMARKS,
};
pub use metrics::{activity_metrics, contributor_metrics, engagement_metrics, health_scores};
pub use recommendations::generate_recommendations;
pub use topics::{cluster_messages, extract_keywords, tokenize, ClusterConfig, OTHER_LABEL};
pub use trends::{detect_trends, topic_trend};
