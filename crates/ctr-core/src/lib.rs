//! Naive CTR core: request logs → item events → per-item counts → CTR table.
//!
//! Stages, leaf-first:
//! - [`position`]: 1-based click position within an impression list
//! - [`normalize`]: raw vs. visible impression list selection
//! - [`expand`]: lazy fan-out of log rows into item events
//! - [`aggregate`]: per-item click and impression counts
//! - [`estimator`]: naive historical CTR fit and lookup
//! - [`pipeline`]: config-driven driver tying the stages together
//!
//! Data anomalies (unresolvable clicks, unseen items) travel as in-band
//! sentinels. Calling the estimator before fitting is an error.

pub mod aggregate;
pub mod estimator;
pub mod expand;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod position;

pub use aggregate::{aggregate, EventCounts};
pub use estimator::{CtrTable, NaiveCtr};
pub use expand::{expand_clicks, expand_impressions, ImpressionEvents};
pub use logging::{init_logging, LoggingError};
pub use normalize::{normalize_record, normalize_records, resolve_visible, NormalizedLog};
pub use pipeline::{item_events, Pipeline, PipelineOutput, PipelineSummary, PipelineVariant};
pub use position::resolve_click_position;
