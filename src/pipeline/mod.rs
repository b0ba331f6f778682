// src/pipeline/mod.rs

pub mod event_bus;
pub mod metrics;
pub mod session;

pub use event_bus::{EventBus, PipelineEvent};
pub use metrics::PipelineMetrics;
pub use session::TrackingSession;
