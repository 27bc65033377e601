/*!
 * Resource Monitoring
 * Converts raw host metrics into an actionable admission pressure signal
 *
 * Samples process CPU and memory on a fixed cadence, smooths noise with
 * moving averages, classifies load into a pressure level, and exposes the
 * spawn-rate multiplier the admission layer throttles with.
 */

pub mod monitor;
pub mod source;
pub mod tracer;
pub mod traits;
pub mod types;

pub use monitor::ResourceMonitor;
pub use source::{platform_source, MetricsSource, NullSource, SyntheticSource};
pub use tracer::init_tracing;
pub use traits::{NullWorld, WorldCollaborator};
pub use types::{PressureLevel, ResourceMetrics};
