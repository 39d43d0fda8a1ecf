pub mod monitor;
pub mod recorder;
pub mod reporter;
pub mod snapshot;
pub mod stream;

pub use monitor::{Monitor, RouteKey};
pub use recorder::{RecorderKind, SampleRecorder};
pub use reporter::Reporter;
pub use snapshot::{ErrorDistribution, RouteStat, StatsSnapshot, SystemMetrics};
