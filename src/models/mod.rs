// Status schema: backend wire shapes, the merged snapshot and dashboard state

mod container;
mod snapshot;
mod state;
mod status;

pub use container::{ContainerState, ContainerStatus};
pub use snapshot::{
    ArchiveSummary, DataSection, MetricReading, Percent, ServiceStatus, ServicesSection, Snapshot,
    SystemSection, parse_sample_date,
};
pub use state::{Connectivity, DashboardState};
pub use status::{
    ArchiveResponse, ContainerEntry, DataStatusResponse, ServicesStatusResponse,
    SystemStatusResponse, from_object_slice,
};
