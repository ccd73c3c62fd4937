//! Repository traits for store operations.

pub mod artifacts;
pub mod maintenance;
pub mod records;

pub use artifacts::ArtifactRepo;
pub use maintenance::MaintenanceRepo;
pub use records::RecordRepo;
