//! pf exporter handles.
//!
//! - [`device`]: [`PfDevice`], the kernel pf device opened by path or
//!   adopted from an inherited descriptor
//! - [`snapshot_file`]: [`SnapshotFile`], a JSON snapshot re-read on every fetch
//!
//! Both implement [`pf_exporter_core::PfHandle`].

pub mod device;
pub mod snapshot_file;

pub use device::PfDevice;
pub use snapshot_file::SnapshotFile;
