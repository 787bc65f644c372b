//! The kernel pf device.
//!
//! [`PfDevice`] owns a read-only descriptor for `/dev/pf`. Decoding the
//! status and queue ioctls is platform specific and no binding ships with
//! this crate, so every read reports [`FetchError::Unsupported`]. The
//! failure is per scrape: the exporter keeps serving, with an empty pf
//! section.

use std::fs::File;
use std::io;
use std::path::Path;

use pf_exporter_core::error::{FetchError, OpenError};
use pf_exporter_core::handle::PfHandle;
use pf_exporter_core::snapshot::PfStatus;

/// An open pf device.
#[derive(Debug)]
pub struct PfDevice {
    name: String,
    // Held open for the process lifetime; closed on drop.
    _file: File,
}

impl PfDevice {
    /// Opens the device node read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| open_error(&name, e))?;
        tracing::info!(device = %name, "opened pf device");
        Ok(Self { name, _file: file })
    }

    /// Adopts a descriptor inherited from the parent process.
    ///
    /// The descriptor must be open; ownership moves to the returned handle.
    #[cfg(unix)]
    pub fn from_raw_fd(fd: i32) -> Result<Self, OpenError> {
        use std::os::fd::FromRawFd;

        // SAFETY: F_GETFD only reads the descriptor flags.
        if unsafe { libc::fcntl(fd, libc::F_GETFD) } == -1 {
            return Err(OpenError::InvalidFd {
                fd,
                source: io::Error::last_os_error(),
            });
        }
        // SAFETY: the descriptor is open and this handle becomes its only owner.
        let file = unsafe { File::from_raw_fd(fd) };
        tracing::info!(fd, "adopted pf device descriptor");
        Ok(Self {
            name: format!("fd:{fd}"),
            _file: file,
        })
    }

    #[cfg(not(unix))]
    pub fn from_raw_fd(fd: i32) -> Result<Self, OpenError> {
        Err(OpenError::InvalidFd {
            fd,
            source: io::Error::new(
                io::ErrorKind::Unsupported,
                "file descriptors are only supported on unix",
            ),
        })
    }
}

fn open_error(path: &str, e: io::Error) -> OpenError {
    match e.kind() {
        io::ErrorKind::NotFound => OpenError::NotFound {
            path: path.to_owned(),
        },
        io::ErrorKind::PermissionDenied => OpenError::PermissionDenied {
            path: path.to_owned(),
        },
        _ => OpenError::Io {
            path: path.to_owned(),
            source: e,
        },
    }
}

impl PfHandle for PfDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&mut self) -> Result<PfStatus, FetchError> {
        Err(FetchError::Unsupported {
            platform: std::env::consts::OS,
        })
    }
}
