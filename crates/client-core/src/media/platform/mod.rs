//! Platform capture backends
//!
//! The backend is chosen by feature: `device-cpal` uses the system's default
//! input device, otherwise the scripted mock is used.

use std::sync::Arc;

use crate::media::device::MediaDevices;

#[cfg(feature = "device-cpal")]
pub mod cpal_impl;
pub mod mock;

/// Capture devices of the current platform
pub fn default_devices() -> Arc<dyn MediaDevices> {
    #[cfg(feature = "device-cpal")]
    {
        Arc::new(cpal_impl::CpalMediaDevices::new())
    }
    #[cfg(not(feature = "device-cpal"))]
    {
        Arc::new(mock::MockMediaDevices::new())
    }
}
