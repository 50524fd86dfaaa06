//! LittleFS partition on the VFS.

use std::ffi::CString;
use std::io;

use esp_idf_svc::sys::littlefs::{
    esp_littlefs_format, esp_littlefs_info, esp_vfs_littlefs_conf_t, esp_vfs_littlefs_register,
};
use esp_idf_svc::sys::{esp, EspError, ESP_ERR_INVALID_ARG};

use super::SetupError;
use crate::config::Storage;

fn c_string(s: &str) -> Result<CString, EspError> {
    CString::new(s).map_err(|_| EspError::from_infallible::<{ ESP_ERR_INVALID_ARG as i32 }>())
}

/// Mount the partition at `storage.base_path`, formatting it if it does
/// not mount.
pub fn mount(storage: &Storage) -> Result<(), SetupError> {
    let base = c_string(&storage.base_path.to_string_lossy()).map_err(SetupError::Storage)?;
    let label = c_string(storage.partition_label).map_err(SetupError::Storage)?;

    let mut conf = esp_vfs_littlefs_conf_t {
        base_path: base.as_ptr(),
        partition_label: label.as_ptr(),
        ..Default::default()
    };
    conf.set_format_if_mount_failed(1);

    // The VFS copies both strings during registration
    esp!(unsafe { esp_vfs_littlefs_register(&conf) }).map_err(SetupError::Storage)?;

    match usage(storage.partition_label) {
        Ok((used, total)) => {
            crate::log_info!("mounted {}: {} of {} bytes used", storage.base_path.display(), used, total)
        }
        Err(e) => crate::log_warn!("mounted {}, no usage info: {}", storage.base_path.display(), e),
    }
    Ok(())
}

/// Erase everything on the partition.
pub fn format(storage: &Storage) -> Result<(), SetupError> {
    let label = c_string(storage.partition_label).map_err(SetupError::Storage)?;
    esp!(unsafe { esp_littlefs_format(label.as_ptr()) }).map_err(SetupError::Storage)
}

/// Used and total bytes of partition `label`.
pub fn usage(label: &str) -> io::Result<(u64, u64)> {
    let label = c_string(label).map_err(io::Error::other)?;
    let (mut total, mut used) = (0usize, 0usize);
    esp!(unsafe { esp_littlefs_info(label.as_ptr(), &mut total, &mut used) }).map_err(io::Error::other)?;
    Ok((used as u64, total as u64))
}
