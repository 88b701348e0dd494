//! Run-at-startup registration under the per-user autorun key.
//!
//! Presence of the value is the only "enabled" signal; its content is the
//! quoted executable path.

use std::error::Error;
use std::io;
use std::path::Path;

use winreg::enums::*;
use winreg::RegKey;

pub const RUN_KEY: &str = r"SOFTWARE\Microsoft\Windows\CurrentVersion\Run";
pub const APP_NAME: &str = "DisplayBrightness";

/// Autorun value for `exe`.
pub fn command_line(exe: &Path) -> String {
    format!("\"{}\"", exe.display())
}

pub fn is_enabled() -> bool {
    RegKey::predef(HKEY_CURRENT_USER)
        .open_subkey_with_flags(RUN_KEY, KEY_READ)
        .map(|key| has_entry(&key))
        .unwrap_or(false)
}

/// Whether `key` holds our value, whatever its registry type.
fn has_entry(key: &RegKey) -> bool {
    key.get_raw_value(APP_NAME).is_ok()
}

pub fn enable() -> Result<(), Box<dyn Error>> {
    let exe = std::env::current_exe()?;
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let (key, _) = hkcu.create_subkey(RUN_KEY)?;
    key.set_value(APP_NAME, &command_line(&exe))?;
    log::info!("Startup entry written for {}", exe.display());
    Ok(())
}

/// Remove the entry. Succeeds when it was already absent.
pub fn disable() -> Result<(), Box<dyn Error>> {
    let hkcu = RegKey::predef(HKEY_CURRENT_USER);
    let key = match hkcu.open_subkey_with_flags(RUN_KEY, KEY_SET_VALUE) {
        Ok(k) => k,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    match key.delete_value(APP_NAME) {
        Ok(()) => {
            log::info!("Startup entry removed");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

pub fn set_enabled(enabled: bool) -> Result<(), Box<dyn Error>> {
    if enabled {
        enable()
    } else {
        disable()
    }
}
