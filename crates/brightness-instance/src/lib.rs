//! Single-instance coordination.
//!
//! Architecture:
//!   - The first process creates a named mutex and becomes the **owner**
//!   - A later process finds the mutex already present and becomes a
//!     **challenger**: it writes one byte to the owner's activation pipe
//!     and exits
//!   - The owner runs an [`ActivationListener`] thread for its whole
//!     lifetime: accept a connection, read a byte, invoke the callback,
//!     repeat; failures back off for one second and retry

use log::{debug, info, warn};
use std::error::Error;
use std::ffi::OsStr;
use std::fmt;
use std::io::Write;
use std::os::windows::ffi::OsStrExt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use windows::core::PCWSTR;
use windows::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, ERROR_PIPE_CONNECTED, HANDLE,
};
use windows::Win32::Storage::FileSystem::{ReadFile, PIPE_ACCESS_INBOUND};
use windows::Win32::System::Pipes::{
    ConnectNamedPipe, CreateNamedPipeW, DisconnectNamedPipe, WaitNamedPipeW, PIPE_READMODE_BYTE,
    PIPE_TYPE_BYTE, PIPE_UNLIMITED_INSTANCES, PIPE_WAIT,
};
use windows::Win32::System::Threading::{CreateMutexW, ReleaseMutex};
use windows::Win32::UI::WindowsAndMessaging::{AllowSetForegroundWindow, ASFW_ANY};

// ============================================================================
// Constants
// ============================================================================

/// Session-wide exclusivity lock.
pub const MUTEX_NAME: &str = "DisplayBrightness_SingleInstance_Mutex";

/// Local pipe the owner listens on for activation requests.
pub const PIPE_NAME: &str = r"\\.\pipe\DisplayBrightness_Pipe";

/// How long a challenger waits for the owner's pipe.
pub const CONNECT_TIMEOUT_MS: u32 = 1000;

/// Retry interval while the owner's pipe does not exist yet.
const CONNECT_POLL: Duration = Duration::from_millis(50);

/// Pause after a listener failure before the next attempt.
pub const LISTENER_BACKOFF: Duration = Duration::from_secs(1);

/// The byte a challenger sends. Any value activates.
pub const ACTIVATE_BYTE: u8 = 1;

// ============================================================================
// Owner / challenger
// ============================================================================

/// Holds the named mutex; released on drop.
pub struct InstanceLock {
    handle: HANDLE,
    name: String,
}

impl fmt::Debug for InstanceLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceLock").field("name", &self.name).finish()
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseMutex(self.handle);
            let _ = CloseHandle(self.handle);
        }
        debug!("Released instance lock {}", self.name);
    }
}

/// Which side of the coordination protocol this process is on.
#[derive(Debug)]
pub enum Role {
    Owner(InstanceLock),
    Challenger,
}

impl Role {
    /// Try to take the mutex named `name`.
    ///
    /// Any failure to become the sole holder makes this process a challenger.
    pub fn acquire(name: &str) -> Role {
        let wide = to_wide(name);
        let handle = match unsafe { CreateMutexW(None, true, PCWSTR(wide.as_ptr())) } {
            Ok(h) => h,
            Err(e) => {
                warn!("CreateMutexW({}) failed: {}", name, e);
                return Role::Challenger;
            }
        };

        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            unsafe {
                let _ = CloseHandle(handle);
            }
            info!("Another instance holds {}", name);
            return Role::Challenger;
        }

        info!("Acquired instance lock {}", name);
        Role::Owner(InstanceLock {
            handle,
            name: name.to_string(),
        })
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Role::Owner(_))
    }
}

/// Ask the running owner to bring itself to the front.
///
/// Best effort: grants foreground rights to any process, waits up to
/// [`CONNECT_TIMEOUT_MS`] for the pipe and writes one byte. Returns whether
/// the byte was delivered; failures are only logged.
pub fn signal_existing_instance(pipe_name: &str) -> bool {
    if let Err(e) = unsafe { AllowSetForegroundWindow(ASFW_ANY) } {
        debug!("AllowSetForegroundWindow failed: {}", e);
    }

    match send_activation(pipe_name) {
        Ok(()) => {
            info!("Activation signal sent to {}", pipe_name);
            true
        }
        Err(e) => {
            warn!("Could not signal the running instance: {}", e);
            false
        }
    }
}

fn send_activation(pipe_name: &str) -> Result<(), Box<dyn Error>> {
    let mut pipe = connect(pipe_name)?;
    pipe.write_all(&[ACTIVATE_BYTE])?;
    pipe.flush()?;
    Ok(())
}

/// Open the client end, retrying until [`CONNECT_TIMEOUT_MS`] elapses.
///
/// Covers both a pipe that does not exist yet and one whose only instance
/// is busy with another client.
fn connect(pipe_name: &str) -> Result<std::fs::File, Box<dyn Error>> {
    let wide = to_wide(pipe_name);
    let deadline = Instant::now() + Duration::from_millis(u64::from(CONNECT_TIMEOUT_MS));
    loop {
        match std::fs::OpenOptions::new().write(true).open(pipe_name) {
            Ok(file) => return Ok(file),
            Err(e) if Instant::now() >= deadline => {
                return Err(format!("connect to {} timed out: {}", pipe_name, e).into())
            }
            Err(_) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let waited =
                    unsafe { WaitNamedPipeW(PCWSTR(wide.as_ptr()), remaining.as_millis() as u32) };
                if !waited.as_bool() {
                    // Pipe not created yet; WaitNamedPipeW returns at once.
                    thread::sleep(CONNECT_POLL.min(remaining));
                }
            }
        }
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Run `attempt` until `running` clears, sleeping `backoff` after each failure.
///
/// Returns how many attempts failed.
pub fn supervise<E, F>(running: &AtomicBool, backoff: Duration, mut attempt: F) -> usize
where
    E: fmt::Display,
    F: FnMut() -> Result<(), E>,
{
    let mut failures = 0usize;
    while running.load(Ordering::SeqCst) {
        if let Err(e) = attempt() {
            failures += 1;
            warn!("Activation listener failed: {}, retrying in {:?}", e, backoff);
            if running.load(Ordering::SeqCst) {
                thread::sleep(backoff);
            }
        }
    }
    failures
}

/// Background thread answering activation requests.
pub struct ActivationListener {
    pipe_name: String,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ActivationListener {
    /// Start listening on `pipe_name`; `on_activate` runs on the listener
    /// thread once per received signal.
    pub fn spawn<F>(pipe_name: &str, on_activate: F) -> Result<Self, Box<dyn Error>>
    where
        F: Fn() + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let name = pipe_name.to_string();

        let thread = thread::Builder::new()
            .name("activation-listener".into())
            .spawn(move || {
                supervise(&flag, LISTENER_BACKOFF, || {
                    let received = accept_one(&name)?;
                    if received && flag.load(Ordering::SeqCst) {
                        on_activate();
                    }
                    Ok::<(), Box<dyn Error>>(())
                });
                debug!("Activation listener on {} stopped", name);
            })?;

        info!("Listening for activation on {}", pipe_name);
        Ok(Self {
            pipe_name: pipe_name.to_string(),
            running,
            thread: Some(thread),
        })
    }

    /// Stop the listener and wait for its thread.
    ///
    /// The owner normally never calls this; the thread lives as long as the
    /// process does.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        // Unblock the pending ConnectNamedPipe.
        let _ = send_activation(&self.pipe_name);
        if let Some(t) = self.thread.take() {
            let _ = t.join();
        }
    }
}

impl fmt::Debug for ActivationListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivationListener")
            .field("pipe_name", &self.pipe_name)
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

/// Server end of one pipe instance; closed on drop.
struct PipeInstance(HANDLE);

impl Drop for PipeInstance {
    fn drop(&mut self) {
        unsafe {
            let _ = DisconnectNamedPipe(self.0);
            let _ = CloseHandle(self.0);
        }
    }
}

/// Create one pipe instance, wait for a client and read a byte.
///
/// Returns whether a byte arrived.
fn accept_one(pipe_name: &str) -> Result<bool, Box<dyn Error>> {
    let wide = to_wide(pipe_name);
    let handle = unsafe {
        CreateNamedPipeW(
            PCWSTR(wide.as_ptr()),
            PIPE_ACCESS_INBOUND,
            PIPE_TYPE_BYTE | PIPE_READMODE_BYTE | PIPE_WAIT,
            PIPE_UNLIMITED_INSTANCES,
            1,
            1,
            0,
            None,
        )
    };
    if handle.is_invalid() {
        return Err(format!("CreateNamedPipeW failed: {}", std::io::Error::last_os_error()).into());
    }
    let pipe = PipeInstance(handle);

    if let Err(e) = unsafe { ConnectNamedPipe(pipe.0, None) } {
        if e.code() != ERROR_PIPE_CONNECTED.to_hresult() {
            return Err(format!("ConnectNamedPipe failed: {}", e).into());
        }
    }

    let mut buf = [0u8; 1];
    let mut read: u32 = 0;
    match unsafe { ReadFile(pipe.0, Some(&mut buf), Some(&mut read as *mut u32), None) } {
        Ok(()) => Ok(read > 0),
        Err(e) => {
            debug!("Activation read failed: {}", e);
            Ok(false)
        }
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    OsStr::new(s)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

#[cfg(test)]
#[path = "tests/instance_tests.rs"]
mod tests;
