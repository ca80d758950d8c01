//! Named Win32 mutex ownership.

#![cfg_attr(not(windows), allow(dead_code))]

use std::io;

#[cfg(windows)]
use windows_sys::Win32::Foundation::{
    CloseHandle, HANDLE, WAIT_ABANDONED, WAIT_FAILED, WAIT_OBJECT_0, WAIT_TIMEOUT,
};
#[cfg(windows)]
use windows_sys::Win32::System::Threading::{CreateMutexW, WaitForSingleObject};

#[derive(Debug, thiserror::Error)]
pub enum MutexError {
    #[error("failed to create mutex {name:?}: {source}")]
    Create {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to grab mutex {name:?}: {source}")]
    Wait {
        name: String,
        #[source]
        source: io::Error,
    },

    /// The previous owner exited without releasing it.
    #[error("mutex {name:?} was abandoned by its previous owner")]
    Abandoned { name: String },

    #[error("unexpected wait status {status:#x} on mutex {name:?}")]
    UnexpectedWait { name: String, status: u32 },

    #[cfg_attr(windows, allow(dead_code))]
    #[error("named mutexes are only supported on Windows")]
    Unsupported,
}

/// Outcome of a non-blocking grab.
#[derive(Debug)]
pub enum Ownership {
    /// We own the mutex until the returned guard is dropped or the process dies.
    Acquired(SingletonMutex),
    /// Some other process already holds it.
    HeldElsewhere,
}

/// An owned named mutex. Dropping it closes the handle.
#[derive(Debug)]
pub struct SingletonMutex {
    name: String,
    #[cfg(windows)]
    handle: HANDLE,
}

impl SingletonMutex {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(windows)]
impl Drop for SingletonMutex {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

/// UTF-16, NUL-terminated, as `CreateMutexW` expects.
pub fn wide_name(name: &str) -> Vec<u16> {
    name.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Create (or open) the mutex called `name` and try to take it without waiting.
#[cfg(windows)]
pub fn acquire(name: &str) -> Result<Ownership, MutexError> {
    let wide = wide_name(name);

    let handle = unsafe { CreateMutexW(std::ptr::null(), 0, wide.as_ptr()) };
    if handle.is_null() {
        return Err(MutexError::Create {
            name: name.to_string(),
            source: io::Error::last_os_error(),
        });
    }
    let mutex = SingletonMutex {
        name: name.to_string(),
        handle,
    };

    match unsafe { WaitForSingleObject(mutex.handle, 0) } {
        WAIT_OBJECT_0 => Ok(Ownership::Acquired(mutex)),
        WAIT_TIMEOUT => Ok(Ownership::HeldElsewhere),
        WAIT_ABANDONED => Err(MutexError::Abandoned {
            name: name.to_string(),
        }),
        WAIT_FAILED => Err(MutexError::Wait {
            name: name.to_string(),
            source: io::Error::last_os_error(),
        }),
        status => Err(MutexError::UnexpectedWait {
            name: name.to_string(),
            status,
        }),
    }
}

#[cfg(not(windows))]
pub fn acquire(_name: &str) -> Result<Ownership, MutexError> {
    Err(MutexError::Unsupported)
}
