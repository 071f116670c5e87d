// SPDX-FileCopyrightText: 2026 Strongroom Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Swap-locked, zero-on-release storage for the master key.
//!
//! On unix every key owns a whole anonymous `mmap`ed page. `munlock` is not
//! reference-counted, so two keys must never share a page: releasing one
//! would unlock the other. The page is `mlock`ed on allocation (best effort,
//! a failed lock leaves [`MasterKey::is_memory_locked`] false) and is zeroed,
//! unlocked and unmapped on drop.
//!
//! Other platforms fall back to a plain heap allocation that is zeroed on drop.

use std::fmt;

use strongroom_core::StrongroomError;

/// Length of the master key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Symmetric master key held in protected memory.
///
/// Not `Clone`, not serializable, and `Debug` never shows the bytes. Raw
/// bytes are only reachable from inside this crate.
pub struct MasterKey {
    page: KeyPage,
}

impl MasterKey {
    /// Allocate a zeroed, locked key slot to be filled in place.
    pub(crate) fn zeroed() -> Result<Self, StrongroomError> {
        Ok(Self {
            page: KeyPage::new()?,
        })
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        self.page.bytes()
    }

    pub(crate) fn as_mut_bytes(&mut self) -> &mut [u8; KEY_LEN] {
        self.page.bytes_mut()
    }

    /// Whether the backing page is locked in RAM.
    pub fn is_memory_locked(&self) -> bool {
        self.page.locked
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

#[cfg(unix)]
struct KeyPage {
    ptr: std::ptr::NonNull<u8>,
    capacity: usize,
    locked: bool,
}

// SAFETY: the page is owned exclusively by one KeyPage and only reached
// through &self / &mut self.
#[cfg(unix)]
unsafe impl Send for KeyPage {}
#[cfg(unix)]
unsafe impl Sync for KeyPage {}

#[cfg(unix)]
impl KeyPage {
    fn new() -> Result<Self, StrongroomError> {
        // SAFETY: sysconf has no preconditions.
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        let capacity = usize::try_from(page_size)
            .ok()
            .filter(|size| *size >= KEY_LEN)
            .ok_or_else(|| StrongroomError::Internal("could not read the page size".to_string()))?;

        // SAFETY: anonymous private mapping, no file descriptor involved.
        let raw = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                capacity,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(StrongroomError::Internal(
                "could not map key memory".to_string(),
            ));
        }
        let ptr = std::ptr::NonNull::new(raw.cast::<u8>()).ok_or_else(|| {
            StrongroomError::Internal("could not map key memory".to_string())
        })?;

        // SAFETY: ptr/capacity describe the mapping created above.
        let locked = unsafe { libc::mlock(ptr.as_ptr().cast(), capacity) } == 0;
        if !locked {
            tracing::debug!("mlock of key page failed");
        }

        Ok(Self {
            ptr,
            capacity,
            locked,
        })
    }

    fn bytes(&self) -> &[u8; KEY_LEN] {
        // SAFETY: the mapping is page-aligned, at least KEY_LEN long and
        // readable for the lifetime of self.
        unsafe { &*self.ptr.as_ptr().cast::<[u8; KEY_LEN]>() }
    }

    fn bytes_mut(&mut self) -> &mut [u8; KEY_LEN] {
        // SAFETY: as in `bytes`, and &mut self guarantees exclusivity.
        unsafe { &mut *self.ptr.as_ptr().cast::<[u8; KEY_LEN]>() }
    }

    #[cfg(test)]
    fn page_address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

#[cfg(unix)]
impl Drop for KeyPage {
    fn drop(&mut self) {
        // SAFETY: the whole mapping is writable and owned by self.
        let page = unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.capacity) };
        zeroize::Zeroize::zeroize(page);
        // SAFETY: same region that was mapped (and possibly locked) in `new`.
        unsafe {
            if self.locked {
                libc::munlock(self.ptr.as_ptr().cast(), self.capacity);
            }
            libc::munmap(self.ptr.as_ptr().cast(), self.capacity);
        }
    }
}

#[cfg(not(unix))]
struct KeyPage {
    bytes: Box<[u8; KEY_LEN]>,
    locked: bool,
}

#[cfg(not(unix))]
impl KeyPage {
    fn new() -> Result<Self, StrongroomError> {
        Ok(Self {
            bytes: Box::new([0u8; KEY_LEN]),
            locked: false,
        })
    }

    fn bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    fn bytes_mut(&mut self) -> &mut [u8; KEY_LEN] {
        &mut self.bytes
    }
}

#[cfg(not(unix))]
impl Drop for KeyPage {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut *self.bytes);
    }
}
