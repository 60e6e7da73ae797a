//! Device-node opening and address-space mapping bookkeeping.
//!
//! Everything here is lifecycle plumbing around the capture core: open the
//! node, map the span, hand out a view, unmap on drop. The core itself never
//! opens or closes anything; it is handed live windows and that is all. The
//! register maps in [`crate::regs`] are checked against the window spans at
//! compile time, so a window that maps successfully covers every offset the
//! core will touch.

use std::ffi::CString;
use std::io;
use std::ptr;
use std::slice;

use thiserror::Error;
use tracing::info;

use crate::mmio::RegisterPort;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("can't open {path}: {source}")]
    DeviceOpen { path: String, source: io::Error },
    #[error("mapping {len:#x} bytes of {path} failed: {source}")]
    Mmap {
        path: String,
        len: usize,
        source: io::Error,
    },
}

fn open_node(path: &str, flags: libc::c_int) -> Result<libc::c_int, MapError> {
    let cpath = CString::new(path).expect("device path contains a NUL");
    let fd = unsafe { libc::open(cpath.as_ptr(), flags) };
    if fd < 0 {
        return Err(MapError::DeviceOpen {
            path: path.to_owned(),
            source: io::Error::last_os_error(),
        });
    }
    Ok(fd)
}

/// One mapped UIO register window. Unmapped and closed on drop.
pub struct UioRegisters {
    base: *mut u8,
    len: usize,
    fd: libc::c_int,
}

impl UioRegisters {
    /// Open a UIO device node and map `len` bytes of its register space.
    /// The kernel refuses the mapping outright if the device exposes less
    /// than `len`, so a window that exists is a window that fits.
    pub fn map(path: &str, len: usize) -> Result<Self, MapError> {
        let fd = open_node(path, libc::O_RDWR)?;
        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if base == libc::MAP_FAILED {
            let source = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(MapError::Mmap {
                path: path.to_owned(),
                len,
                source,
            });
        }
        info!(path, len, "mapped register window");
        Ok(Self {
            base: base.cast(),
            len,
            fd,
        })
    }
}

impl RegisterPort for UioRegisters {
    fn read(&mut self, offset: usize) -> u32 {
        debug_assert!(offset + 4 <= self.len);
        unsafe { ptr::read_volatile(self.base.add(offset).cast::<u32>()) }
    }

    fn write(&mut self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.len);
        unsafe { ptr::write_volatile(self.base.add(offset).cast::<u32>(), value) }
    }
}

impl Drop for UioRegisters {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base.cast(), self.len);
            libc::close(self.fd);
        }
    }
}

// The window is only ever driven from one thread at a time; the raw base
// pointer is all that blocks the auto impl
unsafe impl Send for UioRegisters {}

/// Page-align a physical address for mmap: the aligned base to map from and
/// the intra-page offset to index back in with
fn page_split(phys: u32, page: u64) -> (u64, usize) {
    let mask = page - 1;
    (phys as u64 & !mask, (phys as u64 & mask) as usize)
}

/// The receive buffer, mapped read-only out of physical memory. Unmapped on
/// drop.
pub struct RxBuffer {
    mapping: *mut u8,
    mapping_len: usize,
    offset: usize,
    len: usize,
}

impl RxBuffer {
    /// Map `len` bytes of physical memory at `phys` through `/dev/mem`.
    /// Mappings must start on a page boundary, so the map is taken from the
    /// page below and offset back to the buffer base.
    pub fn map(phys: u32, len: usize) -> Result<Self, MapError> {
        const DEV_MEM: &str = "/dev/mem";
        let fd = open_node(DEV_MEM, libc::O_RDONLY | libc::O_SYNC)?;
        let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as u64;
        let (aligned, offset) = page_split(phys, page);
        let mapping_len = offset + len;
        let mapping = unsafe {
            libc::mmap(
                ptr::null_mut(),
                mapping_len,
                libc::PROT_READ,
                libc::MAP_SHARED,
                fd,
                aligned as libc::off_t,
            )
        };
        if mapping == libc::MAP_FAILED {
            let source = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(MapError::Mmap {
                path: DEV_MEM.to_owned(),
                len: mapping_len,
                source,
            });
        }
        // The mapping holds its own reference to the device
        unsafe { libc::close(fd) };
        info!(phys, len, "mapped receive buffer");
        Ok(Self {
            mapping: mapping.cast(),
            mapping_len,
            offset,
            len,
        })
    }

    /// The captured bytes, valid only after the filling transfer completed
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(self.mapping.add(self.offset), self.len) }
    }
}

impl Drop for RxBuffer {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.mapping.cast(), self.mapping_len);
        }
    }
}
