//! Linux fbdev display sink
//!
//! Geometry comes from the FBIOGET_VSCREENINFO / FBIOGET_FSCREENINFO ioctls;
//! pixels go out with plain seek + write on the device node, no mmap.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::Path;

use tracing::info;

use super::DisplaySink;
use crate::geometry::Size;
use crate::{Error, Result};

const FBIOGET_VSCREENINFO: u32 = 0x4600;
const FBIOGET_FSCREENINFO: u32 = 0x4602;

/// Only 32 bits per pixel (XRGB/XBGR) is supported
pub const SUPPORTED_BPP: u32 = 32;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
#[allow(dead_code)]
struct FbBitfield {
    offset: u32,
    length: u32,
    msb_right: u32,
}

/// struct fb_var_screeninfo from linux/fb.h
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
#[allow(dead_code)]
struct FbVarScreeninfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    red: FbBitfield,
    green: FbBitfield,
    blue: FbBitfield,
    transp: FbBitfield,
    nonstd: u32,
    activate: u32,
    height: u32,
    width: u32,
    accel_flags: u32,
    pixclock: u32,
    left_margin: u32,
    right_margin: u32,
    upper_margin: u32,
    lower_margin: u32,
    hsync_len: u32,
    vsync_len: u32,
    sync: u32,
    vmode: u32,
    rotate: u32,
    colorspace: u32,
    reserved: [u32; 4],
}

/// struct fb_fix_screeninfo from linux/fb.h
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
#[allow(dead_code)]
struct FbFixScreeninfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

/// What the rest of the program needs to know about the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferInfo {
    pub xres: u32,
    pub yres: u32,
    pub bits_per_pixel: u32,
    /// Bytes per framebuffer line
    pub line_length: u32,
    /// fbcon rotation metadata (FB_ROTATE_*)
    pub rotate: u32,
}

impl FramebufferInfo {
    pub fn size(&self) -> Size {
        Size::new(self.xres, self.yres)
    }

    /// Reject layouts the renderer cannot fill
    pub fn validate(&self) -> Result<()> {
        if self.bits_per_pixel != SUPPORTED_BPP {
            return Err(Error::UnsupportedPixelFormat(self.bits_per_pixel));
        }
        if self.xres == 0 || self.yres == 0 || self.line_length < self.xres * 4 {
            return Err(Error::InvalidGeometry {
                width: self.xres,
                height: self.yres,
            });
        }
        Ok(())
    }
}

/// An open framebuffer device
pub struct Framebuffer {
    file: File,
    info: FramebufferInfo,
}

impl Framebuffer {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::DeviceUnavailable {
                path: path.to_path_buf(),
                source,
            })?;

        let mut var = FbVarScreeninfo::default();
        let mut fix = FbFixScreeninfo::default();
        let fd = file.as_raw_fd();
        // SAFETY: both structs mirror the kernel layout and outlive the calls
        unsafe {
            if libc::ioctl(fd, FBIOGET_VSCREENINFO as _, &mut var as *mut FbVarScreeninfo) != 0 {
                return Err(io::Error::last_os_error().into());
            }
            if libc::ioctl(fd, FBIOGET_FSCREENINFO as _, &mut fix as *mut FbFixScreeninfo) != 0 {
                return Err(io::Error::last_os_error().into());
            }
        }

        let info = FramebufferInfo {
            xres: var.xres,
            yres: var.yres,
            bits_per_pixel: var.bits_per_pixel,
            line_length: fix.line_length,
            rotate: var.rotate,
        };
        info.validate()?;
        info!(
            path = %path.display(),
            xres = info.xres,
            yres = info.yres,
            line_length = info.line_length,
            rotate = info.rotate,
            "Framebuffer opened"
        );
        Ok(Self { file, info })
    }

    pub fn info(&self) -> FramebufferInfo {
        self.info
    }
}

impl DisplaySink for Framebuffer {
    fn write_at(&mut self, offset: u64, bytes: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)
    }
}
