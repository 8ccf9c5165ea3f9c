//! Big-endian get/set/match primitives at absolute offsets.
//!
//! Two interchangeable backends exist. [`Intrinsic`] goes through
//! `byteorder`, which lowers to a single load/store plus byte swap where the
//! target allows it. [`Portable`] spells out every shift and mask. Both produce
//! identical results; the `portable-pack` feature picks [`Portable`] as [`Pack`].

use byteorder::{BigEndian, ByteOrder};

/// Narrow interface over big-endian reads and writes into a byte slice.
///
/// Callers guarantee that `off + size_of::<T>() <= buf.len()`; out of range
/// offsets panic.
pub trait BytePack {
    fn get_u16(buf: &[u8], off: usize) -> u16;
    fn get_u32(buf: &[u8], off: usize) -> u32;
    fn get_u64(buf: &[u8], off: usize) -> u64;

    fn set_u16(buf: &mut [u8], off: usize, v: u16);
    fn set_u32(buf: &mut [u8], off: usize, v: u32);
    fn set_u64(buf: &mut [u8], off: usize, v: u64);

    fn match_u16(buf: &[u8], off: usize, v: u16) -> bool {
        Self::get_u16(buf, off) == v
    }

    fn match_u32(buf: &[u8], off: usize, v: u32) -> bool {
        Self::get_u32(buf, off) == v
    }

    fn match_u64(buf: &[u8], off: usize, v: u64) -> bool {
        Self::get_u64(buf, off) == v
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Intrinsic;

impl BytePack for Intrinsic {
    fn get_u16(buf: &[u8], off: usize) -> u16 {
        BigEndian::read_u16(&buf[off..])
    }

    fn get_u32(buf: &[u8], off: usize) -> u32 {
        BigEndian::read_u32(&buf[off..])
    }

    fn get_u64(buf: &[u8], off: usize) -> u64 {
        BigEndian::read_u64(&buf[off..])
    }

    fn set_u16(buf: &mut [u8], off: usize, v: u16) {
        BigEndian::write_u16(&mut buf[off..], v)
    }

    fn set_u32(buf: &mut [u8], off: usize, v: u32) {
        BigEndian::write_u32(&mut buf[off..], v)
    }

    fn set_u64(buf: &mut [u8], off: usize, v: u64) {
        BigEndian::write_u64(&mut buf[off..], v)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Portable;

impl BytePack for Portable {
    fn get_u16(buf: &[u8], off: usize) -> u16 {
        (buf[off] as u16) << 8 | buf[off + 1] as u16
    }

    fn get_u32(buf: &[u8], off: usize) -> u32 {
        (buf[off] as u32) << 24
            | (buf[off + 1] as u32) << 16
            | (buf[off + 2] as u32) << 8
            | buf[off + 3] as u32
    }

    fn get_u64(buf: &[u8], off: usize) -> u64 {
        (Self::get_u32(buf, off) as u64) << 32 | Self::get_u32(buf, off + 4) as u64
    }

    fn set_u16(buf: &mut [u8], off: usize, v: u16) {
        buf[off] = (v >> 8) as u8;
        buf[off + 1] = v as u8;
    }

    fn set_u32(buf: &mut [u8], off: usize, v: u32) {
        buf[off] = (v >> 24) as u8;
        buf[off + 1] = (v >> 16) as u8;
        buf[off + 2] = (v >> 8) as u8;
        buf[off + 3] = v as u8;
    }

    fn set_u64(buf: &mut [u8], off: usize, v: u64) {
        Self::set_u32(buf, off, (v >> 32) as u32);
        Self::set_u32(buf, off + 4, v as u32);
    }

    // Compare byte by byte so a mismatch in the first byte exits early.
    fn match_u32(buf: &[u8], off: usize, v: u32) -> bool {
        buf[off] == (v >> 24) as u8
            && buf[off + 1] == (v >> 16) as u8
            && buf[off + 2] == (v >> 8) as u8
            && buf[off + 3] == v as u8
    }

    fn match_u64(buf: &[u8], off: usize, v: u64) -> bool {
        Self::match_u32(buf, off, (v >> 32) as u32) && Self::match_u32(buf, off + 4, v as u32)
    }
}

#[cfg(not(feature = "portable-pack"))]
pub type Pack = Intrinsic;
#[cfg(feature = "portable-pack")]
pub type Pack = Portable;
