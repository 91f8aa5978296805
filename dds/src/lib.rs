//! Uncompressed DDS container with a full mip chain.
//!
//! Pixels are stored as 32 bit ARGB, so a compressing tool can re-encode
//! the texture to a block format later.

use {
    bytemuck::{Pod, Zeroable},
    im::Image,
    std::{error, fmt, mem},
};

const MAGIC: u32 = u32::from_le_bytes(*b"DDS ");
const HEADER_SIZE: u32 = 124;
const PIXEL_FORMAT_SIZE: u32 = 32;
const BITS_PER_PIXEL: u32 = 32;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x20000;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_RGB: u32 = 0x40;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;

const RED_MASK: u32 = 0x00FF_0000;
const GREEN_MASK: u32 = 0x0000_FF00;
const BLUE_MASK: u32 = 0x0000_00FF;
const ALPHA_MASK: u32 = 0xFF00_0000;

const HEADER_LEN: usize = mem::size_of::<Header>();

type Words = [u32; HEADER_LEN / mem::size_of::<u32>()];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct Header {
    magic: u32,
    size: u32,
    flags: u32,
    height: u32,
    width: u32,
    pitch_or_linear_size: u32,
    depth: u32,
    mip_count: u32,
    reserved: [u32; 11],
    pixel_format: PixelFormat,
    caps: [u32; 4],
    reserved2: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PixelFormat {
    size: u32,
    flags: u32,
    four_cc: u32,
    bit_count: u32,
    masks: [u32; 4],
}

impl Header {
    fn new(width: u32, height: u32, pitch: u32, mip_count: u32) -> Self {
        Self {
            magic: MAGIC,
            size: HEADER_SIZE,
            flags: DDSD_CAPS
                | DDSD_HEIGHT
                | DDSD_WIDTH
                | DDSD_PIXELFORMAT
                | DDSD_PITCH
                | DDSD_MIPMAPCOUNT,
            height,
            width,
            pitch_or_linear_size: pitch,
            depth: 0,
            mip_count,
            reserved: [0; 11],
            pixel_format: PixelFormat {
                size: PIXEL_FORMAT_SIZE,
                flags: DDPF_RGB | DDPF_ALPHAPIXELS,
                four_cc: 0,
                bit_count: BITS_PER_PIXEL,
                masks: [RED_MASK, GREEN_MASK, BLUE_MASK, ALPHA_MASK],
            },
            caps: [DDSCAPS_TEXTURE | DDSCAPS_MIPMAP | DDSCAPS_COMPLEX, 0, 0, 0],
            reserved2: 0,
        }
    }

    fn to_bytes(self) -> [u8; HEADER_LEN] {
        let words: Words = bytemuck::cast(self);
        bytemuck::cast(words.map(u32::to_le))
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        let words: Words = bytemuck::pod_read_unaligned(&bytes[..HEADER_LEN]);
        bytemuck::cast(words.map(u32::from_le))
    }

    fn is_supported(&self) -> bool {
        let pf = &self.pixel_format;
        self.size == HEADER_SIZE
            && pf.size == PIXEL_FORMAT_SIZE
            && pf.four_cc == 0
            && pf.bit_count == BITS_PER_PIXEL
            && pf.masks == [RED_MASK, GREEN_MASK, BLUE_MASK, ALPHA_MASK]
    }
}

/// Returns the number of bytes in a row of the top level.
fn pitch(width: u32) -> Option<u32> {
    let bits = u64::from(width) * u64::from(BITS_PER_PIXEL);
    u32::try_from(bits.div_ceil(8)).ok()
}

/// Returns dimensions of the mip level or `None` if the chain is already over.
fn level_size(width: u32, height: u32, level: usize) -> Option<(u32, u32)> {
    let level = u32::try_from(level).ok()?;
    let w = width.checked_shr(level)?;
    let h = height.checked_shr(level)?;
    (w != 0 && h != 0).then_some((w, h))
}

/// Encodes the mip chain in the DDS container.
///
/// Levels are ordered from the largest to the smallest, each level must be
/// exactly half of the previous one (rounded down).
///
/// # Errors
/// See [`Error`] for details.
pub fn encode(width: u32, height: u32, mips: &[Image]) -> Result<Vec<u8>, Error> {
    if mips.is_empty() {
        return Err(Error::NoLevels);
    }

    for (level, mip) in mips.iter().enumerate() {
        let expected = level_size(width, height, level);
        let found = mip.dimensions();
        if expected != Some(found) {
            return Err(Error::LevelSize {
                level,
                expected,
                found,
            });
        }
    }

    let pitch = pitch(width).ok_or(Error::TooWide(width))?;
    let mip_count = u32::try_from(mips.len()).map_err(|_| Error::NoLevels)?;
    let payload: usize = mips.iter().map(|mip| mip.as_bytes().len()).sum();
    let mut buf = Vec::with_capacity(HEADER_LEN + payload);
    buf.extend_from_slice(&Header::new(width, height, pitch, mip_count).to_bytes());
    for mip in mips {
        for px in mip.as_bytes().chunks_exact(4) {
            buf.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
    }

    Ok(buf)
}

/// The decoded DDS container.
pub struct Dds {
    pub width: u32,
    pub height: u32,
    pub mips: Vec<Image>,
}

/// Decodes the uncompressed DDS container.
///
/// # Errors
/// See [`Error`] for details.
pub fn decode(data: &[u8]) -> Result<Dds, Error> {
    if data.len() < HEADER_LEN {
        return Err(Error::Truncated);
    }

    let header = Header::from_bytes(data);
    if header.magic != MAGIC {
        return Err(Error::Magic(header.magic));
    }

    if !header.is_supported() {
        return Err(Error::Header);
    }

    let Header { width, height, .. } = header;
    let mip_count = usize::try_from(header.mip_count.max(1)).map_err(|_| Error::Header)?;
    let mut rest = &data[HEADER_LEN..];
    let mut mips = Vec::with_capacity(mip_count);
    for level in 0..mip_count {
        let size @ (w, h) = level_size(width, height, level).ok_or(Error::Header)?;
        let len = w as usize * h as usize * 4;
        if rest.len() < len {
            return Err(Error::Truncated);
        }

        let (pixels, tail) = rest.split_at(len);
        rest = tail;

        let rgba = pixels
            .chunks_exact(4)
            .flat_map(|px| [px[2], px[1], px[0], px[3]])
            .collect();

        mips.push(Image::from_raw(size, rgba).ok_or(Error::Truncated)?);
    }

    Ok(Dds {
        width,
        height,
        mips,
    })
}

#[derive(Debug)]
pub enum Error {
    /// There are no mip levels to encode.
    NoLevels,

    /// A mip level has unexpected dimensions.
    LevelSize {
        level: usize,
        expected: Option<(u32, u32)>,
        found: (u32, u32),
    },

    /// The row pitch of the top level doesn't fit in the header.
    TooWide(u32),

    /// The data ends before the container does.
    Truncated,

    /// The data doesn't start with the DDS magic.
    Magic(u32),

    /// The header describes a format this crate doesn't handle.
    Header,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoLevels => write!(f, "no mip levels to encode"),
            Self::LevelSize {
                level,
                expected: Some((ew, eh)),
                found: (w, h),
            } => write!(f, "mip level {level} is {w}x{h}, expected {ew}x{eh}"),
            Self::LevelSize {
                level,
                expected: None,
                ..
            } => write!(f, "mip level {level} is past the end of the chain"),
            Self::TooWide(width) => write!(f, "the width {width} is too large for dds"),
            Self::Truncated => write!(f, "truncated dds data"),
            Self::Magic(magic) => write!(f, "invalid dds magic {magic:#010x}"),
            Self::Header => write!(f, "unsupported dds header"),
        }
    }
}

impl error::Error for Error {}
