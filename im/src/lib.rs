use {
    image::{
        codecs::png::PngEncoder,
        imageops::{self, FilterType},
        ColorType, GenericImage, ImageEncoder, ImageError, RgbaImage,
    },
    std::{error, fmt, str},
};

pub use image::Rgba;

/// The interpolation mode used when an image is resampled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

impl str::FromStr for Filter {
    type Err = Unknown;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const NAMES: [(&str, Filter); 3] = [
            ("nearest", Filter::Nearest),
            ("bilinear", Filter::Bilinear),
            ("bicubic", Filter::Bicubic),
        ];

        NAMES
            .into_iter()
            .find_map(|(name, filter)| name.eq_ignore_ascii_case(s).then_some(filter))
            .ok_or_else(|| Unknown(s.into()))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Nearest => write!(f, "nearest"),
            Self::Bilinear => write!(f, "bilinear"),
            Self::Bicubic => write!(f, "bicubic"),
        }
    }
}

impl From<Filter> for FilterType {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Nearest => Self::Nearest,
            Filter::Bilinear => Self::Triangle,
            Filter::Bicubic => Self::CatmullRom,
        }
    }
}

/// An unknown interpolation mode name.
#[derive(Debug)]
pub struct Unknown(Box<str>);

impl fmt::Display for Unknown {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unknown interpolation mode {:?} (expected nearest, bilinear or bicubic)",
            self.0,
        )
    }
}

impl error::Error for Unknown {}

/// The 32 bits per pixel image buffer.
#[must_use]
#[derive(Clone)]
pub struct Image(RgbaImage);

impl Image {
    /// Creates a new transparent image.
    pub fn empty((width, height): (u32, u32)) -> Self {
        Self(RgbaImage::new(width, height))
    }

    /// Creates an image from row-major RGBA bytes.
    ///
    /// Returns `None` if the buffer length doesn't match the dimensions.
    #[must_use]
    pub fn from_raw((width, height): (u32, u32), data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(Self)
    }

    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    /// Returns row-major RGBA bytes of the image.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.0.get_pixel(x, y)
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, px: Rgba<u8>) {
        self.0.put_pixel(x, y, px);
    }

    /// Copies another image into this image at the given point.
    /// Pixels are replaced, no blending is performed.
    ///
    /// # Panics
    /// This function panics if the copied image doesn't fit.
    pub fn copy_from(&mut self, from: &Self, (x, y): (u32, u32)) {
        self.0.copy_from(&from.0, x, y).expect("copy image");
    }

    /// Resamples the image to new dimensions.
    pub fn resized(&self, (width, height): (u32, u32), filter: Filter) -> Self {
        Self(imageops::resize(&self.0, width, height, filter.into()))
    }
}

/// Decodes an image from bytes and converts it to 32 bits per pixel.
///
/// # Errors
/// See [`Error`] for details.
pub fn decode(data: &[u8]) -> Result<Image, Error> {
    let im = image::load_from_memory(data)?;
    Ok(Image(im.into_rgba8()))
}

/// Encodes the png image in a bytes buffer.
///
/// # Errors
/// See [`Error`] for details.
pub fn encode_png(im: &Image) -> Result<Vec<u8>, Error> {
    const DEFAULT_BUFFER_CAP: usize = 256;

    let mut buf = Vec::with_capacity(DEFAULT_BUFFER_CAP);
    let encoder = PngEncoder::new(&mut buf);
    let (width, height) = im.dimensions();
    encoder.write_image(im.as_bytes(), width, height, ColorType::Rgba8)?;
    Ok(buf)
}

/// The image error.
#[derive(Debug)]
pub enum Error {
    /// Error while decoding or encoding image data.
    Image(ImageError),
}

impl From<ImageError> for Error {
    fn from(v: ImageError) -> Self {
        Self::Image(v)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Image(err) => write!(f, "image error: {err}"),
        }
    }
}

impl error::Error for Error {}
