use {
    crate::{
        mip,
        pack::{Rect, Size},
        params::Parameters,
    },
    im::{Error as ImageError, Image},
    std::fmt,
};

/// The encoded source image.
pub struct ImageData {
    pub name: Box<str>,

    /// Source bytes, `None` if the source couldn't be read.
    pub data: Option<Vec<u8>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Id {
    /// Index of a source in the load order.
    Source(usize),

    /// The atlas itself.
    Atlas,
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Source(idx) => write!(f, "{idx}"),
            Self::Atlas => write!(f, "atlas"),
        }
    }
}

#[derive(Debug)]
pub enum Status {
    Ready,
    Missing(Missing),
}

/// The reason a source is missing.
#[derive(Debug)]
pub enum Missing {
    Unreadable,
    Decode(ImageError),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unreadable => write!(f, "the source can't be read"),
            Self::Decode(err) => write!(f, "{err}"),
        }
    }
}

/// A single image with its mip chain.
pub struct Asset {
    id: Id,
    name: Box<str>,
    size: Size,
    status: Status,
    mips: Vec<Image>,
    placement: Option<Rect>,
}

impl Asset {
    /// Creates a ready asset from the original image.
    pub fn new<S>(id: usize, name: S, original: Image) -> Self
    where
        S: Into<Box<str>>,
    {
        Self {
            id: Id::Source(id),
            name: name.into(),
            size: original.dimensions(),
            status: Status::Ready,
            mips: vec![original],
            placement: None,
        }
    }

    /// Creates an asset for a source without pixels.
    pub fn missing<S>(id: usize, name: S, reason: Missing) -> Self
    where
        S: Into<Box<str>>,
    {
        Self {
            id: Id::Source(id),
            name: name.into(),
            size: (0, 0),
            status: Status::Missing(reason),
            mips: vec![],
            placement: None,
        }
    }

    /// Decodes the source image.
    /// A source that can't be read or decoded becomes a missing asset.
    pub fn load(id: usize, ImageData { name, data }: ImageData) -> Self {
        let Some(data) = data else {
            return Self::missing(id, name, Missing::Unreadable);
        };

        match im::decode(&data) {
            Ok(original) => Self::new(id, name, original),
            Err(err) => Self::missing(id, name, Missing::Decode(err)),
        }
    }

    pub(crate) fn atlas(name: &str, size: Size, params: &Parameters) -> Self {
        Self {
            id: Id::Atlas,
            name: name.into(),
            size,
            status: Status::Ready,
            mips: mip::empty_chain(size, params.mips),
            placement: Some(Rect::new((0, 0), size)),
        }
    }

    /// Generates the mip chain of the asset.
    /// Does nothing for a missing asset.
    pub fn process(&mut self, params: &Parameters) {
        self.mips.truncate(1);
        if let Some(original) = self.mips.first() {
            let chain = mip::generate(original, params.mips, params.filter);
            self.mips.extend(chain);
        }
    }

    #[must_use]
    pub fn id(&self) -> Id {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns dimensions of the original image.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.status, Status::Ready)
    }

    /// Returns the mip chain, the original image goes first.
    #[must_use]
    pub fn mips(&self) -> &[Image] {
        &self.mips
    }

    pub(crate) fn mips_mut(&mut self) -> &mut [Image] {
        &mut self.mips
    }

    pub(crate) fn into_mips(self) -> Vec<Image> {
        self.mips
    }

    /// Returns where the original image lies in the atlas.
    #[must_use]
    pub fn placement(&self) -> Option<Rect> {
        self.placement
    }

    pub(crate) fn place(&mut self, rect: Rect) {
        self.placement = Some(rect);
    }

    pub(crate) fn release(&mut self) {
        self.mips = vec![];
    }
}
