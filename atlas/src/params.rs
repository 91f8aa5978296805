use {
    im::Filter,
    std::{error, fmt, num::NonZeroU32},
};

/// How deep the mip chain goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mips {
    /// Halve the image until one of its dimensions reaches zero.
    Unlimited,

    /// Generate at most this many levels below the original image.
    Limited(u32),
}

impl Mips {
    pub(crate) fn allows(self, level: u32) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(n) => level <= n,
        }
    }
}

/// The atlas pipeline parameters.
#[derive(Clone, Copy, Debug)]
pub struct Parameters {
    pub mips: Mips,
    pub filter: Filter,
    pub columns: NonZeroU32,
}

impl Parameters {
    /// Creates new parameters.
    ///
    /// `mip_count` of -1 means an unlimited mip chain, zero disables it.
    ///
    /// # Errors
    /// This function returns an [error](Invalid) if a value is out of range.
    pub const fn new(mip_count: i32, filter: Filter, columns: u32) -> Result<Self, Invalid> {
        let mips = match mip_count {
            -1 => Mips::Unlimited,
            0.. => Mips::Limited(mip_count.unsigned_abs()),
            _ => return Err(Invalid::MipCount(mip_count)),
        };

        let Some(columns) = NonZeroU32::new(columns) else {
            return Err(Invalid::Columns(columns));
        };

        Ok(Self {
            mips,
            filter,
            columns,
        })
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            mips: Mips::Unlimited,
            filter: Filter::default(),
            columns: NonZeroU32::MIN,
        }
    }
}

#[derive(Debug)]
pub enum Invalid {
    MipCount(i32),
    Columns(u32),
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MipCount(n) => write!(f, "mip count {n} is invalid, expected -1 or more"),
            Self::Columns(n) => write!(f, "grid columns {n} is invalid, expected 1 or more"),
        }
    }
}

impl error::Error for Invalid {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_count() {
        let params = Parameters::new(-1, Filter::Nearest, 1).expect("params");
        assert_eq!(params.mips, Mips::Unlimited);
        assert!(params.mips.allows(30));

        let params = Parameters::new(0, Filter::Nearest, 1).expect("params");
        assert!(!params.mips.allows(1));

        let params = Parameters::new(2, Filter::Nearest, 1).expect("params");
        assert!(params.mips.allows(2));
        assert!(!params.mips.allows(3));

        assert!(matches!(
            Parameters::new(-2, Filter::Nearest, 1),
            Err(Invalid::MipCount(-2)),
        ));
    }

    #[test]
    fn columns() {
        let params = Parameters::new(-1, Filter::Bicubic, 4).expect("params");
        assert_eq!(params.columns.get(), 4);
        assert!(matches!(
            Parameters::new(-1, Filter::Bicubic, 0),
            Err(Invalid::Columns(0)),
        ));
    }

    #[test]
    fn invalid_is_error() {
        let err: Box<dyn error::Error> = Box::new(Invalid::Columns(0));
        assert_eq!(err.to_string(), "grid columns 0 is invalid, expected 1 or more");
    }
}
