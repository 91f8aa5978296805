use {
    crate::{pack::Size, params::Mips},
    im::{Filter, Image},
};

/// Returns dimensions of the levels below the original image, each one is
/// half of the previous (rounded down). The chain stops before a dimension
/// reaches zero.
pub fn levels((width, height): Size, mips: Mips) -> impl Iterator<Item = Size> {
    (1..)
        .take_while(move |&level| mips.allows(level))
        .map_while(move |level| {
            let w = width.checked_shr(level)?;
            let h = height.checked_shr(level)?;
            (w != 0 && h != 0).then_some((w, h))
        })
}

/// Generates the mip chain below the original image.
///
/// Every level is resampled from the original image itself, not from the
/// previous level.
pub fn generate(original: &Image, mips: Mips, filter: Filter) -> Vec<Image> {
    levels(original.dimensions(), mips)
        .map(|size| original.resized(size, filter))
        .collect()
}

/// Allocates a transparent mip chain including the original level.
pub fn empty_chain(size: Size, mips: Mips) -> Vec<Image> {
    [size]
        .into_iter()
        .chain(levels(size, mips))
        .map(Image::empty)
        .collect()
}
