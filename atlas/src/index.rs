use {
    crate::{atlas::Atlas, pack::Rect},
    serde::Serialize,
    std::io::{self, Write},
};

/// Writes the texture atlas index.
///
/// Every merged asset gets a line with its normalized offset and size in the
/// atlas, in the packing order.
///
/// # Errors
/// Returns an error if the writer fails.
pub fn write_index<W>(
    mut out: W,
    atlas: &Atlas,
    atlas_file: &str,
    invocation: &str,
) -> io::Result<()>
where
    W: Write,
{
    // there is only one atlas texture per index
    const ATLAS_INDEX: u32 = 0;
    const DEPTH: f64 = 0.;

    writeln!(out, "# {atlas_file}: {invocation}")?;

    let (width, height) = atlas.size();
    let (width, height) = (f64::from(width), f64::from(height));
    for (name, rect) in atlas.placements() {
        let Rect {
            point: (x, y),
            size: (w, h),
        } = rect;

        writeln!(
            out,
            "{name}\t\t{atlas_file}, {ATLAS_INDEX}, 2D, {:.6}, {:.6}, {DEPTH:.6}, {:.6}, {:.6}",
            f64::from(x) / width,
            f64::from(y) / height,
            f64::from(w) / width,
            f64::from(h) / height,
        )?;
    }

    writeln!(out)
}

/// Placements of atlas sprites.
#[derive(Serialize)]
pub struct Map<'a> {
    size: [u32; 2],
    mips: usize,
    sprites: Vec<Sprite<'a>>,
}

#[derive(Serialize)]
struct Sprite<'a> {
    name: &'a str,
    rect: Rect,
}

impl Atlas {
    #[must_use]
    pub fn map(&self) -> Map<'_> {
        let (width, height) = self.size();
        Map {
            size: [width, height],
            mips: self.mips().len(),
            sprites: self
                .placements()
                .map(|(name, rect)| Sprite { name, rect })
                .collect(),
        }
    }
}
