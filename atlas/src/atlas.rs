use {
    crate::{
        asset::{Asset, ImageData, Status},
        pack::{area, Packer, Rect, Size},
        params::Parameters,
    },
    im::Image,
    std::{cmp::Reverse, fmt, num::NonZeroU32},
};

/// Receives notifications as assets pass through the pipeline.
///
/// Notifications are advisory, they don't affect the result.
pub trait Observer {
    /// The source pixels are decoded.
    fn loaded(&mut self, _asset: &Asset) {}

    /// The mip chain is generated.
    fn processed(&mut self, _asset: &Asset) {}

    /// The asset is merged into the atlas.
    fn packed(&mut self, _asset: &Asset) {}
}

impl Observer for () {}

/// How children are placed in the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// All images have the same size and lie in a row-major grid.
    Grid,

    /// Images of different sizes are placed by dividing the atlas plane.
    Partitioned,
}

/// The composed texture atlas.
pub struct Atlas {
    asset: Asset,
    layout: Layout,
    children: Vec<Asset>,
    dropped: Vec<Asset>,
    missing: Vec<Asset>,
}

impl Atlas {
    #[must_use]
    pub fn name(&self) -> &str {
        self.asset.name()
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.asset.size()
    }

    /// Returns the atlas mip chain, the largest level goes first.
    #[must_use]
    pub fn mips(&self) -> &[Image] {
        self.asset.mips()
    }

    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Returns merged assets in the packing order.
    /// Their pixels are released, placements remain.
    #[must_use]
    pub fn children(&self) -> &[Asset] {
        &self.children
    }

    /// Returns assets which didn't fit in the atlas.
    #[must_use]
    pub fn dropped(&self) -> &[Asset] {
        &self.dropped
    }

    /// Returns assets which sources couldn't be loaded.
    #[must_use]
    pub fn missing(&self) -> &[Asset] {
        &self.missing
    }

    /// Returns names and placements of merged assets in the packing order.
    pub fn placements(&self) -> impl Iterator<Item = (&str, Rect)> {
        self.children
            .iter()
            .filter_map(|child| Some((child.name(), child.placement()?)))
    }

    #[must_use]
    pub fn into_mips(self) -> Vec<Image> {
        self.asset.into_mips()
    }

    fn grid<O>(&mut self, assets: Vec<Asset>, columns: NonZeroU32, observer: &mut O)
    where
        O: Observer,
    {
        let columns = columns.get();
        for (idx, mut asset) in (0..).zip(assets) {
            let (x, y) = (idx % columns, idx / columns);
            for (mip, dest) in asset.mips().iter().zip(self.asset.mips_mut()) {
                let (w, h) = mip.dimensions();
                dest.copy_from(mip, (x * w, y * h));
            }

            let size @ (w, h) = asset.size();
            asset.place(Rect::new((x * w, y * h), size));
            self.merge(asset, observer);
        }
    }

    fn partition<O>(&mut self, mut assets: Vec<Asset>, observer: &mut O)
    where
        O: Observer,
    {
        assets.sort_by_key(|asset| Reverse(area(asset.size())));

        let mut packer = Packer::new(self.size());
        for mut asset in assets {
            let Some(rect) = packer.insert(asset.size()) else {
                let (w, h) = asset.size();
                log::warn!(
                    "no space left for {} ({w}x{h}) in the atlas {}, dropping it",
                    asset.name(),
                    self.name(),
                );

                self.dropped.push(asset);
                continue;
            };

            let (x, y) = rect.point;
            let levels = asset.mips().iter().zip(self.asset.mips_mut());
            for (level, (mip, dest)) in levels.enumerate() {
                dest.copy_from(mip, (x >> level, y >> level));
            }

            asset.place(rect);
            self.merge(asset, observer);
        }
    }

    fn merge<O>(&mut self, mut asset: Asset, observer: &mut O)
    where
        O: Observer,
    {
        asset.release();
        observer.packed(&asset);
        self.children.push(asset);
    }
}

/// Make an atlas from encoded images.
///
/// Every source is loaded, then mip chains are generated, then assets are
/// composed in the atlas. Sources that can't be loaded are kept as missing.
///
/// # Errors
/// See [`Error`] type for details.
pub fn make<D, O>(
    name: &str,
    data: D,
    params: &Parameters,
    observer: &mut O,
) -> Result<Atlas, Error>
where
    D: IntoIterator<Item = ImageData>,
    O: Observer,
{
    let mut assets: Vec<_> = data
        .into_iter()
        .enumerate()
        .map(|(id, data)| {
            let asset = Asset::load(id, data);
            if asset.is_ready() {
                observer.loaded(&asset);
            }

            asset
        })
        .collect();

    for asset in assets.iter_mut().filter(|asset| asset.is_ready()) {
        asset.process(params);
        observer.processed(asset);
    }

    compose(name, assets, params, observer)
}

/// Composes processed assets in an atlas.
///
/// If all loaded assets have the same size, they are placed in a grid with
/// the given number of columns. Otherwise the atlas plane is sized from the
/// first loaded asset and divided between assets, larger ones go first.
/// An asset that doesn't fit is dropped.
///
/// # Errors
/// See [`Error`] type for details.
pub fn compose<O>(
    name: &str,
    assets: Vec<Asset>,
    params: &Parameters,
    observer: &mut O,
) -> Result<Atlas, Error>
where
    O: Observer,
{
    let (ready, missing): (Vec<_>, Vec<_>) = assets.into_iter().partition(Asset::is_ready);
    for asset in &missing {
        if let Status::Missing(reason) = asset.status() {
            log::warn!("missing source {}: {reason}", asset.name());
        }
    }

    let Some(first) = ready.first() else {
        return Err(Error::Empty);
    };

    let tile = first.size();
    let count = u32::try_from(ready.len()).map_err(|_| Error::TooLarge)?;
    let columns = params.columns.get();
    let (layout, rows) = if ready.iter().all(|asset| asset.size() == tile) {
        (Layout::Grid, 1 + (count - 1) / columns)
    } else {
        (Layout::Partitioned, 1 + count / columns)
    };

    let size = columns
        .checked_mul(tile.0)
        .zip(rows.checked_mul(tile.1))
        .ok_or(Error::TooLarge)?;

    log::debug!(
        "atlas {name} is {}x{} ({layout:?}, {count} images)",
        size.0,
        size.1,
    );

    let mut atlas = Atlas {
        asset: Asset::atlas(name, size, params),
        layout,
        children: Vec::with_capacity(ready.len()),
        dropped: vec![],
        missing,
    };

    match layout {
        Layout::Grid => atlas.grid(ready, params.columns, observer),
        Layout::Partitioned => atlas.partition(ready, observer),
    }

    Ok(atlas)
}

#[derive(Debug)]
pub enum Error {
    /// No source image was loaded.
    Empty,

    /// The atlas dimensions don't fit in 32 bits.
    TooLarge,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "no images to make an atlas from"),
            Self::TooLarge => write!(f, "the atlas is too large"),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            asset::{Id, Missing},
            params::Mips,
        },
        im::{Filter, Rgba},
    };

    fn solid((w, h): Size, shade: u8) -> Image {
        let mut im = Image::empty((w, h));
        for x in 0..w {
            for y in 0..h {
                im.put_pixel(x, y, Rgba([shade, shade, shade, 255]));
            }
        }

        im
    }

    fn params(mip_count: i32, columns: u32) -> Parameters {
        Parameters::new(mip_count, Filter::Nearest, columns).expect("params")
    }

    fn processed(assets: &[(Size, u8)], params: &Parameters) -> Vec<Asset> {
        (0..)
            .zip(assets)
            .map(|(id, &(size, shade))| {
                let mut asset = Asset::new(id, format!("{id}.png"), solid(size, shade));
                asset.process(params);
                asset
            })
            .collect()
    }

    fn assert_disjoint(atlas: &Atlas) {
        let bounds = Rect::new((0, 0), atlas.size());
        let rects: Vec<_> = atlas.placements().map(|(_, rect)| rect).collect();
        for (i, &a) in rects.iter().enumerate() {
            assert!(bounds.contains(a));
            for &b in &rects[i + 1..] {
                assert!(!a.intersects(b));
            }
        }
    }

    #[derive(Default)]
    struct Events(Vec<(&'static str, Id)>);

    impl Observer for Events {
        fn loaded(&mut self, asset: &Asset) {
            self.0.push(("loaded", asset.id()));
        }

        fn processed(&mut self, asset: &Asset) {
            self.0.push(("processed", asset.id()));
        }

        fn packed(&mut self, asset: &Asset) {
            self.0.push(("packed", asset.id()));
        }
    }

    #[test]
    fn uniform_row() {
        let params = params(0, 3);
        let assets = processed(&[((64, 64), 10), ((64, 64), 20), ((64, 64), 30)], &params);
        let atlas = compose("atlas", assets, &params, &mut ()).expect("compose");

        assert_eq!(atlas.layout(), Layout::Grid);
        assert_eq!(atlas.size(), (192, 64));
        assert_eq!(atlas.mips().len(), 1);

        let xs: Vec<_> = atlas.placements().map(|(_, rect)| rect.point).collect();
        assert_eq!(xs, [(0, 0), (64, 0), (128, 0)]);

        let level = &atlas.mips()[0];
        assert_eq!(level.pixel(0, 0), Rgba([10, 10, 10, 255]));
        assert_eq!(level.pixel(64, 63), Rgba([20, 20, 20, 255]));
        assert_eq!(level.pixel(191, 0), Rgba([30, 30, 30, 255]));
    }

    #[test]
    fn uniform_grid() {
        let params = params(-1, 2);
        let assets: Vec<(Size, u8)> = (0..5).map(|i| ((8, 4), 50 * i)).collect();
        let atlas = compose("atlas", processed(&assets, &params), &params, &mut ())
            .expect("compose");

        assert_eq!(atlas.size(), (16, 12));
        for (idx, child) in (0..).zip(atlas.children()) {
            let rect = child.placement().expect("placement");
            assert_eq!(rect, Rect::new((idx % 2 * 8, idx / 2 * 4), (8, 4)));
            assert!(child.mips().is_empty());
        }

        assert_disjoint(&atlas);

        // the fourth image lies in cell (1, 1), at level 1 it is 4x2
        let level = &atlas.mips()[1];
        assert_eq!(level.dimensions(), (8, 6));
        assert_eq!(level.pixel(4, 2), Rgba([150, 150, 150, 255]));
        assert_eq!(level.pixel(7, 3), Rgba([150, 150, 150, 255]));
        assert_eq!(level.pixel(0, 4), Rgba([200, 200, 200, 255]));
        assert_eq!(level.pixel(4, 4), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn grid_height() {
        for (count, columns, rows) in [(1, 1, 1), (2, 1, 2), (3, 3, 1), (4, 3, 2), (7, 2, 4)] {
            let params = params(0, columns);
            let assets = processed(&vec![((2, 3), 1); count], &params);
            let atlas = compose("atlas", assets, &params, &mut ()).expect("compose");
            assert_eq!(atlas.size(), (2 * columns, 3 * rows));
            assert_disjoint(&atlas);
        }
    }

    #[test]
    fn partitioned() {
        let params = params(-1, 2);
        let assets = processed(&[((100, 60), 100), ((40, 40), 200)], &params);
        let atlas = compose("atlas", assets, &params, &mut ()).expect("compose");

        assert_eq!(atlas.layout(), Layout::Partitioned);
        assert_eq!(atlas.size(), (200, 120));
        assert!(atlas.dropped().is_empty());

        let placements: Vec<_> = atlas.placements().collect();
        assert_eq!(
            placements,
            [
                ("0.png", Rect::new((0, 0), (100, 60))),
                ("1.png", Rect::new((0, 60), (40, 40))),
            ],
        );

        assert_disjoint(&atlas);

        let level = &atlas.mips()[0];
        assert_eq!(level.pixel(99, 59), Rgba([100, 100, 100, 255]));
        assert_eq!(level.pixel(39, 99), Rgba([200, 200, 200, 255]));
        assert_eq!(level.pixel(40, 60), Rgba([0, 0, 0, 0]));

        let level = &atlas.mips()[2];
        assert_eq!(level.dimensions(), (50, 30));
        assert_eq!(level.pixel(24, 14), Rgba([100, 100, 100, 255]));
        assert_eq!(level.pixel(0, 15), Rgba([200, 200, 200, 255]));
        assert_eq!(level.pixel(9, 24), Rgba([200, 200, 200, 255]));
        assert_eq!(level.pixel(10, 15), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn larger_first() {
        let params = params(0, 2);
        let assets = processed(&[((20, 20), 1), ((10, 10), 2), ((30, 5), 3)], &params);
        let atlas = compose("atlas", assets, &params, &mut ()).expect("compose");
        let names: Vec<_> = atlas.placements().map(|(name, _)| name).collect();
        assert_eq!(names, ["0.png", "2.png", "1.png"]);
        assert_disjoint(&atlas);
    }

    #[test]
    fn drop_and_continue() {
        let params = params(0, 2);
        let assets = processed(&[((40, 40), 1), ((100, 60), 2), ((20, 20), 3)], &params);
        let atlas = compose("atlas", assets, &params, &mut ()).expect("compose");

        assert_eq!(atlas.size(), (80, 80));
        let dropped: Vec<_> = atlas.dropped().iter().map(Asset::name).collect();
        assert_eq!(dropped, ["1.png"]);
        let names: Vec<_> = atlas.placements().map(|(name, _)| name).collect();
        assert_eq!(names, ["0.png", "2.png"]);
        assert_disjoint(&atlas);
    }

    #[test]
    fn missing_sources() {
        let params = params(0, 2);
        let mut assets = processed(&[((4, 4), 1), ((4, 4), 2)], &params);
        assets.insert(1, Asset::missing(7, "gone.png", Missing::Unreadable));
        let atlas = compose("atlas", assets, &params, &mut ()).expect("compose");

        assert_eq!(atlas.layout(), Layout::Grid);
        assert_eq!(atlas.size(), (8, 4));
        assert_eq!(atlas.children().len(), 2);
        assert_eq!(atlas.missing().len(), 1);
        assert_eq!(atlas.missing()[0].name(), "gone.png");
    }

    #[test]
    fn empty() {
        let params = params(0, 2);
        let assets = vec![Asset::missing(0, "gone.png", Missing::Unreadable)];
        assert!(matches!(
            compose("atlas", assets, &params, &mut ()),
            Err(Error::Empty),
        ));
    }

    #[test]
    fn make_from_data() {
        let png = |size, shade| im::encode_png(&solid(size, shade)).expect("encode");
        let data = vec![
            ImageData {
                name: "a.png".into(),
                data: Some(png((8, 8), 1)),
            },
            ImageData {
                name: "missing.png".into(),
                data: None,
            },
            ImageData {
                name: "b.png".into(),
                data: Some(png((8, 8), 2)),
            },
        ];

        let mut events = Events::default();
        let atlas = make("atlas", data, &params(-1, 2), &mut events).expect("make");

        assert_eq!(atlas.name(), "atlas");
        assert_eq!(atlas.size(), (16, 8));
        assert_eq!(atlas.mips().len(), 4);
        assert_eq!(atlas.missing().len(), 1);
        assert_eq!(
            events.0,
            [
                ("loaded", Id::Source(0)),
                ("loaded", Id::Source(2)),
                ("processed", Id::Source(0)),
                ("processed", Id::Source(2)),
                ("packed", Id::Source(0)),
                ("packed", Id::Source(2)),
            ],
        );

        let mips = atlas.into_mips();
        let level = &mips[3];
        assert_eq!(level.dimensions(), (2, 1));
        assert_eq!(level.pixel(0, 0), Rgba([1, 1, 1, 255]));
        assert_eq!(level.pixel(1, 0), Rgba([2, 2, 2, 255]));
    }

    #[test]
    fn dropped_are_not_packed() {
        let params = params(0, 1);
        let mut events = Events::default();
        let assets = processed(&[((10, 10), 1), ((30, 30), 2)], &params);
        let atlas = compose("atlas", assets, &params, &mut events).expect("compose");

        assert_eq!(atlas.size(), (10, 30));
        assert_eq!(atlas.dropped().len(), 1);
        assert_eq!(events.0, [("packed", Id::Source(0))]);
    }
}
