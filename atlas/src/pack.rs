use {serde::Serialize, std::cmp::Reverse};

pub type Size = (u32, u32);
pub type Point = (u32, u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(into = "[u32; 4]")]
pub struct Rect {
    pub point: Point,
    pub size: Size,
}

impl Rect {
    #[must_use]
    pub const fn new(point: Point, size: Size) -> Self {
        Self { point, size }
    }

    /// Checks if the other rect lies fully within this one.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        let Self {
            point: (x, y),
            size: (w, h),
        } = self;

        let Self {
            point: (ox, oy),
            size: (ow, oh),
        } = other;

        ox >= x
            && oy >= y
            && u64::from(ox) + u64::from(ow) <= u64::from(x) + u64::from(w)
            && u64::from(oy) + u64::from(oh) <= u64::from(y) + u64::from(h)
    }

    /// Checks if the areas of two rects intersect.
    #[must_use]
    pub fn intersects(self, other: Self) -> bool {
        fn overlap(a: u32, alen: u32, b: u32, blen: u32) -> bool {
            u64::from(a) < u64::from(b) + u64::from(blen)
                && u64::from(b) < u64::from(a) + u64::from(alen)
        }

        overlap(self.point.0, self.size.0, other.point.0, other.size.0)
            && overlap(self.point.1, self.size.1, other.point.1, other.size.1)
    }

    /// Splits the rect in two parts so the first one has the given size along
    /// the axis with the larger slack.
    fn split(self, (width, height): Size) -> [Self; 2] {
        let Self {
            point: (x, y),
            size: (w, h),
        } = self;

        if w - width > h - height {
            [
                Self::new((x, y), (width, h)),
                Self::new((x + width, y), (w - width, h)),
            ]
        } else {
            [
                Self::new((x, y), (w, height)),
                Self::new((x, y + height), (w, h - height)),
            ]
        }
    }
}

impl From<Rect> for [u32; 4] {
    fn from(
        Rect {
            point: (x, y),
            size: (w, h),
        }: Rect,
    ) -> Self {
        [x, y, w, h]
    }
}

pub(crate) fn area((width, height): Size) -> u64 {
    u64::from(width) * u64::from(height)
}

#[derive(Clone, Copy)]
enum Kind {
    Free,
    Occupied,
    Split([usize; 2]),
}

#[derive(Clone, Copy)]
struct Node {
    rect: Rect,
    kind: Kind,
}

/// Divides a bounded plane to place rects with no overlaps.
///
/// Every free leaf is split in two when a smaller rect is inserted into it,
/// a split node is never split again.
pub struct Packer {
    nodes: Vec<Node>,
}

impl Packer {
    const ROOT: usize = 0;

    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            nodes: vec![Node {
                rect: Rect::new((0, 0), size),
                kind: Kind::Free,
            }],
        }
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.nodes[Self::ROOT].rect.size
    }

    /// Places a rect of the given size.
    ///
    /// Returns `None` if there is no free space for it.
    pub fn insert(&mut self, size: Size) -> Option<Rect> {
        self.insert_at(Self::ROOT, size)
    }

    /// Places rects in descending order of their area and stops at the first
    /// one that doesn't fit. Rects of the same area keep the input order.
    ///
    /// Returns placements in the input order, rects left out are `None`.
    pub fn pack_all(&mut self, sizes: &[Size]) -> Vec<Option<Rect>> {
        let mut order: Vec<_> = (0..sizes.len()).collect();
        order.sort_by_key(|&idx| Reverse(area(sizes[idx])));

        let mut placed = vec![None; sizes.len()];
        for idx in order {
            match self.insert(sizes[idx]) {
                Some(rect) => placed[idx] = Some(rect),
                None => break,
            }
        }

        placed
    }

    fn insert_at(&mut self, idx: usize, size @ (width, height): Size) -> Option<Rect> {
        let Node { rect, kind } = self.nodes[idx];
        match kind {
            Kind::Split([first, second]) => self
                .insert_at(first, size)
                .or_else(|| self.insert_at(second, size)),
            Kind::Occupied => None,
            Kind::Free => {
                let (w, h) = rect.size;
                if width > w || height > h {
                    return None;
                }

                if size == rect.size {
                    self.nodes[idx].kind = Kind::Occupied;
                    return Some(rect);
                }

                let [a, b] = rect.split(size).map(|rect| {
                    self.nodes.push(Node {
                        rect,
                        kind: Kind::Free,
                    });

                    self.nodes.len() - 1
                });

                self.nodes[idx].kind = Kind::Split([a, b]);
                self.insert_at(a, size)
            }
        }
    }
}
