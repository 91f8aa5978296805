mod asset;
mod atlas;
mod index;
mod mip;
mod pack;
mod params;

pub use {
    crate::{
        asset::{Asset, Id, ImageData, Missing, Status},
        atlas::{compose, make, Atlas, Error, Layout, Observer},
        index::{write_index, Map},
        mip::{empty_chain, generate, levels},
        pack::{Packer, Point, Rect, Size},
        params::{Invalid, Mips, Parameters},
    },
    im::{Filter, Unknown},
};
