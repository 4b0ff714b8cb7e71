//! Terrain classification grid.
//!
//! A level's terrain is a colour raster: every pixel's exact RGB value decides
//! what a particle at that pixel is inside.  [`TerrainField::classify`] turns
//! the raster into a [`TerrainClass`] grid once at level load; afterwards the
//! grid is read-only and queried per particle per tick.
//!
//! ## Colour table
//!
//! | RGB        | Class        | Passable |
//! |------------|--------------|----------|
//! | `#FFFFFF`  | `Air`        | yes      |
//! | `#A9D3FF`  | `Water`      | yes      |
//! | `#A26830`  | `Ground`     | no       |
//! | `#828181`  | `ReservedA`  | no       |
//! | `#7A6C62`  | `ReservedB`  | no       |
//! | anything   | `Solid`      | no       |
//!
//! Queries outside the grid report `Ground`, so the level edge behaves like a
//! wall.

use crate::constants::{
    AIR_COLOR, GROUND_COLOR, RESERVED_A_COLOR, RESERVED_B_COLOR, WATER_COLOR,
};
use crate::error::{LevelLoadError, LevelResult};
use bevy::math::DVec2;
use bevy::tasks::{ComputeTaskPool, TaskPool};

/// What a single terrain cell is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerrainClass {
    Air,
    Water,
    Ground,
    ReservedA,
    ReservedB,
    /// Any colour not in the table.
    Solid,
}

impl TerrainClass {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        match (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b) {
            AIR_COLOR => TerrainClass::Air,
            WATER_COLOR => TerrainClass::Water,
            GROUND_COLOR => TerrainClass::Ground,
            RESERVED_A_COLOR => TerrainClass::ReservedA,
            RESERVED_B_COLOR => TerrainClass::ReservedB,
            _ => TerrainClass::Solid,
        }
    }

    /// Particles may only occupy air and water.
    #[inline]
    pub fn is_passable(self) -> bool {
        matches!(self, TerrainClass::Air | TerrainClass::Water)
    }
}

/// Decoded RGB samples in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    samples: Vec<[u8; 3]>,
}

impl Raster {
    pub fn new(width: u32, height: u32, samples: Vec<[u8; 3]>) -> LevelResult<Self> {
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(LevelLoadError::RasterSize {
                expected: (width, height),
                got: (samples.len() as u32 / width.max(1), height),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Build from tightly packed RGBA8 bytes, dropping alpha.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> LevelResult<Self> {
        let samples = bytes
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2]])
            .collect();
        Self::new(width, height, samples)
    }

    /// A raster of one colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self {
            width,
            height,
            samples: vec![rgb; width as usize * height as usize],
        }
    }

    /// Paint the half-open rectangle `[x0, x1) × [y0, y1)`, clipped to the raster.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, rgb: [u8; 3]) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.samples[y as usize * self.width as usize + x as usize] = rgb;
            }
        }
    }
}

/// Row-major offset of a non-negative cell, computed in `usize` so large
/// rasters cannot overflow `i32`.
#[inline]
fn cell_index(width: i32, x: i32, y: i32) -> usize {
    y as usize * width as usize + x as usize
}

/// Per-cell terrain classes for one level.  Dimensions never change after load.
#[derive(Debug, Clone)]
pub struct TerrainField {
    width: i32,
    height: i32,
    cells: Vec<TerrainClass>,
}

impl TerrainField {
    /// Classify every raster sample.
    ///
    /// Rows are split into bands and classified on the compute task pool; the
    /// task scope does not return until every band is done.
    pub fn classify(raster: &Raster) -> Self {
        let width = raster.width as usize;
        let pool = ComputeTaskPool::get_or_init(TaskPool::default);
        let rows_per_band = (raster.height as usize)
            .div_ceil(pool.thread_num().max(1))
            .max(1);
        let band_len = (rows_per_band * width).max(1);

        let mut bands: Vec<(usize, Vec<TerrainClass>)> = pool.scope(|scope| {
            for (index, band) in raster.samples.chunks(band_len).enumerate() {
                scope.spawn(async move {
                    let classes = band
                        .iter()
                        .map(|&[r, g, b]| TerrainClass::from_rgb(r, g, b))
                        .collect::<Vec<_>>();
                    (index, classes)
                });
            }
        });
        bands.sort_unstable_by_key(|(index, _)| *index);

        Self {
            width: raster.width as i32,
            height: raster.height as i32,
            cells: bands.into_iter().flat_map(|(_, band)| band).collect(),
        }
    }

    /// Class at integer cell `(x, y)`; `Ground` for anything off the grid.
    #[inline]
    pub fn query(&self, x: i32, y: i32) -> TerrainClass {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return TerrainClass::Ground;
        }
        self.cells[cell_index(self.width, x, y)]
    }

    /// Class under a continuous position, truncating toward zero.
    #[inline]
    pub fn sample(&self, pos: DVec2) -> TerrainClass {
        self.query(pos.x as i32, pos.y as i32)
    }

    /// Whether `pos` lies within `[0, w-1] × [0, h-1]`.
    #[inline]
    pub fn in_bounds(&self, pos: DVec2) -> bool {
        pos.x >= 0.0
            && pos.y >= 0.0
            && pos.x <= (self.width - 1) as f64
            && pos.y <= (self.height - 1) as f64
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }
}
