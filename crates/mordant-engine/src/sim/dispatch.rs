//! Workgroup grids for the tiled compute kernels.

use crate::coords::Viewport;

/// Shape of one compute workgroup and the texels it is responsible for.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TileLayout {
    /// Threads per workgroup; must match `@workgroup_size` in the kernel.
    pub workgroup: [u32; 2],
    /// Texels handled by each thread.
    pub tile: [u32; 2],
    /// Border texels loaded for the kernel footprint but not written.
    pub halo: u32,
}

impl TileLayout {
    /// Texels loaded per workgroup, halo included.
    pub const fn cache_size(&self) -> [u32; 2] {
        [
            self.workgroup[0] * self.tile[0],
            self.workgroup[1] * self.tile[1],
        ]
    }

    /// Texels written per workgroup.
    pub const fn coverage(&self) -> [u32; 2] {
        let cache = self.cache_size();
        [cache[0] - 2 * self.halo, cache[1] - 2 * self.halo]
    }
}

/// Paint kernel: 8×8 threads, 3×3 texels each, no neighbourhood cache.
pub const PAINT_TILES: TileLayout = TileLayout {
    workgroup: [8, 8],
    tile: [3, 3],
    halo: 0,
};

/// Laplacian footprint of the reaction-diffusion kernel.
pub const REACTION_KERNEL_SIZE: u32 = 3;

/// Reaction-diffusion kernel: 8×8 threads, 2×2 texels each, a one texel halo
/// around the 16×16 cache.
pub const REACTION_TILES: TileLayout = TileLayout {
    workgroup: [8, 8],
    tile: [2, 2],
    halo: (REACTION_KERNEL_SIZE - 1) / 2,
};

/// Number of workgroups dispatched along each axis.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DispatchGrid {
    pub x: u32,
    pub y: u32,
    coverage: [u32; 2],
}

impl DispatchGrid {
    /// Smallest grid whose workgroups cover every texel of `size`.
    pub fn covering(size: Viewport, layout: TileLayout) -> Self {
        let coverage = layout.coverage();
        Self {
            x: size.width.div_ceil(coverage[0]),
            y: size.height.div_ceil(coverage[1]),
            coverage,
        }
    }

    /// Texel rectangle `[x0, x1) × [y0, y1)` written by workgroup `(gx, gy)`,
    /// before clipping to the field.
    pub fn workgroup_region(&self, gx: u32, gy: u32) -> ([u32; 2], [u32; 2]) {
        let origin = [gx * self.coverage[0], gy * self.coverage[1]];
        let end = [origin[0] + self.coverage[0], origin[1] + self.coverage[1]];
        (origin, end)
    }

    pub fn workgroup_count(&self) -> u32 {
        self.x * self.y
    }
}
