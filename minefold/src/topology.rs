use itertools::iproduct;
use thiserror::Error;

/// How the apparent edges of the board are identified with each other.
///
/// [`Surface::Square`] is the classical bounded board. The other kinds glue
/// one or both pairs of opposite edges together, optionally with a flip,
/// which removes the information-rich borders a solver normally leans on.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Surface {
    /// No identification; out-of-range neighbours do not exist.
    Square,
    /// Both axes wrap.
    Torus,
    /// Horizontal wrap with a vertical flip per lap; vertical edges are hard.
    Mobius,
    /// Horizontal wrap as on the Möbius band, plus a plain vertical wrap.
    Klein,
    /// Both axes wrap, each lap flipping the opposite axis.
    Projective,
}

impl Surface {
    pub fn wraps_horizontally(self) -> bool {
        !matches!(self, Surface::Square)
    }

    pub fn wraps_vertically(self) -> bool {
        matches!(self, Surface::Torus | Surface::Klein | Surface::Projective)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("{width}x{height} is not a valid size for {surface:?}; every axis needs length >= 2")]
    InvalidDimensions {
        width: usize,
        height: usize,
        surface: Surface,
    },
}

/// An immutable cell-adjacency graph for one board surface.
///
/// Cells are addressed by `idx = y * width + x`. Construction resolves the
/// eight grid offsets of every cell through the surface identification once,
/// so the solver's inner loops iterate neighbours without re-deriving any
/// wrapping arithmetic. Per-cell lists are sorted, duplicate-free and never
/// contain the cell itself; the relation is symmetric.
#[derive(Debug)]
pub struct Topology {
    width: usize,
    height: usize,
    surface: Surface,
    /// Neighbour indices of all cells, one contiguous run per cell.
    data: Vec<usize>,
    /// `data` range of cell `i` is `offsets[i]..offsets[i + 1]`.
    offsets: Vec<usize>,
}

impl Topology {
    /// Builds the adjacency graph for a `width` x `height` board.
    ///
    /// Both axes must have length at least 2: a length-1 axis leaves cells
    /// with fewer than three neighbours (and would collapse a wrapped axis
    /// into self-loops). With that bound every cell ends up with 3 to 8
    /// neighbours on every surface.
    pub fn new(width: usize, height: usize, surface: Surface) -> Result<Self, TopologyError> {
        if width < 2 || height < 2 {
            return Err(TopologyError::InvalidDimensions {
                width,
                height,
                surface,
            });
        }

        let cells = width * height;
        let mut data = Vec::with_capacity(cells * 8);
        let mut offsets = Vec::with_capacity(cells + 1);
        let mut adj = Vec::with_capacity(8);
        for (y, x) in iproduct!(0..height, 0..width) {
            offsets.push(data.len());
            let idx = y * width + x;
            adj.clear();
            for (dy, dx) in iproduct!(-1isize..=1, -1isize..=1) {
                if (dx, dy) == (0, 0) {
                    continue;
                }
                let target = identify(surface, x as isize + dx, y as isize + dy, width, height);
                if let Some((nx, ny)) = target {
                    adj.push(ny * width + nx);
                }
            }
            adj.sort_unstable();
            // Narrow wrapped boards reach the same cell via several offsets,
            // and a projective corner reaches itself through the antipodal
            // gluing; duplicates would double-count mines.
            adj.dedup();
            data.extend(adj.iter().copied().filter(|&n| n != idx));
        }
        offsets.push(data.len());

        Ok(Self {
            width,
            height,
            surface,
            data,
            offsets,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// The neighbours of `idx`, sorted ascending.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    pub fn neighbours(&self, idx: usize) -> &[usize] {
        &self.data[self.offsets[idx]..self.offsets[idx + 1]]
    }

    pub fn to_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    pub fn to_coord(&self, idx: usize) -> (usize, usize) {
        (idx % self.width, idx / self.width)
    }
}

/// Maps a raw `(nx, ny)` that may lie outside `[0, w) x [0, h)` onto the
/// surface, or discards it where the surface has a hard edge.
///
/// Wrapping uses mathematical modulo, and the lap count (`div_euclid`) on a
/// wrapped axis decides whether the identification flips the other
/// coordinate. Each identification is an involution of the plane, so the
/// resulting neighbour relation is symmetric.
fn identify(surface: Surface, nx: isize, ny: isize, w: usize, h: usize) -> Option<(usize, usize)> {
    let (w, h) = (w as isize, h as isize);
    let in_x = (0..w).contains(&nx);
    let in_y = (0..h).contains(&ny);
    let (x, y) = match surface {
        Surface::Square => {
            if !in_x || !in_y {
                return None;
            }
            (nx, ny)
        }
        Surface::Torus => (nx.rem_euclid(w), ny.rem_euclid(h)),
        Surface::Mobius => {
            if !in_y {
                return None;
            }
            let laps = nx.div_euclid(w);
            let x = nx.rem_euclid(w);
            let y = if laps.rem_euclid(2) == 1 { h - 1 - ny } else { ny };
            (x, y)
        }
        Surface::Klein => {
            let laps = nx.div_euclid(w);
            let x = nx.rem_euclid(w);
            let y = ny.rem_euclid(h);
            let y = if laps.rem_euclid(2) == 1 { h - 1 - y } else { y };
            (x, y)
        }
        Surface::Projective => {
            let laps_x = nx.div_euclid(w);
            let laps_y = ny.div_euclid(h);
            let mut x = nx.rem_euclid(w);
            let mut y = ny.rem_euclid(h);
            if laps_x.rem_euclid(2) == 1 {
                y = h - 1 - y;
            }
            if laps_y.rem_euclid(2) == 1 {
                x = w - 1 - x;
            }
            (x, y)
        }
    };
    Some((x as usize, y as usize))
}
