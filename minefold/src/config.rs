use thiserror::Error;

use crate::topology::Surface;

/// The largest possible safe zone around a first click: the cell itself
/// plus up to eight neighbours.
const MAX_SAFE_ZONE: usize = 9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board must have positive dimensions, got {width}x{height}")]
    EmptyBoard { width: usize, height: usize },
    #[error("{mines} mines do not leave room for a first click on {width}x{height}")]
    TooManyMines {
        mines: usize,
        width: usize,
        height: usize,
    },
}

/// A requested game: dimensions, mine total, and surface identification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub width: usize,
    pub height: usize,
    pub mines: usize,
    pub surface: Surface,
}

impl BoardConfig {
    /// Checks the bounds every first click must survive. Uses the maximal
    /// safe-zone size, so a config that passes here is placeable from any
    /// starting cell.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyBoard {
                width: self.width,
                height: self.height,
            });
        }
        let cells = self.width * self.height;
        if self.mines > cells.saturating_sub(MAX_SAFE_ZONE) {
            return Err(ConfigError::TooManyMines {
                mines: self.mines,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }
}

/// Stock difficulty settings.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum Preset {
    Beginner,
    Intermediate,
    Expert,
    Maniac,
}

impl Preset {
    /// `(width, height, mines)` of the preset.
    pub fn dimensions(self) -> (usize, usize, usize) {
        match self {
            Preset::Beginner => (9, 9, 10),
            Preset::Intermediate => (16, 16, 40),
            Preset::Expert => (30, 16, 99),
            Preset::Maniac => (48, 24, 256),
        }
    }

    pub fn config(self, surface: Surface) -> BoardConfig {
        let (width, height, mines) = self.dimensions();
        BoardConfig {
            width,
            height,
            mines,
            surface,
        }
    }
}
