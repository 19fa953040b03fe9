//! Terrain kinds making up the island map.

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};

/// Terrain types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Highland,
    Lowland,
    Desert,
    Sea,
}

impl Terrain {
    pub const ALL: [Terrain; 4] = [
        Terrain::Highland,
        Terrain::Lowland,
        Terrain::Desert,
        Terrain::Sea,
    ];

    /// Parse a map character
    pub fn from_code(code: char) -> Result<Self> {
        match code {
            'H' => Ok(Terrain::Highland),
            'L' => Ok(Terrain::Lowland),
            'D' => Ok(Terrain::Desert),
            'W' => Ok(Terrain::Sea),
            other => Err(SimError::validation(format!(
                "unrecognised terrain code '{}'",
                other
            ))),
        }
    }

    /// Map character for this terrain
    pub fn code(&self) -> char {
        match self {
            Terrain::Highland => 'H',
            Terrain::Lowland => 'L',
            Terrain::Desert => 'D',
            Terrain::Sea => 'W',
        }
    }

    /// Can animals live here (and migrate here)?
    #[inline]
    pub fn is_habitable(&self) -> bool {
        !matches!(self, Terrain::Sea)
    }

    /// Does fodder grow here?
    #[inline]
    pub fn grows_fodder(&self) -> bool {
        matches!(self, Terrain::Highland | Terrain::Lowland)
    }

    /// Get color code for terminal rendering (ANSI)
    pub fn color_code(&self) -> &'static str {
        match self {
            Terrain::Highland => "\x1b[92m", // Bright green
            Terrain::Lowland => "\x1b[32m",  // Green
            Terrain::Desert => "\x1b[33m",   // Yellow
            Terrain::Sea => "\x1b[34m",      // Blue
        }
    }
}
