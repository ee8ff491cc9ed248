//! Grid slots occupied by epics inside their parent's 3×3 board.

use serde::{Deserialize, Serialize};

/// One of the nine cells of a 3×3 grid.
///
/// Slot `0` is the centre, reserved for root epics. Slots `1..=8` run
/// clockwise from the top-left corner and hold sub-epics.
///
/// ```text
/// 1 2 3
/// 8 0 4
/// 7 6 5
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GridPosition {
    Center,
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

/// Raised when a slot number falls outside `0..=8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("grid position must be between 0 and 8, got {0}")]
pub struct InvalidGridPosition(pub u8);

impl GridPosition {
    /// The eight slots available to sub-epics, in allocation order.
    pub const SURROUNDING: [Self; 8] = [
        Self::TopLeft,
        Self::Top,
        Self::TopRight,
        Self::Right,
        Self::BottomRight,
        Self::Bottom,
        Self::BottomLeft,
        Self::Left,
    ];

    /// Slot number as stored and exchanged over the API.
    #[must_use]
    pub const fn slot(self) -> u8 {
        match self {
            Self::Center => 0,
            Self::TopLeft => 1,
            Self::Top => 2,
            Self::TopRight => 3,
            Self::Right => 4,
            Self::BottomRight => 5,
            Self::Bottom => 6,
            Self::BottomLeft => 7,
            Self::Left => 8,
        }
    }

    /// Whether this is the centre slot.
    #[must_use]
    pub const fn is_center(self) -> bool {
        matches!(self, Self::Center)
    }

    /// Zero-based `(row, column)` of the slot within the grid.
    #[must_use]
    pub const fn coordinates(self) -> (u8, u8) {
        match self {
            Self::TopLeft => (0, 0),
            Self::Top => (0, 1),
            Self::TopRight => (0, 2),
            Self::Left => (1, 0),
            Self::Center => (1, 1),
            Self::Right => (1, 2),
            Self::BottomLeft => (2, 0),
            Self::Bottom => (2, 1),
            Self::BottomRight => (2, 2),
        }
    }

    /// Lowest-numbered surrounding slot for which `occupied` returns false.
    pub fn first_free(occupied: impl Fn(Self) -> bool) -> Option<Self> {
        Self::SURROUNDING.into_iter().find(|slot| !occupied(*slot))
    }
}

impl TryFrom<u8> for GridPosition {
    type Error = InvalidGridPosition;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Center),
            1 => Ok(Self::TopLeft),
            2 => Ok(Self::Top),
            3 => Ok(Self::TopRight),
            4 => Ok(Self::Right),
            5 => Ok(Self::BottomRight),
            6 => Ok(Self::Bottom),
            7 => Ok(Self::BottomLeft),
            8 => Ok(Self::Left),
            other => Err(InvalidGridPosition(other)),
        }
    }
}

impl From<GridPosition> for u8 {
    fn from(value: GridPosition) -> Self {
        value.slot()
    }
}
