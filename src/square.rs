use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PositionError;
use crate::piece::PieceId;

/// A board coordinate. `x` is the file (0 = a), `y` is the rank (0 = rank 1).
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    /// Returns `None` when either component is off the 8x8 grid.
    pub fn new(x: usize, y: usize) -> Option<Coord> {
        if x < 8 && y < 8 {
            Some(Coord { x, y })
        } else {
            None
        }
    }

    /// Step by a signed offset. Off-board results are `None`, which every
    /// move generator treats as "skip this direction".
    pub fn offset(self, dx: i32, dy: i32) -> Option<Coord> {
        let x = self.x as i32 + dx;
        let y = self.y as i32 + dy;
        if (0..8).contains(&x) && (0..8).contains(&y) {
            Some(Coord { x: x as usize, y: y as usize })
        } else {
            None
        }
    }

    /// Iterate all 64 coordinates, rank 1 first.
    pub fn all() -> impl Iterator<Item = Coord> {
        (0..8).flat_map(|y| (0..8).map(move |x| Coord { x, y }))
    }

    /// Algebraic coordinate, e.g. "e4".
    pub fn to_algebraic(self) -> String {
        let file = (b'a' + self.x as u8) as char;
        let rank = (b'1' + self.y as u8) as char;
        format!("{file}{rank}")
    }

    pub fn from_algebraic(s: &str) -> Option<Coord> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return None;
        }
        let x = bytes[0].checked_sub(b'a')? as usize;
        let y = bytes[1].checked_sub(b'1')? as usize;
        Coord::new(x, y)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_algebraic())
    }
}

impl FromStr for Coord {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coord::from_algebraic(s).ok_or_else(|| PositionError::Square(s.to_string()))
    }
}

/// One cell of the grid. The occupant is an index into the board's piece
/// set; the piece stores this square's coordinate in turn.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Square {
    pub coord: Coord,
    pub occupant: Option<PieceId>,
    /// Set on the square a pawn skipped over with a double step, for one ply.
    pub en_passant: bool,
}

impl Square {
    pub fn new(coord: Coord) -> Self {
        Square { coord, occupant: None, en_passant: false }
    }

    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algebraic_maps_both_ways() {
        let e4 = Coord::new(4, 3).unwrap();
        assert_eq!(e4.to_algebraic(), "e4");
        assert_eq!(Coord::from_algebraic("e4"), Some(e4));
        assert_eq!("h8".parse::<Coord>(), Ok(Coord { x: 7, y: 7 }));
    }

    #[test]
    fn rejects_off_board_coordinates() {
        assert_eq!(Coord::from_algebraic("i1"), None);
        assert_eq!(Coord::from_algebraic("a9"), None);
        assert_eq!(Coord::from_algebraic("a"), None);
        assert!("z0".parse::<Coord>().is_err());
        assert_eq!(Coord::new(8, 0), None);
    }

    #[test]
    fn offset_stops_at_the_edge() {
        let a1 = Coord { x: 0, y: 0 };
        assert_eq!(a1.offset(-1, 0), None);
        assert_eq!(a1.offset(0, -1), None);
        assert_eq!(a1.offset(1, 2), Some(Coord { x: 1, y: 2 }));
        assert_eq!(Coord { x: 7, y: 7 }.offset(1, 1), None);
    }

    #[test]
    fn all_yields_every_square_once() {
        let all: Vec<Coord> = Coord::all().collect();
        assert_eq!(all.len(), 64);
        assert_eq!(all[0], Coord { x: 0, y: 0 });
        assert_eq!(all[63], Coord { x: 7, y: 7 });
    }
}
