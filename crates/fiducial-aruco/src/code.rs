//! The 7x7 binary code carried by a marker.
//!
//! The outer ring of cells is black. Each of the 5 interior rows holds one of
//! four 5-bit codewords; bits 1 and 3 of a row carry 2 bits of identity, so
//! five rows encode ids `0..1024`.

use std::fmt;

use fiducial_core::{GrayImage, GrayImageView};
use serde::{Deserialize, Serialize};

use crate::MarkerError;

pub const CODE_SIZE: usize = 7;
pub const MAX_MARKER_ID: u32 = 1023;

/// Row codewords; index = the 2 identity bits of the row.
pub const CODEWORDS: [[u8; 5]; 4] = [
    [1, 0, 0, 0, 0],
    [1, 0, 1, 1, 1],
    [0, 1, 0, 0, 1],
    [0, 1, 1, 1, 0],
];

/// Outcome of matching a code against the codeword set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identification {
    pub id: u32,
    /// Clockwise quarter turns applied to the observed code to read it upright.
    pub rotations: u8,
}

/// 7x7 cells, `cells[row][col]`, 1 = white.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Code {
    cells: [[u8; CODE_SIZE]; CODE_SIZE],
}

impl Code {
    pub fn from_cells(cells: [[u8; CODE_SIZE]; CODE_SIZE]) -> Self {
        Self {
            cells: cells.map(|row| row.map(|v| u8::from(v != 0))),
        }
    }

    pub fn cells(&self) -> &[[u8; CODE_SIZE]; CODE_SIZE] {
        &self.cells
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, white: bool) {
        self.cells[row][col] = u8::from(white);
    }

    /// Code of marker `id` in its upright orientation.
    pub fn for_id(id: u32) -> Result<Self, MarkerError> {
        if id > MAX_MARKER_ID {
            return Err(MarkerError::IdOutOfRange(id));
        }
        let mut code = Self::default();
        for y in 0..5 {
            let word = &CODEWORDS[((id >> (2 * (4 - y))) & 3) as usize];
            for (x, &bit) in word.iter().enumerate() {
                code.cells[y + 1][x + 1] = bit;
            }
        }
        Ok(code)
    }

    /// Read a code from a binarized square patch. Each cell is `side / 7`
    /// pixels wide and counts as white when more than half its pixels are set.
    pub fn from_binary_patch(patch: &GrayImageView<'_>) -> Option<Self> {
        let cell = patch.width.min(patch.height) / CODE_SIZE;
        if cell == 0 {
            return None;
        }
        let half = cell * cell / 2;
        let mut code = Self::default();
        for row in 0..CODE_SIZE {
            for col in 0..CODE_SIZE {
                let white = patch.count_non_zero_in(col * cell, row * cell, cell, cell);
                code.set(row, col, white > half);
            }
        }
        Some(code)
    }

    /// Render as a `size x size` image; cells are `size / 7` pixels and any
    /// remainder on the right and bottom stays black.
    pub fn render(&self, size: usize) -> Result<GrayImage, MarkerError> {
        let cell = size / CODE_SIZE;
        if cell == 0 {
            return Err(MarkerError::ImageTooSmall(size));
        }
        let mut img = GrayImage::new(size, size);
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, &v) in cells.iter().enumerate() {
                if v != 0 {
                    img.fill_rect(col * cell, row * cell, cell, cell, 255);
                }
            }
        }
        Ok(img)
    }

    /// The code turned 90 degrees clockwise.
    pub fn rotated(&self) -> Self {
        let mut out = Self::default();
        for i in 0..CODE_SIZE {
            for j in 0..CODE_SIZE {
                out.cells[i][j] = self.cells[CODE_SIZE - 1 - j][i];
            }
        }
        out
    }

    /// Every cell of the outer ring is black.
    pub fn has_black_border(&self) -> bool {
        let last = CODE_SIZE - 1;
        (0..CODE_SIZE).all(|i| {
            self.cells[0][i] == 0 && self.cells[last][i] == 0 && self.cells[i][0] == 0 && self.cells[i][last] == 0
        })
    }

    /// Sum over interior rows of the distance to the nearest codeword.
    pub fn hamming_distance(&self) -> u32 {
        (0..5)
            .map(|y| {
                CODEWORDS
                    .iter()
                    .map(|word| {
                        word.iter()
                            .enumerate()
                            .filter(|&(x, &bit)| self.cells[y + 1][x + 1] != bit)
                            .count() as u32
                    })
                    .min()
                    .unwrap_or(0)
            })
            .sum()
    }

    /// Identity bits read MSB first from interior columns 1 and 3 of each row.
    pub fn id(&self) -> u32 {
        (1..=5).fold(0u32, |acc, row| {
            let acc = (acc << 1) | self.cells[row][2] as u32;
            (acc << 1) | self.cells[row][4] as u32
        })
    }

    /// Try all four orientations; the first with zero distance wins.
    pub fn identify(&self) -> Option<Identification> {
        let mut current = *self;
        let mut best: Option<(u32, u8, Code)> = None;
        for rotations in 0..4u8 {
            if rotations > 0 {
                current = current.rotated();
            }
            let d = current.hamming_distance();
            if best.is_none_or(|(bd, _, _)| d < bd) {
                best = Some((d, rotations, current));
            }
        }
        match best {
            Some((0, rotations, upright)) => Some(Identification {
                id: upright.id(),
                rotations,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.cells {
            for &v in row {
                f.write_str(if v != 0 { "1" } else { "0" })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_id_round_trips_upright() {
        for id in 0..=MAX_MARKER_ID {
            let code = Code::for_id(id).expect("valid id");
            assert!(code.has_black_border());
            assert_eq!(code.hamming_distance(), 0);
            assert_eq!(
                code.identify(),
                Some(Identification { id, rotations: 0 }),
                "id {id}"
            );
        }
    }

    #[test]
    fn quarter_turns_are_undone() {
        for id in [108u32, 300] {
            let mut code = Code::for_id(id).expect("valid id");
            // turning the observation counter-clockwise k times needs k clockwise turns back
            for k in 0..4u8 {
                assert_eq!(code.identify(), Some(Identification { id, rotations: k }), "id {id}, k {k}");
                code = code.rotated().rotated().rotated();
            }
        }
    }

    #[test]
    fn four_rotations_are_identity() {
        let code = Code::for_id(517).expect("valid id");
        assert_eq!(code.rotated().rotated().rotated().rotated(), code);
        assert_ne!(code.rotated(), code);
    }

    #[test]
    fn id_bits_follow_row_order() {
        // rows encode words 0,1,2,3,0
        let code = Code::for_id(0b00_01_10_11_00).expect("valid id");
        assert_eq!(code.to_string().lines().nth(1), Some("0100000"));
        assert_eq!(code.to_string().lines().nth(2), Some("0101110"));
        assert_eq!(code.to_string().lines().nth(3), Some("0010010"));
    }

    #[test]
    fn white_cell_in_border_is_detected() {
        let mut code = Code::for_id(3).expect("valid id");
        code.set(6, 3, true);
        assert!(!code.has_black_border());
    }

    #[test]
    fn corrupted_row_does_not_identify() {
        let mut code = Code::for_id(42).expect("valid id");
        // 11111 is one bit away from 10111 and never a codeword
        for x in 1..6 {
            code.set(3, x, true);
        }
        assert_eq!(code.hamming_distance(), 1);
        assert_eq!(code.identify(), None);
    }

    #[test]
    fn out_of_range_id_is_rejected() {
        assert_eq!(Code::for_id(1024), Err(MarkerError::IdOutOfRange(1024)));
    }

    #[test]
    fn patch_reading_uses_majority_per_cell() {
        let code = Code::for_id(777).expect("valid id");
        let img = code.render(70).expect("render");
        assert_eq!(Code::from_binary_patch(&img.view()), Some(code));

        let tiny = GrayImage::new(6, 6);
        assert_eq!(Code::from_binary_patch(&tiny.view()), None);
    }
}
