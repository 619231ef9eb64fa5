//! Frame encoder
//!
//! Turns a full-resolution bitmap into one column-byte buffer per panel.
//!
//! Each byte holds one panel column. The panel's bottom row ends up in the most
//! significant used bit: rows are read from `height - 1` down to `0`, shifting
//! the accumulator left before each new dot. This matches how the dot
//! controllers are wired and must not be reordered.

use tracing::warn;

use crate::layout::{Panel, PanelLayout};
use crate::FlipdotError;

/// Column bytes for one panel; byte `i` is column `start_x + i`
pub type EncodedPanel = Vec<u8>;

/// Encode `bitmap` for every panel of `layout`, in declaration order.
///
/// `bitmap` is row-major with `layout.line_stride()` dots per row; zero is off,
/// anything else is on. A bitmap of the wrong length is rejected as a whole.
pub fn encode(bitmap: &[i32], layout: &PanelLayout) -> Result<Vec<EncodedPanel>, FlipdotError> {
    let expected = layout.total_dot_count();
    if bitmap.len() != expected {
        warn!(
            expected,
            actual = bitmap.len(),
            "dropping bitmap with wrong dot count"
        );
        return Err(FlipdotError::BitmapLength {
            expected,
            actual: bitmap.len(),
        });
    }

    Ok(layout
        .panels()
        .iter()
        .map(|panel| encode_panel(bitmap, layout.line_stride(), panel))
        .collect())
}

fn encode_panel(bitmap: &[i32], line_stride: usize, panel: &Panel) -> EncodedPanel {
    (panel.start_x..panel.start_x + panel.width)
        .map(|x| {
            let mut cell: u8 = 0;
            for y in (0..panel.height).rev() {
                let dot = bitmap[x + (panel.start_y + y) * line_stride] != 0;
                cell = (cell << 1) | dot as u8;
            }
            cell
        })
        .collect()
}
