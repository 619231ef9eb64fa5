//! Panel layout
//!
//! Static geometry of the display: where each panel sits inside the global
//! bitmap. Declaration order fixes the screen id each panel is addressed by.

use serde::{Deserialize, Serialize};

use crate::protocol::Command;
use crate::FlipdotError;

/// A panel packs one column into one byte, so it can be at most this tall.
pub const MAX_PANEL_HEIGHT: usize = 8;

/// Position and size of one panel, as declared in the settings file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelDimension {
    /// Leftmost bitmap column
    pub start_x: usize,
    /// Top bitmap row
    pub start_y: usize,
    /// Width in dots
    pub width: usize,
    /// Height in dots
    pub height: usize,
}

impl PanelDimension {
    /// Create a panel dimension
    pub fn new(start_x: usize, start_y: usize, width: usize, height: usize) -> Self {
        Self {
            start_x,
            start_y,
            width,
            height,
        }
    }
}

/// A panel placed in a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panel {
    /// 1-based ordinal in declaration order
    pub id: u8,
    /// Leftmost bitmap column
    pub start_x: usize,
    /// Top bitmap row
    pub start_y: usize,
    /// Width in dots (and payload bytes)
    pub width: usize,
    /// Height in dots
    pub height: usize,
}

impl Panel {
    /// Screen id this panel answers to on the wire
    pub fn screen_id(&self) -> u8 {
        self.id
    }

    /// Number of dots on the panel
    pub fn dot_count(&self) -> usize {
        self.width * self.height
    }
}

/// Validated, immutable panel geometry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLayout {
    panels: Vec<Panel>,
    line_stride: usize,
    total_dot_count: usize,
}

impl PanelLayout {
    /// Build a layout from declared panels.
    ///
    /// `line_stride` is the width of one bitmap row in dots. When `rows` is
    /// given, panels must also fit vertically. Overlapping panels are allowed.
    pub fn new(
        dimensions: &[PanelDimension],
        line_stride: usize,
        rows: Option<usize>,
    ) -> Result<Self, FlipdotError> {
        if dimensions.is_empty() {
            return Err(FlipdotError::config("layout declares no panels"));
        }
        if dimensions.len() > u8::MAX as usize {
            return Err(FlipdotError::config(format!(
                "layout declares {} panels, at most {} can be addressed",
                dimensions.len(),
                u8::MAX
            )));
        }
        if line_stride == 0 {
            return Err(FlipdotError::config("lineStride must be positive"));
        }

        let mut panels = Vec::with_capacity(dimensions.len());
        for (i, dim) in dimensions.iter().enumerate() {
            let id = (i + 1) as u8;
            if dim.width == 0 || dim.height == 0 {
                return Err(FlipdotError::config(format!(
                    "panel {} has an empty size {}x{}",
                    id, dim.width, dim.height
                )));
            }
            if dim.height > MAX_PANEL_HEIGHT {
                return Err(FlipdotError::config(format!(
                    "panel {} is {} dots tall, at most {} fit in a column byte",
                    id, dim.height, MAX_PANEL_HEIGHT
                )));
            }
            if dim.width.checked_mul(dim.height).is_none() {
                return Err(FlipdotError::config(format!(
                    "panel {} is too large ({}x{})",
                    id, dim.width, dim.height
                )));
            }
            let end_x = dim
                .start_x
                .checked_add(dim.width)
                .ok_or_else(|| FlipdotError::config(format!("panel {} startX overflows", id)))?;
            if end_x > line_stride {
                return Err(FlipdotError::config(format!(
                    "panel {} spans columns {}..{} past lineStride {}",
                    id, dim.start_x, end_x, line_stride
                )));
            }
            let end_y = dim
                .start_y
                .checked_add(dim.height)
                .ok_or_else(|| FlipdotError::config(format!("panel {} startY overflows", id)))?;
            if let Some(rows) = rows {
                if end_y > rows {
                    return Err(FlipdotError::config(format!(
                        "panel {} spans rows {}..{} past the {} bitmap rows",
                        id, dim.start_y, end_y, rows
                    )));
                }
            }
            panels.push(Panel {
                id,
                start_x: dim.start_x,
                start_y: dim.start_y,
                width: dim.width,
                height: dim.height,
            });
        }

        // The expected bitmap length is the sum over panels, not stride * rows.
        let total_dot_count = panels
            .iter()
            .try_fold(0usize, |sum, panel| sum.checked_add(panel.dot_count()))
            .ok_or_else(|| FlipdotError::config("total dot count overflows"))?;

        for panel in &panels {
            // end_x and end_y were checked above, so only the row offset can overflow
            let last_index = (panel.start_y + panel.height - 1)
                .checked_mul(line_stride)
                .and_then(|row| row.checked_add(panel.start_x + panel.width - 1))
                .ok_or_else(|| {
                    FlipdotError::config(format!("panel {} lies outside any bitmap", panel.id))
                })?;
            if last_index >= total_dot_count {
                return Err(FlipdotError::config(format!(
                    "panel {} reads dot {} but the bitmap only holds {} dots",
                    panel.id, last_index, total_dot_count
                )));
            }
        }

        Ok(Self {
            panels,
            line_stride,
            total_dot_count,
        })
    }

    /// Panels in declaration (and transmission) order
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Number of panels
    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Dots per bitmap row
    pub fn line_stride(&self) -> usize {
        self.line_stride
    }

    /// Bitmap length the encoder accepts
    pub fn total_dot_count(&self) -> usize {
        self.total_dot_count
    }

    /// Reject panels whose width has no command byte in the wire protocol.
    ///
    /// A frame for such a panel would carry command `0x00`, which the panel
    /// controller rejects or misreads.
    pub fn ensure_addressable(&self) -> Result<(), FlipdotError> {
        for panel in &self.panels {
            if Command::for_payload(panel.width, true).is_none() {
                return Err(FlipdotError::config(format!(
                    "panel {} is {} dots wide; the protocol only addresses widths {:?}",
                    panel.id,
                    panel.width,
                    Command::SUPPORTED_WIDTHS
                )));
            }
        }
        Ok(())
    }
}
