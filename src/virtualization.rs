//! Virtualization window
//!
//! Pure function of `(scroll_offset, row_height, viewport_height, overscan,
//! total_rows)`: which slice of the flattened row list must be rendered.

use std::ops::Range;

/// Inputs for [`compute_window`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowParams {
    /// Pixels scrolled from the top
    pub scroll_offset: u32,
    pub row_height: u32,
    pub viewport_height: u32,
    /// Extra rows rendered on each side of the viewport
    pub overscan: usize,
    pub total_rows: usize,
}

/// Rows to render for one scroll position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibleWindow {
    /// First rendered row, overscan included
    pub start: usize,
    /// One past the last rendered row
    pub end: usize,
    /// First row intersecting the viewport
    pub first_visible: usize,
    /// One past the last row intersecting the viewport
    pub last_visible: usize,
    /// Pixel offset of `start`
    pub offset_top: u64,
    /// Height of the whole list
    pub total_height: u64,
}

impl VisibleWindow {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Compute the rendered range, clamped to `[0, total_rows)`.
///
/// Offsets past the end are clamped so the last page stays filled.
pub fn compute_window(params: &WindowParams) -> VisibleWindow {
    let WindowParams {
        scroll_offset,
        row_height,
        viewport_height,
        overscan,
        total_rows,
    } = *params;

    if total_rows == 0 || row_height == 0 {
        return VisibleWindow::default();
    }

    let row_height = u64::from(row_height);
    let total_height = total_rows as u64 * row_height;
    let max_scroll = total_height.saturating_sub(u64::from(viewport_height));
    let offset = u64::from(scroll_offset).min(max_scroll);

    let first_visible = ((offset / row_height) as usize).min(total_rows - 1);
    let bottom = offset + u64::from(viewport_height);
    let last_visible = (bottom.div_ceil(row_height) as usize)
        .max(first_visible + 1)
        .min(total_rows);

    let start = first_visible.saturating_sub(overscan);
    let end = last_visible.saturating_add(overscan).min(total_rows);

    VisibleWindow {
        start,
        end,
        first_visible,
        last_visible,
        offset_top: start as u64 * row_height,
        total_height,
    }
}
