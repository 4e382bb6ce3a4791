use crate::geometry::{Rect, Size};
use crate::surface::Surface;

/// Greedy line-packing layout over a surface's children.
///
/// Children are placed left to right in their stored order. A child starts a
/// new line when it would push a non-empty line past the available width; a
/// child wider than the available width still gets a line of its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowLayout {
    pub h_gap: u16,
    pub v_gap: u16,
    pub padding: u16,
}

/// One packed row: indices into the measured children plus its extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowLine {
    pub items: Vec<usize>,
    pub width: u16,
    pub height: u16,
}

impl FlowLine {
    fn empty() -> Self {
        Self {
            items: Vec::new(),
            width: 0,
            height: 0,
        }
    }
}

impl FlowLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gaps(mut self, h_gap: u16, v_gap: u16) -> Self {
        self.h_gap = h_gap;
        self.v_gap = v_gap;
        self
    }

    pub fn with_padding(mut self, padding: u16) -> Self {
        self.padding = padding;
        self
    }

    /// Pack `sizes` into lines no wider than `width` minus padding.
    pub fn pack(&self, sizes: &[Size], width: u16) -> Vec<FlowLine> {
        let available = width.saturating_sub(self.padding.saturating_mul(2));
        let mut lines = Vec::new();
        let mut line = FlowLine::empty();

        for (index, size) in sizes.iter().enumerate() {
            let projected = line
                .width
                .saturating_add(size.width)
                .saturating_add(self.h_gap);
            if !line.items.is_empty() && projected > available {
                lines.push(std::mem::replace(&mut line, FlowLine::empty()));
            }
            line.width = if line.items.is_empty() {
                size.width
            } else {
                line.width.saturating_add(self.h_gap).saturating_add(size.width)
            };
            line.height = line.height.max(size.height);
            line.items.push(index);
        }
        if !line.items.is_empty() {
            lines.push(line);
        }
        lines
    }

    /// Size needed to show `sizes` when constrained to `width`.
    pub fn measure(&self, sizes: &[Size], width: u16) -> Size {
        let lines = self.pack(sizes, width);
        self.extent(&lines)
    }

    /// Place every child of `surface` inside `bounds` and size the surface.
    ///
    /// Child frames are relative to `surface`. The surface keeps the width of
    /// `bounds` and takes the measured height.
    pub fn arrange(&self, surface: &Surface, bounds: Rect) -> Size {
        let children = surface.children();
        let sizes: Vec<Size> = children.iter().map(Surface::preferred_size).collect();
        let lines = self.pack(&sizes, bounds.width);

        let mut y = self.padding;
        for line in &lines {
            let mut x = self.padding;
            for &index in &line.items {
                let size = sizes[index];
                children[index].set_frame(Rect::new(x, y, size.width, size.height));
                x = x.saturating_add(size.width).saturating_add(self.h_gap);
            }
            y = y.saturating_add(line.height).saturating_add(self.v_gap);
        }

        let measured = self.extent(&lines);
        surface.set_frame(Rect::new(bounds.x, bounds.y, bounds.width, measured.height));
        measured
    }

    fn extent(&self, lines: &[FlowLine]) -> Size {
        let padding = self.padding.saturating_mul(2);
        let width = lines.iter().map(|line| line.width).max().unwrap_or(0);
        let gaps = self
            .v_gap
            .saturating_mul(lines.len().saturating_sub(1) as u16);
        let height = lines
            .iter()
            .fold(gaps, |total, line| total.saturating_add(line.height));
        Size::new(width.saturating_add(padding), height.saturating_add(padding))
    }
}
