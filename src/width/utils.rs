//! Terminal display width helpers.
//!
//! Text surfaces are measured in display cells after stripping ANSI escapes,
//! so styled content occupies the same footprint as its plain form.

use crate::geometry::Size;

/// Compute the display width of a string after stripping ANSI escapes.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean_str = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean_str)
}

/// Widest line and line count of a block of text, clamped to `u16`.
pub fn text_extent(text: &str) -> Size {
    if text.is_empty() {
        return Size::ZERO;
    }
    let mut width = 0usize;
    let mut height = 0usize;
    for line in text.split('\n') {
        width = width.max(display_width(line));
        height += 1;
    }
    Size::new(
        width.min(u16::MAX as usize) as u16,
        height.min(u16::MAX as usize) as u16,
    )
}
