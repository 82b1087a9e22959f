//! Measurement seams: a cheap text estimator and an exact cell/header probe.

use std::collections::HashMap;

use gridsync_model::SizingMode;

/// Fast, approximate width of plain text in the grid's cell font.
pub trait TextMeasurer {
    fn text_width(&self, text: &str) -> f64;
}

/// Header cell to be measured.
#[derive(Debug, Clone, Copy)]
pub struct HeaderProbe<'a> {
    pub markup: &'a str,
    pub classes: &'a [String],
    pub sizing_mode: SizingMode,
    pub show_sort: bool,
    pub show_menu: bool,
}

/// Data cell to be measured, with the row and cell classes applied to it.
#[derive(Debug, Clone, Copy)]
pub struct CellMeasure<'a> {
    pub markup: &'a str,
    pub row_classes: &'a [String],
    pub cell_classes: &'a [String],
    pub sizing_mode: SizingMode,
}

/// Exact width of a rendered cell or header, including padding, icons and class effects.
///
/// One probe is reused for every measurement, so implementations may keep state between calls.
pub trait CellProbe {
    fn header_width(&mut self, header: &HeaderProbe<'_>) -> f64;

    fn cell_width(&mut self, cell: &CellMeasure<'_>) -> f64;

    /// Horizontal indentation of one tree level.
    fn indent_per_level(&self) -> f64;
}

/// Deterministic metrics: fixed glyph width, fixed padding and per-class extras.
///
/// Stands in for a real font/layout engine in headless use.
#[derive(Debug, Clone)]
pub struct FixedMetrics {
    pub char_width: f64,
    pub cell_padding: f64,
    pub header_padding: f64,
    pub sort_icon_width: f64,
    pub menu_icon_width: f64,
    pub indent_px: f64,
    /// Width multiplier for `<b>` markup.
    pub bold_factor: f64,
    /// Extra width added when a row or cell carries the class.
    pub class_extra: HashMap<String, f64>,
}

impl Default for FixedMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            cell_padding: 12.0,
            header_padding: 12.0,
            sort_icon_width: 16.0,
            menu_icon_width: 16.0,
            indent_px: 20.0,
            bold_factor: 1.1,
            class_extra: HashMap::new(),
        }
    }
}

impl FixedMetrics {
    #[must_use]
    pub fn with_char_width(mut self, char_width: f64) -> Self {
        self.char_width = char_width;
        self
    }

    #[must_use]
    pub fn with_class_extra(mut self, class: impl Into<String>, extra: f64) -> Self {
        self.class_extra.insert(class.into(), extra);
        self
    }

    fn mode_scale(mode: SizingMode) -> f64 {
        match mode {
            SizingMode::Large => 1.15,
            SizingMode::Standard => 1.0,
            SizingMode::Compact => 0.93,
            SizingMode::Tiny => 0.85,
        }
    }

    fn markup_width(&self, markup: &str, mode: SizingMode) -> f64 {
        let mut width = self.text_width(&strip_tags(markup)) * Self::mode_scale(mode);
        if markup.contains("<b>") {
            width *= self.bold_factor;
        }
        width
    }

    fn classes_extra(&self, classes: &[String]) -> f64 {
        classes
            .iter()
            .flat_map(|it| it.split_whitespace())
            .filter_map(|class| self.class_extra.get(class))
            .sum()
    }
}

impl TextMeasurer for FixedMetrics {
    fn text_width(&self, text: &str) -> f64 {
        text.chars().count() as f64 * self.char_width
    }
}

impl CellProbe for FixedMetrics {
    fn header_width(&mut self, header: &HeaderProbe<'_>) -> f64 {
        let mut width = self.markup_width(header.markup, header.sizing_mode) + self.header_padding;
        if header.show_sort {
            width += self.sort_icon_width;
        }
        if header.show_menu {
            width += self.menu_icon_width;
        }
        width + self.classes_extra(header.classes)
    }

    fn cell_width(&mut self, cell: &CellMeasure<'_>) -> f64 {
        self.markup_width(cell.markup, cell.sizing_mode)
            + self.cell_padding
            + self.classes_extra(cell.row_classes)
            + self.classes_extra(cell.cell_classes)
    }

    fn indent_per_level(&self) -> f64 {
        self.indent_px
    }
}

/// Visible text of a markup string: tags removed, common entities decoded.
pub fn strip_tags(markup: &str) -> String {
    let mut ret = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => ret.push(c),
            _ => {}
        }
    }
    if ret.contains('&') {
        ret = ret
            .replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&amp;", "&");
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markup() {
        assert_eq!(strip_tags("<b>1,234</b> <span class=\"x\">USD</span>"), "1,234 USD");
        assert_eq!(strip_tags("a &amp; b"), "a & b");
    }

    #[test]
    fn classes_add_width() {
        let mut metrics = FixedMetrics::default().with_class_extra("bold", 4.0);
        let plain = metrics.cell_width(&CellMeasure {
            markup: "abc",
            row_classes: &[],
            cell_classes: &[],
            sizing_mode: SizingMode::Standard,
        });
        let classed = metrics.cell_width(&CellMeasure {
            markup: "abc",
            row_classes: &["bold other".to_string()],
            cell_classes: &[],
            sizing_mode: SizingMode::Standard,
        });
        assert_eq!(plain, 21.0 + 12.0);
        assert_eq!(classed, plain + 4.0);
    }
}
