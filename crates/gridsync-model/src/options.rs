//! Grid configuration passed explicitly to the reconciliation engine.

use serde::{Deserialize, Serialize};

/// Density of the grid's rows and headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizingMode {
    Large,
    #[default]
    Standard,
    Compact,
    Tiny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Desktop,
    Mobile,
}

/// One pixel value per sizing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeTable {
    pub large: u32,
    pub standard: u32,
    pub compact: u32,
    pub tiny: u32,
}

impl SizeTable {
    pub const fn new(large: u32, standard: u32, compact: u32, tiny: u32) -> Self {
        Self {
            large,
            standard,
            compact,
            tiny,
        }
    }

    pub fn get(&self, mode: SizingMode) -> u32 {
        match mode {
            SizingMode::Large => self.large,
            SizingMode::Standard => self.standard,
            SizingMode::Compact => self.compact,
            SizingMode::Tiny => self.tiny,
        }
    }
}

/// Row, group-row and header heights per sizing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowHeightTable {
    pub row: SizeTable,
    pub group_row: SizeTable,
    pub header: SizeTable,
}

impl RowHeightTable {
    pub const DESKTOP: Self = Self {
        row: SizeTable::new(32, 28, 24, 18),
        group_row: SizeTable::new(28, 24, 22, 18),
        header: SizeTable::new(28, 24, 22, 20),
    };

    pub const MOBILE: Self = Self {
        row: SizeTable::new(38, 34, 30, 26),
        group_row: SizeTable::new(38, 34, 30, 26),
        header: SizeTable::new(42, 38, 34, 30),
    };

    pub fn for_platform(platform: Platform) -> Self {
        match platform {
            Platform::Desktop => Self::DESKTOP,
            Platform::Mobile => Self::MOBILE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowSummary {
    #[default]
    None,
    Top,
    Bottom,
}

/// When header menu icons are visible, and so need room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMenuDisplay {
    #[default]
    Always,
    Hover,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutosizeMode {
    Disabled,
    OnDemand,
    #[default]
    OnSizingModeChange,
    Managed,
}

impl AutosizeMode {
    /// Whether a sizing mode change should trigger a full autosize.
    pub fn sizes_on_mode_change(self) -> bool {
        matches!(self, Self::OnSizingModeChange | Self::Managed)
    }
}

/// How leftover horizontal space is handed out after autosizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillMode {
    #[default]
    None,
    All,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosizeOptions {
    pub mode: AutosizeMode,
    /// Explicit subset of column ids. Setting this disables fill.
    pub columns: Option<Vec<String>>,
    pub rendered_rows_only: bool,
    pub include_collapsed_children: Option<bool>,
    pub show_mask: bool,
    /// Padding added to every measured width; defaults by platform.
    pub buffer_px: Option<u32>,
    pub fill_mode: FillMode,
}

impl Default for AutosizeOptions {
    fn default() -> Self {
        Self {
            mode: AutosizeMode::default(),
            columns: None,
            rendered_rows_only: false,
            include_collapsed_children: None,
            show_mask: false,
            buffer_px: None,
            fill_mode: FillMode::None,
        }
    }
}

impl AutosizeOptions {
    #[must_use]
    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_fill_mode(mut self, fill_mode: FillMode) -> Self {
        self.fill_mode = fill_mode;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: AutosizeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn buffer_px(&self, platform: Platform) -> u32 {
        self.buffer_px.unwrap_or(match platform {
            Platform::Desktop => 5,
            Platform::Mobile => 10,
        })
    }

    /// Fill mode, forced off when an explicit column subset is given.
    pub fn effective_fill_mode(&self) -> FillMode {
        if self.columns.is_some() {
            FillMode::None
        } else {
            self.fill_mode
        }
    }

    /// Merge per-call overrides onto these defaults.
    #[must_use]
    pub fn merged(&self, overrides: &AutosizeOverrides) -> Self {
        let mut ret = self.clone();
        if let Some(columns) = &overrides.columns {
            ret.columns = Some(columns.clone());
        }
        if let Some(rendered_rows_only) = overrides.rendered_rows_only {
            ret.rendered_rows_only = rendered_rows_only;
        }
        if let Some(include) = overrides.include_collapsed_children {
            ret.include_collapsed_children = Some(include);
        }
        if let Some(show_mask) = overrides.show_mask {
            ret.show_mask = show_mask;
        }
        if let Some(fill_mode) = overrides.fill_mode {
            ret.fill_mode = fill_mode;
        }
        ret
    }
}

/// Per-call autosize settings; unset fields fall back to the grid's [`AutosizeOptions`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosizeOverrides {
    pub columns: Option<Vec<String>>,
    pub rendered_rows_only: Option<bool>,
    pub include_collapsed_children: Option<bool>,
    pub show_mask: Option<bool>,
    pub fill_mode: Option<FillMode>,
}

impl AutosizeOverrides {
    pub fn columns<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: Some(columns.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }
}

/// Engine configuration. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub sizing_mode: SizingMode,
    pub tree_mode: bool,
    pub external_sort: bool,
    pub show_summary: ShowSummary,
    pub group_row_height: Option<u32>,
    pub row_height: Option<u32>,
    pub use_scroll_optimization: bool,
    pub autosize: AutosizeOptions,
    pub row_heights: Option<RowHeightTable>,
    pub header_menu_display: HeaderMenuDisplay,
    pub platform: Platform,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            sizing_mode: SizingMode::default(),
            tree_mode: false,
            external_sort: false,
            show_summary: ShowSummary::None,
            group_row_height: None,
            row_height: None,
            use_scroll_optimization: true,
            autosize: AutosizeOptions::default(),
            row_heights: None,
            header_menu_display: HeaderMenuDisplay::default(),
            platform: Platform::default(),
        }
    }
}

impl GridConfig {
    #[must_use]
    pub fn with_tree_mode(mut self, tree_mode: bool) -> Self {
        self.tree_mode = tree_mode;
        self
    }

    #[must_use]
    pub fn with_sizing_mode(mut self, sizing_mode: SizingMode) -> Self {
        self.sizing_mode = sizing_mode;
        self
    }

    #[must_use]
    pub fn with_external_sort(mut self, external_sort: bool) -> Self {
        self.external_sort = external_sort;
        self
    }

    #[must_use]
    pub fn with_show_summary(mut self, show_summary: ShowSummary) -> Self {
        self.show_summary = show_summary;
        self
    }

    #[must_use]
    pub fn with_autosize(mut self, autosize: AutosizeOptions) -> Self {
        self.autosize = autosize;
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Explicit height table, else the platform preset.
    pub fn row_heights(&self) -> RowHeightTable {
        self.row_heights
            .unwrap_or_else(|| RowHeightTable::for_platform(self.platform))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: GridConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, GridConfig::default());
        assert!(config.use_scroll_optimization);
        assert_eq!(config.autosize.mode, AutosizeMode::OnSizingModeChange);
        assert_eq!(config.row_heights().row.get(SizingMode::Standard), 28);
    }

    #[test]
    fn platform_presets() {
        let mobile = GridConfig::default().with_platform(Platform::Mobile);
        assert_eq!(mobile.row_heights().row.get(SizingMode::Tiny), 26);
        assert_eq!(mobile.autosize.buffer_px(mobile.platform), 10);
        assert_eq!(RowHeightTable::DESKTOP.group_row.get(SizingMode::Compact), 22);
    }

    #[test]
    fn explicit_columns_disable_fill() {
        let opts = AutosizeOptions::default()
            .with_fill_mode(FillMode::All)
            .merged(&AutosizeOverrides::columns(["a"]));
        assert_eq!(opts.effective_fill_mode(), FillMode::None);
    }
}
