use crate::models::{Color, RegionDict, RegionIndex};

/// Map renderer driven by the core after each committed mutation.
pub trait MapView {
    /// Recompute every region's style from the active entry.
    fn reset_all_region_style(&mut self, regions: &RegionDict);

    /// Recompute only the listed regions.
    fn reset_specified_region_style(&mut self, regions: &RegionDict, indices: &[RegionIndex]);
}

/// Widget holding the currently chosen paint color.
pub trait ColorPicker {
    fn color(&self) -> Color;
    fn set_color(&mut self, color: Color);
}

/// Map stand-in for headless use; it only logs what would be repainted.
#[derive(Debug, Default)]
pub struct HeadlessMap;

impl MapView for HeadlessMap {
    fn reset_all_region_style(&mut self, regions: &RegionDict) {
        let colored = regions.values().filter(|r| r.color.is_some()).count();
        tracing::trace!(regions = regions.len(), colored, "repaint all regions");
    }

    fn reset_specified_region_style(&mut self, _regions: &RegionDict, indices: &[RegionIndex]) {
        tracing::trace!(?indices, "repaint regions");
    }
}

/// Picker holding a single swatch.
#[derive(Debug, Clone)]
pub struct SwatchPicker {
    color: Color,
}

impl SwatchPicker {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Default for SwatchPicker {
    fn default() -> Self {
        Self::new(Color::rgb(0xff, 0x00, 0x00))
    }
}

impl ColorPicker for SwatchPicker {
    fn color(&self) -> Color {
        self.color
    }

    fn set_color(&mut self, color: Color) {
        self.color = color;
    }
}
