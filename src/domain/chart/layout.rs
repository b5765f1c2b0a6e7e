use super::value_objects::Rect;
use crate::domain::config::Margins;

/// Pixel geometry of one frame: price pane, separate-indicator panels and both axes.
///
/// All panes share the same horizontal extent so candles and indicators line up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
    pub sub_panels: usize,
    pub sub_panel_ratio: f64,
}

impl ChartLayout {
    pub fn new(width: f64, height: f64, margins: Margins) -> Self {
        Self { width: width.max(0.0), height: height.max(0.0), margins, sub_panels: 0, sub_panel_ratio: 0.0 }
    }

    pub fn with_sub_panels(mut self, count: usize, ratio: f64) -> Self {
        self.sub_panels = count;
        self.sub_panel_ratio = ratio;
        self
    }

    /// Area below the top margin and left of the price axis, above the time axis
    pub fn plot_area(&self) -> Rect {
        let m = &self.margins;
        Rect::new(
            m.left,
            m.top,
            (self.width - m.left - m.right).max(1.0),
            (self.height - m.top - m.bottom).max(1.0),
        )
    }

    fn sub_panel_height(&self) -> f64 {
        self.plot_area().height * self.sub_panel_ratio
    }

    pub fn price_pane(&self) -> Rect {
        let plot = self.plot_area();
        let taken = self.sub_panel_height() * self.sub_panels as f64;
        Rect::new(plot.x, plot.y, plot.width, (plot.height - taken).max(1.0))
    }

    /// Panel `index` stacked under the price pane, `None` past the configured count
    pub fn sub_panel(&self, index: usize) -> Option<Rect> {
        if index >= self.sub_panels {
            return None;
        }
        let price = self.price_pane();
        let h = self.sub_panel_height();
        Some(Rect::new(price.x, price.bottom() + h * index as f64, price.width, h))
    }

    pub fn price_axis(&self) -> Rect {
        let plot = self.plot_area();
        Rect::new(plot.right(), 0.0, self.margins.right, self.height)
    }

    pub fn time_axis(&self) -> Rect {
        let plot = self.plot_area();
        Rect::new(0.0, plot.bottom(), self.width, self.margins.bottom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panels_stack_under_price_pane() {
        let layout = ChartLayout::new(800.0, 600.0, Margins::default()).with_sub_panels(2, 0.25);
        let plot = layout.plot_area();
        assert_eq!(plot, Rect::new(10.0, 10.0, 720.0, 562.0));
        let price = layout.price_pane();
        assert_eq!(price.height, 281.0);
        let first = layout.sub_panel(0).unwrap();
        let second = layout.sub_panel(1).unwrap();
        assert_eq!(first.y, price.bottom());
        assert_eq!(second.bottom(), plot.bottom());
        assert!(layout.sub_panel(2).is_none());
    }

    #[test]
    fn axes_sit_outside_plot() {
        let layout = ChartLayout::new(800.0, 600.0, Margins::default());
        assert_eq!(layout.price_axis().x, 730.0);
        assert_eq!(layout.time_axis().y, 572.0);
    }
}
