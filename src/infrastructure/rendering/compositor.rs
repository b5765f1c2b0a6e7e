//! Layer compositor: one surface per layer, painted bottom to top, only where dirty.
//!
//! Mutations mark layers dirty through a `FrameScheduler`; every request made before the
//! next animation frame lands in the same repaint.

use super::candle_renderer::CandleRenderer;
use super::crosshair_renderer::CrosshairRenderer;
use super::drawing_renderer::DrawingRenderer;
use super::frame::FrameInput;
use super::grid_renderer::GridRenderer;
use super::indicator_renderer::IndicatorRenderer;
use super::price_line_renderer::PriceLineRenderer;
use super::surface::Surface;
use crate::domain::logging::LogComponent;
use crate::log_trace;
use strum::{AsRefStr, Display, EnumCount, EnumIter, IntoEnumIterator};

/// Canvas layers in z-order, bottom first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, AsRefStr, EnumIter, EnumCount)]
#[strum(serialize_all = "kebab-case")]
pub enum LayerId {
    Background,
    Candles,
    Indicators,
    Crosshair,
    Drawings,
    PriceLines,
}

impl LayerId {
    pub fn z_index(self) -> usize {
        self as usize
    }

    fn bit(self) -> u8 {
        1 << self.z_index()
    }
}

/// Set of layers waiting for a repaint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyLayers(u8);

impl DirtyLayers {
    pub fn none() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        LayerId::iter().fold(Self::none(), |acc, layer| acc.with(layer))
    }

    pub fn of(layers: &[LayerId]) -> Self {
        layers.iter().fold(Self::none(), |acc, layer| acc.with(*layer))
    }

    pub fn with(mut self, layer: LayerId) -> Self {
        self.mark(layer);
        self
    }

    pub fn mark(&mut self, layer: LayerId) {
        self.0 |= layer.bit();
    }

    pub fn merge(&mut self, other: DirtyLayers) {
        self.0 |= other.0;
    }

    pub fn contains(&self, layer: LayerId) -> bool {
        self.0 & layer.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Dirty layers in paint order
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        LayerId::iter().filter(move |layer| self.contains(*layer))
    }

    pub fn take(&mut self) -> DirtyLayers {
        std::mem::take(self)
    }
}

/// Coalesces repaint requests until the next frame callback
#[derive(Debug, Default)]
pub struct FrameScheduler {
    pending: DirtyLayers,
    scheduled: bool,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue layers for the next frame. Returns true when the caller must request an
    /// animation frame; later requests in the same tick only widen the set.
    pub fn request(&mut self, layers: DirtyLayers) -> bool {
        if layers.is_empty() {
            return false;
        }
        self.pending.merge(layers);
        if self.scheduled {
            return false;
        }
        self.scheduled = true;
        true
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn pending(&self) -> DirtyLayers {
        self.pending
    }

    /// Frame callback fired: hand over everything queued so far
    pub fn flush(&mut self) -> DirtyLayers {
        self.scheduled = false;
        self.pending.take()
    }
}

/// One renderer per layer
#[derive(Debug, Default)]
pub struct ChartRenderer {
    grid: GridRenderer,
    candles: CandleRenderer,
    indicators: IndicatorRenderer,
    crosshair: CrosshairRenderer,
    drawings: DrawingRenderer,
    price_lines: PriceLineRenderer,
}

impl ChartRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget cached background state after a resize or theme switch
    pub fn invalidate(&mut self) {
        self.grid.invalidate();
    }

    /// Paint one layer. Returns false when the layer had nothing new to paint.
    pub fn paint(&mut self, layer: LayerId, surface: &mut dyn Surface, frame: &FrameInput<'_>) -> bool {
        match layer {
            LayerId::Background => self.grid.render(surface, frame),
            LayerId::Candles => {
                self.candles.render(surface, frame);
                true
            }
            LayerId::Indicators => {
                self.indicators.render(surface, frame);
                true
            }
            LayerId::Crosshair => {
                self.crosshair.render(surface, frame);
                true
            }
            LayerId::Drawings => {
                self.drawings.render(surface, frame);
                true
            }
            LayerId::PriceLines => {
                self.price_lines.render(surface, frame);
                true
            }
        }
    }
}

/// Stacked surfaces, one per `LayerId`
pub struct LayerStack<S: Surface> {
    surfaces: Vec<S>,
    renderer: ChartRenderer,
}

impl<S: Surface> LayerStack<S> {
    pub fn new(mut make_surface: impl FnMut(LayerId) -> S) -> Self {
        Self { surfaces: LayerId::iter().map(&mut make_surface).collect(), renderer: ChartRenderer::new() }
    }

    /// Build every layer surface, stopping at the first failure
    pub fn try_new<E>(make_surface: impl FnMut(LayerId) -> Result<S, E>) -> Result<Self, E> {
        let surfaces = LayerId::iter().map(make_surface).collect::<Result<Vec<S>, E>>()?;
        Ok(Self { surfaces, renderer: ChartRenderer::new() })
    }

    pub fn surface(&self, layer: LayerId) -> &S {
        &self.surfaces[layer.z_index()]
    }

    pub fn surface_mut(&mut self, layer: LayerId) -> &mut S {
        &mut self.surfaces[layer.z_index()]
    }

    pub fn surfaces_mut(&mut self) -> impl Iterator<Item = (LayerId, &mut S)> {
        LayerId::iter().zip(self.surfaces.iter_mut())
    }

    pub fn invalidate(&mut self) {
        self.renderer.invalidate();
    }

    /// Repaint the dirty layers bottom to top. Returns the layers actually painted.
    pub fn compose(&mut self, dirty: DirtyLayers, frame: &FrameInput<'_>) -> Vec<LayerId> {
        let mut painted = Vec::with_capacity(LayerId::COUNT);
        for layer in dirty.layers() {
            let surface = &mut self.surfaces[layer.z_index()];
            if self.renderer.paint(layer, surface, frame) {
                painted.push(layer);
            }
        }
        log_trace!(LogComponent::Infrastructure("LayerStack"), "composed {:?}", painted);
        painted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::rendering::frame::fixtures::{Scene, rising_candles};
    use crate::infrastructure::rendering::surface::{DrawCommand, RecordingSurface};

    fn stack() -> LayerStack<RecordingSurface> {
        LayerStack::new(|_| RecordingSurface::new(1070.0, 738.0))
    }

    #[test]
    fn layers_follow_fixed_z_order() {
        let order: Vec<LayerId> = LayerId::iter().collect();
        assert_eq!(
            order,
            vec![
                LayerId::Background,
                LayerId::Candles,
                LayerId::Indicators,
                LayerId::Crosshair,
                LayerId::Drawings,
                LayerId::PriceLines
            ]
        );
        assert_eq!(LayerId::PriceLines.to_string(), "price-lines");
        let dirty = DirtyLayers::of(&[LayerId::PriceLines, LayerId::Background]);
        assert_eq!(dirty.layers().collect::<Vec<_>>(), vec![LayerId::Background, LayerId::PriceLines]);
    }

    #[test]
    fn requests_in_one_tick_share_a_frame() {
        let mut scheduler = FrameScheduler::new();
        assert!(!scheduler.request(DirtyLayers::none()));
        assert!(scheduler.request(DirtyLayers::of(&[LayerId::Crosshair])));
        assert!(!scheduler.request(DirtyLayers::of(&[LayerId::Candles])));
        assert!(scheduler.is_scheduled());

        let flushed = scheduler.flush();
        assert_eq!(flushed, DirtyLayers::of(&[LayerId::Candles, LayerId::Crosshair]));
        assert!(scheduler.pending().is_empty());
        assert!(scheduler.request(DirtyLayers::all()));
    }

    #[test]
    fn only_dirty_layers_are_repainted() {
        let scene = Scene::new(rising_candles());
        let mut layers = stack();
        let painted = layers.compose(DirtyLayers::all(), &scene.frame());
        assert_eq!(painted.len(), LayerId::COUNT);
        for (_, surface) in layers.surfaces_mut() {
            surface.take_commands();
        }

        let painted = layers.compose(DirtyLayers::of(&[LayerId::Crosshair]), &scene.frame());
        assert_eq!(painted, vec![LayerId::Crosshair]);
        assert!(layers.surface(LayerId::Candles).commands().is_empty());
        assert_eq!(layers.surface(LayerId::Crosshair).commands(), &[DrawCommand::Clear]);
    }

    #[test]
    fn unchanged_background_is_skipped() {
        let scene = Scene::new(rising_candles());
        let mut layers = stack();
        layers.compose(DirtyLayers::all(), &scene.frame());
        let painted = layers.compose(DirtyLayers::of(&[LayerId::Background, LayerId::Candles]), &scene.frame());
        assert_eq!(painted, vec![LayerId::Candles]);
        layers.invalidate();
        let painted = layers.compose(DirtyLayers::of(&[LayerId::Background]), &scene.frame());
        assert_eq!(painted, vec![LayerId::Background]);
    }
}
