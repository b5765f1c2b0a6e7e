//! Canvas rendering: a `Surface` abstraction, one renderer per layer and the compositor
//! that stacks them.

pub mod candle_renderer;
#[cfg(target_arch = "wasm32")]
pub mod canvas_surface;
pub mod compositor;
pub mod crosshair_renderer;
pub mod drawing_renderer;
pub mod frame;
pub mod grid_renderer;
pub mod indicator_renderer;
pub mod price_line_renderer;
pub mod surface;

#[cfg(target_arch = "wasm32")]
pub use canvas_surface::CanvasSurface;
pub use compositor::{ChartRenderer, DirtyLayers, FrameScheduler, LayerId, LayerStack};
pub use frame::FrameInput;
pub use surface::{DrawCommand, RecordingSurface, StrokeStyle, Surface, TextAlign, TextStyle};
