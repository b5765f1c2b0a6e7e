//! Chart geometry: value objects, viewport state, the frame transform, layout and themes.

pub mod layout;
pub mod theme;
pub mod transform;
pub mod value_objects;
pub mod viewport;

pub use layout::*;
pub use theme::*;
pub use transform::*;
pub use value_objects::*;
pub use viewport::*;
