//! User annotations: shapes, hit testing, the interaction state machine and
//! JSON import/export.

pub mod entities;
pub mod export;
pub mod hit_test;
pub mod manager;

pub use entities::*;
pub use export::{DrawingExport, EXPORT_VERSION};
pub use hit_test::HitTolerance;
pub use manager::*;
