//! Data structures exchanged with template generation, data conditioning
//! and trigger persistence.

pub mod event;
pub mod gps;
pub mod segment;
pub mod template;

pub use event::InspiralEvent;
pub use gps::{GpsParseError, LigoTimeGps};
pub use segment::{DataSegment, FilterInput};
pub use template::{ChirpTemplate, TemplateParams};
