pub mod host;
pub mod scenario;

pub use host::{HostEvent, RecordingElement, RecordingLayer, STICKER_COLOR};
pub use scenario::{Scenario, FRAME};
