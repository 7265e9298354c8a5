pub mod orchestrator;
pub mod report;

pub use orchestrator::{BatchAccumulator, BatchConverter, EventCallback};
pub use report::{
    ConversionEvent, ConversionReport, EventKind, EventLevel, FileOutcome, STATUS_TIME_FORMAT,
};
