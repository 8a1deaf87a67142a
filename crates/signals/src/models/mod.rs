//! Domain models for collected sensor data

mod batch;
mod reading;
mod watermark;

pub use batch::Batch;
pub use reading::{Reading, RejectedLine};
pub use watermark::Watermark;
