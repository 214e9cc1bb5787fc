//! Built-in job handlers.

mod backfill;
mod quality;
mod relatedness;

pub use backfill::BackfillHandler;
pub use quality::QualityHandler;
pub use relatedness::RelatednessHandler;
