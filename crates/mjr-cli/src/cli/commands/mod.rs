//! CLI command handlers, one per file, plus the shared observer loop.

mod convert;
mod crop;
mod observe;
mod simulate;

pub use convert::run_convert;
pub use crop::run_crop;
pub use simulate::run_simulate;
