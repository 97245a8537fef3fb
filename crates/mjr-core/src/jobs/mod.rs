//! Concrete job variants: ffmpeg-backed crop and convert, delegated remote
//! download, and the in-memory simulated job.

pub mod convert;
pub mod crop;
pub mod download;
pub mod simulated;

pub use convert::ConvertJob;
pub use crop::CropJob;
pub use download::{FetchContext, FetchFn, FetchFuture, FetchProgress, RemoteDownloadJob};
pub use simulated::SimulatedJob;
