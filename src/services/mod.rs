pub mod chooser;
pub mod compressor;
pub mod fetcher;
pub mod reconciler;

pub use chooser::ChooserService;
pub use compressor::CacheCompressor;
pub use fetcher::ImageFetcher;
pub use reconciler::{ReconcileOutcome, SourceListReconciler};
