// Pipeline primitives, configuration, and shared types for sonoscope.

pub mod config;
pub mod error;
pub mod frame;
pub mod normalize;
pub mod scores;
pub mod tracker;
pub mod traits;

pub use config::ExtractorConfig;
pub use error::CoreError;
pub use frame::{FeatureTensor, FrameQueue, WaveformTensor};
pub use normalize::normalize;
pub use scores::{ScoreAggregator, SessionVerdict};
pub use tracker::FireTracker;
pub use traits::{ScoreDecision, Scorer, SpectralSource};
