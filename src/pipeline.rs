//! Frame acquisition pipeline: source, landmark provider, extractor.
//!
//! Cameras and landmark inference live behind traits so the numeric pipeline
//! stays testable with synthetic implementations. The pipeline owns a
//! monotonic detector timestamp advanced per processed frame, which some
//! landmark backends require to be strictly increasing.

use crate::constants::FRAME_TIMESTAMP_STEP_MS;
use crate::error::Result;
use crate::features::{Extraction, FeatureExtractor};
use crate::types::{Frame, LandmarkSet};

/// A source of video frames.
///
/// `read_frame` returns `Ok(None)` when the source is exhausted; errors are
/// reserved for device failures.
pub trait FrameSource {
    fn read_frame(&mut self) -> Result<Option<Frame>>;
}

/// A face landmark detector.
///
/// `detect` returns `Ok(None)` when no face is visible in the frame. The
/// timestamp is in milliseconds and strictly increases across calls.
pub trait LandmarkProvider {
    fn detect(&mut self, frame: &Frame, timestamp_ms: u64) -> Result<Option<LandmarkSet>>;
}

/// Source, provider and extractor glued into a single per-tick step
pub struct FramePipeline<S, P> {
    source: S,
    provider: P,
    extractor: FeatureExtractor,
    timestamp_ms: u64,
}

impl<S: FrameSource, P: LandmarkProvider> FramePipeline<S, P> {
    pub fn new(source: S, provider: P) -> Self {
        Self {
            source,
            provider,
            extractor: FeatureExtractor::new(),
            timestamp_ms: 0,
        }
    }

    /// Read one frame, detect landmarks and extract features.
    ///
    /// Returns `Ok(None)` when the source is exhausted. A frame without a
    /// detected face yields an empty extraction, not an error.
    ///
    /// # Errors
    ///
    /// Propagates source and provider failures.
    pub fn process(&mut self) -> Result<Option<Extraction>> {
        let Some(frame) = self.source.read_frame()? else {
            return Ok(None);
        };
        self.timestamp_ms += FRAME_TIMESTAMP_STEP_MS;
        let landmarks = self.provider.detect(&frame, self.timestamp_ms)?;
        Ok(Some(
            self.extractor
                .extract(landmarks.as_ref(), frame.width, frame.height),
        ))
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }
}
