use thiserror::Error;

/// Refusal to start playback, autoplay-policy style. Expected and swallowed:
/// playback may legitimately require a later user gesture.
#[derive(Debug, Error)]
#[error("playback rejected: {reason}")]
pub struct PlaybackRejected {
    pub reason: String,
}

impl PlaybackRejected {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// Handle to one playback-capable element.
///
/// Position and rate are in seconds and unitless rate, matching native
/// media elements. Lifecycle events (`seeked`, `loadedmetadata`, `error`)
/// are delivered by the host to the corresponding controller methods; this
/// trait only covers the mutation surface.
pub trait MediaElement {
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn play(&mut self) -> Result<(), PlaybackRejected>;
    fn pause(&mut self);
    fn set_playback_rate(&mut self, rate: f64);
    fn set_muted(&mut self, muted: bool);
    /// Best-effort preload hint.
    fn set_preload_auto(&mut self);
}
