use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::PlayheadState;
use crate::element::MediaElement;

/// Thresholds and capabilities for one controller instance.
///
/// Call sites differ in whether they expose a scrub gesture and in how
/// aggressively they correct drift, so both observed variants are presets
/// rather than hardcoded constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Timestamp delta (ms) above which a tick is a user-initiated jump.
    pub jump_threshold_ms: f64,
    /// Playing-state drift (seconds) that triggers a position correction.
    pub drift_threshold_s: f64,
    /// Minimum wall-clock spacing between drift corrections.
    pub drift_cooldown: Duration,
    /// Paused-state divergence (seconds) tolerated without touching the
    /// element, to avoid flicker from rounding noise.
    pub paused_tolerance_s: f64,
    /// How long a seek may stay in flight before the loading flag raises.
    pub loading_delay: Duration,
    /// Whether the host exposes a scrub gesture for this element.
    pub scrub_aware: bool,
}

impl SyncConfig {
    /// Scrub-aware variant with the wider drift window.
    pub fn full() -> Self {
        Self {
            jump_threshold_ms: 500.0,
            drift_threshold_s: 0.5,
            drift_cooldown: Duration::from_millis(500),
            paused_tolerance_s: 0.1,
            loading_delay: Duration::from_millis(500),
            scrub_aware: true,
        }
    }

    /// Simpler variant: tighter thresholds, no scrub handling.
    pub fn lightweight() -> Self {
        Self {
            drift_threshold_s: 0.3,
            drift_cooldown: Duration::from_millis(300),
            scrub_aware: false,
            ..Self::full()
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::full()
    }
}

/// Controller phase. `Seeking` is the re-entrancy gate: it is set before the
/// element is touched and cleared only by the native seek-completed signal,
/// never by a timeout, so two seeks can never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Ready,
    Seeking,
    Scrubbing,
}

/// One element mutation. Every transition yields a single ordered list of
/// these, applied in order, so no two code paths race on the same element
/// field within a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ElementCommand {
    Mute,
    PreloadAuto,
    /// Position write in seconds. Used both for gated hard seeks and for
    /// direct drift corrections.
    Seek(f64),
    Play,
    Pause,
    SetRate(f64),
}

/// Per-element synchronization state machine.
///
/// One instance per bound (element, source) pair; destroy or [`teardown`]
/// when either changes. All inputs arrive by injection: clock snapshots,
/// the externally owned scrub flag, and the element handle itself.
///
/// [`teardown`]: SyncController::teardown
pub struct SyncController {
    config: SyncConfig,
    phase: Phase,
    initialized: bool,
    last_known_ms: f64,
    was_playing_before_seek: bool,
    last_drift_correction: Option<Instant>,
    scrub_start_ms: f64,
    loading_deadline: Option<Instant>,
    is_loading: bool,
    is_ready: bool,
    failed: bool,
    prev_clock: Option<PlayheadState>,
}

impl SyncController {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            phase: Phase::Uninitialized,
            initialized: false,
            last_known_ms: 0.0,
            was_playing_before_seek: false,
            last_drift_correction: None,
            scrub_start_ms: 0.0,
            loading_deadline: None,
            is_loading: false,
            is_ready: false,
            failed: false,
            prev_clock: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// One-shot setup for a freshly bound (element, source) pair: best-effort
    /// preloading and muting (audio is sourced elsewhere). Repeat calls are
    /// no-ops until [`teardown`](Self::teardown) clears the gate.
    pub fn bind(&mut self, element: &mut dyn MediaElement) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        apply(&[ElementCommand::Mute, ElementCommand::PreloadAuto], element);
    }

    /// The element reported loaded metadata: align it with the clock and
    /// start playback if the clock says playing.
    pub fn on_loaded_metadata(&mut self, clock: &PlayheadState, element: &mut dyn MediaElement) {
        if !self.initialized || self.phase != Phase::Uninitialized {
            return;
        }
        self.phase = Phase::Ready;
        self.is_ready = true;
        self.last_known_ms = clock.timestamp_ms;
        self.prev_clock = Some(*clock);
        let mut cmds = vec![
            ElementCommand::Seek(clock.timestamp_s()),
            ElementCommand::SetRate(clock.speed),
        ];
        if clock.is_playing {
            cmds.push(ElementCommand::Play);
        }
        apply(&cmds, element);
    }

    /// Explicit hard seek to `time_ms`.
    pub fn seek_to(
        &mut self,
        time_ms: f64,
        clock: &PlayheadState,
        element: &mut dyn MediaElement,
        now: Instant,
    ) {
        let cmds = self.plan_seek(time_ms, clock, now);
        apply(&cmds, element);
    }

    /// The element reported seek completion: clear the gate, cancel the
    /// loading debounce, and resume iff it was playing before the seek and
    /// the clock still says playing.
    pub fn on_seeked(&mut self, clock: &PlayheadState, element: &mut dyn MediaElement) {
        if self.phase != Phase::Seeking {
            return;
        }
        self.phase = Phase::Ready;
        self.loading_deadline = None;
        self.is_loading = false;
        let resume = self.was_playing_before_seek && clock.is_playing;
        self.was_playing_before_seek = false;
        if resume {
            apply(
                &[ElementCommand::SetRate(clock.speed), ElementCommand::Play],
                element,
            );
        }
    }

    /// Raises the debounced loading flag if a seek is still in flight past
    /// its deadline. Never clears the seeking gate.
    pub fn poll(&mut self, now: Instant) {
        if let Some(deadline) = self.loading_deadline {
            if self.phase == Phase::Seeking && now >= deadline {
                self.is_loading = true;
                self.loading_deadline = None;
            }
        }
    }

    /// Native media error. The controller has no recovery action of its own;
    /// it reports through [`has_failed`](Self::has_failed) and stands down.
    pub fn on_media_error(&mut self) {
        warn!("media element reported a native error");
        self.failed = true;
        self.is_loading = false;
        self.is_ready = false;
        self.loading_deadline = None;
    }

    /// The bound element, its source, or the active flag went away: cancel
    /// the pending debounce, reset transient flags, and clear the one-shot
    /// gate so a future rebind re-initializes fully. Idempotent.
    pub fn teardown(&mut self) {
        self.phase = Phase::Uninitialized;
        self.initialized = false;
        self.loading_deadline = None;
        self.is_loading = false;
        self.is_ready = false;
        self.failed = false;
        self.was_playing_before_seek = false;
        self.last_drift_correction = None;
        self.prev_clock = None;
    }

    /// Per-frame transition: classify the clock tick and reconcile the
    /// element. `scrubbing` is the externally owned gesture flag.
    pub fn tick(
        &mut self,
        clock: &PlayheadState,
        scrubbing: bool,
        element: &mut dyn MediaElement,
        now: Instant,
    ) {
        self.poll(now);
        let element_time_s = element.current_time();
        let cmds = self.plan_tick(clock, scrubbing, element_time_s, now);
        apply(&cmds, element);
    }

    fn plan_seek(&mut self, time_ms: f64, clock: &PlayheadState, now: Instant) -> Vec<ElementCommand> {
        self.was_playing_before_seek = clock.is_playing;
        self.phase = Phase::Seeking;
        self.is_loading = false;
        self.loading_deadline = Some(now + self.config.loading_delay);
        self.last_known_ms = time_ms;
        vec![ElementCommand::Pause, ElementCommand::Seek(time_ms / 1000.0)]
    }

    fn plan_tick(
        &mut self,
        clock: &PlayheadState,
        scrubbing: bool,
        element_time_s: f64,
        now: Instant,
    ) -> Vec<ElementCommand> {
        let absorb = |s: &mut Self| {
            s.last_known_ms = clock.timestamp_ms;
            s.prev_clock = Some(*clock);
        };

        // Not yet metadata-ready: nothing to reconcile against.
        if self.phase == Phase::Uninitialized {
            absorb(self);
            return Vec::new();
        }

        let scrubbing = scrubbing && self.config.scrub_aware;

        // Scrub-freeze wins over jump and drift: the visible frame must not
        // jitter while the user drags the position indicator.
        if self.phase == Phase::Scrubbing {
            if scrubbing {
                absorb(self);
                return Vec::new();
            }
            // Release: exactly one seek back to the clock.
            debug!(from_ms = self.scrub_start_ms, to_ms = clock.timestamp_ms, "scrub released");
            let cmds = self.plan_seek(clock.timestamp_ms, clock, now);
            self.prev_clock = Some(*clock);
            return cmds;
        }
        if scrubbing && self.phase == Phase::Ready {
            self.phase = Phase::Scrubbing;
            self.scrub_start_ms = clock.timestamp_ms;
            absorb(self);
            return vec![ElementCommand::Pause];
        }

        // A seek is in flight: absorb everything. Re-entrant seeks are the
        // failure mode this gate exists to prevent.
        if self.phase == Phase::Seeking {
            absorb(self);
            return Vec::new();
        }

        let prev = self.prev_clock;
        let mut cmds = Vec::new();

        // Speed propagates immediately, independent of play state.
        if prev.map_or(true, |p| p.speed != clock.speed) {
            cmds.push(ElementCommand::SetRate(clock.speed));
        }

        // Jump classification beats play/pause propagation and drift.
        let delta_ms = (clock.timestamp_ms - self.last_known_ms).abs();
        if delta_ms > self.config.jump_threshold_ms {
            let mut seek = self.plan_seek(clock.timestamp_ms, clock, now);
            cmds.append(&mut seek);
            self.prev_clock = Some(*clock);
            return cmds;
        }

        // Play/pause propagation; rate is re-applied before resuming.
        if let Some(p) = prev {
            if p.is_playing != clock.is_playing {
                if clock.is_playing {
                    cmds.push(ElementCommand::SetRate(clock.speed));
                    cmds.push(ElementCommand::Play);
                } else {
                    cmds.push(ElementCommand::Pause);
                }
            }
        }

        // Drift handling. Playing corrections use hysteresis (threshold plus
        // cooldown) so a nearly-right natural rate does not oscillate; paused
        // sync only moves the element past a small tolerance.
        let expected_s = clock.timestamp_s();
        let drift_s = (element_time_s - expected_s).abs();
        if clock.is_playing {
            let cooled = self
                .last_drift_correction
                .map_or(true, |at| now.duration_since(at) >= self.config.drift_cooldown);
            if drift_s > self.config.drift_threshold_s && cooled {
                debug!(drift_s, expected_s, "correcting playback drift");
                cmds.push(ElementCommand::Seek(expected_s));
                self.last_drift_correction = Some(now);
            }
        } else if drift_s > self.config.paused_tolerance_s {
            cmds.push(ElementCommand::Seek(expected_s));
        }

        absorb(self);
        cmds
    }
}

/// Apply an ordered command list to the element. A refused play is expected
/// (autoplay policy) and swallowed; it is not a failure of the state machine.
fn apply(commands: &[ElementCommand], element: &mut dyn MediaElement) {
    for cmd in commands {
        match *cmd {
            ElementCommand::Mute => element.set_muted(true),
            ElementCommand::PreloadAuto => element.set_preload_auto(),
            ElementCommand::Seek(seconds) => element.set_current_time(seconds),
            ElementCommand::Play => {
                if let Err(err) = element.play() {
                    debug!(%err, "element refused to play");
                }
            }
            ElementCommand::Pause => element.pause(),
            ElementCommand::SetRate(rate) => element.set_playback_rate(rate),
        }
    }
}
