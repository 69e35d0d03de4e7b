//! Master clock: maps wall time to loop ticks and paces beats.
//!
//! Beat deadlines advance additively from the previous deadline, never from
//! the observed fire time, so a late wake-up does not push later beats back.
//! The loop origin is re-anchored to the actual fire time of every beat 0.
//! Once a beat has fired, the reported tick never falls behind that beat's
//! first tick, even when the truncated beat length lands a few nanoseconds
//! short of the exact one.

use alloc::boxed::Box;
use ls_ir::{LoopGeometry, Tempo, Tick};

/// Monotonic nanosecond time plus a way to wait for it.
pub trait ClockSource {
    /// Current time in nanoseconds from an arbitrary origin.
    fn now(&self) -> u64;

    /// Block until `deadline`. Only the driver loop calls this.
    fn sleep_until(&mut self, deadline: u64);
}

/// Deterministic clock for tests and offline driving.
///
/// `sleep_until` jumps straight to the deadline, plus whatever the optional
/// jitter hook returns for that wake-up.
pub struct ManualClock {
    now: u64,
    jitter: Option<Box<dyn FnMut(u64) -> u64 + Send>>,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self { now, jitter: None }
    }

    /// Delay every wake-up by `jitter(deadline)` nanoseconds.
    pub fn with_jitter(mut self, jitter: impl FnMut(u64) -> u64 + Send + 'static) -> Self {
        self.jitter = Some(Box::new(jitter));
        self
    }

    pub fn set(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    pub fn advance(&mut self, nanos: u64) {
        self.now += nanos;
    }
}

impl core::fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManualClock").field("now", &self.now).finish_non_exhaustive()
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> u64 {
        self.now
    }

    fn sleep_until(&mut self, deadline: u64) {
        let late = self.jitter.as_mut().map_or(0, |j| j(deadline));
        self.now = self.now.max(deadline + late);
    }
}

/// Tempo, loop origin and beat position.
#[derive(Clone, Debug)]
pub struct Clock {
    geometry: LoopGeometry,
    tempo: Tempo,
    /// Requested while running; applied at the next beat.
    pending: Option<Tempo>,
    running: bool,
    loop_start: u64,
    next_beat_deadline: u64,
    current_beat: u32,
    /// First tick of the last beat fired
    beat_floor: u64,
}

impl Clock {
    pub fn new(geometry: LoopGeometry, tempo: Tempo) -> Self {
        Self {
            geometry,
            tempo,
            pending: None,
            running: false,
            loop_start: 0,
            next_beat_deadline: 0,
            current_beat: 0,
            beat_floor: 0,
        }
    }

    /// Start at beat 0. The first beat is due immediately.
    pub fn start(&mut self, now: u64) {
        if let Some(tempo) = self.pending.take() {
            self.tempo = tempo;
        }
        self.running = true;
        self.loop_start = now;
        self.next_beat_deadline = now;
        self.current_beat = 0;
        self.beat_floor = 0;
    }

    pub fn stop(&mut self) {
        if let Some(tempo) = self.pending.take() {
            self.tempo = tempo;
        }
        self.running = false;
        self.current_beat = 0;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn geometry(&self) -> &LoopGeometry {
        &self.geometry
    }

    /// Tempo the clock is currently ticking at.
    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Tempo waiting for the next beat, if any.
    pub fn pending_tempo(&self) -> Option<Tempo> {
        self.pending
    }

    /// Tempo once any pending change lands.
    pub fn target_tempo(&self) -> Tempo {
        self.pending.unwrap_or(self.tempo)
    }

    /// Beat that fires next, `0..total_beats`.
    pub fn current_beat(&self) -> u32 {
        self.current_beat
    }

    pub fn next_beat_deadline(&self) -> u64 {
        self.next_beat_deadline
    }

    pub fn loop_start(&self) -> u64 {
        self.loop_start
    }

    /// Position within the loop at `now`. Always 0 while stopped.
    pub fn current_tick(&self, now: u64) -> Tick {
        if !self.running {
            return 0;
        }
        let elapsed = now.wrapping_sub(self.loop_start);
        let ticks = self.tempo.ticks_in(elapsed, self.geometry.ticks_per_beat);
        self.geometry.wrap(ticks.max(self.beat_floor))
    }

    /// Change tempo. Returns true when the change is deferred to the next beat.
    pub fn set_tempo(&mut self, tempo: Tempo) -> bool {
        if self.running {
            self.pending = Some(tempo);
            true
        } else {
            self.tempo = tempo;
            self.pending = None;
            false
        }
    }

    /// Handle the beat firing at `fire_time` and return which beat it was.
    ///
    /// Beat 0 re-anchors the loop origin. A pending tempo is applied here and
    /// the origin shifted so this beat still sits at `beat * ticks_per_beat`.
    /// The shifted origin may precede time zero, hence wrapping arithmetic.
    pub fn on_beat(&mut self, fire_time: u64) -> u32 {
        let beat = self.current_beat;
        if beat == 0 {
            self.loop_start = fire_time;
        }
        if let Some(tempo) = self.pending.take() {
            self.tempo = tempo;
            self.loop_start = fire_time.wrapping_sub(tempo.nanos_for_beats(beat as u64));
        }
        self.beat_floor = self.geometry.beat_start(beat) as u64;
        beat
    }

    /// Move to the next beat and return its deadline.
    pub fn advance(&mut self) -> u64 {
        self.next_beat_deadline += self.tempo.nanos_per_beat();
        self.current_beat = (self.current_beat + 1) % self.geometry.total_beats();
        self.next_beat_deadline
    }

    /// How often the player should sample the clock.
    pub fn sampling_interval(&self) -> u64 {
        self.tempo.sampling_interval(self.geometry.ticks_per_beat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BEAT_120: u64 = 500_000_000;

    fn clock() -> Clock {
        Clock::new(LoopGeometry::default(), Tempo::clamped(120))
    }

    #[test]
    fn tick_is_zero_while_stopped() {
        let c = clock();
        assert_eq!(c.current_tick(123_456_789), 0);
    }

    #[test]
    fn tick_follows_elapsed_time() {
        let mut c = clock();
        c.start(1_000);
        assert_eq!(c.current_tick(1_000), 0);
        assert_eq!(c.current_tick(1_000 + BEAT_120 / 2), 240);
        assert_eq!(c.current_tick(1_000 + 3 * BEAT_120), 1440);
    }

    #[test]
    fn tick_wraps_at_loop_end() {
        let mut c = clock();
        c.start(0);
        assert_eq!(c.current_tick(16 * BEAT_120), 0);
        assert_eq!(c.current_tick(16 * BEAT_120 + BEAT_120), 480);
    }

    #[test]
    fn deadlines_advance_additively() {
        let mut c = clock();
        c.start(0);
        for n in 1..=40u64 {
            // fire late by a varying amount
            c.on_beat(c.next_beat_deadline() + n * 1_000);
            assert_eq!(c.advance(), n * BEAT_120);
        }
        assert_eq!(c.current_beat(), 40 % 16);
    }

    #[test]
    fn beat_zero_reanchors_to_fire_time() {
        let mut c = clock();
        c.start(0);
        for _ in 0..16 {
            let deadline = c.next_beat_deadline();
            c.on_beat(deadline);
            c.advance();
        }
        assert_eq!(c.current_beat(), 0);
        let late = 16 * BEAT_120 + 7_000;
        assert_eq!(c.on_beat(late), 0);
        assert_eq!(c.loop_start(), late);
        assert_eq!(c.current_tick(late), 0);
    }

    #[test]
    fn tempo_change_waits_for_next_beat() {
        let mut c = clock();
        c.start(0);
        c.on_beat(0);
        c.advance();
        assert!(c.set_tempo(Tempo::clamped(60)));
        assert_eq!(c.tempo().bpm(), 120);
        assert_eq!(c.target_tempo().bpm(), 60);

        let fire = c.next_beat_deadline();
        assert_eq!(c.on_beat(fire), 1);
        assert_eq!(c.tempo().bpm(), 60);
        assert_eq!(c.current_tick(fire), 480);
        // one second later at 60 BPM is one more beat
        assert_eq!(c.current_tick(fire + 1_000_000_000), 960);
        assert_eq!(c.advance(), fire + 1_000_000_000);
    }

    #[test]
    fn truncated_deadline_reads_as_the_beat_start() {
        // 70 BPM does not divide a minute evenly
        let mut c = Clock::new(LoopGeometry::default(), Tempo::clamped(70));
        c.start(0);
        for beat in 0..40u32 {
            let deadline = c.next_beat_deadline();
            c.on_beat(deadline);
            assert_eq!(c.current_tick(deadline), (beat % 16) * 480, "beat {}", beat);
            c.advance();
        }
    }

    #[test]
    fn tempo_change_while_stopped_is_immediate() {
        let mut c = clock();
        assert!(!c.set_tempo(Tempo::clamped(90)));
        assert_eq!(c.tempo().bpm(), 90);
        assert_eq!(c.pending_tempo(), None);
    }

    #[test]
    fn manual_clock_applies_jitter() {
        let mut m = ManualClock::new(0).with_jitter(|d| d % 3);
        m.sleep_until(10);
        assert_eq!(m.now(), 11);
        m.sleep_until(5);
        assert_eq!(m.now(), 11);
    }
}
