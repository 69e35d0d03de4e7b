//! Recording/playback state machine.
//!
//! Arming only takes effect on a beat boundary, so every take starts at
//! tick 0 of some beat and stays phase-aligned with the loop.

use ls_ir::AutoStop;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    /// Waiting for the next beat to start recording
    Armed,
    Recording,
}

impl TransportState {
    pub fn is_running(self) -> bool {
        self != TransportState::Stopped
    }

    pub fn label(self) -> &'static str {
        match self {
            TransportState::Stopped => "stopped",
            TransportState::Playing => "playing",
            TransportState::Armed => "armed",
            TransportState::Recording => "recording",
        }
    }
}

/// Why a take ended on a beat boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The record-enable signal was low
    Released,
    /// The take reached its beat limit
    LimitReached,
}

/// What changed at a beat boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BeatReport {
    /// Recording began on this beat
    pub started: bool,
    pub stopped: Option<StopReason>,
}

#[derive(Clone, Debug)]
pub struct Transport {
    state: TransportState,
    record_enable: bool,
    beats_recorded: u32,
    total_beats: u32,
    auto_stop: AutoStop,
}

impl Transport {
    pub fn new(total_beats: u32, auto_stop: AutoStop) -> Self {
        Self {
            state: TransportState::Stopped,
            record_enable: false,
            beats_recorded: 0,
            total_beats,
            auto_stop,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == TransportState::Recording
    }

    pub fn record_enable(&self) -> bool {
        self.record_enable
    }

    pub fn beats_recorded(&self) -> u32 {
        self.beats_recorded
    }

    /// Stopped -> Playing. Returns false if already running.
    pub fn start(&mut self) -> bool {
        if self.state.is_running() {
            return false;
        }
        self.state = TransportState::Playing;
        self.beats_recorded = 0;
        true
    }

    /// Any state -> Stopped. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        let was_running = self.state.is_running();
        self.state = TransportState::Stopped;
        self.record_enable = false;
        self.beats_recorded = 0;
        was_running
    }

    /// Playing -> Armed, raising record-enable.
    pub fn arm(&mut self) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.state = TransportState::Armed;
        self.record_enable = true;
        true
    }

    /// Armed/Recording -> Playing immediately.
    pub fn stop_recording(&mut self) -> bool {
        match self.state {
            TransportState::Armed | TransportState::Recording => {
                self.state = TransportState::Playing;
                self.record_enable = false;
                true
            }
            _ => false,
        }
    }

    /// Drive the external record-enable signal. Sampled on the next beat.
    pub fn set_record_enable(&mut self, enabled: bool) {
        self.record_enable = enabled;
    }

    /// Beat-boundary transitions, evaluated before the beat counter advances.
    pub fn on_beat(&mut self) -> BeatReport {
        let mut report = BeatReport::default();

        if self.state == TransportState::Armed && self.record_enable {
            self.state = TransportState::Recording;
            self.beats_recorded = 0;
            report.started = true;
        }

        if matches!(self.state, TransportState::Armed | TransportState::Recording) && !self.record_enable {
            self.state = TransportState::Playing;
            report.stopped = Some(StopReason::Released);
        }

        if self.state == TransportState::Recording {
            self.beats_recorded += 1;
            if self.auto_stop.reached(self.beats_recorded, self.total_beats) {
                self.state = TransportState::Playing;
                report.stopped = Some(StopReason::LimitReached);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(auto_stop: AutoStop) -> Transport {
        let mut t = Transport::new(16, auto_stop);
        assert!(t.start());
        t
    }

    #[test]
    fn arm_requires_playing() {
        let mut t = Transport::new(16, AutoStop::PastLimit);
        assert!(!t.arm());
        assert!(t.start());
        assert!(t.arm());
        assert!(!t.arm());
        assert_eq!(t.state(), TransportState::Armed);
        assert!(t.record_enable());
    }

    #[test]
    fn armed_starts_recording_on_beat() {
        let mut t = playing(AutoStop::PastLimit);
        t.arm();
        let report = t.on_beat();
        assert!(report.started);
        assert_eq!(report.stopped, None);
        assert!(t.is_recording());
        // the start beat counts
        assert_eq!(t.beats_recorded(), 1);
    }

    #[test]
    fn releasing_record_enable_stops_on_next_beat() {
        let mut t = playing(AutoStop::PastLimit);
        t.arm();
        t.on_beat();
        t.set_record_enable(false);
        assert!(t.is_recording());
        let report = t.on_beat();
        assert_eq!(report.stopped, Some(StopReason::Released));
        assert_eq!(t.state(), TransportState::Playing);
    }

    #[test]
    fn armed_without_enable_disarms() {
        let mut t = playing(AutoStop::PastLimit);
        t.arm();
        t.set_record_enable(false);
        let report = t.on_beat();
        assert!(!report.started);
        assert_eq!(report.stopped, Some(StopReason::Released));
        assert_eq!(t.state(), TransportState::Playing);
    }

    #[test]
    fn past_limit_records_a_full_loop() {
        let mut t = playing(AutoStop::PastLimit);
        t.arm();
        for beat in 1..=16 {
            let report = t.on_beat();
            assert_eq!(report.stopped, None, "beat {}", beat);
        }
        assert!(t.is_recording());
        assert_eq!(t.on_beat().stopped, Some(StopReason::LimitReached));
        assert_eq!(t.beats_recorded(), 17);
        assert_eq!(t.state(), TransportState::Playing);
    }

    #[test]
    fn at_limit_stops_one_beat_earlier() {
        let mut t = playing(AutoStop::AtLimit);
        t.arm();
        for _ in 1..16 {
            assert_eq!(t.on_beat().stopped, None);
        }
        assert_eq!(t.on_beat().stopped, Some(StopReason::LimitReached));
        assert_eq!(t.beats_recorded(), 16);
    }

    #[test]
    fn auto_stop_does_not_rearm() {
        let mut t = playing(AutoStop::AtLimit);
        t.arm();
        for _ in 0..16 {
            t.on_beat();
        }
        assert_eq!(t.state(), TransportState::Playing);
        assert_eq!(t.on_beat(), BeatReport::default());
        assert_eq!(t.state(), TransportState::Playing);
    }

    #[test]
    fn stop_from_any_state() {
        let mut t = playing(AutoStop::PastLimit);
        t.arm();
        t.on_beat();
        assert!(t.stop());
        assert_eq!(t.state(), TransportState::Stopped);
        assert!(!t.record_enable());
        assert!(!t.stop());
    }

    #[test]
    fn stop_recording_is_immediate() {
        let mut t = playing(AutoStop::PastLimit);
        assert!(!t.stop_recording());
        t.arm();
        assert!(t.stop_recording());
        assert_eq!(t.state(), TransportState::Playing);
        assert_eq!(t.on_beat(), BeatReport::default());
    }
}
