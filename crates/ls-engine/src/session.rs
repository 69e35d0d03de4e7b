//! The sequencer session: one object owning all mutable state.
//!
//! Everything runs on one thread. Beats, sampling passes and key repeats are
//! entries in a single [`TimerQueue`]; a driver calls [`Session::run_due`]
//! (or [`Session::run_until`]) and input handlers call the command methods
//! in between.

use ls_ir::consts::ALL_NOTES_OFF;
use ls_ir::{
    program_name, step_program, EventKind, MidiMessage, RecordingChannelPlayback, SessionConfig,
    Tempo, TrackBank, MAX_CHANNELS,
};

use crate::clock::{Clock, ClockSource};
use crate::command::{Command, CommandOutcome, TempoChange};
use crate::metronome::Metronome;
use crate::player::Player;
use crate::recorder::{Capture, Recorder};
use crate::repeat::{AutoRepeat, NudgeTarget, REPEAT_DELAY, REPEAT_INTERVAL};
use crate::sink::OutputSink;
use crate::status::Status;
use crate::timer_queue::{TimerHandle, TimerQueue};
use crate::transport::{StopReason, Transport, TransportState};

/// Largest MIDI data byte.
const MAX_DATA: u8 = 127;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Task {
    Beat,
    Sample,
    Repeat(NudgeTarget),
}

pub struct Session<C: ClockSource, O: OutputSink> {
    source: C,
    output: O,
    config: SessionConfig,
    clock: Clock,
    transport: Transport,
    recorder: Recorder,
    player: Player,
    metronome: Metronome,
    timers: TimerQueue<Task>,
    repeat: AutoRepeat,
    channel: u8,
    send_failures: u32,
}

impl<C: ClockSource, O: OutputSink> Session<C, O> {
    /// Build a stopped session. An unusable loop geometry is clamped into
    /// range.
    pub fn new(mut config: SessionConfig, source: C, output: O) -> Self {
        if let Err(problem) = config.geometry.check() {
            config.geometry = config.geometry.clamped();
            log::warn!(target: "session", "{}; using {:?}", problem, config.geometry);
        }
        let geometry = config.geometry;
        Self {
            source,
            output,
            clock: Clock::new(geometry, config.tempo),
            transport: Transport::new(geometry.total_beats(), config.auto_stop),
            recorder: Recorder::new(geometry, config.track_capacity, config.quantize, config.record_mode),
            player: Player::new(),
            metronome: Metronome::new(config.metronome),
            timers: TimerQueue::new(),
            repeat: AutoRepeat::new(),
            channel: 0,
            send_failures: 0,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn tracks(&self) -> &TrackBank {
        self.recorder.tracks()
    }

    /// Active channel, 0-based.
    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn source(&self) -> &C {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut C {
        &mut self.source
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Messages the output refused.
    pub fn send_failures(&self) -> u32 {
        self.send_failures
    }

    /// Tempo in effect once any pending change lands.
    pub fn tempo(&self) -> Tempo {
        self.clock.target_tempo()
    }

    pub fn execute(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::Play => self.start(),
            Command::Stop => self.stop(),
            Command::ToggleClock => self.toggle_clock(),
            Command::Arm => self.arm(),
            Command::StopRecording => self.stop_recording(),
            Command::RecordEnable(enabled) => {
                self.set_record_enable(enabled);
                CommandOutcome::Applied
            }
            Command::NoteOn { note, velocity } => self.note_on(note, velocity).into(),
            Command::NoteOff { note } => self.note_off(note).into(),
            Command::SetTempo(bpm) => self.set_tempo(bpm).into(),
            Command::Hold { target, delta } => self.hold(target, delta),
            Command::Release(target) => self.release(target),
            Command::ToggleQuantize => {
                self.toggle_quantize();
                CommandOutcome::Applied
            }
            Command::ToggleMetronome => {
                self.toggle_metronome();
                CommandOutcome::Applied
            }
            Command::SetChannel(channel) => self.set_channel(channel),
            Command::StepChannel(delta) => self.step_channel(delta),
            Command::SetProgram(program) => self.set_program(program),
            Command::StepProgram(delta) => self.step_program(delta),
            Command::ClearTrack => self.clear_track(),
            Command::Panic => {
                self.panic();
                CommandOutcome::Applied
            }
        }
    }

    // --- Transport ---

    /// Start the clock at beat 0; the first beat fires immediately.
    pub fn start(&mut self) -> CommandOutcome {
        if !self.transport.start() {
            return CommandOutcome::Ignored;
        }
        let now = self.source.now();
        self.clock.start(now);
        self.player.reset();
        log::info!(target: "transport", "started at {}", self.clock.tempo());
        self.fire_beat(now);
        let first_sample = now + self.clock.sampling_interval();
        self.timers.schedule(first_sample, Task::Sample);
        CommandOutcome::Applied
    }

    /// Stop from any state: cancel every timer and silence all channels.
    pub fn stop(&mut self) -> CommandOutcome {
        let was_running = self.transport.stop();
        self.clock.stop();
        self.timers.cancel_all();
        self.repeat.clear();
        self.player.reset();
        self.panic();
        if was_running {
            log::info!(target: "transport", "stopped");
        }
        CommandOutcome::from_flag(was_running)
    }

    pub fn toggle_clock(&mut self) -> CommandOutcome {
        if self.transport.state().is_running() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Record from the next beat. Requires the clock to be running.
    pub fn arm(&mut self) -> CommandOutcome {
        let armed = self.transport.arm();
        if armed {
            log::info!(target: "transport", "armed on channel {}", self.channel + 1);
        }
        CommandOutcome::from_flag(armed)
    }

    pub fn stop_recording(&mut self) -> CommandOutcome {
        let stopped = self.transport.stop_recording();
        if stopped {
            log::info!(target: "transport", "recording stopped");
        }
        CommandOutcome::from_flag(stopped)
    }

    pub fn set_record_enable(&mut self, enabled: bool) {
        self.transport.set_record_enable(enabled);
    }

    // --- Input ---

    /// A key went down on the active channel. Always monitored, recorded when
    /// a take is running.
    ///
    /// Notes above 127 are ignored; velocity is clamped to 127.
    pub fn note_on(&mut self, note: u8, velocity: u8) -> Capture {
        if note > MAX_DATA {
            return Capture::Ignored;
        }
        let velocity = velocity.min(MAX_DATA);
        let channel = self.channel;
        self.recorder.held_mut().press(note, channel);
        self.send(MidiMessage::note_on(channel, note, velocity));
        let tick = self.clock.current_tick(self.source.now());
        self.recorder.record(self.transport.is_recording(), channel, tick, EventKind::NoteOn { note, velocity })
    }

    /// A key went up. The release goes to the channel that sounded the note;
    /// a note that is not sounding is ignored.
    pub fn note_off(&mut self, note: u8) -> Capture {
        let Some(channel) = self.recorder.held_mut().release(note) else {
            log::trace!(target: "session", "release of {} with nothing sounding", note);
            return Capture::Ignored;
        };
        self.send(MidiMessage::note_off(channel, note));
        let tick = self.clock.current_tick(self.source.now());
        self.recorder.record(self.transport.is_recording(), channel, tick, EventKind::NoteOff { note })
    }

    // --- Settings ---

    /// Set tempo, clamped to the supported range. Rejected while recording.
    pub fn set_tempo(&mut self, bpm: i32) -> TempoChange {
        if self.transport.is_recording() {
            return TempoChange::RejectedWhileRecording;
        }
        let clamped = Tempo::is_out_of_range(bpm);
        let tempo = Tempo::clamped(bpm);
        let deferred = self.clock.set_tempo(tempo);
        log::info!(target: "clock", "tempo {}{}", tempo, if deferred { " from next beat" } else { "" });
        if deferred {
            TempoChange::Deferred { tempo, clamped }
        } else {
            TempoChange::Applied { tempo, clamped }
        }
    }

    pub fn nudge_tempo(&mut self, delta: i32) -> TempoChange {
        self.set_tempo(self.clock.target_tempo().bpm() as i32 + delta)
    }

    /// Nudge now, then keep nudging while held.
    pub fn hold(&mut self, target: NudgeTarget, delta: i32) -> CommandOutcome {
        let outcome = self.apply_nudge(target, delta);
        if outcome == CommandOutcome::RejectedWhileRecording {
            return outcome;
        }
        let timer = self.timers.schedule(self.source.now() + REPEAT_DELAY, Task::Repeat(target));
        if let Some(previous) = self.repeat.press(target, delta, timer) {
            self.timers.cancel(previous);
        }
        outcome
    }

    pub fn release(&mut self, target: NudgeTarget) -> CommandOutcome {
        match self.repeat.release(target) {
            Some(timer) => {
                self.timers.cancel(timer);
                CommandOutcome::Applied
            }
            None => CommandOutcome::Ignored,
        }
    }

    /// Flip quantization. Turning it on snaps everything already recorded.
    pub fn toggle_quantize(&mut self) -> bool {
        let enabled = !self.recorder.quantize_enabled();
        self.recorder.set_quantize(enabled);
        log::info!(target: "recorder", "quantize {}", if enabled { "on" } else { "off" });
        enabled
    }

    pub fn toggle_metronome(&mut self) -> bool {
        self.metronome.toggle()
    }

    /// Switch the active channel, releasing notes held on the old one.
    pub fn set_channel(&mut self, channel: u8) -> CommandOutcome {
        if self.transport.is_recording() {
            return CommandOutcome::RejectedWhileRecording;
        }
        if channel as usize >= MAX_CHANNELS {
            return CommandOutcome::Ignored;
        }
        let old = self.channel;
        let Self { recorder, output, send_failures, .. } = self;
        recorder.held_mut().release_channel(old, |note| {
            if output.send(MidiMessage::note_off(old, note)).is_err() {
                *send_failures += 1;
            }
        });
        self.channel = channel;
        let program = self.recorder.program(channel);
        self.send(MidiMessage::program_change(channel, program));
        log::debug!(target: "session", "channel {} ({})", channel + 1, program_name(program));
        CommandOutcome::Applied
    }

    /// Step the active channel, wrapping around all sixteen.
    pub fn step_channel(&mut self, delta: i32) -> CommandOutcome {
        let channel = (self.channel as i32 + delta).rem_euclid(MAX_CHANNELS as i32) as u8;
        self.set_channel(channel)
    }

    /// Select a program for the active channel, clamped to 0-127.
    pub fn set_program(&mut self, program: i32) -> CommandOutcome {
        if self.transport.is_recording() {
            return CommandOutcome::RejectedWhileRecording;
        }
        let clamped = !(0..=127).contains(&program);
        self.apply_program(program.clamp(0, 127) as u8);
        if clamped {
            CommandOutcome::Clamped
        } else {
            CommandOutcome::Applied
        }
    }

    /// Step the active channel's program, wrapping within 0-127.
    pub fn step_program(&mut self, delta: i32) -> CommandOutcome {
        if self.transport.is_recording() {
            return CommandOutcome::RejectedWhileRecording;
        }
        let program = step_program(self.recorder.program(self.channel), delta);
        self.apply_program(program);
        CommandOutcome::Applied
    }

    /// Empty the active track.
    pub fn clear_track(&mut self) -> CommandOutcome {
        if self.transport.is_recording() {
            return CommandOutcome::RejectedWhileRecording;
        }
        self.recorder.clear_track(self.channel);
        log::info!(target: "recorder", "cleared track {}", self.channel + 1);
        CommandOutcome::Applied
    }

    /// All notes off on every channel.
    pub fn panic(&mut self) {
        for channel in 0..MAX_CHANNELS as u8 {
            self.send(MidiMessage::control_change(channel, ALL_NOTES_OFF, 0));
        }
        self.recorder.held_mut().clear();
    }

    /// Replace every track, e.g. with a bank loaded from disk.
    pub fn load_tracks(&mut self, tracks: TrackBank) -> CommandOutcome {
        if self.transport.is_recording() {
            return CommandOutcome::RejectedWhileRecording;
        }
        self.recorder.replace_tracks(tracks);
        CommandOutcome::Applied
    }

    pub fn status(&self) -> Status {
        let geometry = self.clock.geometry();
        let total_beats = geometry.total_beats();
        let beat = if self.clock.is_running() {
            (self.clock.current_beat() + total_beats - 1) % total_beats
        } else {
            0
        };
        let program = self.recorder.program(self.channel);
        let (event_count, dropped) = self
            .recorder
            .track(self.channel)
            .map_or((0, 0), |t| (t.len(), t.dropped()));
        Status {
            state: self.transport.state(),
            beat,
            bar: geometry.bar_of(beat),
            beat_in_bar: geometry.beat_in_bar(beat),
            total_beats,
            bpm: self.clock.tempo().bpm(),
            pending_bpm: self.clock.pending_tempo().map(Tempo::bpm),
            quantize: self.recorder.quantize_enabled(),
            metronome: self.metronome.is_enabled(),
            channel: self.channel,
            program,
            program_name: program_name(program),
            event_count,
            dropped,
            beats_recorded: self.transport.beats_recorded(),
        }
    }

    // --- Driving ---

    /// Deadline of the next pending timer.
    pub fn next_deadline(&mut self) -> Option<u64> {
        self.timers.next_deadline()
    }

    /// Fire every timer due at the current time. Returns how many fired.
    pub fn run_due(&mut self) -> usize {
        let now = self.source.now();
        let mut fired = 0;
        while let Some((fire_time, handle, task)) = self.timers.pop_due(now) {
            fired += 1;
            match task {
                Task::Beat => self.fire_beat(now),
                Task::Sample => self.fire_sample(fire_time, now),
                Task::Repeat(target) => self.fire_repeat(target, handle, fire_time),
            }
        }
        fired
    }

    /// Sleep from deadline to deadline, firing timers, until `until`.
    pub fn run_until(&mut self, until: u64) {
        while let Some(next) = self.timers.next_deadline() {
            if next > until {
                break;
            }
            self.source.sleep_until(next);
            self.run_due();
        }
        self.source.sleep_until(until);
    }

    /// One playback pass at the current time. Returns messages sent.
    pub fn sample(&mut self) -> usize {
        let now = self.source.now();
        self.sample_at(now)
    }

    fn sample_at(&mut self, now: u64) -> usize {
        if !self.transport.state().is_running() {
            return 0;
        }
        let current = self.clock.current_tick(now);
        let total = self.clock.geometry().total_loop_ticks();
        let muted = match self.config.recording_channel {
            RecordingChannelPlayback::Mute if self.transport.is_recording() => Some(self.channel),
            _ => None,
        };
        let Self { player, recorder, output, send_failures, .. } = self;
        player.dispatch(recorder.tracks(), current, total, muted, |message| {
            if output.send(message).is_err() {
                *send_failures += 1;
            }
        })
    }

    fn fire_beat(&mut self, now: u64) {
        let geometry = *self.clock.geometry();
        let beat = self.clock.on_beat(now);
        if let Some(click) = self.metronome.click(&geometry, beat) {
            self.send(click);
        }

        let report = self.transport.on_beat();
        if report.started {
            self.recorder.begin_take(self.channel);
            log::info!(target: "transport", "recording channel {} from bar {}", self.channel + 1, geometry.bar_of(beat));
        }
        match report.stopped {
            Some(StopReason::LimitReached) => {
                log::info!(target: "transport", "recording complete after {} beats", self.transport.beats_recorded());
            }
            Some(StopReason::Released) => log::info!(target: "transport", "record enable released"),
            None => {}
        }

        log::trace!(target: "clock", "beat {}.{}", geometry.bar_of(beat), geometry.beat_in_bar(beat));
        let deadline = self.clock.advance();
        self.timers.schedule(deadline, Task::Beat);
    }

    fn fire_sample(&mut self, target: u64, now: u64) {
        #[cfg(feature = "alloc_check")]
        assert_no_alloc::assert_no_alloc(|| self.sample_at(now));
        #[cfg(not(feature = "alloc_check"))]
        self.sample_at(now);
        let interval = self.clock.sampling_interval();
        let mut next = target + interval;
        while next <= now {
            next += interval;
        }
        self.timers.schedule(next, Task::Sample);
    }

    fn fire_repeat(&mut self, target: NudgeTarget, handle: TimerHandle, fire_time: u64) {
        let Some(delta) = self.repeat.delta_for(target, handle) else {
            return;
        };
        self.apply_nudge(target, delta);
        let timer = self.timers.schedule(fire_time + REPEAT_INTERVAL, Task::Repeat(target));
        self.repeat.rearm(target, timer);
    }

    fn apply_nudge(&mut self, target: NudgeTarget, delta: i32) -> CommandOutcome {
        match target {
            NudgeTarget::Tempo => self.nudge_tempo(delta).into(),
            NudgeTarget::Program => self.step_program(delta),
        }
    }

    fn apply_program(&mut self, program: u8) {
        self.recorder.set_program(self.channel, program);
        self.send(MidiMessage::program_change(self.channel, program));
        log::debug!(target: "session", "program {} {}", program, program_name(program));
    }

    fn send(&mut self, message: MidiMessage) {
        if let Err(err) = self.output.send(message) {
            self.send_failures += 1;
            log::trace!(target: "output", "{}: {}", message, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use alloc::vec::Vec;
    use ls_ir::{AutoStop, LoopGeometry};

    const BEAT: u64 = 500_000_000;

    fn session() -> Session<ManualClock, Vec<MidiMessage>> {
        let config = SessionConfig { metronome: false, ..SessionConfig::default() };
        Session::new(config, ManualClock::new(0), Vec::new())
    }

    fn notes_on(out: &[MidiMessage], channel: u8) -> usize {
        out.iter()
            .filter(|m| m.channel == channel && matches!(m.kind, EventKind::NoteOn { .. }))
            .count()
    }

    #[test]
    fn start_fires_first_beat_immediately() {
        let mut s = session();
        assert_eq!(s.start(), CommandOutcome::Applied);
        assert_eq!(s.state(), TransportState::Playing);
        assert_eq!(s.clock().current_beat(), 1);
        assert_eq!(s.clock().next_beat_deadline(), BEAT);
        assert_eq!(s.start(), CommandOutcome::Ignored);
    }

    #[test]
    fn metronome_clicks_every_beat() {
        let config = SessionConfig::default();
        let mut s = Session::new(config, ManualClock::new(0), Vec::<MidiMessage>::new());
        s.start();
        s.run_until(3 * BEAT);
        let clicks: Vec<_> = s.output().iter().filter(|m| m.channel == 9).copied().collect();
        assert_eq!(clicks.len(), 4);
        assert_eq!(clicks[0], MidiMessage::note_on(9, 76, 120));
        assert_eq!(clicks[1], MidiMessage::note_on(9, 77, 80));
    }

    #[test]
    fn stop_flushes_all_notes_off_and_cancels_timers() {
        let mut s = session();
        s.start();
        s.note_on(60, 100);
        s.output_mut().clear();
        assert_eq!(s.stop(), CommandOutcome::Applied);
        let out = s.output();
        assert_eq!(out.len(), 16);
        for (ch, msg) in out.iter().enumerate() {
            assert_eq!(*msg, MidiMessage::control_change(ch as u8, 123, 0));
        }
        assert_eq!(s.recorder.held().held_count(), 0);
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.state(), TransportState::Stopped);
    }

    #[test]
    fn recording_starts_on_the_beat_after_arming() {
        let mut s = session();
        s.start();
        s.source_mut().set(BEAT / 3);
        assert_eq!(s.arm(), CommandOutcome::Applied);
        // not yet recording: mid-beat input is monitored but not captured
        assert_eq!(s.note_on(60, 100), Capture::NotRecording);
        assert_eq!(s.output().last(), Some(&MidiMessage::note_on(0, 60, 100)));

        s.run_until(BEAT);
        assert_eq!(s.state(), TransportState::Recording);
        assert_eq!(s.note_off(60), Capture::Recorded(480));
    }

    #[test]
    fn arm_requires_running_clock() {
        let mut s = session();
        assert_eq!(s.arm(), CommandOutcome::Ignored);
    }

    #[test]
    fn note_off_follows_the_note_on_channel() {
        let mut s = session();
        s.note_on(64, 90);
        s.set_channel(5);
        assert!(s.output().contains(&MidiMessage::note_off(0, 64)));
        s.output_mut().clear();
        // the channel switch already released it
        assert_eq!(s.note_off(64), Capture::Ignored);
        assert!(s.output().is_empty());

        s.note_on(65, 90);
        s.set_channel(2);
        assert_eq!(s.recorder.held().channel_of(65), None);
    }

    #[test]
    fn held_note_releases_on_original_channel() {
        let mut s = session();
        s.recorder.held_mut().press(70, 3);
        s.note_off(70);
        assert_eq!(s.output().last(), Some(&MidiMessage::note_off(3, 70)));
    }

    #[test]
    fn out_of_range_notes_are_ignored() {
        let mut s = session();
        s.start();
        s.arm();
        s.run_until(BEAT);
        s.output_mut().clear();
        assert_eq!(s.note_on(200, 100), Capture::Ignored);
        assert_eq!(s.note_on(128, 100), Capture::Ignored);
        assert!(s.output().is_empty());
        assert_eq!(s.tracks().total_events(), 0);

        assert_eq!(s.note_on(127, 200), Capture::Recorded(480));
        assert_eq!(s.output().last(), Some(&MidiMessage::note_on(0, 127, 127)));
        assert_eq!(s.execute(Command::NoteOn { note: 130, velocity: 1 }), CommandOutcome::Ignored);
    }

    #[test]
    fn take_starts_on_the_beat_at_uneven_tempo() {
        let config = SessionConfig { metronome: false, tempo: Tempo::clamped(70), ..SessionConfig::default() };
        let mut s = Session::new(config, ManualClock::new(0), Vec::<MidiMessage>::new());
        s.start();
        s.arm();
        let deadline = s.clock().next_beat_deadline();
        s.run_until(deadline);
        assert!(s.transport.is_recording());
        assert_eq!(s.note_on(60, 100), Capture::Recorded(480));
    }

    #[test]
    fn unmatched_release_sends_and_records_nothing() {
        let mut s = session();
        s.start();
        s.arm();
        s.run_until(BEAT);
        s.output_mut().clear();
        assert_eq!(s.note_off(61), Capture::Ignored);
        assert!(s.output().is_empty());
        assert_eq!(s.tracks().total_events(), 0);
        assert_eq!(s.execute(Command::NoteOff { note: 61 }), CommandOutcome::Ignored);
    }

    #[test]
    fn release_after_restart_is_not_recorded() {
        let mut s = session();
        s.start();
        s.note_on(62, 100);
        s.stop();
        s.start();
        s.arm();
        s.run_until(BEAT);
        assert!(s.transport.is_recording());
        assert_eq!(s.note_off(62), Capture::Ignored);
        assert_eq!(s.tracks().total_events(), 0);
    }

    #[test]
    fn settings_rejected_while_recording() {
        let mut s = session();
        s.start();
        s.arm();
        s.run_until(BEAT);
        assert!(s.transport.is_recording());
        assert_eq!(s.set_tempo(100), TempoChange::RejectedWhileRecording);
        assert_eq!(s.set_channel(1), CommandOutcome::RejectedWhileRecording);
        assert_eq!(s.set_program(10), CommandOutcome::RejectedWhileRecording);
        assert_eq!(s.step_program(1), CommandOutcome::RejectedWhileRecording);
        assert_eq!(s.clear_track(), CommandOutcome::RejectedWhileRecording);
        assert_eq!(s.hold(NudgeTarget::Tempo, 1), CommandOutcome::RejectedWhileRecording);
        assert!(!s.repeat.is_held(NudgeTarget::Tempo));
    }

    #[test]
    fn tempo_is_clamped_and_deferred_while_running() {
        let mut s = session();
        assert_eq!(
            s.set_tempo(500),
            TempoChange::Applied { tempo: Tempo::clamped(300), clamped: true }
        );
        s.set_tempo(120);
        s.start();
        assert_eq!(
            s.set_tempo(60),
            TempoChange::Deferred { tempo: Tempo::clamped(60), clamped: false }
        );
        assert_eq!(s.status().bpm, 120);
        assert_eq!(s.status().pending_bpm, Some(60));
        s.run_until(BEAT);
        assert_eq!(s.status().bpm, 60);
        assert_eq!(s.clock().next_beat_deadline(), BEAT + 2 * BEAT);
    }

    #[test]
    fn hold_repeats_until_released() {
        let mut s = session();
        assert_eq!(s.hold(NudgeTarget::Tempo, 1), CommandOutcome::Applied);
        assert_eq!(s.tempo().bpm(), 121);
        s.run_until(REPEAT_DELAY - 1);
        assert_eq!(s.tempo().bpm(), 121);
        s.run_until(REPEAT_DELAY);
        assert_eq!(s.tempo().bpm(), 122);
        s.run_until(REPEAT_DELAY + 3 * REPEAT_INTERVAL);
        assert_eq!(s.tempo().bpm(), 125);
        assert_eq!(s.release(NudgeTarget::Tempo), CommandOutcome::Applied);
        s.run_until(REPEAT_DELAY + 10 * REPEAT_INTERVAL);
        assert_eq!(s.tempo().bpm(), 125);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn program_hold_wraps() {
        let mut s = session();
        s.hold(NudgeTarget::Program, -1);
        assert_eq!(s.status().program, 127);
        assert_eq!(s.output().last(), Some(&MidiMessage::program_change(0, 127)));
        s.run_until(REPEAT_DELAY + REPEAT_INTERVAL);
        assert_eq!(s.status().program, 125);
        assert_eq!(s.status().program_name, "Helicopter");
        s.release(NudgeTarget::Program);
    }

    #[test]
    fn channel_change_sends_stored_program() {
        let mut s = session();
        s.set_channel(4);
        s.set_program(40);
        s.set_channel(0);
        s.output_mut().clear();
        assert_eq!(s.step_channel(4), CommandOutcome::Applied);
        assert_eq!(s.channel(), 4);
        assert_eq!(s.output().as_slice(), [MidiMessage::program_change(4, 40)]);
        assert_eq!(s.step_channel(-5), CommandOutcome::Applied);
        assert_eq!(s.channel(), 15);
        assert_eq!(s.set_channel(16), CommandOutcome::Ignored);
        assert_eq!(s.set_program(200), CommandOutcome::Clamped);
        assert_eq!(s.status().program, 127);
    }

    /// Overdub on channel 0 over an earlier take, with channel 7 as a witness.
    fn overdub(policy: RecordingChannelPlayback) -> Session<ManualClock, Vec<MidiMessage>> {
        let config = SessionConfig { metronome: false, recording_channel: policy, ..SessionConfig::default() };
        let mut s = Session::new(config, ManualClock::new(0), Vec::<MidiMessage>::new());
        s.recorder.record(true, 0, 1200, EventKind::NoteOn { note: 40, velocity: 90 });
        s.recorder.record(true, 7, 1200, EventKind::NoteOn { note: 40, velocity: 90 });
        s.start();
        s.arm();
        s.run_until(BEAT);
        assert!(s.transport.is_recording());
        s.output_mut().clear();
        s.run_until(4 * BEAT);
        s
    }

    #[test]
    fn recording_channel_is_muted_during_take() {
        let s = overdub(RecordingChannelPlayback::Mute);
        assert_eq!(notes_on(s.output(), 0), 0);
        assert_eq!(notes_on(s.output(), 7), 1);
    }

    #[test]
    fn recording_channel_plays_when_configured() {
        let s = overdub(RecordingChannelPlayback::Play);
        assert_eq!(notes_on(s.output(), 0), 1);
        assert_eq!(notes_on(s.output(), 7), 1);
    }

    #[test]
    fn auto_stop_after_a_full_loop() {
        let mut s = session();
        s.start();
        s.arm();
        s.run_until(BEAT);
        assert!(s.transport.is_recording());
        s.run_until(16 * BEAT);
        assert!(s.transport.is_recording());
        s.run_until(17 * BEAT);
        assert_eq!(s.state(), TransportState::Playing);
        assert_eq!(s.status().beats_recorded, 17);
    }

    #[test]
    fn auto_stop_at_limit_cuts_last_beat() {
        let config = SessionConfig { metronome: false, auto_stop: AutoStop::AtLimit, ..SessionConfig::default() };
        let mut s = Session::new(config, ManualClock::new(0), Vec::<MidiMessage>::new());
        s.start();
        s.arm();
        s.run_until(16 * BEAT);
        assert_eq!(s.state(), TransportState::Playing);
        assert_eq!(s.status().beats_recorded, 16);
    }

    #[test]
    fn toggling_quantize_snaps_recorded_events() {
        let mut s = session();
        s.start();
        s.arm();
        s.run_until(BEAT);
        s.source_mut().advance(BEAT / 8 + 1_000_000);
        s.note_on(60, 100);
        assert!(s.toggle_quantize());
        let tick = s.tracks().get(0).unwrap().events()[0].tick;
        assert_eq!(tick, 480 + 120);
        assert!(!s.toggle_quantize());
    }

    #[test]
    fn status_reports_position() {
        let mut s = session();
        s.start();
        s.run_until(5 * BEAT + 1);
        let status = s.status();
        assert_eq!(status.beat, 5);
        assert_eq!(status.bar, 2);
        assert_eq!(status.beat_in_bar, 2);
        assert_eq!(status.total_beats, 16);
        assert_eq!(status.program_name, "Acoustic Grand Piano");
    }

    #[test]
    fn load_tracks_replaces_bank() {
        let mut s = session();
        let mut bank = TrackBank::new(8);
        bank.get_mut(2).unwrap().push(ls_ir::Event::note_on(0, 1, 2));
        assert_eq!(s.load_tracks(bank), CommandOutcome::Applied);
        assert_eq!(s.tracks().total_events(), 1);
    }

    #[test]
    fn zero_beats_per_bar_is_clamped() {
        let config = SessionConfig {
            geometry: LoopGeometry::new(480, 0, 2),
            metronome: false,
            ..SessionConfig::default()
        };
        let mut s = Session::new(config, ManualClock::new(0), Vec::<MidiMessage>::new());
        assert_eq!(*s.clock().geometry(), LoopGeometry::new(480, 1, 2));
        s.start();
        s.run_until(3 * BEAT);
        assert_eq!(s.status().total_beats, 2);
    }

    #[test]
    fn small_loop_geometry_wraps() {
        let config = SessionConfig {
            geometry: LoopGeometry::new(480, 4, 1),
            metronome: false,
            ..SessionConfig::default()
        };
        let mut s = Session::new(config, ManualClock::new(0), Vec::<MidiMessage>::new());
        s.start();
        s.run_until(4 * BEAT);
        assert_eq!(s.status().beat, 0);
        assert_eq!(s.clock().loop_start(), 4 * BEAT);
    }
}
