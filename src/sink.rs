//! The capability through which decoded events are handed to the caller.

use crate::{
    event::{MidiMessage, PitchBend, TextKind},
    prelude::*,
    primitive::SmpteTime,
    smf::Header,
};

/// Receives every event decoded from a Standard Midi File, in file order.
///
/// Each method gets the absolute time of the event in milliseconds, the 1-based number of the
/// track it belongs to, and the event-specific fields.
/// All methods do nothing by default, so implementors only override the events they care about.
///
/// Byte payloads borrow from the file buffer and are only valid for the duration of the call.
#[allow(unused_variables)]
pub trait Sink {
    /// Called once, after the header chunk has been validated and before any event.
    fn header(&mut self, header: &Header) {}

    fn note_off(&mut self, millis: u64, track: u16, channel: u4, key: u7, velocity: u7) {}

    /// Note that by convention a `note_on` with a velocity of 0 is equivalent to a `note_off`.
    fn note_on(&mut self, millis: u64, track: u16, channel: u4, key: u7, velocity: u7) {}

    fn polyphonic_pressure(&mut self, millis: u64, track: u16, channel: u4, key: u7, pressure: u7) {
    }

    fn control_change(&mut self, millis: u64, track: u16, channel: u4, controller: u7, value: u7) {}

    fn program_change(&mut self, millis: u64, track: u16, channel: u4, program: u7) {}

    fn channel_pressure(&mut self, millis: u64, track: u16, channel: u4, pressure: u7) {}

    /// `bend` ranges from 0 to 16383, with 8192 meaning no bend.
    fn pitch_bend(&mut self, millis: u64, track: u16, channel: u4, bend: PitchBend) {}

    /// `number` is `None` when the event omits it, meaning that the position of the track in the
    /// file should be used instead.
    fn sequence_number(&mut self, millis: u64, track: u16, number: Option<u16>) {}

    /// The text family of meta events shares a single payload shape, so they are all funneled
    /// through here first. The default forwards to the per-kind methods below.
    ///
    /// `channel` is the channel set by the most recent channel prefix meta event in this track.
    fn text_event(
        &mut self,
        millis: u64,
        track: u16,
        kind: TextKind,
        channel: Option<u4>,
        text: &str,
    ) {
        match kind {
            TextKind::Text => self.text(millis, track, channel, text),
            TextKind::Copyright => self.copyright(millis, track, channel, text),
            TextKind::TrackName => self.track_name(millis, track, channel, text),
            TextKind::InstrumentName => self.instrument_name(millis, track, channel, text),
            TextKind::Lyric => self.lyric(millis, track, channel, text),
            TextKind::Marker => self.marker(millis, track, channel, text),
            TextKind::CuePoint => self.cue_point(millis, track, channel, text),
            TextKind::ProgramName => self.program_name(millis, track, channel, text),
            TextKind::DeviceName => self.device_name(millis, track, channel, text),
        }
    }

    fn text(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn copyright(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn track_name(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn instrument_name(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn lyric(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn marker(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn cue_point(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn program_name(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn device_name(&mut self, millis: u64, track: u16, channel: Option<u4>, text: &str) {}

    fn channel_prefix(&mut self, millis: u64, track: u16, channel: u4) {}

    fn midi_port(&mut self, millis: u64, track: u16, port: u8) {}

    fn end_of_track(&mut self, millis: u64, track: u16) {}

    /// The tempo change has already been applied when this is called, so it affects the
    /// timestamps of all following events.
    fn tempo(&mut self, millis: u64, track: u16, micros_per_quarter_note: u24) {}

    fn smpte_offset(&mut self, millis: u64, track: u16, offset: SmpteTime) {}

    /// `denominator` is the actual denominator (`4` for 3/4), not the power of two stored in
    /// the file.
    fn time_signature(
        &mut self,
        millis: u64,
        track: u16,
        numerator: u8,
        denominator: u32,
        clocks_per_click: u8,
        thirty_seconds_per_quarter: u8,
    ) {
    }

    /// Negative numbers indicate flats, positive numbers indicate sharps.
    fn key_signature(&mut self, millis: u64, track: u16, sharps: i8, minor: bool) {}

    fn sequencer_specific(&mut self, millis: u64, track: u16, data: &[u8]) {}

    fn unknown_meta(&mut self, millis: u64, track: u16, type_byte: u8, data: &[u8]) {}

    /// An `0xF7` escape carrying arbitrary bytes, not part of any System Exclusive message.
    fn system_escape(&mut self, millis: u64, track: u16, data: &[u8]) {}

    /// A System Exclusive message or one of its continuation packets.
    ///
    /// `data` does not include the leading `0xF0` status, but does include the trailing `0xF7`
    /// when present. `unfinished` is set when the packet does not end the message, in which case
    /// the next `0xF7` event of the track carries the continuation.
    fn system_message(&mut self, millis: u64, track: u16, data: &[u8], unfinished: bool) {}

    /// A System Exclusive (`0xF0`) or escape (`0xF7`) event with an empty body.
    fn empty_system_message(&mut self, millis: u64, track: u16, status: u8) {}
}

/// Forward a decoded channel message to the matching sink method.
pub(crate) fn emit_channel<S: Sink + ?Sized>(
    sink: &mut S,
    millis: u64,
    track: u16,
    channel: u4,
    message: MidiMessage,
) {
    match message {
        MidiMessage::NoteOff { key, vel } => sink.note_off(millis, track, channel, key, vel),
        MidiMessage::NoteOn { key, vel } => sink.note_on(millis, track, channel, key, vel),
        MidiMessage::PolyphonicPressure { key, pressure } => {
            sink.polyphonic_pressure(millis, track, channel, key, pressure)
        }
        MidiMessage::ControlChange { controller, value } => {
            sink.control_change(millis, track, channel, controller, value)
        }
        MidiMessage::ProgramChange { program } => {
            sink.program_change(millis, track, channel, program)
        }
        MidiMessage::ChannelPressure { pressure } => {
            sink.channel_pressure(millis, track, channel, pressure)
        }
        MidiMessage::PitchBend { bend } => sink.pitch_bend(millis, track, channel, bend),
    }
}
