//! A sink that simply records every event, for callers who would rather iterate over a `Vec`.

use crate::{
    event::{MidiMessage, PitchBend, TextKind},
    prelude::*,
    primitive::SmpteTime,
    sink::Sink,
    smf::Header,
};

/// An owned copy of a decoded event.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// A message associated to a MIDI channel carrying musical data.
    Midi { channel: u4, message: MidiMessage },
    SequenceNumber(Option<u16>),
    Text {
        kind: TextKind,
        channel: Option<u4>,
        text: String,
    },
    ChannelPrefix(u4),
    MidiPort(u8),
    EndOfTrack,
    Tempo(u24),
    SmpteOffset(SmpteTime),
    /// Numerator, actual denominator, MIDI clocks per click, 32nd notes per quarter.
    TimeSignature(u8, u32, u8, u8),
    /// Negative numbers indicate flats. `true` indicates a minor scale.
    KeySignature(i8, bool),
    SequencerSpecific(Vec<u8>),
    /// The raw meta event type byte and its payload.
    UnknownMeta(u8, Vec<u8>),
    SystemEscape(Vec<u8>),
    SystemMessage { data: Vec<u8>, unfinished: bool },
    /// Carries the status byte of the empty event, `0xF0` or `0xF7`.
    EmptySystemMessage(u8),
}

/// An event with its absolute time in milliseconds and the 1-based track it came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TimedEvent {
    pub millis: u64,
    pub track: u16,
    pub event: Event,
}

/// Records every event it receives, in file order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    pub header: Option<Header>,
    pub events: Vec<TimedEvent>,
}
impl EventLog {
    pub fn new() -> EventLog {
        EventLog::default()
    }

    /// Iterate over the events of a single track.
    pub fn track(&self, track: u16) -> impl Iterator<Item = &TimedEvent> {
        self.events.iter().filter(move |ev| ev.track == track)
    }

    fn push(&mut self, millis: u64, track: u16, event: Event) {
        self.events.push(TimedEvent {
            millis,
            track,
            event,
        });
    }

    fn push_midi(&mut self, millis: u64, track: u16, channel: u4, message: MidiMessage) {
        self.push(millis, track, Event::Midi { channel, message });
    }
}

impl Sink for EventLog {
    fn header(&mut self, header: &Header) {
        self.header = Some(*header);
    }

    fn note_off(&mut self, millis: u64, track: u16, channel: u4, key: u7, vel: u7) {
        self.push_midi(millis, track, channel, MidiMessage::NoteOff { key, vel });
    }

    fn note_on(&mut self, millis: u64, track: u16, channel: u4, key: u7, vel: u7) {
        self.push_midi(millis, track, channel, MidiMessage::NoteOn { key, vel });
    }

    fn polyphonic_pressure(&mut self, millis: u64, track: u16, channel: u4, key: u7, pressure: u7) {
        let message = MidiMessage::PolyphonicPressure { key, pressure };
        self.push_midi(millis, track, channel, message);
    }

    fn control_change(&mut self, millis: u64, track: u16, channel: u4, controller: u7, value: u7) {
        let message = MidiMessage::ControlChange { controller, value };
        self.push_midi(millis, track, channel, message);
    }

    fn program_change(&mut self, millis: u64, track: u16, channel: u4, program: u7) {
        self.push_midi(millis, track, channel, MidiMessage::ProgramChange { program });
    }

    fn channel_pressure(&mut self, millis: u64, track: u16, channel: u4, pressure: u7) {
        self.push_midi(millis, track, channel, MidiMessage::ChannelPressure { pressure });
    }

    fn pitch_bend(&mut self, millis: u64, track: u16, channel: u4, bend: PitchBend) {
        self.push_midi(millis, track, channel, MidiMessage::PitchBend { bend });
    }

    fn sequence_number(&mut self, millis: u64, track: u16, number: Option<u16>) {
        self.push(millis, track, Event::SequenceNumber(number));
    }

    fn text_event(
        &mut self,
        millis: u64,
        track: u16,
        kind: TextKind,
        channel: Option<u4>,
        text: &str,
    ) {
        let text = String::from(text);
        self.push(
            millis,
            track,
            Event::Text {
                kind,
                channel,
                text,
            },
        );
    }

    fn channel_prefix(&mut self, millis: u64, track: u16, channel: u4) {
        self.push(millis, track, Event::ChannelPrefix(channel));
    }

    fn midi_port(&mut self, millis: u64, track: u16, port: u8) {
        self.push(millis, track, Event::MidiPort(port));
    }

    fn end_of_track(&mut self, millis: u64, track: u16) {
        self.push(millis, track, Event::EndOfTrack);
    }

    fn tempo(&mut self, millis: u64, track: u16, micros_per_quarter_note: u24) {
        self.push(millis, track, Event::Tempo(micros_per_quarter_note));
    }

    fn smpte_offset(&mut self, millis: u64, track: u16, offset: SmpteTime) {
        self.push(millis, track, Event::SmpteOffset(offset));
    }

    fn time_signature(
        &mut self,
        millis: u64,
        track: u16,
        numerator: u8,
        denominator: u32,
        clocks_per_click: u8,
        thirty_seconds_per_quarter: u8,
    ) {
        let event = Event::TimeSignature(
            numerator,
            denominator,
            clocks_per_click,
            thirty_seconds_per_quarter,
        );
        self.push(millis, track, event);
    }

    fn key_signature(&mut self, millis: u64, track: u16, sharps: i8, minor: bool) {
        self.push(millis, track, Event::KeySignature(sharps, minor));
    }

    fn sequencer_specific(&mut self, millis: u64, track: u16, data: &[u8]) {
        self.push(millis, track, Event::SequencerSpecific(data.to_vec()));
    }

    fn unknown_meta(&mut self, millis: u64, track: u16, type_byte: u8, data: &[u8]) {
        self.push(millis, track, Event::UnknownMeta(type_byte, data.to_vec()));
    }

    fn system_escape(&mut self, millis: u64, track: u16, data: &[u8]) {
        self.push(millis, track, Event::SystemEscape(data.to_vec()));
    }

    fn system_message(&mut self, millis: u64, track: u16, data: &[u8], unfinished: bool) {
        let event = Event::SystemMessage {
            data: data.to_vec(),
            unfinished,
        };
        self.push(millis, track, event);
    }

    fn empty_system_message(&mut self, millis: u64, track: u16, status: u8) {
        self.push(millis, track, Event::EmptySystemMessage(status));
    }
}
