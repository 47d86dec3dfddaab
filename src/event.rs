//! All sort of events and their decoders.
//!
//! Every handler reads from the cursor, mutates the explicit `ParserState` and reports what it
//! decoded to the sink. No handler keeps state of its own.

use crate::{
    cursor::ByteCursor,
    prelude::*,
    primitive::{Format, SmpteTime},
    sink::{emit_channel, Sink},
    tempo::TempoMap,
};
use tracing::{trace, warn};

/// Mutable decoding state, carried across events and tracks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParserState {
    pub(crate) track_number: u16,
    pub(crate) tick: u64,
    pub(crate) running_status: Option<u8>,
    pub(crate) channel_prefix: Option<u4>,
    pub(crate) pending_sysex: bool,
}
impl ParserState {
    pub(crate) fn new() -> ParserState {
        ParserState {
            track_number: 1,
            tick: 0,
            running_status: None,
            channel_prefix: None,
            pending_sysex: false,
        }
    }

    /// The 1-based number of the track being decoded.
    #[inline]
    pub fn track_number(&self) -> u16 {
        self.track_number
    }

    /// Ticks elapsed since the start of the track (or of the file, for non-parallel formats).
    #[inline]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// The last channel status byte seen, reused by events that omit their status byte.
    #[inline]
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// The channel associated to text events by the last channel prefix meta event.
    #[inline]
    pub fn channel_prefix(&self) -> Option<u4> {
        self.channel_prefix
    }

    /// Whether a System Exclusive message was left unterminated.
    #[inline]
    pub fn pending_sysex(&self) -> bool {
        self.pending_sysex
    }

    /// Move on to the next track.
    ///
    /// Tick time only restarts from zero for parallel files, where every track starts at the
    /// beginning of the song.
    pub(crate) fn finish_track(&mut self, format: Format) {
        self.track_number = self.track_number.saturating_add(1);
        if format == Format::Parallel {
            self.tick = 0;
        }
        self.running_status = None;
        self.channel_prefix = None;
        self.pending_sysex = false;
    }
}

/// What the main loop should do after an event.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Flow {
    Continue,
    EndOfTrack,
}

/// Decode a single track event: delta time, status and body.
///
/// In case of failure the cursor might be left in the middle of an event!
pub(crate) fn read_event<S: Sink + ?Sized>(
    cursor: &mut ByteCursor,
    state: &mut ParserState,
    tempo: &mut TempoMap,
    sink: &mut S,
) -> Result<Flow> {
    let delta = cursor
        .read_varlen()
        .context(err_bad!("failed to read event delta time"))?;
    state.tick += u64::from(delta.as_int());

    let status = match cursor
        .peek_u8()
        .context(err_bad!("failed to read event status"))?
    {
        //Running status! The data byte is left for the handler
        0x00..=0x7F => state
            .running_status
            .ok_or(err_bad!("running status with no prior status byte"))?,
        status => {
            cursor.skip(1)?;
            status
        }
    };
    let millis = tempo.ticks_to_millis(state.tick);
    trace!(
        track = state.track_number,
        tick = state.tick,
        millis,
        status,
        "dispatching event"
    );

    match status {
        0x80..=0xEF => {
            let message = MidiMessage::read(status, cursor)?;
            emit_channel(sink, millis, state.track_number, u4::from(status), message);
            state.running_status = Some(status);
            Ok(Flow::Continue)
        }
        0xFF => read_meta(cursor, state, tempo, sink, millis),
        0xF0 | 0xF7 => {
            read_sysex(status, cursor, state, sink, millis)?;
            Ok(Flow::Continue)
        }
        0xF1..=0xF6 => bail!(err_bad!(
            "standard midi files cannot contain system common events"
        )),
        0xF8..=0xFE => bail!(err_bad!(
            "standard midi files cannot contain system realtime events"
        )),
        //Running status only ever stores channel statuses
        0x00..=0x7F => bail!(err_bad!("invalid status byte")),
    }
}

/// Represents a MIDI message, always associated to a MIDI channel.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum MidiMessage {
    /// Stop playing a note.
    NoteOff {
        /// The MIDI key to stop playing.
        key: u7,
        /// The velocity with which to stop playing it.
        vel: u7,
    },
    /// Start playing a note.
    NoteOn {
        /// The key to start playing.
        key: u7,
        /// The velocity (strength) with which to press it.
        ///
        /// Note that by convention a `NoteOn` message with a velocity of 0 is equivalent to a
        /// `NoteOff`.
        vel: u7,
    },
    /// Modify the pressure on a note after it has been played.
    PolyphonicPressure {
        /// The key for which to modify its pressure.
        key: u7,
        /// The new pressure for the key.
        pressure: u7,
    },
    /// Modify the value of a MIDI controller.
    ControlChange {
        /// The controller to modify.
        ///
        /// See the MIDI spec for the meaning of each index.
        controller: u7,
        /// The value to set it to.
        value: u7,
    },
    /// Change the program (also known as instrument) for a channel.
    ProgramChange {
        /// The new program (instrument) to use for the channel.
        program: u7,
    },
    /// Change the pressure of a whole channel at once, without starting new notes.
    ChannelPressure {
        /// The new pressure for all notes currently playing in the channel.
        pressure: u7,
    },
    /// Set the pitch bend value for the entire channel.
    PitchBend {
        /// The new pitch-bend value.
        bend: PitchBend,
    },
}
impl MidiMessage {
    /// Midi messages have a known length.
    pub(crate) fn msg_length(status: u8) -> usize {
        const LENGTH_BY_STATUS: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 2, 2, 2, 2, 1, 1, 2, 0];
        LENGTH_BY_STATUS[(status >> 4) as usize] as usize
    }

    /// Read the data bytes of the message with the given status (0x80..=0xEF).
    pub(crate) fn read(status: u8, cursor: &mut ByteCursor) -> Result<MidiMessage> {
        let len = Self::msg_length(status);
        let data = cursor
            .read_bytes(len)
            .context(err_bad!("truncated midi message"))?;
        let data = match len {
            1 => [data_byte(data[0])?, u7::from(0)],
            2 => [data_byte(data[0])?, data_byte(data[1])?],
            _ => [u7::from(0), u7::from(0)],
        };
        Ok(match status >> 4 {
            0x8 => MidiMessage::NoteOff {
                key: data[0],
                vel: data[1],
            },
            0x9 => MidiMessage::NoteOn {
                key: data[0],
                vel: data[1],
            },
            0xA => MidiMessage::PolyphonicPressure {
                key: data[0],
                pressure: data[1],
            },
            0xB => MidiMessage::ControlChange {
                controller: data[0],
                value: data[1],
            },
            0xC => MidiMessage::ProgramChange { program: data[0] },
            0xD => MidiMessage::ChannelPressure { pressure: data[0] },
            0xE => {
                //Note the little-endian order, contrasting with the default big-endian order of
                //Standard Midi Files
                let lsb = data[0].as_int() as u16;
                let msb = data[1].as_int() as u16;
                MidiMessage::PitchBend {
                    bend: PitchBend(u14::from(msb << 7 | lsb)),
                }
            }
            _ => bail!(err_bad!("not a channel message status")),
        })
    }
}

fn data_byte(byte: u8) -> StdResult<u7, &'static ErrorKind> {
    if cfg!(feature = "strict") {
        u7::check_int(byte).map_err(|_| err_bad!("data byte with top bit set"))
    } else {
        //Ignore and truncate the extra bit
        Ok(u7::from(byte))
    }
}

/// The value of a pitch bend, represented as 14 bits.
///
/// A value of `0x0000` indicates full bend downwards.
/// A value of `0x2000` indicates no bend.
/// A value of `0x3FFF` indicates full bend upwards.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct PitchBend(pub u14);
impl PitchBend {
    /// The minimum value of `0x0000`, indicating full bend downwards.
    #[inline]
    pub const fn min_raw_value() -> PitchBend {
        PitchBend(u14::new(0x0000))
    }

    /// The middle value of `0x2000`, indicating no bend.
    #[inline]
    pub const fn mid_raw_value() -> PitchBend {
        PitchBend(u14::new(0x2000))
    }

    /// The maximum value of `0x3FFF`, indicating full bend upwards.
    #[inline]
    pub const fn max_raw_value() -> PitchBend {
        PitchBend(u14::new(0x3FFF))
    }

    /// The raw 14-bit value, in the range `[0, 0x3FFF]`.
    #[inline]
    pub fn raw(self) -> u16 {
        self.0.as_int()
    }

    /// Returns an int in the range `[-0x2000, 0x1FFF]`.
    #[inline]
    pub fn as_int(self) -> i16 {
        self.0.as_int() as i16 - 0x2000
    }

    /// Returns an `f32` in the range `[-1.0, 1.0)`.
    #[inline]
    pub fn as_f32(self) -> f32 {
        self.as_int() as f32 * (1.0 / 0x2000 as f32)
    }
}

/// The kind of a text meta event (types `0x01` to `0x09`).
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum TextKind {
    /// Arbitrary text associated to an instant.
    Text,
    /// A copyright notice.
    Copyright,
    /// Information about the name of the track.
    TrackName,
    /// Information about the name of the current instrument.
    InstrumentName,
    /// Arbitrary lyric information associated to an instant.
    Lyric,
    /// Arbitrary marker text associated to an instant.
    Marker,
    /// Arbitrary cue point text associated to an instant.
    CuePoint,
    /// Information about the name of the current program.
    ProgramName,
    /// Name of the device that this file was intended to be played with.
    DeviceName,
}
impl TextKind {
    /// Map a meta event type byte to a text kind, if it is one.
    pub fn from_type_byte(type_byte: u8) -> Option<TextKind> {
        Some(match type_byte {
            0x01 => TextKind::Text,
            0x02 => TextKind::Copyright,
            0x03 => TextKind::TrackName,
            0x04 => TextKind::InstrumentName,
            0x05 => TextKind::Lyric,
            0x06 => TextKind::Marker,
            0x07 => TextKind::CuePoint,
            0x08 => TextKind::ProgramName,
            0x09 => TextKind::DeviceName,
            _ => return None,
        })
    }
}

/// Check that a fixed-size meta event declares exactly the expected length.
fn expect_len(len: usize, expected: usize, err: &'static ErrorKind) -> Result<()> {
    ensure!(len == expected, err);
    Ok(())
}

fn read_meta<S: Sink + ?Sized>(
    cursor: &mut ByteCursor,
    state: &mut ParserState,
    tempo: &mut TempoMap,
    sink: &mut S,
    millis: u64,
) -> Result<Flow> {
    let type_byte = cursor
        .read_u8()
        .context(err_bad!("failed to read meta event type"))?;
    let len = cursor
        .read_varlen()
        .context(err_bad!("failed to read meta event length"))?
        .as_int() as usize;
    let track = state.track_number;
    macro_rules! body {
        () => {
            cursor
                .read_bytes(len)
                .context(err_bad!("truncated meta event"))?
        };
    }

    match type_byte {
        0x00 => {
            let number = match len {
                0 => None,
                2 => {
                    let data = body!();
                    Some(u16::from_be_bytes([data[0], data[1]]))
                }
                _ => bail!(err_bad!("sequence number meta event must be 0 or 2 bytes long")),
            };
            sink.sequence_number(millis, track, number);
        }
        0x01..=0x09 => {
            let text = cursor
                .read_text(len)
                .context(err_bad!("truncated text meta event"))?;
            if let Some(kind) = TextKind::from_type_byte(type_byte) {
                sink.text_event(millis, track, kind, state.channel_prefix, &text);
            }
        }
        0x20 => {
            expect_len(len, 1, err_bad!("channel prefix meta event must be 1 byte long"))?;
            let channel = u4::try_from(body!()[0])
                .ok_or(err_bad!("channel prefix out of range"))?;
            state.channel_prefix = Some(channel);
            sink.channel_prefix(millis, track, channel);
        }
        0x21 => {
            expect_len(len, 1, err_bad!("midi port meta event must be 1 byte long"))?;
            sink.midi_port(millis, track, body!()[0]);
        }
        0x2F => {
            expect_len(len, 0, err_bad!("end of track meta event must be empty"))?;
            sink.end_of_track(millis, track);
            return Ok(Flow::EndOfTrack);
        }
        0x51 => {
            expect_len(len, 3, err_bad!("tempo meta event must be 3 bytes long"))?;
            let micros = cursor
                .read_u24()
                .context(err_bad!("truncated meta event"))?;
            ensure!(micros != 0, err_bad!("tempo of zero microseconds per beat"));
            tempo.add_tempo(micros, state.tick);
            ensure!(
                !tempo.is_out_of_order(),
                err_bad!("out of order tempo change")
            );
            sink.tempo(millis, track, micros);
        }
        0x54 => {
            expect_len(len, 5, err_bad!("smpte offset meta event must be 5 bytes long"))?;
            let offset = SmpteTime::read(body!())?;
            sink.smpte_offset(millis, track, offset);
        }
        0x58 => {
            expect_len(len, 4, err_bad!("time signature meta event must be 4 bytes long"))?;
            let data = body!();
            let exponent = data[1];
            ensure!(
                exponent < 31,
                err_unsupported!("time signature denominator too large")
            );
            sink.time_signature(millis, track, data[0], 1 << exponent, data[2], data[3]);
        }
        0x59 => {
            expect_len(len, 2, err_bad!("key signature meta event must be 2 bytes long"))?;
            let data = body!();
            let sharps = data[0] as i8;
            ensure!(
                (-14..=14).contains(&sharps),
                err_unsupported!("key signature out of range")
            );
            let minor = match data[1] {
                0 => false,
                1 => true,
                _ => bail!(err_bad!("invalid key signature mode")),
            };
            sink.key_signature(millis, track, sharps, minor);
        }
        0x7F => sink.sequencer_specific(millis, track, body!()),
        _ => sink.unknown_meta(millis, track, type_byte, body!()),
    }
    Ok(Flow::Continue)
}

/// Decode an `0xF0` System Exclusive or an `0xF7` escape/continuation event.
///
/// A System Exclusive message is complete once a packet ends in `0xF7`. Until then, `0xF7` events
/// continue the same message instead of being independent escapes.
fn read_sysex<S: Sink + ?Sized>(
    status: u8,
    cursor: &mut ByteCursor,
    state: &mut ParserState,
    sink: &mut S,
    millis: u64,
) -> Result<()> {
    let len = cursor
        .read_varlen()
        .context(err_bad!("failed to read sysex length"))?
        .as_int() as usize;
    let track = state.track_number;
    if len == 0 {
        trace!(track, status, "empty system message");
        sink.empty_system_message(millis, track, status);
        return Ok(());
    }
    let data = cursor
        .read_bytes(len)
        .context(err_bad!("truncated system exclusive message"))?;
    let unfinished = data.last() != Some(&0xF7);
    if status == 0xF0 {
        if state.pending_sysex {
            warn!(track, "system exclusive message started before the previous one ended");
        }
        state.pending_sysex = unfinished;
        sink.system_message(millis, track, data, unfinished);
    } else if state.pending_sysex {
        state.pending_sysex = unfinished;
        sink.system_message(millis, track, data, unfinished);
    } else {
        sink.system_escape(millis, track, data);
    }
    Ok(())
}
