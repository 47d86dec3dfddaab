//! # Overview
//!
//! `midisink` is a streaming Standard Midi File (SMF) decoder.
//! Instead of building an in-memory representation of the file, it walks the raw bytes once and
//! reports every event to a user-provided [`Sink`](trait.Sink.html), already stamped with its
//! absolute time in milliseconds.
//!
//! Usage is as simple as:
//!
//! ```rust
//! use midisink::{num::{u4, u7}, Sink};
//!
//! #[derive(Default)]
//! struct NoteCounter(usize);
//! impl Sink for NoteCounter {
//!     fn note_on(&mut self, _millis: u64, _track: u16, _ch: u4, _key: u7, vel: u7) {
//!         if vel > 0 {
//!             self.0 += 1;
//!         }
//!     }
//! }
//!
//! # let bytes: &[u8] = &[
//! #     b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0,
//! #     b'M', b'T', b'r', b'k', 0, 0, 0, 11,
//! #     0x00, 0x90, 0x3C, 0x40, 0x60, 0x3C, 0x00, 0x00, 0xFF, 0x2F, 0x00,
//! # ];
//! let mut counter = NoteCounter::default();
//! let summary = midisink::decode(bytes, &mut counter).unwrap();
//! println!("{} notes across {} tracks", counter.0, summary.tracks);
//! ```
//!
//! The [`Sink`](trait.Sink.html) trait has one method per event kind, all of which do nothing by
//! default. Implementors override only the events they care about.
//! For consumers that would rather have a list of events, the
//! [`EventLog`](struct.EventLog.html) sink records everything it sees.
//!
//! # About timestamps
//!
//! Every event is reported with the milliseconds elapsed since the start of the song, computed
//! from the tempo changes decoded so far. Files that use a metrical time base but never declare a
//! tempo report every event at 0 milliseconds.
//!
//! In format 1 (parallel) files every track restarts from tick zero, while in format 2
//! (sequential) files tick time keeps accumulating from one track to the next.
//!
//! # About features
//!
//! The mode in which the crate works is configurable through the use of cargo features.
//! The crate is always `no_std + alloc`; the features only add functionality on top.
//!
//! - The `std` feature
//!
//!   Implements `std::error::Error` for [`Error`](struct.Error.html).
//!   Enabled by default.
//!
//! - The `parallel` feature
//!
//!   Enables [`decode_all`](fn.decode_all.html), which decodes several files at once through the
//!   `rayon` thread pool. Implies `std`. Enabled by default.
//!
//! - The `strict` feature
//!
//!   By default `midisink` will plow through some non-standard files: tracks that run past their
//!   declared length, data bytes with the top bit set and junk after the last track are tolerated
//!   (and logged through `tracing`). By enabling the `strict` feature these are rejected with
//!   `ErrorKind::BadMidiFile` instead.
//!
//! # Logging
//!
//! Diagnostics are emitted through the `tracing` crate. No subscriber is installed by the library.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

macro_rules! bail {
    ($err:expr) => {{
        return Err($err.into());
    }};
}
macro_rules! ensure {
    ($cond:expr, $err:expr) => {{
        if !$cond {
            bail!($err)
        }
    }};
}

/// All of the errors this crate produces.
#[macro_use]
mod error;

mod prelude {
    pub(crate) use crate::{
        error::{ErrorKind, Result, ResultExt, StdResult},
        primitive::{u14, u15, u24, u28, u4, u7, Format},
    };
    pub(crate) use alloc::{string::String, vec::Vec};
    pub(crate) use core::ops;

    pub(crate) fn bit_range<T>(val: T, range: ops::Range<u32>) -> T
    where
        T: From<u8>
            + ops::Shr<u32, Output = T>
            + ops::Shl<u32, Output = T>
            + ops::Not<Output = T>
            + ops::BitAnd<Output = T>,
    {
        let mask = !((!T::from(0)) << (range.end - range.start));
        (val >> range.start) & mask
    }
}

mod cursor;
mod event;
mod primitive;
mod record;
mod sink;
mod smf;
mod tempo;

#[cfg(feature = "parallel")]
pub use crate::smf::decode_all;
pub use crate::{
    cursor::{decode_text, ByteCursor},
    error::{Error, ErrorKind, Result},
    event::{MidiMessage, ParserState, PitchBend, TextKind},
    primitive::{Format, Fps, SmpteTime},
    record::{Event, EventLog, TimedEvent},
    sink::Sink,
    smf::{decode, Decoder, Header, Summary},
    tempo::{TempoDescriptor, TempoMap, TimeBase},
};

/// Exotically-sized integers used by the MIDI standard.
pub mod num {
    pub use crate::primitive::{u14, u15, u2, u24, u28, u4, u7};
}
