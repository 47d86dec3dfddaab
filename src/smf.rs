//! Specific to the SMF packaging of MIDI streams: header validation, track chunk framing and the
//! main decoding loop.

use crate::{
    cursor::ByteCursor,
    event::{read_event, Flow, ParserState},
    prelude::*,
    sink::Sink,
    tempo::{TempoMap, TimeBase},
};
use tracing::{debug, warn};

/// A MIDI file header.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Header {
    pub format: Format,
    /// Amount of track chunks declared by the header. Always at least 1.
    pub track_count: u16,
    pub time_base: TimeBase,
}
impl Header {
    pub fn new(format: Format, track_count: u16, time_base: TimeBase) -> Header {
        Header {
            format,
            track_count,
            time_base,
        }
    }

    /// Read and validate the whole header chunk, magic included.
    pub(crate) fn read(cursor: &mut ByteCursor) -> Result<Header> {
        let magic = cursor
            .read_bytes(4)
            .context(err_bad!("failed to read file magic"))?;
        ensure!(magic == b"MThd", err_bad!("not a midi file"));
        let len = cursor
            .read_u32()
            .context(err_bad!("failed to read header length"))?;
        ensure!(len == 6, err_unsupported!("unsupported header chunk length"));
        let format = cursor
            .read_u16()
            .context(err_bad!("failed to read midi format"))?;
        let track_count = cursor
            .read_u16()
            .context(err_bad!("failed to read track count"))?;
        let division = cursor
            .read_u16()
            .context(err_bad!("failed to read midi time base"))?;

        let format = Format::from_int(format).ok_or(err_unsupported!("unsupported smf format"))?;
        ensure!(track_count >= 1, err_bad!("midi file declares no tracks"));
        ensure!(
            format != Format::SingleTrack || track_count == 1,
            err_bad!("singletrack format file declares multiple tracks")
        );
        let time_base = TimeBase::from_division(division)?;
        Ok(Header::new(format, track_count, time_base))
    }
}

/// Read a track chunk header and start counting its bytes.
fn open_track(cursor: &mut ByteCursor, track_number: u16) -> Result<()> {
    let magic = cursor
        .read_bytes(4)
        .context(err_bad!("failed to read track magic"))?;
    ensure!(magic == b"MTrk", err_bad!("expected a track chunk"));
    let len = cursor
        .read_u32()
        .context(err_bad!("failed to read track length"))?;
    debug!(
        track = track_number,
        len,
        offset = cursor.position(),
        "opened track chunk"
    );
    cursor.begin_track(len);
    Ok(())
}

/// What happened during a successful decode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub header: Header,
    /// Amount of tracks that were decoded up to their end of track event.
    pub tracks: u16,
    /// Amount of events reported to the sink.
    pub events: u64,
    /// Tracks (1-based) whose events ran past the length declared by their chunk header.
    ///
    /// This is tolerated unless the `strict` feature is enabled.
    pub overrun_tracks: Vec<u16>,
    /// Latest end of track time across all tracks, in milliseconds.
    pub last_millis: u64,
}

/// Decodes a Standard Midi File held in memory, reporting every event to a sink.
///
/// The decoder is cheap to create and holds no state between calls to `decode`: each call owns a
/// fresh cursor, tempo map and parser state, so a single decoder may be used from several
/// threads at once.
#[derive(Copy, Clone, Debug)]
pub struct Decoder<'a> {
    raw: &'a [u8],
}
impl<'a> Decoder<'a> {
    pub fn new(raw: &'a [u8]) -> Decoder<'a> {
        Decoder { raw }
    }

    /// The raw bytes of the file.
    pub fn bytes(&self) -> &'a [u8] {
        self.raw
    }

    /// Decode the whole file in a single pass.
    ///
    /// On failure the error carries the file offset at which decoding stopped. Events decoded
    /// before the failure have already been delivered to the sink.
    pub fn decode<S: Sink + ?Sized>(&self, sink: &mut S) -> Result<Summary> {
        let mut cursor = ByteCursor::new(self.raw);
        decode_impl(&mut cursor, sink).map_err(|err| err.at(cursor.position()))
    }
}

/// Decode the Standard Midi File in `raw`, reporting every event to `sink`.
///
/// Shorthand for `Decoder::new(raw).decode(sink)`.
pub fn decode<S: Sink + ?Sized>(raw: &[u8], sink: &mut S) -> Result<Summary> {
    Decoder::new(raw).decode(sink)
}

fn decode_impl<S: Sink + ?Sized>(cursor: &mut ByteCursor, sink: &mut S) -> Result<Summary> {
    let header = Header::read(cursor)?;
    debug!(
        format = header.format.as_int(),
        tracks = header.track_count,
        time_base = ?header.time_base,
        "decoding midi file"
    );
    sink.header(&header);

    let mut tempo = TempoMap::new(header.time_base);
    let mut state = ParserState::new();
    let mut summary = Summary {
        header,
        tracks: 0,
        events: 0,
        overrun_tracks: Vec::new(),
        last_millis: 0,
    };
    open_track(cursor, state.track_number)?;
    loop {
        let flow = read_event(cursor, &mut state, &mut tempo, sink)?;
        summary.events += 1;
        if cursor.is_track_overrun() && summary.overrun_tracks.last() != Some(&state.track_number)
        {
            if cfg!(feature = "strict") {
                bail!(err_bad!("event crosses the end of its track chunk"));
            }
            warn!(
                track = state.track_number,
                declared = cursor.track_length(),
                "track runs past its declared length"
            );
            summary.overrun_tracks.push(state.track_number);
        }
        if flow == Flow::EndOfTrack {
            summary.last_millis = summary.last_millis.max(tempo.ticks_to_millis(state.tick));
            let leftover = cursor.track_remaining();
            if leftover > 0 {
                debug!(
                    track = state.track_number,
                    leftover, "skipping bytes after end of track"
                );
                cursor
                    .skip(leftover)
                    .context(err_bad!("track chunk longer than the file"))?;
            }
            summary.tracks += 1;
            state.finish_track(header.format);
            if summary.tracks == header.track_count {
                break;
            }
            open_track(cursor, state.track_number)?;
        }
    }

    if !cursor.is_eof() {
        if cfg!(feature = "strict") {
            bail!(err_bad!("unexpected data after the last track"));
        }
        warn!(
            trailing = cursor.remaining(),
            "ignoring data after the last track"
        );
    }
    debug!(
        tracks = summary.tracks,
        events = summary.events,
        "finished decoding midi file"
    );
    Ok(summary)
}

/// Decode several independent files at once, on the `rayon` thread pool.
///
/// `make_sink` is called with the index of each file to build the sink that will receive its
/// events. Results are returned in the same order as `files`, each with its sink.
#[cfg(feature = "parallel")]
pub fn decode_all<B, S, F>(files: &[B], make_sink: F) -> Vec<Result<(S, Summary)>>
where
    B: AsRef<[u8]> + Sync,
    S: Sink + Send,
    F: Fn(usize) -> S + Sync,
{
    use rayon::prelude::*;

    files
        .par_iter()
        .enumerate()
        .map(|(idx, raw)| -> Result<(S, Summary)> {
            let mut sink = make_sink(idx);
            let summary = decode(raw.as_ref(), &mut sink)?;
            Ok((sink, summary))
        })
        .collect()
}
