//! Conversion from MIDI ticks to wall-clock milliseconds.

use crate::{prelude::*, primitive::Fps};

/// The time base of an SMF file, taken from the division field of the header.
/// This can be in ticks/beat or ticks/second.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub enum TimeBase {
    /// Ticks per quarter note, as a nonzero 15-bit integer.
    ///
    /// The length of a beat is not fixed, so the tempo meta events of the file are needed to turn
    /// ticks into time.
    Metrical { ticks_per_quarter_note: u15 },
    /// Ticks per second, by dividing a second into frames and then into subframes.
    /// Therefore the length of a tick is `1/fps/ticks_per_frame`.
    PerSecond { fps: Fps, ticks_per_frame: u8 },
}
impl TimeBase {
    /// Interpret the raw 16-bit division field of a header chunk.
    pub fn from_division(raw: u16) -> Result<TimeBase> {
        if bit_range(raw, 15..16) != 0 {
            //The high byte holds the frame rate as a negative two's complement number
            let fps = (bit_range(raw, 8..16) as u8 as i8).wrapping_neg() as u8;
            let fps = Fps::from_int(fps).ok_or(err_unsupported!("unsupported smpte frame rate"))?;
            let ticks_per_frame = bit_range(raw, 0..8) as u8;
            ensure!(
                ticks_per_frame != 0,
                err_bad!("smpte time base with zero ticks per frame")
            );
            Ok(TimeBase::PerSecond {
                fps,
                ticks_per_frame,
            })
        } else {
            let ticks_per_quarter_note = u15::from(raw);
            ensure!(
                ticks_per_quarter_note != 0,
                err_bad!("metrical time base with zero ticks per quarter note")
            );
            Ok(TimeBase::Metrical {
                ticks_per_quarter_note,
            })
        }
    }

    /// Fixed tick rate of `PerSecond` time bases.
    ///
    /// `Metrical` time bases have no fixed rate, since it depends on the current tempo.
    pub fn ticks_per_second(&self) -> Option<f64> {
        match *self {
            TimeBase::Metrical { .. } => None,
            TimeBase::PerSecond {
                fps,
                ticks_per_frame,
            } => Some(per_second_rate(fps, ticks_per_frame)),
        }
    }
}

fn per_second_rate(fps: Fps, ticks_per_frame: u8) -> f64 {
    fps.as_f64() * f64::from(ticks_per_frame)
}

/// A tempo change: from `tick` onwards, a quarter note lasts `micros_per_quarter_note`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct TempoDescriptor {
    pub micros_per_quarter_note: u24,
    pub tick: u64,
}

/// Every tempo change seen so far, ordered by tick.
///
/// The map is built incrementally while decoding, so converting a tick only takes into account the
/// tempo changes that were decoded before it.
#[derive(Clone, Debug)]
pub struct TempoMap {
    time_base: TimeBase,
    tempos: Vec<TempoDescriptor>,
    out_of_order: bool,
}
impl TempoMap {
    pub fn new(time_base: TimeBase) -> TempoMap {
        TempoMap {
            time_base,
            tempos: Vec::new(),
            out_of_order: false,
        }
    }

    #[inline]
    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// The tempo changes recorded so far, in increasing tick order.
    #[inline]
    pub fn tempos(&self) -> &[TempoDescriptor] {
        &self.tempos[..]
    }

    /// Whether a tempo change was ever inserted at or before the tick of the latest one.
    ///
    /// This flag is sticky: once set it stays set for the lifetime of the map.
    #[inline]
    pub fn is_out_of_order(&self) -> bool {
        self.out_of_order
    }

    /// Record a tempo change.
    ///
    /// The tick must be strictly greater than the tick of every tempo change recorded so far.
    /// Otherwise the change is discarded and the out-of-order flag is raised.
    pub fn add_tempo(&mut self, micros_per_quarter_note: u24, tick: u64) {
        if let Some(last) = self.tempos.last() {
            if tick <= last.tick {
                self.out_of_order = true;
                return;
            }
        }
        self.tempos.push(TempoDescriptor {
            micros_per_quarter_note,
            tick,
        });
    }

    /// Elapsed milliseconds from tick 0 to `tick`, truncated.
    ///
    /// For metrical time bases the time before the first tempo change is zero.
    pub fn ticks_to_millis(&self, tick: u64) -> u64 {
        let ticks_per_quarter_note = match self.time_base {
            TimeBase::Metrical {
                ticks_per_quarter_note,
            } => u128::from(ticks_per_quarter_note.as_int()),
            TimeBase::PerSecond {
                fps,
                ticks_per_frame,
            } => {
                return (tick as f64 * 1000.0 / per_second_rate(fps, ticks_per_frame)) as u64;
            }
        };
        let segment = |ticks: u64, tempo: &TempoDescriptor| -> u64 {
            let micros = u128::from(ticks) * u128::from(tempo.micros_per_quarter_note.as_int());
            (micros / ticks_per_quarter_note / 1000) as u64
        };

        let last = match self.tempos.last() {
            Some(last) => last,
            None => return 0,
        };
        let mut millis = 0;
        for pair in self.tempos.windows(2) {
            let (cur, next) = (&pair[0], &pair[1]);
            if tick >= next.tick {
                millis += segment(next.tick - cur.tick, cur);
            } else {
                return millis + segment(tick.saturating_sub(cur.tick), cur);
            }
        }
        millis + segment(tick.saturating_sub(last.tick), last)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn metrical(tpq: u16) -> TempoMap {
        TempoMap::new(TimeBase::Metrical {
            ticks_per_quarter_note: u15::from(tpq),
        })
    }

    #[test]
    fn single_tempo() {
        let mut map = metrical(480);
        map.add_tempo(u24::from(500_000), 0);
        assert_eq!(map.ticks_to_millis(0), 0);
        assert_eq!(map.ticks_to_millis(240), 250);
        assert_eq!(map.ticks_to_millis(480), 500);
        assert_eq!(map.ticks_to_millis(4800), 5000);
    }

    #[test]
    fn no_tempo_means_no_time() {
        let map = metrical(96);
        assert_eq!(map.ticks_to_millis(0), 0);
        assert_eq!(map.ticks_to_millis(10_000), 0);
    }

    #[test]
    fn piecewise_tempo() {
        let mut map = metrical(480);
        map.add_tempo(u24::from(500_000), 0);
        map.add_tempo(u24::from(250_000), 960);
        map.add_tempo(u24::from(1_000_000), 1920);
        // First segment: 2 beats at 500ms
        assert_eq!(map.ticks_to_millis(960), 1000);
        // Half a beat into the second segment at 250ms
        assert_eq!(map.ticks_to_millis(1200), 1125);
        // Whole second segment, then one beat at 1s
        assert_eq!(map.ticks_to_millis(1920), 1500);
        assert_eq!(map.ticks_to_millis(2400), 2500);
    }

    #[test]
    fn time_before_first_tempo_is_zero() {
        let mut map = metrical(480);
        map.add_tempo(u24::from(500_000), 480);
        assert_eq!(map.ticks_to_millis(100), 0);
        assert_eq!(map.ticks_to_millis(960), 500);
    }

    #[test]
    fn sub_millisecond_remainders_truncate() {
        let mut map = metrical(3);
        map.add_tempo(u24::from(1000), 0);
        // 1 tick = 333.33us
        assert_eq!(map.ticks_to_millis(2), 0);
        assert_eq!(map.ticks_to_millis(3), 1);
        assert_eq!(map.ticks_to_millis(8), 2);
    }

    #[test]
    fn non_increasing_tempo_is_flagged() {
        let mut map = metrical(480);
        map.add_tempo(u24::from(500_000), 0);
        map.add_tempo(u24::from(400_000), 480);
        assert!(!map.is_out_of_order());
        map.add_tempo(u24::from(300_000), 480);
        assert!(map.is_out_of_order());
        assert_eq!(map.tempos().len(), 2);
        // Sticky
        map.add_tempo(u24::from(300_000), 960);
        assert!(map.is_out_of_order());
    }

    #[test]
    fn smpte_division() {
        // -25 fps, 40 ticks per frame: 1ms per tick
        let tb = TimeBase::from_division(0xE728).unwrap();
        assert_eq!(
            tb,
            TimeBase::PerSecond {
                fps: Fps::Fps25,
                ticks_per_frame: 40
            }
        );
        let map = TempoMap::new(tb);
        assert_eq!(map.ticks_to_millis(1234), 1234);

        // -24 fps, 4 ticks per frame
        let tb = TimeBase::from_division(0xE804).unwrap();
        assert_eq!(tb.ticks_per_second(), Some(96.0));
        let map = TempoMap::new(tb);
        assert_eq!(map.ticks_to_millis(96), 1000);

        let metrical = TimeBase::from_division(480).unwrap();
        assert_eq!(metrical.ticks_per_second(), None);
    }

    #[test]
    fn drop_frame_division() {
        // -29 fps (29.97 drop-frame), 100 ticks per frame
        let tb = TimeBase::from_division(0xE364).unwrap();
        assert_eq!(
            tb,
            TimeBase::PerSecond {
                fps: Fps::Fps29,
                ticks_per_frame: 100
            }
        );
        let map = TempoMap::new(tb);
        // 1 tick = 1.001/3 ms
        assert_eq!(map.ticks_to_millis(1500), 500);
        assert_eq!(map.ticks_to_millis(2997), 999);
    }

    #[test]
    fn bad_divisions() {
        let err = TimeBase::from_division(0xE028).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::UnsupportedMidi("unsupported smpte frame rate")
        );
        let err = TimeBase::from_division(0xE700).unwrap_err();
        assert!(err.kind().is_bad_file());
        let err = TimeBase::from_division(0).unwrap_err();
        assert!(err.kind().is_bad_file());
        assert_eq!(
            TimeBase::from_division(480).unwrap(),
            TimeBase::Metrical {
                ticks_per_quarter_note: u15::from(480)
            }
        );
    }
}
