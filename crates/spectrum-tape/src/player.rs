//! Playback of one tape block as EAR signal levels.

use emu_core::{Observable, Value};

use crate::block::TapeBlock;

/// Length of one pilot pulse, in tacts.
pub const PILOT_PULSE: i64 = 2168;

/// Length of the first sync pulse.
pub const SYNC_1_PULSE: i64 = 667;

/// Length of the second sync pulse.
pub const SYNC_2_PULSE: i64 = 735;

/// Length of each half-pulse of a zero bit.
pub const BIT_0_PULSE: i64 = 855;

/// Length of each half-pulse of a one bit.
pub const BIT_1_PULSE: i64 = 1710;

/// Pilot pulse count for header blocks (flag byte high bit clear).
pub const HEADER_PILOT_COUNT: i64 = 8063;

/// Pilot pulse count for data blocks.
pub const DATA_PILOT_COUNT: i64 = 3223;

/// Tacts per millisecond at the 3.5 MHz reference clock.
pub const TACTS_PER_MS: i64 = 3500;

/// Playback gives up and completes the block when it is sampled this far
/// past its start, treating the tape as faulty. Ten minutes of reference
/// clock, comfortably beyond the longest legal block.
pub const MAX_TACT_JUMP: i64 = 2_100_000_000;

/// Where playback currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayPhase {
    /// Playback has not been started.
    #[default]
    None,
    /// The leading pilot tone.
    Pilot,
    /// The two sync pulses after the pilot.
    Sync,
    /// Payload bits.
    Data,
    /// Holding the post-block pause level.
    Pause,
    /// The block has fully played.
    Completed,
}

/// Plays one block as the EAR levels a loader would sample.
///
/// The player is a pure function of the CPU tact counter: the host asks
/// for the level at the current tact and the player advances its phase
/// as far as that tact implies. Sampling sparsely skips detail exactly
/// like real loaders that poll too slowly.
#[derive(Debug, Clone)]
pub struct TapePlayer {
    block: TapeBlock,
    phase: PlayPhase,
    start_tact: i64,
    pilot_ends: i64,
    sync1_ends: i64,
    sync2_ends: i64,
    bit_starts: i64,
    bit_pulse_length: i64,
    byte_index: usize,
    bit_mask: u8,
    pause_ends: i64,
}

impl TapePlayer {
    #[must_use]
    pub fn new(block: TapeBlock) -> Self {
        Self {
            block,
            phase: PlayPhase::None,
            start_tact: 0,
            pilot_ends: 0,
            sync1_ends: 0,
            sync2_ends: 0,
            bit_starts: 0,
            bit_pulse_length: 0,
            byte_index: 0,
            bit_mask: 0x80,
            pause_ends: 0,
        }
    }

    #[must_use]
    pub const fn block(&self) -> &TapeBlock {
        &self.block
    }

    #[must_use]
    pub const fn phase(&self) -> PlayPhase {
        self.phase
    }

    #[must_use]
    pub const fn start_tact(&self) -> i64 {
        self.start_tact
    }

    /// Byte currently being played.
    #[must_use]
    pub const fn byte_index(&self) -> usize {
        self.byte_index
    }

    /// Mask of the bit currently being played, MSB first.
    #[must_use]
    pub const fn bit_mask(&self) -> u8 {
        self.bit_mask
    }

    /// Begin playback at the given tact. The pilot length is fixed here
    /// from the flag byte: headers get the long pilot, data the short one.
    pub fn start_playback(&mut self, start_tact: i64) {
        self.phase = PlayPhase::Pilot;
        self.start_tact = start_tact;
        let pilot_count = if self.block.is_header() {
            HEADER_PILOT_COUNT
        } else {
            DATA_PILOT_COUNT
        };
        self.pilot_ends = pilot_count * PILOT_PULSE;
        self.sync1_ends = self.pilot_ends + SYNC_1_PULSE;
        self.sync2_ends = self.sync1_ends + SYNC_2_PULSE;
        self.byte_index = 0;
        self.bit_mask = 0x80;
    }

    /// The EAR level at `current_tact`, advancing the phase as needed.
    pub fn signal_at(&mut self, current_tact: i64) -> bool {
        if matches!(self.phase, PlayPhase::None | PlayPhase::Completed) {
            return true;
        }

        let pos = current_tact - self.start_tact;
        if pos >= MAX_TACT_JUMP {
            // Unsampled for far too long: treat the tape as faulty and
            // finish the block.
            self.phase = PlayPhase::Completed;
            return true;
        }

        if matches!(self.phase, PlayPhase::Pilot | PlayPhase::Sync) {
            if pos <= self.pilot_ends {
                // alternating pilot pulses
                return (pos / PILOT_PULSE) % 2 == 0;
            }
            if pos <= self.sync1_ends {
                self.phase = PlayPhase::Sync;
                return false;
            }
            if pos <= self.sync2_ends {
                self.phase = PlayPhase::Sync;
                return true;
            }
            self.phase = PlayPhase::Data;
            self.bit_starts = self.sync2_ends;
            self.load_bit_pulse();
        }

        if self.phase == PlayPhase::Data {
            let bit_pos = pos - self.bit_starts;
            if bit_pos < self.bit_pulse_length {
                return false;
            }
            if bit_pos < 2 * self.bit_pulse_length {
                return true;
            }

            // move past the bit just finished
            self.bit_mask >>= 1;
            if self.bit_mask == 0 {
                self.bit_mask = 0x80;
                self.byte_index += 1;
            }

            if self.byte_index < self.block.payload().len() {
                self.bit_starts += 2 * self.bit_pulse_length;
                self.load_bit_pulse();
                // first pulse of the next bit
                return false;
            }

            self.phase = PlayPhase::Pause;
            self.pause_ends =
                current_tact + TACTS_PER_MS * i64::from(self.block.pause_after_ms());
            return true;
        }

        // pause phase: hold the level, then finish
        if current_tact > self.pause_ends {
            self.phase = PlayPhase::Completed;
        }
        true
    }

    fn load_bit_pulse(&mut self) {
        let bit_set = self.block.payload()[self.byte_index] & self.bit_mask != 0;
        self.bit_pulse_length = if bit_set { BIT_1_PULSE } else { BIT_0_PULSE };
    }
}

impl Observable for TapePlayer {
    fn query(&self, path: &str) -> Option<Value> {
        let value = match path {
            "phase" => Value::Str(match self.phase {
                PlayPhase::None => "none",
                PlayPhase::Pilot => "pilot",
                PlayPhase::Sync => "sync",
                PlayPhase::Data => "data",
                PlayPhase::Pause => "pause",
                PlayPhase::Completed => "completed",
            }),
            "start_tact" => Value::I64(self.start_tact),
            "byte_index" => Value::I64(self.byte_index as i64),
            "bit_mask" => Value::U8(self.bit_mask),
            "pause_after" => Value::U16(self.block.pause_after_ms()),
            "length" => Value::I64(self.block.payload().len() as i64),
            _ => return None,
        };
        Some(value)
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "phase",
            "start_tact",
            "byte_index",
            "bit_mask",
            "pause_after",
            "length",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::TapeBlock;

    fn player_for(pause_ms: u16, payload: &[u8]) -> TapePlayer {
        TapePlayer::new(TapeBlock::new(pause_ms, payload.to_vec()).unwrap())
    }

    #[test]
    fn unstarted_player_holds_high() {
        let mut player = player_for(0, &[0x00]);
        assert_eq!(player.phase(), PlayPhase::None);
        assert!(player.signal_at(12345));
        assert_eq!(player.phase(), PlayPhase::None);
    }

    #[test]
    fn header_flag_selects_the_long_pilot() {
        let mut player = player_for(0, &[0x00]);
        player.start_playback(0);
        // just inside the header pilot: still alternating
        let last_pilot = HEADER_PILOT_COUNT * PILOT_PULSE;
        player.signal_at(last_pilot);
        assert_eq!(player.phase(), PlayPhase::Pilot);
        // one past it: first sync pulse
        assert!(!player.signal_at(last_pilot + 1));
        assert_eq!(player.phase(), PlayPhase::Sync);
    }

    #[test]
    fn data_flag_selects_the_short_pilot() {
        let mut player = player_for(0, &[0xFF]);
        player.start_playback(0);
        let last_pilot = DATA_PILOT_COUNT * PILOT_PULSE;
        assert!(!player.signal_at(last_pilot + 1));
        assert_eq!(player.phase(), PlayPhase::Sync);
    }

    #[test]
    fn pilot_pulses_alternate_levels() {
        let mut player = player_for(0, &[0x00]);
        player.start_playback(1000);
        assert!(player.signal_at(1000));
        assert!(player.signal_at(1000 + PILOT_PULSE - 1));
        assert!(!player.signal_at(1000 + PILOT_PULSE));
        assert!(!player.signal_at(1000 + 2 * PILOT_PULSE - 1));
        assert!(player.signal_at(1000 + 2 * PILOT_PULSE));
    }

    #[test]
    fn sync_pulses_are_low_then_high() {
        let mut player = player_for(0, &[0x00]);
        player.start_playback(0);
        let pilot_ends = HEADER_PILOT_COUNT * PILOT_PULSE;
        assert!(!player.signal_at(pilot_ends + SYNC_1_PULSE));
        assert!(player.signal_at(pilot_ends + SYNC_1_PULSE + SYNC_2_PULSE));
        assert_eq!(player.phase(), PlayPhase::Sync);
    }

    #[test]
    fn zero_bits_use_the_short_pulse() {
        let mut player = player_for(0, &[0x00]);
        player.start_playback(0);
        let data_starts = HEADER_PILOT_COUNT * PILOT_PULSE + SYNC_1_PULSE + SYNC_2_PULSE;
        // first half-pulse low, second high
        assert!(!player.signal_at(data_starts + 1));
        assert_eq!(player.phase(), PlayPhase::Data);
        assert!(!player.signal_at(data_starts + BIT_0_PULSE - 1));
        assert!(player.signal_at(data_starts + BIT_0_PULSE));
        assert!(player.signal_at(data_starts + 2 * BIT_0_PULSE - 1));
    }

    #[test]
    fn one_bits_use_the_long_pulse() {
        let mut player = player_for(0, &[0xFF]);
        player.start_playback(0);
        let data_starts = DATA_PILOT_COUNT * PILOT_PULSE + SYNC_1_PULSE + SYNC_2_PULSE;
        assert!(!player.signal_at(data_starts + BIT_1_PULSE - 1));
        assert!(player.signal_at(data_starts + BIT_1_PULSE));
    }

    #[test]
    fn bits_advance_msb_first() {
        // 0xA0 = bits 1,0,1,0,0,0,0,0: the second bit is short
        let mut player = player_for(0, &[0xA0]);
        player.start_playback(0);
        let data_starts = DATA_PILOT_COUNT * PILOT_PULSE + SYNC_1_PULSE + SYNC_2_PULSE;
        // enter the data phase
        player.signal_at(data_starts + 1);
        assert_eq!(player.bit_mask(), 0x80);
        // step past the first (long) bit
        assert!(!player.signal_at(data_starts + 2 * BIT_1_PULSE));
        assert_eq!(player.bit_mask(), 0x40);
        // second bit is a zero: high half starts after one short pulse
        let second_starts = data_starts + 2 * BIT_1_PULSE;
        assert!(player.signal_at(second_starts + BIT_0_PULSE));
    }

    #[test]
    fn block_end_enters_pause_then_completes() {
        let mut player = player_for(10, &[0xFF]);
        player.start_playback(0);
        let data_starts = DATA_PILOT_COUNT * PILOT_PULSE + SYNC_1_PULSE + SYNC_2_PULSE;
        let data_ends = data_starts + 8 * 2 * BIT_1_PULSE;
        // walk through all eight bits so the bit bookkeeping advances
        for bit in 0..8 {
            let bit_start = data_starts + bit * 2 * BIT_1_PULSE;
            assert!(!player.signal_at(bit_start + 1));
            assert!(player.signal_at(bit_start + BIT_1_PULSE + 1));
        }
        // first sample past the last bit flips to the pause level
        assert!(player.signal_at(data_ends + 1));
        assert_eq!(player.phase(), PlayPhase::Pause);

        // pause holds high for 10 ms from the tact that entered it
        let pause_ends = data_ends + 1 + 10 * TACTS_PER_MS;
        assert!(player.signal_at(pause_ends));
        assert_eq!(player.phase(), PlayPhase::Pause);
        assert!(player.signal_at(pause_ends + 1));
        assert_eq!(player.phase(), PlayPhase::Completed);
        // completed blocks stay high forever
        assert!(player.signal_at(pause_ends + 1_000_000));
    }

    #[test]
    fn zero_pause_completes_on_the_next_sample() {
        let mut player = player_for(0, &[0xFF]);
        player.start_playback(0);
        let data_starts = DATA_PILOT_COUNT * PILOT_PULSE + SYNC_1_PULSE + SYNC_2_PULSE;
        for bit in 0..8 {
            let bit_start = data_starts + bit * 2 * BIT_1_PULSE;
            player.signal_at(bit_start + 1);
            player.signal_at(bit_start + BIT_1_PULSE + 1);
        }
        let data_ends = data_starts + 8 * 2 * BIT_1_PULSE;
        assert!(player.signal_at(data_ends + 1));
        assert_eq!(player.phase(), PlayPhase::Pause);
        assert!(player.signal_at(data_ends + 2));
        assert_eq!(player.phase(), PlayPhase::Completed);
    }

    #[test]
    fn long_unsampled_gap_faults_the_block() {
        let mut player = player_for(0, &[0x00]);
        player.start_playback(500);
        assert!(player.signal_at(500));
        assert!(player.signal_at(500 + MAX_TACT_JUMP));
        assert_eq!(player.phase(), PlayPhase::Completed);
    }

    #[test]
    fn restart_rewinds_the_block() {
        let mut player = player_for(0, &[0x00]);
        player.start_playback(0);
        player.signal_at(MAX_TACT_JUMP);
        assert_eq!(player.phase(), PlayPhase::Completed);

        player.start_playback(5000);
        assert_eq!(player.phase(), PlayPhase::Pilot);
        assert_eq!(player.byte_index(), 0);
        assert_eq!(player.bit_mask(), 0x80);
        assert!(player.signal_at(5000));
    }

    #[test]
    fn observable_reports_phase_and_position() {
        let mut player = player_for(250, &[0x00, 0x01]);
        assert_eq!(player.query("phase"), Some(Value::Str("none")));
        player.start_playback(42);
        assert_eq!(player.query("phase"), Some(Value::Str("pilot")));
        assert_eq!(player.query("start_tact"), Some(Value::I64(42)));
        assert_eq!(player.query("pause_after"), Some(Value::U16(250)));
        assert_eq!(player.query("length"), Some(Value::I64(2)));
        assert_eq!(player.query("bogus"), None);
        for path in player.query_paths() {
            assert!(player.query(path).is_some(), "missing path {path}");
        }
    }
}
