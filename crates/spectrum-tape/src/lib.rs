//! Cassette tape blocks and their playback as an EAR signal.
//!
//! A [`TapeBlock`] is the stored form: a pause length, a payload length
//! and the payload bytes. A [`TapePlayer`] turns one block into the
//! square-wave EAR levels a loader routine samples, driven purely by the
//! CPU tact counter - the player holds no clock of its own.

mod block;
mod player;

pub use block::{TapeBlock, TapeBlockError};
pub use player::{
    BIT_0_PULSE, BIT_1_PULSE, DATA_PILOT_COUNT, HEADER_PILOT_COUNT, MAX_TACT_JUMP, PILOT_PULSE,
    PlayPhase, SYNC_1_PULSE, SYNC_2_PULSE, TACTS_PER_MS, TapePlayer,
};
