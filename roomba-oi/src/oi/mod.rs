//! Open Interface protocol layer
//!
//! - [`packet`]: command encoder
//! - [`sensors`]: packet table and decoder for query responses and stream frames
//! - [`stream`]: stream lifecycle and frame reassembly
//! - [`presets`]: named sensor id lists

pub mod constants;
pub mod packet;
pub mod presets;
pub mod ring_buffer;
pub mod sensors;
pub mod stream;
