//! Archive client - Control message codec
//!
//! Little-endian, SBE-style framing of the archive control protocol. Every
//! message starts with a [`MessageHeader`]; fixed-size fields follow in a
//! block whose length the header announces, then length-prefixed strings.
//!
//! ```text
//! +--------------+-------------+-----------+---------+--------------+----------+
//! | Block Length | Template Id | Schema Id | Version | Fixed Block  | Var Data |
//! | u16 LE       | u16 LE      | u16 LE    | u16 LE  | block_length | ...      |
//! +--------------+-------------+-----------+---------+--------------+----------+
//! ```
//!
//! Decoders read var data from `8 + block_length`, so a sender with a longer
//! block than this client knows still decodes.

mod buffer;
mod control_response;
mod error;
mod header;
mod recording_descriptor;
mod requests;

pub use control_response::*;
pub use error::*;
pub use header::*;
pub use recording_descriptor::*;
pub use requests::*;
