//! File formats for loopseq.
//!
//! Writes the recorded track bank as a Format 1 Standard MIDI File, and reads
//! such files back for verification or to reload a session.

mod import;
mod smf;
mod vlq;

pub use import::{import_smf, Imported};
pub use smf::{read_smf, smf_to_bytes, write_smf, SmfEvent, SmfEventKind, SmfFile, SmfTrack};
pub use vlq::{read_vlq, write_vlq, MAX_VLQ};

/// Error type for reading and writing files.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Missing or malformed `MThd` chunk
    #[error("invalid file header")]
    InvalidHeader,
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Format 2 files are not supported
    #[error("unsupported SMF format {0}")]
    UnsupportedFormat(u16),
    /// SMPTE-based division
    #[error("unsupported time division {0:#06x}")]
    UnsupportedDivision(u16),
    /// Loop geometry that a header or time signature cannot carry
    #[error("cannot encode loop geometry: {0}")]
    UnencodableGeometry(&'static str),
    #[error("variable-length quantity out of range")]
    VlqOverflow,
    /// A data byte with no running status, or a system message inside a track
    #[error("unexpected status byte {0:#04x}")]
    UnexpectedStatus(u8),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("binary layout error: {0}")]
    Binrw(#[from] binrw::Error),
}
