//! Polygon chain access: Conditional Tokens transfer logs.

pub mod ctf;
pub mod log;

pub use ctf::CtfTransferSource;
