use thiserror::Error;

pub use self::aligned_slice::AlignedBuf;

pub mod aligned_slice;

#[non_exhaustive]
#[derive(Debug, Error)]
#[error("allocation failed")]
pub struct AllocError;
