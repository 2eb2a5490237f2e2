//! Boundary services between the JSON contract and in-memory images
//!
//! - Payload decoding and data-URL encoding
//! - Output format encoding

pub mod format;
pub mod io;

pub use format::OutputFormatHandler;
pub use io::ImageIOService;
