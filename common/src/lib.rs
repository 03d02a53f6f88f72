//! Pieces shared by the USB pipe tools.

mod logger;

pub use logger::*;
