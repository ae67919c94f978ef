//! Core math modules.

pub mod error;
pub mod mixture;
pub mod stable;
