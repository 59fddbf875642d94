//! 공통 값 타입.

pub mod ticker;

pub use ticker::Ticker;
