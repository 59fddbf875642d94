//! 도메인 모델.

pub mod bar;
pub mod forecast;

pub use bar::*;
pub use forecast::*;
