//! Individual enhancement steps

pub mod contrast;
pub mod unsharp;
