mod kind;

pub use kind::*;
