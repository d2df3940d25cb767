mod poll;

pub use poll::*;
