mod blocking_executor;

pub use blocking_executor::*;
