pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Daemon, Document, Health, Init, Version};
