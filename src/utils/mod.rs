//! Small shared helpers: scope guards and logging setup.

pub mod guard;
pub mod logger;
