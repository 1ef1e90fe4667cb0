//! Linux devices for running the stack in user space.

pub mod dev;
mod libc;

pub use self::dev::Tap;
