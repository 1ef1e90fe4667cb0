//! Bounded storage shared by sockets.

pub mod ring;

pub use self::ring::Ring;
