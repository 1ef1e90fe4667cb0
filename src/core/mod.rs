//! Core, platform independent networking code.

pub mod arp_cache;
pub mod buffer;
pub mod check;
pub mod config;
pub mod dev;
pub mod dhcp_client;
pub mod interface;
pub mod registry;
pub mod repr;
pub mod service;
pub mod socket;
pub mod storage;
pub mod time;
pub mod timer;
