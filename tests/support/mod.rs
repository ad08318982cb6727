#![allow(clippy::unwrap_used)]
#![allow(dead_code)]

pub mod fake_fetch;
pub mod socket_guard;
