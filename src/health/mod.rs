//! Keep-alive pinger

mod keepalive;

pub use self::keepalive::KeepAlive;
