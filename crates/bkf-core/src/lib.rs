pub mod auth;
pub mod config;
pub mod control;
pub mod delay;
pub mod export;
pub mod logging;
pub mod storage;
pub mod transport;
