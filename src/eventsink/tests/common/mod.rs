#![allow(dead_code)]

pub mod client;
pub mod healthcheck;
pub mod process;
pub mod server;
