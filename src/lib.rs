#![allow(non_snake_case)]

pub mod config;
pub mod logging;
pub mod runtime;
pub mod tasks;
