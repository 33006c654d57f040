pub mod cancel;
pub mod config;
pub mod entities;
pub mod error;
pub mod frame;
pub mod json_tolerant;
pub mod trace;
