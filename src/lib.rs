pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod reference_loader;
pub mod scanner;
pub mod storage;
pub mod vision;
