pub mod config;
pub mod init;
pub mod opportunity;
pub mod serve;
