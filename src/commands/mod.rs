//! One module per command-line operation

pub mod backup;
pub mod deploy;
pub mod init;
pub mod reload;
