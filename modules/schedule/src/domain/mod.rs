pub mod accounts;
pub mod caller;
pub mod error;
pub mod insights;
pub mod ports;
pub mod repo;
pub mod service;
pub mod transfer;
