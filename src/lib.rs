pub mod ai;
pub mod capture;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod rate_limit;
pub mod session;
pub mod storage;
pub mod types;
pub mod view;
