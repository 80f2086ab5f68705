pub mod config;
pub mod notify;
pub mod run;
pub mod send;
pub mod status;
