pub mod chat;
pub mod config;
pub mod personas;
pub mod run;
pub mod send_as;
