pub mod run;
pub mod show_log;
