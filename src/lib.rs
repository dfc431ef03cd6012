pub mod bilibili;
pub mod commands;
pub mod data_log;
pub mod datetime_utils;
pub mod error_utils;
