pub mod commands;
pub mod error;
pub mod http;
pub mod install;
pub mod package;
pub mod registry;
pub mod remove;
pub mod runtime;
pub mod ui;
