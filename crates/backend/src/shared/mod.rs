pub mod app_state;
pub mod config;
pub mod data;
pub mod debounce;
pub mod diff_save;
pub mod events;
