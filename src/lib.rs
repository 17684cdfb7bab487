pub mod app;
pub mod cancel;
pub mod citekey;
pub mod config;
pub mod controller;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod library;
pub mod notify;
pub mod outcome;
pub mod output;
pub mod prefs;
pub mod providers;
pub mod review;
pub mod task;
