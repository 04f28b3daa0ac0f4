pub mod ai;
pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod db;
pub mod emotion;
pub mod global;
pub mod meeting;
pub mod vexa;
