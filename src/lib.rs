pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod contact;
pub mod domain;
pub mod editor;
pub mod error;
pub mod filter;
pub mod firestore;
pub mod output;
pub mod store;
pub mod tui;
pub mod watch;
