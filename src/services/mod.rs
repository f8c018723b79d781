pub mod accounts;
pub mod auth;
pub mod catalog;
pub mod chat;
pub mod movies;
pub mod recommendations;
pub mod reviews;
pub mod users;
pub mod watch_history;
