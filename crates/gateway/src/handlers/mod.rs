//! HTTP request handlers

pub mod chat;
pub mod dashboard;
pub mod meta;
pub mod search;
