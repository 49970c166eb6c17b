// ABOUTME: Shared configuration helpers for repoprobe crates
// ABOUTME: Exposes environment variable names and typed env parsing

pub mod constants;
pub mod env;
