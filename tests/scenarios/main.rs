//! End-to-end scenarios: build, execute, verify

#[path = "../helpers/mod.rs"]
mod helpers;

mod cli;
mod combination;
mod failure_policy;
mod registration;
