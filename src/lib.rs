#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]

pub mod action;
pub mod api;
pub mod config;
pub mod cursor;
pub mod daemon;
pub mod error;
pub mod event;
pub mod input;
pub mod module;
pub mod poll;
pub mod reconcile;
pub mod snapshot;
pub mod variables;
