//! undertime-core: the cycle and save-state engine of a time-loop game.
//!
//! Headless. Rendering, input capture, localisation and audio live
//! outside this crate and talk to it through `GameSession`.

pub mod bomb_participant;
pub mod clock;
pub mod clue_wall_participant;
pub mod command;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod hints;
pub mod hud;
pub mod participant;
pub mod phone_participant;
pub mod player_participant;
pub mod save_data;
pub mod selection;
pub mod session;
pub mod settings;
pub mod snapshot;
pub mod store;
pub mod transition;
pub mod types;
