#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for pinion.
//!
//! This crate provides pure helper functions used across the pinion
//! workspace. It has no async runtime, logging, or network dependencies.

pub mod fs;
pub mod hash;
