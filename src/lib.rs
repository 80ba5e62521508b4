//! sflcast — a document-to-persona dialogue studio.
//!
//! Converts uploaded documents into editable Systemic Functional
//! Linguistics personas and drives a generative model to produce and refine
//! a two-speaker scripted dialogue between any two of them.
//!
//! See `DESIGN.md` for full architecture documentation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod extract;
pub mod logging;
pub mod providers;

pub mod analysis;
pub mod dialogue;
pub mod persona;
pub mod script;
pub mod view;

pub mod studio;
