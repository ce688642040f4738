//! Prompt-synchronized front end for an interactive calculator process.
//!
//! The calculator runs as a child process on two private pipes. Each line the
//! user enters is written to its stdin, and its stdout is read until the
//! calculator prints its prompt again; the text before the prompt is the
//! answer.

pub mod buffer;
pub mod child;
pub mod config;
pub mod display;
pub mod input;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod shutdown;
