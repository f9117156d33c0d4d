// SPDX-License-Identifier: MIT OR Apache-2.0

//! docrank - Persona-driven relevance ranking library
//!
//! Shared modules for the docrank CLI tool.

pub mod assemble;
pub mod config;
pub mod document;
pub mod embedding;
pub mod errors;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod request;
