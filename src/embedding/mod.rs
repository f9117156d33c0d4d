// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - turns text into comparable vectors
//!
//! Providers sit behind the [`EmbeddingProvider`] trait so ranking stays
//! independent of how vectors are produced; [`similarity`] scores them.

pub mod command;
pub mod hashing;
#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
pub mod local;
pub mod provider;
pub mod remote;
pub mod similarity;

pub use command::CommandProvider;
pub use hashing::HashingEmbedder;
#[cfg(not(all(target_os = "macos", target_arch = "x86_64")))]
pub use local::{FastEmbedConfig, FastEmbedder};
pub use provider::{init_provider, Embedding, EmbeddingProvider, SharedProvider};
pub use remote::RemoteProvider;
pub use similarity::{cosine_similarity, l2_normalize};
