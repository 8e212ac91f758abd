//! # parley-core
//!
//! Core library for parley - a terminal chat client with persistent history.
//!
//! This library provides:
//! - Bounded per-session transcript stores (Redis-backed or in-memory)
//! - Startup backend selection with fail-open degradation
//! - Completion sources (OpenAI-compatible API, offline echo)
//! - The streaming turn loop with cancellation and fallback
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! A turn flows through three pieces:
//! - **Store:** the user's message is appended to the session transcript
//! - **Source:** the whole transcript is sent for completion and streamed back
//! - **Turn loop:** fragments are accumulated and the reply is appended once
//!
//! ## Example
//!
//! ```rust,no_run
//! use parley_core::llm::EchoSource;
//! use parley_core::selector::{select_store, SelectorOptions};
//! use parley_core::store::ClientRegistry;
//! use parley_core::{CancelToken, Config, SessionId, TurnRunner};
//!
//! let config = Config::load().expect("failed to load config");
//! let registry = ClientRegistry::default();
//! let mut selection = select_store(
//!     &SelectorOptions::from_config(&config),
//!     &SessionId::generate(),
//!     &registry,
//! );
//!
//! let source = EchoSource;
//! let runner = TurnRunner::new(&source, config.llm.temperature);
//! runner
//!     .run(selection.store.as_mut(), "hello", &CancelToken::new(), &mut |chunk| print!("{chunk}"))
//!     .expect("store failure");
//! ```

// Re-export commonly used items at the crate root
pub use cancel::CancelToken;
pub use config::Config;
pub use error::{Error, Result};
pub use humanize::humanize_error;
pub use selector::{BackendKind, StoreSelection};
pub use store::TranscriptStore;
pub use turn::{TurnOutcome, TurnRunner};
pub use types::*;

// Public modules
pub mod cancel;
pub mod config;
pub mod error;
pub mod export;
pub mod humanize;
pub mod llm;
pub mod logging;
pub mod selector;
pub mod store;
pub mod turn;
pub mod types;
