//! # flowforge: a declarative graph agent execution engine
//!
//! flowforge takes a declarative graph of nodes — model calls, tool
//! invocations, string transforms, and reusable sub-graph components — and
//! runs it to completion under step/time/concurrency limits, with
//! conditional routing and versioned, reducer-based state merging.
//!
//! ## Pipeline
//!
//! Untrusted JSON flows through a fixed sequence of stages before it ever
//! executes:
//!
//! 1. [`parser`] / [`upgrader`] — parse canonical v3 IR directly, or upgrade
//!    legacy v1/v2 payloads ([`legacy`]) into it, collecting structured
//!    warnings along the way.
//! 2. [`canonicalize`] — sort nodes, edges, and entrypoints into a
//!    deterministic order so equivalent graphs compare equal.
//! 3. [`validate`] — a closed vocabulary of structural checks: reachability,
//!    cycle/limit interaction, routing determinism, predicate well-formedness.
//! 4. [`compiler`] — lower the validated [`ir::GraphConfig`] into a
//!    [`compiler::CompiledGraph`]: one step function per node, one router
//!    per node's outgoing edges.
//! 5. [`runtime`] — execute the compiled graph: a frontier-based scheduler
//!    that batches ready nodes, runs them concurrently, and merges state
//!    patches back in canonical order.
//!
//! [`registry`] holds the versioned library of reusable [`registry::Component`]
//! subgraphs that `component` nodes resolve against, seeded by [`builtin`].
//! [`factory`] is the entry point chat sessions use: resolve a stored config
//! (or the builtin `react` agent), inject the caller's system prompt, and
//! hand off to the compiler and runtime.
//!
//! ## Quick start
//!
//! ```
//! use flowforge::message::Message;
//!
//! let user_msg = Message::user("What's the weather like?");
//! let assistant_msg = Message::assistant("It's sunny and 75°F!");
//! assert!(user_msg.has_role(Message::USER));
//! assert!(!user_msg.has_role(Message::ASSISTANT));
//! ```
//!
//! ```
//! use flowforge::state::ExecutionState;
//!
//! let state = ExecutionState::builder()
//!     .with_system_message("You are a weather assistant")
//!     .with_user_message("What's the weather?")
//!     .with_extra("location", serde_json::json!("San Francisco"))
//!     .build();
//! assert_eq!(state.snapshot().messages.len(), 2);
//! ```
//!
//! ## Module guide
//!
//! - [`ir`] - the canonical v3 graph intermediate representation
//! - [`legacy`] - v1/v2 schema shapes and the v1→v2 migration
//! - [`parser`] - direct v3 parsing
//! - [`upgrader`] - legacy-to-canonical upgrade with structured warnings
//! - [`canonicalize`] - deterministic node/edge/entrypoint ordering
//! - [`validate`] - structural validation (reachability, cycles, routing)
//! - [`compiler`] - lowers validated IR into an executable step/router table
//! - [`runtime`] - the frontier-based concurrent scheduler
//! - [`registry`] - the versioned component registry
//! - [`builtin`] - builtin agent configs and components (`react`, `deep_research`)
//! - [`factory`] - agent resolution, prompt injection, compile+run orchestration
//! - [`message`] - message types and construction utilities
//! - [`state`] - versioned state management and snapshots
//! - [`node`] - the compiled step contract
//! - [`channels`] - channel-based state storage and versioning
//! - [`reducers`] - state merge strategies
//! - [`telemetry`] - human-readable rendering of runtime events and errors
//! - [`utils`] - shared JSON helpers

pub mod builtin;
pub mod canonicalize;
pub mod channels;
pub mod compiler;
pub mod factory;
pub mod ir;
pub mod legacy;
pub mod message;
pub mod node;
pub mod parser;
pub mod reducers;
pub mod registry;
pub mod runtime;
pub mod state;
pub mod telemetry;
pub mod upgrader;
pub mod utils;
pub mod validate;
