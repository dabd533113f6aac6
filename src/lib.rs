// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Client for remote interactive volume rendering on hayStack servers.
//!
//! A render server runs locally or on a cluster node behind an SSH tunnel.
//! The client keeps two TCP channels open to it: camera poses and transfer
//! functions go out on one, progressively refined frames come back on the
//! other. A background render loop does the round trips while the host's
//! viewport keeps drawing whatever frame is newest.
//!
//! # Key entry points
//!
//! - [`viewport::ViewportDriver`] - per-redraw glue for a host viewport
//! - [`session::Session`] - one connected session over a
//!   [`transport::TransportBinding`]
//! - [`render_loop::RenderLoop`] - the background worker
//! - [`process::Launcher`] - local or remote server processes
//! - [`options::ClientOptions`] - runtime configuration
//!
//! # Architecture
//!
//! The GUI thread never talks to the server while a loop runs. It queues
//! [`render_loop::LoopCommand`]s (camera, transfer function, scene frame)
//! that the worker applies before its next iteration, and reads frames
//! back through a lock-free triple buffer. Resizing stops the worker,
//! resizes the session and starts a new one.

pub mod bounds;
pub mod camera;
pub mod error;
pub mod options;
pub mod process;
pub mod render_loop;
pub mod session;
pub mod transfer;
pub mod transport;
pub mod util;
pub mod viewport;
