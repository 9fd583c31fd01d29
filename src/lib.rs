//! Placement and auto-hide engines for screen-edge panels.
//!
//! [`layout::ViewLifecycle`] assigns panel definitions to (screen, edge)
//! slots through [`placement::PlacementEngine`] and keeps one live
//! [`view::View`] per placed panel. Each view runs its own
//! [`view::VisibilityStateMachine`]. Everything is single-threaded; time only
//! advances through the injected [`scheduler::Clock`].

pub mod config;
pub mod constants;
pub mod drivers;
pub mod edge;
pub mod error;
pub mod event_loop;
pub mod geometry;
pub mod layout;
pub mod log_buffer;
pub mod placement;
pub mod registry;
pub mod scheduler;
pub mod screens;
pub mod sim;
pub mod tracing_sub;
pub mod view;
pub mod window_system;
