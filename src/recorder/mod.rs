//! Session event recorders
//!
//! Each recorder is an append-only accumulator scoped to a single session.
//! Recorders are owned by a [`crate::session::SessionContext`] and mutated
//! only by the task receiving UI input, in arrival order.

pub mod flow;
pub mod navigation;
pub mod swipe;
pub mod tap;

pub use flow::FlowRecorder;
pub use navigation::NavigationRecorder;
pub use swipe::SwipeRecorder;
pub use tap::TapRecorder;
