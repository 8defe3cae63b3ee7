//! Time subsystem.
//!
//! One `FrameClock` per bound window; call `tick()` once per frame to obtain
//! the delta published to the GUI library.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
