//! Simulation core for the facility digital twin.
//!
//! Everything in this crate is rendering-free: the synthetic telemetry
//! feed, the explode/assemble state machine, the pumpjack linkage solver,
//! the flame shape/color functions and the flare puff pool are plain data
//! plus pure update functions, driven by an elapsed-time scalar and frame
//! deltas supplied by the caller. The viewer crate maps the results onto
//! scene transforms and materials.

pub mod assembly;
pub mod flame;
pub mod geometry;
pub mod kinematics;
pub mod puffs;
pub mod telemetry;
pub mod tween;
