//! # switchyard-domain
//!
//! Pure domain model for the switchyard device reconciler.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps, clock times
//! - Define **Devices** (networked nodes) and the **Controls** they expose
//! - Define **Rules** (timer windows, motion pulses, switch pairing)
//! - Define **Sun times** (resolved sunset/sunrise anchors)
//! - Track **Manual overrides** (grace periods after a manual switch)
//! - Define **Programs** (RGB/ARGB libraries and scheduled program events)
//! - Compute the **desired state** of a control from all of the above
//! - Merge stored **device profiles** for unconfigured devices
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;

pub mod control;
pub mod device;
pub mod evaluator;
pub mod manual_override;
pub mod profile;
pub mod program;
pub mod rule;
pub mod sun;
