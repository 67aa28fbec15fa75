//! Hardware command profiles for the `gfxcmd` encoders.
//!
//! This crate provides:
//! - Dword bit packing with range-checked setters (see [`CmdDwords`]).
//! - Data-driven command layouts for the commands the encoders emit (see [`cmd`]).
//! - Per-generation capability tables selected once per device (see [`HwProfile`]).

pub mod bits;
pub mod cmd;
pub mod profile;

pub use bits::{AddressField, BitField, CmdDwords};
pub use cmd::{AluOpcode, AluRegister, CachePolicy, CompareOperation, WaitMode};
pub use profile::{HwFeatures, HwGeneration, HwProfile, MocsTable, UnknownGeneration};
