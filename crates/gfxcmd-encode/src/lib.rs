//! Stateless hardware command encoders.
//!
//! Each encoder has a pure size function of the [`HwProfile`](gfxcmd_hw::HwProfile) and a
//! builder that produces the complete command from the profile's zeroed template. `encode_*`
//! reserves exactly that many bytes in a [`CommandStream`](gfxcmd_stream::CommandStream) and
//! copies the command in one block, so a stream never holds a half-written command.

pub mod alu;
pub mod config;
pub mod mem_fence;
pub mod misc;
pub mod semaphore;
pub mod state_base_address;

pub use alu::{AluEncoder, AluInst};
pub use config::DebugOverrides;
pub use mem_fence::{encode_mem_fence, mem_fence_size};
pub use misc::{
    encode_batch_buffer_end, encode_batch_buffer_start, encode_noop, encode_store_data_imm,
    ChainingEpilogue,
};
pub use semaphore::{
    encode_semaphore_wait, patch_semaphore_data, semaphore_wait_size, SemaphoreWait,
};
pub use state_base_address::{
    encode_state_base_address, resolve_cache_policy, state_base_address_size, HeapRange, SbaArgs,
};
