use gfxcmd_hw::{CmdDwords, HwProfile};
use gfxcmd_stream::{CmdLocation, CommandStream, StreamError};

/// Size of `STATE_SYSTEM_MEM_FENCE_ADDRESS`, or zero on generations that do not have it.
pub fn mem_fence_size(profile: &HwProfile) -> usize {
    profile.mem_fence.map_or(0, |layout| layout.size_bytes())
}

/// Program the address of the process-wide system memory fence allocation.
///
/// Whether the generation needs this at all is the caller's decision; calling it on a profile
/// without the command is a programming error.
pub fn encode_mem_fence(
    stream: &mut CommandStream<'_>,
    profile: &HwProfile,
    fence_address: u64,
) -> Result<CmdLocation, StreamError> {
    let Some(layout) = profile.mem_fence else {
        panic!(
            "{} has no STATE_SYSTEM_MEM_FENCE_ADDRESS command",
            profile.generation
        );
    };
    let mut cmd = CmdDwords::from_template(layout.template);
    cmd.set_address(layout.address, fence_address);
    stream.reserve_cmd(&cmd)
}
