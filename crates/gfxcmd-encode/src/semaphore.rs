use gfxcmd_hw::{CmdDwords, CompareOperation, HwProfile, WaitMode};
use gfxcmd_stream::{CmdLocation, CommandStream, StreamError};

/// Parameters of one `MI_SEMAPHORE_WAIT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SemaphoreWait {
    /// Semaphore location; must be dword aligned.
    pub address: u64,
    pub data: u32,
    pub compare: CompareOperation,
    pub mode: WaitMode,
    /// Fetch the comparison value from memory instead of `data`. Only honored where the
    /// hardware supports it.
    pub indirect: bool,
}

impl SemaphoreWait {
    /// Poll until the value at `address` compares `compare` to `data`.
    pub fn polling(address: u64, data: u32, compare: CompareOperation) -> Self {
        Self {
            address,
            data,
            compare,
            mode: WaitMode::Polling,
            indirect: false,
        }
    }

    pub fn to_dwords(&self, profile: &HwProfile) -> CmdDwords {
        let layout = &profile.semaphore_wait;
        let mut cmd = CmdDwords::from_template(layout.template);
        cmd.set(
            layout.compare_operation,
            layout.compare_values[self.compare.index()],
        );
        cmd.set_flag(layout.wait_mode, self.mode == WaitMode::Polling);
        if let Some(indirect) = layout.indirect_data {
            cmd.set_flag(indirect, self.indirect);
        }
        cmd.set(layout.data, self.data);
        cmd.set_address(layout.address, self.address);
        cmd
    }

    /// Read the parameters back out of an encoded command.
    pub fn decode(profile: &HwProfile, cmd: &CmdDwords) -> Option<Self> {
        let layout = &profile.semaphore_wait;
        if cmd.len_dwords() != layout.template.len()
            || cmd.raw(0) >> 23 != layout.template[0] >> 23
        {
            return None;
        }
        let raw_op = cmd.get(layout.compare_operation);
        let compare = CompareOperation::ALL
            .into_iter()
            .find(|op| layout.compare_values[op.index()] == raw_op)?;
        Some(Self {
            address: cmd.address(layout.address),
            data: cmd.get(layout.data),
            compare,
            mode: if cmd.flag(layout.wait_mode) {
                WaitMode::Polling
            } else {
                WaitMode::Signal
            },
            indirect: layout.indirect_data.is_some_and(|f| cmd.flag(f)),
        })
    }
}

pub fn semaphore_wait_size(profile: &HwProfile) -> usize {
    profile.semaphore_wait.size_bytes()
}

/// Append one semaphore wait and return where it landed, for later patching.
pub fn encode_semaphore_wait(
    stream: &mut CommandStream<'_>,
    profile: &HwProfile,
    wait: &SemaphoreWait,
) -> Result<CmdLocation, StreamError> {
    stream.reserve_cmd(&wait.to_dwords(profile))
}

/// Rewrite the inline comparison value of a semaphore wait emitted earlier into the current
/// segment of `stream`.
pub fn patch_semaphore_data(
    stream: &mut CommandStream<'_>,
    profile: &HwProfile,
    location: CmdLocation,
    data: u32,
) -> Result<(), StreamError> {
    let mut cmd = stream.read_dwords(location)?;
    cmd.set(profile.semaphore_wait.data, data);
    stream.patch_dwords(location, &cmd)
}
