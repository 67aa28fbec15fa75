//! Small MI commands used by chaining and instrumentation.

use gfxcmd_hw::{CmdDwords, HwProfile};
use gfxcmd_stream::{CmdLocation, CommandStream, SegmentCloser, StreamError};

pub fn build_noop(
    profile: &HwProfile,
    identification: u32,
    register_write_enable: bool,
) -> CmdDwords {
    let layout = &profile.noop;
    let mut cmd = CmdDwords::from_template(layout.template);
    cmd.set(layout.identification_number, identification);
    cmd.set_flag(layout.register_write_enable, register_write_enable);
    cmd
}

/// `MI_NOOP` carrying an identification number, optionally latched into the NOPID register.
pub fn encode_noop(
    stream: &mut CommandStream<'_>,
    profile: &HwProfile,
    identification: u32,
    register_write_enable: bool,
) -> Result<CmdLocation, StreamError> {
    stream.reserve_cmd(&build_noop(profile, identification, register_write_enable))
}

pub fn build_store_data_imm(profile: &HwProfile, address: u64, data: u32) -> CmdDwords {
    let layout = &profile.store_data_imm;
    let mut cmd = CmdDwords::from_template(layout.template);
    cmd.set_address(layout.address, address);
    cmd.set(layout.data, data);
    cmd
}

/// `MI_STORE_DATA_IMM` writing one dword to `address`.
pub fn encode_store_data_imm(
    stream: &mut CommandStream<'_>,
    profile: &HwProfile,
    address: u64,
    data: u32,
) -> Result<CmdLocation, StreamError> {
    stream.reserve_cmd(&build_store_data_imm(profile, address, data))
}

pub fn build_batch_buffer_start(profile: &HwProfile, address: u64) -> CmdDwords {
    let layout = &profile.batch_buffer_start;
    let mut cmd = CmdDwords::from_template(layout.template);
    cmd.set_address(layout.address, address);
    cmd
}

pub fn encode_batch_buffer_start(
    stream: &mut CommandStream<'_>,
    profile: &HwProfile,
    address: u64,
) -> Result<CmdLocation, StreamError> {
    stream.reserve_cmd(&build_batch_buffer_start(profile, address))
}

pub fn encode_batch_buffer_end(
    stream: &mut CommandStream<'_>,
    profile: &HwProfile,
) -> Result<CmdLocation, StreamError> {
    stream.reserve_cmd(&CmdDwords::from_template(profile.batch_buffer_end.template))
}

/// Closes retired segments with a jump to the next one and the last segment with a batch
/// buffer end. Unused tail bytes are zero, i.e. `MI_NOOP`.
#[derive(Clone, Copy, Debug)]
pub struct ChainingEpilogue {
    profile: &'static HwProfile,
}

impl ChainingEpilogue {
    pub fn new(profile: &'static HwProfile) -> Self {
        Self { profile }
    }
}

impl SegmentCloser for ChainingEpilogue {
    fn tail_size(&self) -> usize {
        self.profile
            .batch_buffer_start
            .size_bytes()
            .max(self.profile.batch_buffer_end.size_bytes())
    }

    fn close(&self, tail: &mut [u8], next_gpu_address: Option<u64>) {
        let cmd = match next_gpu_address {
            Some(next) => build_batch_buffer_start(self.profile, next),
            None => CmdDwords::from_template(self.profile.batch_buffer_end.template),
        };
        let (head, rest) = tail.split_at_mut(cmd.len_bytes());
        cmd.write_le(head);
        rest.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfxcmd_hw::HwGeneration;
    use pretty_assertions::assert_eq;

    fn gen12() -> &'static HwProfile {
        HwProfile::for_generation(HwGeneration::Gen12Lp)
    }

    #[test]
    fn noop_fields() {
        assert_eq!(build_noop(gen12(), 0x12_3456, true).raw(0), 0x0052_3456);
        assert_eq!(build_noop(gen12(), 0, false).raw(0), 0);
    }

    #[test]
    fn store_data_imm_layout() {
        let cmd = build_store_data_imm(gen12(), 0x1_0000_0040, 0xdead_beef);
        assert_eq!(cmd.as_slice(), &[0x1000_0002, 0x40, 0x1, 0xdead_beef]);
    }

    #[test]
    fn epilogue_writes_bbs_or_bbe() {
        let closer = ChainingEpilogue::new(gen12());
        assert_eq!(closer.tail_size(), 12);

        let mut tail = [0xffu8; 12];
        closer.close(&mut tail, Some(0x2000));
        assert_eq!(
            CmdDwords::from_le_bytes(&tail).as_slice(),
            &[0x1880_0101, 0x2000, 0]
        );

        closer.close(&mut tail, None);
        assert_eq!(CmdDwords::from_le_bytes(&tail).as_slice(), &[0x0500_0000, 0, 0]);
    }
}
