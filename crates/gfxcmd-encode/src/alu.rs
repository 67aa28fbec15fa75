//! `MI_MATH` programs: a header dword followed by `N` inline ALU instructions.

use gfxcmd_hw::{AluOpcode, AluRegister, CmdDwords, HwProfile};
use gfxcmd_stream::{CmdLocation, CommandStream, StreamError};

/// One ALU instruction. Operand values are raw register encodings; operations that take no
/// operands (`ADD`, `SUB`, ...) carry zeroes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AluInst {
    pub opcode: AluOpcode,
    pub operand1: u32,
    pub operand2: u32,
}

impl AluInst {
    pub const fn new(opcode: AluOpcode, operand1: AluRegister, operand2: AluRegister) -> Self {
        Self {
            opcode,
            operand1: operand1 as u32,
            operand2: operand2 as u32,
        }
    }

    /// An operation on `SRCA`/`SRCB` that writes `ACCU` and the flags.
    pub const fn op(opcode: AluOpcode) -> Self {
        Self {
            opcode,
            operand1: 0,
            operand2: 0,
        }
    }

    pub const fn load(dst: AluRegister, src: AluRegister) -> Self {
        Self::new(AluOpcode::Load, dst, src)
    }

    pub const fn store(dst: AluRegister, src: AluRegister) -> Self {
        Self::new(AluOpcode::Store, dst, src)
    }
}

/// Builder for one `MI_MATH` command with exactly `N` instructions.
///
/// Instructions are appended in order with [`AluEncoder::set_next_alu`]; the command can only
/// be emitted once all `N` are present, so a partially built program never reaches a stream.
#[derive(Clone, Debug)]
pub struct AluEncoder<const N: usize> {
    profile: &'static HwProfile,
    header: CmdDwords,
    insts: [u32; N],
    next: usize,
}

impl<const N: usize> AluEncoder<N> {
    pub fn new(profile: &'static HwProfile) -> Self {
        assert!(
            N > 0 && N <= profile.mi_math.max_instructions,
            "MI_MATH supports 1..={} instructions, got {N}",
            profile.mi_math.max_instructions
        );
        let mut header = CmdDwords::from_template(&[profile.mi_math.header]);
        header.set(profile.mi_math.dword_length, (N - 1) as u32);
        Self {
            profile,
            header,
            insts: [0; N],
            next: 0,
        }
    }

    /// Build a complete program from a literal table.
    pub fn from_program(profile: &'static HwProfile, program: [AluInst; N]) -> Self {
        let mut enc = Self::new(profile);
        for inst in program {
            enc.push(inst);
        }
        enc
    }

    /// Select the memory object control state the math unit uses. Ignored on generations
    /// whose `MI_MATH` has no such field.
    pub fn set_mocs(&mut self, mocs: u32) {
        if let Some(field) = self.profile.mi_math.mocs {
            self.header.set(field, mocs);
        }
    }

    pub fn set_next_alu(
        &mut self,
        opcode: AluOpcode,
        operand1: AluRegister,
        operand2: AluRegister,
    ) {
        self.push(AluInst::new(opcode, operand1, operand2));
    }

    pub fn push(&mut self, inst: AluInst) {
        assert!(self.next < N, "MI_MATH program already has all {N} instructions");
        let layout = &self.profile.alu_inst;
        let mut dw = CmdDwords::zeroed(1);
        dw.set(layout.opcode, inst.opcode as u32);
        dw.set(layout.operand1, inst.operand1);
        dw.set(layout.operand2, inst.operand2);
        self.insts[self.next] = dw.raw(0);
        self.next += 1;
    }

    /// Instructions appended so far.
    pub fn len(&self) -> usize {
        self.next
    }

    pub fn is_empty(&self) -> bool {
        self.next == 0
    }

    pub fn is_complete(&self) -> bool {
        self.next == N
    }

    pub const fn size_bytes() -> usize {
        alu_size(N)
    }

    /// The full command. Panics unless all `N` instructions have been set.
    pub fn to_dwords(&self) -> CmdDwords {
        assert!(
            self.is_complete(),
            "MI_MATH program has {} of {N} instructions",
            self.next
        );
        let mut cmd = self.header.clone();
        cmd.extend(&CmdDwords::from_template(&self.insts));
        cmd
    }

    /// Reserve the whole command in `stream` and copy it in one block.
    pub fn copy_to_cmd_stream(
        &self,
        stream: &mut CommandStream<'_>,
    ) -> Result<CmdLocation, StreamError> {
        stream.reserve_cmd(&self.to_dwords())
    }
}

/// Size of an `MI_MATH` command with `instructions` entries.
pub const fn alu_size(instructions: usize) -> usize {
    4 + 4 * instructions
}

/// `dst = a + b`.
pub fn add(
    profile: &'static HwProfile,
    dst: AluRegister,
    a: AluRegister,
    b: AluRegister,
) -> AluEncoder<4> {
    binary(profile, AluOpcode::Add, dst, a, b)
}

/// `dst = a - b`.
pub fn sub(
    profile: &'static HwProfile,
    dst: AluRegister,
    a: AluRegister,
    b: AluRegister,
) -> AluEncoder<4> {
    binary(profile, AluOpcode::Sub, dst, a, b)
}

/// `dst = a & b`.
pub fn bitwise_and(
    profile: &'static HwProfile,
    dst: AluRegister,
    a: AluRegister,
    b: AluRegister,
) -> AluEncoder<4> {
    binary(profile, AluOpcode::And, dst, a, b)
}

/// `dst = a | b`.
pub fn bitwise_or(
    profile: &'static HwProfile,
    dst: AluRegister,
    a: AluRegister,
    b: AluRegister,
) -> AluEncoder<4> {
    binary(profile, AluOpcode::Or, dst, a, b)
}

/// `dst = (a > b) as u64`, computed as the borrow of `b - a`.
pub fn greater_than(
    profile: &'static HwProfile,
    dst: AluRegister,
    a: AluRegister,
    b: AluRegister,
) -> AluEncoder<4> {
    AluEncoder::from_program(
        profile,
        [
            AluInst::load(AluRegister::SrcA, b),
            AluInst::load(AluRegister::SrcB, a),
            AluInst::op(AluOpcode::Sub),
            AluInst::store(dst, AluRegister::Cf),
        ],
    )
}

fn binary(
    profile: &'static HwProfile,
    opcode: AluOpcode,
    dst: AluRegister,
    a: AluRegister,
    b: AluRegister,
) -> AluEncoder<4> {
    AluEncoder::from_program(
        profile,
        [
            AluInst::load(AluRegister::SrcA, a),
            AluInst::load(AluRegister::SrcB, b),
            AluInst::op(opcode),
            AluInst::store(dst, AluRegister::Accu),
        ],
    )
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
    fn add_program_encodes_expected_dwords() {
        let cmd = add(gen12(), AluRegister::R2, AluRegister::R0, AluRegister::R1).to_dwords();
        assert_eq!(
            cmd.as_slice(),
            &[
                0x0d00_0003,
                0x0800_8000,
                0x0800_8401,
                0x1000_0000,
                0x1800_0831,
            ]
        );
    }

    #[test]
    fn length_field_is_count_minus_one() {
        let mut enc = AluEncoder::<2>::new(gen12());
        enc.push(AluInst::op(AluOpcode::Noop));
        enc.push(AluInst::op(AluOpcode::Noop));
        let cmd = enc.to_dwords();
        assert_eq!(cmd.len_bytes(), AluEncoder::<2>::size_bytes());
        assert_eq!(cmd.raw(0) & 0xff, 1);
    }

    #[test]
    #[should_panic(expected = "1 of 2 instructions")]
    fn incomplete_program_cannot_be_encoded() {
        let mut enc = AluEncoder::<2>::new(gen12());
        enc.set_next_alu(AluOpcode::Load, AluRegister::SrcA, AluRegister::R0);
        enc.to_dwords();
    }

    #[test]
    #[should_panic(expected = "already has all 1 instructions")]
    fn extra_instruction_panics() {
        let mut enc = AluEncoder::<1>::new(gen12());
        enc.push(AluInst::op(AluOpcode::Add));
        enc.push(AluInst::op(AluOpcode::Add));
    }

    #[test]
    fn mocs_only_written_where_supported() {
        let mut old = AluEncoder::<1>::new(gen12());
        old.set_mocs(3);
        old.push(AluInst::op(AluOpcode::Noop));
        assert_eq!(old.to_dwords().raw(0), 0x0d00_0000);

        let mut new = AluEncoder::<1>::new(HwProfile::for_generation(HwGeneration::Xe3));
        new.set_mocs(3);
        new.push(AluInst::op(AluOpcode::Noop));
        assert_eq!(new.to_dwords().raw(0), 0x0d00_0000 | (3 << 8));
    }

    #[test]
    fn greater_than_stores_carry_flag() {
        let cmd =
            greater_than(gen12(), AluRegister::R5, AluRegister::R1, AluRegister::R2).to_dwords();
        assert_eq!(cmd.raw(1), 0x0800_8002, "LOAD SRCA, R2");
        assert_eq!(cmd.raw(2), 0x0800_8401, "LOAD SRCB, R1");
        assert_eq!(cmd.raw(3), 0x1010_0000, "SUB");
        assert_eq!(cmd.raw(4), 0x1800_1433, "STORE R5, CF");
    }
}
