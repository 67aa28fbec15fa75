//! Per-generation capability tables.
//!
//! A [`HwProfile`] bundles every command layout and feature constant the encoders need for one
//! GPU generation. Profiles are immutable statics selected once at device initialisation via
//! [`HwProfile::for_generation`] and then passed by reference into every encode call.

use core::fmt;
use core::str::FromStr;

use bitflags::bitflags;
use thiserror::Error;

use crate::bits::{template, AddressField, BitField};
use crate::cmd::{
    AluInstLayout, BatchBufferEndLayout, BatchBufferStartLayout, BufferSizeFields, CachePolicy,
    HeapBaseFields, MemFenceLayout, MiMathLayout, NoopLayout, SemaphoreWaitLayout,
    StateBaseAddressLayout, StoreDataImmLayout,
};

bitflags! {
    /// Optional hardware capabilities.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct HwFeatures: u32 {
        /// `MI_MATH` carries a memory object control state field.
        const MI_MATH_MOCS = 1 << 0;
        /// `MI_SEMAPHORE_WAIT` can fetch its comparison data from memory.
        const INDIRECT_SEMAPHORE_DATA = 1 << 1;
        /// `MI_SEMAPHORE_WAIT` has a trailing wait-token dword.
        const SEMAPHORE_WAIT_TOKEN = 1 << 2;
        /// `STATE_BASE_ADDRESS` programs a bindless sampler heap.
        const BINDLESS_SAMPLER_STATE = 1 << 3;
        /// `STATE_BASE_ADDRESS` carries an L1 cache policy for stateless accesses.
        const L1_CACHE_POLICY = 1 << 4;
        /// `STATE_SYSTEM_MEM_FENCE_ADDRESS` exists.
        const SYSTEM_MEM_FENCE = 1 << 5;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HwGeneration {
    Gen9,
    Gen12Lp,
    XeHpg,
    Xe3,
}

impl HwGeneration {
    pub const ALL: [HwGeneration; 4] = [Self::Gen9, Self::Gen12Lp, Self::XeHpg, Self::Xe3];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Gen9 => "gen9",
            Self::Gen12Lp => "gen12lp",
            Self::XeHpg => "xe_hpg",
            Self::Xe3 => "xe3",
        }
    }
}

impl fmt::Display for HwGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hardware generation {0:?}")]
pub struct UnknownGeneration(pub String);

impl FromStr for HwGeneration {
    type Err = UnknownGeneration;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|g| g.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownGeneration(s.to_owned()))
    }
}

/// Memory object control state indices for the policies the encoders select between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MocsTable {
    pub uncached: u32,
    pub l3_cached: u32,
    /// Stateless data-port MOCS used when the caller does not pick one.
    pub stateless_default: u32,
}

/// Immutable command-layout and feature table for one generation.
#[derive(Debug)]
pub struct HwProfile {
    pub generation: HwGeneration,
    pub features: HwFeatures,
    pub mi_math: MiMathLayout,
    pub alu_inst: AluInstLayout,
    pub semaphore_wait: SemaphoreWaitLayout,
    pub state_base_address: StateBaseAddressLayout,
    pub mem_fence: Option<MemFenceLayout>,
    pub noop: NoopLayout,
    pub store_data_imm: StoreDataImmLayout,
    pub batch_buffer_start: BatchBufferStartLayout,
    pub batch_buffer_end: BatchBufferEndLayout,
    pub mocs: MocsTable,
    /// Size of one `RENDER_SURFACE_STATE`, in bytes.
    pub surface_state_stride: u32,
    /// Surface-state count programmed when the global bindless heap is used.
    pub max_bindless_surface_states: u32,
    pub default_cache_policy: CachePolicy,
    pub debugger_cache_policy: CachePolicy,
}

impl HwProfile {
    pub fn for_generation(generation: HwGeneration) -> &'static HwProfile {
        match generation {
            HwGeneration::Gen9 => &GEN9,
            HwGeneration::Gen12Lp => &GEN12LP,
            HwGeneration::XeHpg => &XE_HPG,
            HwGeneration::Xe3 => &XE3,
        }
    }

    /// Resolve a profile from a generation name such as `"gen12lp"`.
    pub fn lookup(name: &str) -> Result<&'static HwProfile, UnknownGeneration> {
        name.parse().map(Self::for_generation)
    }

    pub fn supports(&self, feature: HwFeatures) -> bool {
        self.features.contains(feature)
    }
}

const MI_MATH_HEADER: u32 = 0x1a << 23;
const MI_SEMAPHORE_WAIT_HEADER: u32 = 0x1c << 23;
const MI_STORE_DATA_IMM_HEADER: u32 = 0x20 << 23;
const MI_BATCH_BUFFER_START_HEADER: u32 = 0x31 << 23;
const MI_BATCH_BUFFER_END_HEADER: u32 = 0x0a << 23;
/// GFXPIPE, common subtype, non-pipelined opcode.
const GFXPIPE_NONPIPELINED: u32 = (0x3 << 29) | (0x1 << 24);

const STATE_BASE_ADDRESS_SUBOPCODE: u32 = 0x01 << 16;
const STATE_SYSTEM_MEM_FENCE_ADDRESS_SUBOPCODE: u32 = 0x09 << 16;

/// Batch-buffer-start address space indicator: per-process GTT.
const BBS_ADDRESS_SPACE_PPGTT: u32 = 1 << 8;

const SEMAPHORE_WAIT_4DW: [u32; 4] = template(MI_SEMAPHORE_WAIT_HEADER | 0x2);
const SEMAPHORE_WAIT_5DW: [u32; 5] = template(MI_SEMAPHORE_WAIT_HEADER | 0x3);
const SBA_19DW: [u32; 19] = template(GFXPIPE_NONPIPELINED | STATE_BASE_ADDRESS_SUBOPCODE | 0x11);
const SBA_22DW: [u32; 22] = template(GFXPIPE_NONPIPELINED | STATE_BASE_ADDRESS_SUBOPCODE | 0x14);
const MEM_FENCE_3DW: [u32; 3] =
    template(GFXPIPE_NONPIPELINED | STATE_SYSTEM_MEM_FENCE_ADDRESS_SUBOPCODE | 0x1);
const NOOP_1DW: [u32; 1] = [0];
const STORE_DATA_IMM_4DW: [u32; 4] = template(MI_STORE_DATA_IMM_HEADER | 0x2);
const BATCH_BUFFER_START_3DW: [u32; 3] =
    template(MI_BATCH_BUFFER_START_HEADER | BBS_ADDRESS_SPACE_PPGTT | 0x1);
const BATCH_BUFFER_END_1DW: [u32; 1] = [MI_BATCH_BUFFER_END_HEADER];

const COMPARE_VALUES: [u32; 6] = [0x0, 0x1, 0x2, 0x3, 0x4, 0x5];

const MI_MATH: MiMathLayout = MiMathLayout {
    header: MI_MATH_HEADER,
    dword_length: BitField::new(0, 0, 7),
    mocs: None,
    max_instructions: 256,
};

const ALU_INST: AluInstLayout = AluInstLayout {
    opcode: BitField::new(0, 20, 31),
    operand1: BitField::new(0, 10, 19),
    operand2: BitField::new(0, 0, 9),
};

const fn semaphore_wait(
    template: &'static [u32],
    indirect_data: Option<BitField>,
    wait_token: Option<BitField>,
) -> SemaphoreWaitLayout {
    SemaphoreWaitLayout {
        template,
        compare_operation: BitField::new(0, 12, 14),
        wait_mode: BitField::flag(0, 15),
        register_poll_mode: BitField::flag(0, 16),
        indirect_data,
        data: BitField::new(1, 0, 31),
        address: AddressField::new(2, 2),
        wait_token,
        compare_values: COMPARE_VALUES,
    }
}

const fn heap_base(dword: u8) -> HeapBaseFields {
    HeapBaseFields {
        modify_enable: BitField::flag(dword, 0),
        mocs: BitField::new(dword, 5, 10),
        address: AddressField::new(dword, 12),
    }
}

const fn buffer_size(dword: u8) -> BufferSizeFields {
    BufferSizeFields {
        modify_enable: BitField::flag(dword, 0),
        size: BitField::new(dword, 12, 31),
    }
}

const fn state_base_address(
    template: &'static [u32],
    bindless_sampler: bool,
    l1_cache_policy: Option<BitField>,
) -> StateBaseAddressLayout {
    StateBaseAddressLayout {
        template,
        general_state: heap_base(1),
        general_state_size: buffer_size(12),
        stateless_mocs: BitField::new(3, 17, 22),
        surface_state: heap_base(4),
        dynamic_state: heap_base(6),
        dynamic_state_size: buffer_size(13),
        indirect_object: heap_base(8),
        indirect_object_size: buffer_size(14),
        instruction: heap_base(10),
        instruction_size: buffer_size(15),
        bindless_surface_state: heap_base(16),
        bindless_surface_state_size: BitField::new(18, 12, 31),
        bindless_sampler_state: if bindless_sampler {
            Some(heap_base(19))
        } else {
            None
        },
        bindless_sampler_state_size: if bindless_sampler {
            Some(BitField::new(21, 12, 31))
        } else {
            None
        },
        l1_cache_policy,
    }
}

const NOOP: NoopLayout = NoopLayout {
    template: &NOOP_1DW,
    identification_number: BitField::new(0, 0, 21),
    register_write_enable: BitField::flag(0, 22),
};

const STORE_DATA_IMM: StoreDataImmLayout = StoreDataImmLayout {
    template: &STORE_DATA_IMM_4DW,
    address: AddressField::new(1, 2),
    data: BitField::new(3, 0, 31),
};

const BATCH_BUFFER_START: BatchBufferStartLayout = BatchBufferStartLayout {
    template: &BATCH_BUFFER_START_3DW,
    address: AddressField::new(1, 2),
};

const BATCH_BUFFER_END: BatchBufferEndLayout = BatchBufferEndLayout {
    template: &BATCH_BUFFER_END_1DW,
};

const SURFACE_STATE_STRIDE: u32 = 64;
const MAX_BINDLESS_SURFACE_STATES: u32 = (1 << 20) - 1;

pub static GEN9: HwProfile = HwProfile {
    generation: HwGeneration::Gen9,
    features: HwFeatures::empty(),
    mi_math: MI_MATH,
    alu_inst: ALU_INST,
    semaphore_wait: semaphore_wait(&SEMAPHORE_WAIT_4DW, None, None),
    state_base_address: state_base_address(&SBA_19DW, false, None),
    mem_fence: None,
    noop: NOOP,
    store_data_imm: STORE_DATA_IMM,
    batch_buffer_start: BATCH_BUFFER_START,
    batch_buffer_end: BATCH_BUFFER_END,
    mocs: MocsTable {
        uncached: 1,
        l3_cached: 2,
        stateless_default: 2,
    },
    surface_state_stride: SURFACE_STATE_STRIDE,
    max_bindless_surface_states: MAX_BINDLESS_SURFACE_STATES,
    default_cache_policy: CachePolicy::WriteBack,
    debugger_cache_policy: CachePolicy::Uncached,
};

pub static GEN12LP: HwProfile = HwProfile {
    generation: HwGeneration::Gen12Lp,
    features: HwFeatures::SEMAPHORE_WAIT_TOKEN.union(HwFeatures::BINDLESS_SAMPLER_STATE),
    mi_math: MI_MATH,
    alu_inst: ALU_INST,
    semaphore_wait: semaphore_wait(&SEMAPHORE_WAIT_5DW, None, Some(BitField::new(4, 5, 9))),
    state_base_address: state_base_address(&SBA_22DW, true, None),
    mem_fence: None,
    noop: NOOP,
    store_data_imm: STORE_DATA_IMM,
    batch_buffer_start: BATCH_BUFFER_START,
    batch_buffer_end: BATCH_BUFFER_END,
    mocs: MocsTable {
        uncached: 3,
        l3_cached: 2,
        stateless_default: 2,
    },
    surface_state_stride: SURFACE_STATE_STRIDE,
    max_bindless_surface_states: MAX_BINDLESS_SURFACE_STATES,
    default_cache_policy: CachePolicy::WriteBack,
    debugger_cache_policy: CachePolicy::Uncached,
};

pub static XE_HPG: HwProfile = HwProfile {
    generation: HwGeneration::XeHpg,
    features: HwFeatures::SEMAPHORE_WAIT_TOKEN
        .union(HwFeatures::BINDLESS_SAMPLER_STATE)
        .union(HwFeatures::L1_CACHE_POLICY),
    mi_math: MI_MATH,
    alu_inst: ALU_INST,
    semaphore_wait: semaphore_wait(&SEMAPHORE_WAIT_5DW, None, Some(BitField::new(4, 5, 9))),
    state_base_address: state_base_address(&SBA_22DW, true, Some(BitField::new(3, 4, 6))),
    mem_fence: None,
    noop: NOOP,
    store_data_imm: STORE_DATA_IMM,
    batch_buffer_start: BATCH_BUFFER_START,
    batch_buffer_end: BATCH_BUFFER_END,
    mocs: MocsTable {
        uncached: 1,
        l3_cached: 2,
        stateless_default: 2,
    },
    surface_state_stride: SURFACE_STATE_STRIDE,
    max_bindless_surface_states: MAX_BINDLESS_SURFACE_STATES,
    default_cache_policy: CachePolicy::WriteBackPartial,
    debugger_cache_policy: CachePolicy::WriteBack,
};

pub static XE3: HwProfile = HwProfile {
    generation: HwGeneration::Xe3,
    features: HwFeatures::all(),
    mi_math: MiMathLayout {
        mocs: Some(BitField::new(0, 8, 14)),
        ..MI_MATH
    },
    alu_inst: ALU_INST,
    semaphore_wait: semaphore_wait(
        &SEMAPHORE_WAIT_5DW,
        Some(BitField::flag(0, 11)),
        Some(BitField::new(4, 5, 9)),
    ),
    state_base_address: state_base_address(&SBA_22DW, true, Some(BitField::new(3, 4, 6))),
    mem_fence: Some(MemFenceLayout {
        template: &MEM_FENCE_3DW,
        address: AddressField::new(1, 12),
    }),
    noop: NOOP,
    store_data_imm: STORE_DATA_IMM,
    batch_buffer_start: BATCH_BUFFER_START,
    batch_buffer_end: BATCH_BUFFER_END,
    mocs: MocsTable {
        uncached: 1,
        l3_cached: 3,
        stateless_default: 3,
    },
    surface_state_stride: SURFACE_STATE_STRIDE,
    max_bindless_surface_states: MAX_BINDLESS_SURFACE_STATES,
    default_cache_policy: CachePolicy::WriteBackPartial,
    debugger_cache_policy: CachePolicy::WriteBack,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_is_case_insensitive() {
        assert_eq!(
            HwProfile::lookup("GEN12LP").unwrap().generation,
            HwGeneration::Gen12Lp
        );
        assert_eq!(
            HwProfile::lookup(" xe_hpg ").unwrap().generation,
            HwGeneration::XeHpg
        );
        assert_eq!(
            HwProfile::lookup("gen7").unwrap_err(),
            UnknownGeneration("gen7".to_owned())
        );
    }

    #[test]
    fn generation_names_round_trip() {
        for gen in HwGeneration::ALL {
            assert_eq!(gen.to_string().parse::<HwGeneration>().unwrap(), gen);
            assert_eq!(HwProfile::for_generation(gen).generation, gen);
        }
    }

    #[test]
    fn feature_flags_agree_with_optional_layouts() {
        for gen in HwGeneration::ALL {
            let p = HwProfile::for_generation(gen);
            assert_eq!(p.supports(HwFeatures::MI_MATH_MOCS), p.mi_math.mocs.is_some(), "{gen}");
            assert_eq!(
                p.supports(HwFeatures::INDIRECT_SEMAPHORE_DATA),
                p.semaphore_wait.indirect_data.is_some(),
                "{gen}"
            );
            assert_eq!(
                p.supports(HwFeatures::SEMAPHORE_WAIT_TOKEN),
                p.semaphore_wait.wait_token.is_some(),
                "{gen}"
            );
            assert_eq!(
                p.supports(HwFeatures::BINDLESS_SAMPLER_STATE),
                p.state_base_address.bindless_sampler_state.is_some(),
                "{gen}"
            );
            assert_eq!(
                p.supports(HwFeatures::L1_CACHE_POLICY),
                p.state_base_address.l1_cache_policy.is_some(),
                "{gen}"
            );
            assert_eq!(
                p.supports(HwFeatures::SYSTEM_MEM_FENCE),
                p.mem_fence.is_some(),
                "{gen}"
            );
        }
    }

    #[test]
    fn dword_length_fields_match_template_sizes() {
        for gen in HwGeneration::ALL {
            let p = HwProfile::for_generation(gen);
            let sem = p.semaphore_wait.template;
            assert_eq!((sem[0] & 0xff) as usize, sem.len() - 2, "{gen}");
            let sba = p.state_base_address.template;
            assert_eq!((sba[0] & 0xff) as usize, sba.len() - 2, "{gen}");
            let bbs = p.batch_buffer_start.template;
            assert_eq!((bbs[0] & 0xff) as usize, bbs.len() - 2, "{gen}");
        }
    }
}
