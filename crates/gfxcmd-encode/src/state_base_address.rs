//! `STATE_BASE_ADDRESS`: heap base addresses, buffer sizes and cache policy.
//!
//! Every value this encoder writes is paired with its modify-enable bit. Heaps the caller does
//! not name keep both the value and the enable bit at zero, so the hardware retains whatever
//! was programmed before.

use gfxcmd_hw::cmd::{BufferSizeFields, HeapBaseFields};
use gfxcmd_hw::{CachePolicy, CmdDwords, HwProfile};
use gfxcmd_stream::{CmdLocation, CommandStream, StreamError};

use crate::config::DebugOverrides;

const PAGE_SIZE: u64 = 0x1000;

/// Buffer size programmed for heaps addressed through the full 4 GiB window, in pages.
pub const MAX_BUFFER_SIZE_PAGES: u32 = 0xfffff;

/// A GPU heap: its base address and the bytes usable from that base.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapRange {
    pub gpu_base: u64,
    pub size: u64,
}

impl HeapRange {
    pub const fn new(gpu_base: u64, size: u64) -> Self {
        Self { gpu_base, size }
    }

    fn size_in_pages(&self) -> u32 {
        let pages = self.size.div_ceil(PAGE_SIZE);
        pages.min(u64::from(MAX_BUFFER_SIZE_PAGES)) as u32
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SbaArgs {
    pub general_state_base: Option<u64>,
    pub instruction_heap_base: Option<u64>,
    pub indirect_object_heap: Option<HeapRange>,
    pub dynamic_state_heap: Option<HeapRange>,
    /// Surface state heap; also programmed as the bindless surface heap.
    pub surface_state_heap: Option<HeapRange>,
    /// Base of the global bindless heap. When set, the dynamic, surface and bindless surface
    /// bases all point at it.
    pub global_heap_base: Option<u64>,
    /// Surface state base that wins over both the surface state heap and the global heap.
    pub surface_state_base_override: Option<u64>,
    /// Stateless data-port MOCS index; the profile default when `None`.
    pub stateless_mocs: Option<u32>,
    pub cache_policy_override: Option<CachePolicy>,
    pub debugger_active: bool,
}

/// Pick the stateless L1 cache policy.
///
/// From strongest to weakest: an attached debugger, the forced-uncached override, the per-call
/// override, the process-wide forced policy, the generation default.
pub fn resolve_cache_policy(
    profile: &HwProfile,
    overrides: &DebugOverrides,
    per_call: Option<CachePolicy>,
    debugger_active: bool,
) -> CachePolicy {
    if debugger_active {
        profile.debugger_cache_policy
    } else if overrides.force_all_resources_uncached {
        CachePolicy::Uncached
    } else {
        per_call
            .or(overrides.force_stateless_l1_cache_policy)
            .unwrap_or(profile.default_cache_policy)
    }
}

/// Number of surface states the bindless surface heap exposes, minus one, as the hardware
/// expects it. Heaps larger than the field can describe are capped at the profile maximum.
pub fn bindless_surface_state_size(profile: &HwProfile, heap: &HeapRange) -> u32 {
    let states = heap.size / u64::from(profile.surface_state_stride);
    assert!(
        states >= 1,
        "surface state heap of {} bytes holds no surface state",
        heap.size
    );
    (states - 1).min(u64::from(profile.max_bindless_surface_states)) as u32
}

pub fn state_base_address_size(profile: &HwProfile) -> usize {
    profile.state_base_address.size_bytes()
}

pub fn build_state_base_address(
    profile: &HwProfile,
    overrides: &DebugOverrides,
    args: &SbaArgs,
) -> CmdDwords {
    let layout = &profile.state_base_address;
    let mut cmd = CmdDwords::from_template(layout.template);

    let policy = resolve_cache_policy(
        profile,
        overrides,
        args.cache_policy_override,
        args.debugger_active,
    );
    let uncached = overrides.force_all_resources_uncached;
    let heap_mocs = if uncached {
        profile.mocs.uncached
    } else {
        profile.mocs.l3_cached
    };
    let stateless_mocs = if uncached {
        profile.mocs.uncached
    } else if let Some(mocs) = args.stateless_mocs {
        mocs
    } else if policy == CachePolicy::Uncached {
        profile.mocs.uncached
    } else {
        profile.mocs.stateless_default
    };

    cmd.set(layout.stateless_mocs, stateless_mocs);
    if let Some(field) = layout.l1_cache_policy {
        cmd.set(field, policy as u32);
    }

    if let Some(base) = args.general_state_base {
        set_heap(&mut cmd, layout.general_state, base, heap_mocs);
        set_size(&mut cmd, layout.general_state_size, MAX_BUFFER_SIZE_PAGES);
    }
    if let Some(base) = args.instruction_heap_base {
        set_heap(&mut cmd, layout.instruction, base, heap_mocs);
        set_size(&mut cmd, layout.instruction_size, MAX_BUFFER_SIZE_PAGES);
    }
    if let Some(ioh) = args.indirect_object_heap {
        set_heap(&mut cmd, layout.indirect_object, ioh.gpu_base, heap_mocs);
        set_size(&mut cmd, layout.indirect_object_size, ioh.size_in_pages());
    }

    if let Some(global) = args.global_heap_base {
        set_heap(&mut cmd, layout.dynamic_state, global, heap_mocs);
        set_size(&mut cmd, layout.dynamic_state_size, MAX_BUFFER_SIZE_PAGES);
        set_heap(&mut cmd, layout.surface_state, global, heap_mocs);
        set_heap(&mut cmd, layout.bindless_surface_state, global, heap_mocs);
        cmd.set(
            layout.bindless_surface_state_size,
            profile.max_bindless_surface_states,
        );
        if let (Some(sampler), Some(size)) = (
            layout.bindless_sampler_state,
            layout.bindless_sampler_state_size,
        ) {
            set_heap(&mut cmd, sampler, global, heap_mocs);
            cmd.set(size, MAX_BUFFER_SIZE_PAGES);
        }
    } else {
        if let Some(dsh) = args.dynamic_state_heap {
            set_heap(&mut cmd, layout.dynamic_state, dsh.gpu_base, heap_mocs);
            set_size(&mut cmd, layout.dynamic_state_size, dsh.size_in_pages());
        }
        if let Some(ssh) = args.surface_state_heap {
            set_heap(&mut cmd, layout.surface_state, ssh.gpu_base, heap_mocs);
            set_heap(&mut cmd, layout.bindless_surface_state, ssh.gpu_base, heap_mocs);
            cmd.set(
                layout.bindless_surface_state_size,
                bindless_surface_state_size(profile, &ssh),
            );
        }
    }

    if let Some(base) = args.surface_state_base_override {
        set_heap(&mut cmd, layout.surface_state, base, heap_mocs);
    }

    cmd
}

pub fn encode_state_base_address(
    stream: &mut CommandStream<'_>,
    profile: &HwProfile,
    overrides: &DebugOverrides,
    args: &SbaArgs,
) -> Result<CmdLocation, StreamError> {
    stream.reserve_cmd(&build_state_base_address(profile, overrides, args))
}

fn set_heap(cmd: &mut CmdDwords, fields: HeapBaseFields, base: u64, mocs: u32) {
    cmd.set_address(fields.address, base);
    cmd.set(fields.mocs, mocs);
    cmd.set_flag(fields.modify_enable, true);
}

fn set_size(cmd: &mut CmdDwords, fields: BufferSizeFields, pages: u32) {
    cmd.set(fields.size, pages);
    cmd.set_flag(fields.modify_enable, true);
}
