use gfxcmd_encode::state_base_address::{bindless_surface_state_size, build_state_base_address};
use gfxcmd_encode::{
    encode_state_base_address, resolve_cache_policy, state_base_address_size, DebugOverrides,
    HeapRange, SbaArgs,
};
use gfxcmd_hw::cmd::HeapBaseFields;
use gfxcmd_hw::{CachePolicy, CmdDwords, HwGeneration, HwProfile};
use gfxcmd_stream::{CommandStream, Segment};
use pretty_assertions::assert_eq;

fn named_heaps(profile: &HwProfile) -> Vec<(&'static str, HeapBaseFields)> {
    let l = &profile.state_base_address;
    let mut heaps = vec![
        ("general", l.general_state),
        ("surface", l.surface_state),
        ("dynamic", l.dynamic_state),
        ("indirect", l.indirect_object),
        ("instruction", l.instruction),
        ("bindless_surface", l.bindless_surface_state),
    ];
    if let Some(sampler) = l.bindless_sampler_state {
        heaps.push(("bindless_sampler", sampler));
    }
    heaps
}

fn is_programmed(cmd: &CmdDwords, fields: HeapBaseFields) -> bool {
    cmd.flag(fields.modify_enable)
}

#[test]
fn only_requested_heaps_are_modified() {
    for gen in HwGeneration::ALL {
        let p = HwProfile::for_generation(gen);
        let args = SbaArgs {
            general_state_base: Some(0x1000_0000),
            indirect_object_heap: Some(HeapRange::new(0x2000_0000, 0x4000)),
            ..SbaArgs::default()
        };
        let cmd = build_state_base_address(p, &DebugOverrides::default(), &args);

        let modified: Vec<&str> = named_heaps(p)
            .into_iter()
            .filter(|(_, f)| is_programmed(&cmd, *f))
            .map(|(name, _)| name)
            .collect();
        assert_eq!(modified, vec!["general", "indirect"], "{gen}");

        for (name, fields) in named_heaps(p) {
            if !is_programmed(&cmd, fields) {
                assert_eq!(cmd.address(fields.address), 0, "{gen} {name}");
                assert_eq!(cmd.get(fields.mocs), 0, "{gen} {name}");
            }
        }

        let l = &p.state_base_address;
        assert!(cmd.flag(l.general_state_size.modify_enable));
        assert!(cmd.flag(l.indirect_object_size.modify_enable));
        assert_eq!(cmd.get(l.indirect_object_size.size), 4);
        assert!(!cmd.flag(l.dynamic_state_size.modify_enable));
        assert_eq!(cmd.get(l.dynamic_state_size.size), 0);
        assert!(!cmd.flag(l.instruction_size.modify_enable));
    }
}

#[test]
fn every_heap_paired_with_modify_enable() {
    let p = HwProfile::for_generation(HwGeneration::Gen12Lp);
    let args = SbaArgs {
        general_state_base: Some(0x1000_0000),
        instruction_heap_base: Some(0x2000_0000),
        indirect_object_heap: Some(HeapRange::new(0x3000_0000, 0x1_0000)),
        dynamic_state_heap: Some(HeapRange::new(0x4000_0000, 0x1_0000)),
        surface_state_heap: Some(HeapRange::new(0x5000_0000, 0x1_0000)),
        ..SbaArgs::default()
    };
    let cmd = build_state_base_address(p, &DebugOverrides::default(), &args);
    for (name, fields) in named_heaps(p) {
        if name == "bindless_sampler" {
            assert!(!is_programmed(&cmd, fields));
            continue;
        }
        assert!(is_programmed(&cmd, fields), "{name}");
        assert_ne!(cmd.address(fields.address), 0, "{name}");
    }
}

#[test]
fn bindless_surface_size_off_by_one_boundary() {
    let p = HwProfile::for_generation(HwGeneration::XeHpg);
    let stride = u64::from(p.surface_state_stride);
    for (states, expected) in [(1u64, 0u32), (2, 1), (1024, 1023)] {
        let heap = HeapRange::new(0x8000_0000, states * stride);
        assert_eq!(bindless_surface_state_size(p, &heap), expected);

        let args = SbaArgs {
            surface_state_heap: Some(heap),
            ..SbaArgs::default()
        };
        let cmd = build_state_base_address(p, &DebugOverrides::default(), &args);
        assert_eq!(cmd.get(p.state_base_address.bindless_surface_state_size), expected);
    }
    // A partial trailing surface state does not count.
    let heap = HeapRange::new(0, 2 * stride - 1);
    assert_eq!(bindless_surface_state_size(p, &heap), 0);
}

#[test]
fn bindless_surface_size_caps_at_field_maximum() {
    let p = HwProfile::for_generation(HwGeneration::XeHpg);
    let max = p.max_bindless_surface_states;
    for (size, expected) in [
        (64u64 << 20, 0xfffff),
        ((64 << 20) + 64, max),
        (128 << 20, max),
        (1 << 40, max),
    ] {
        let heap = HeapRange::new(0x1000_0000, size);
        assert_eq!(bindless_surface_state_size(p, &heap), expected, "{size:#x}");

        let args = SbaArgs {
            surface_state_heap: Some(heap),
            ..SbaArgs::default()
        };
        let cmd = build_state_base_address(p, &DebugOverrides::default(), &args);
        assert_eq!(cmd.get(p.state_base_address.bindless_surface_state_size), expected);
    }
}

#[test]
fn cache_policy_precedence() {
    let p = HwProfile::for_generation(HwGeneration::Xe3);
    let global = DebugOverrides {
        force_stateless_l1_cache_policy: Some(CachePolicy::WriteThrough),
        ..DebugOverrides::default()
    };

    let cases = [
        (DebugOverrides::default(), None, false),
        (global, None, false),
        (global, Some(CachePolicy::Streaming), false),
        (global, Some(CachePolicy::Streaming), true),
    ];
    let resolved: Vec<CachePolicy> = cases
        .iter()
        .map(|(o, per_call, dbg)| resolve_cache_policy(p, o, *per_call, *dbg))
        .collect();
    assert_eq!(
        resolved,
        vec![
            p.default_cache_policy,
            CachePolicy::WriteThrough,
            CachePolicy::Streaming,
            p.debugger_cache_policy,
        ]
    );

    // The same precedence lands in the encoded L1 policy field.
    let field = p.state_base_address.l1_cache_policy.unwrap();
    for ((o, per_call, dbg), expected) in cases.iter().zip(&resolved) {
        let args = SbaArgs {
            cache_policy_override: *per_call,
            debugger_active: *dbg,
            ..SbaArgs::default()
        };
        let cmd = build_state_base_address(p, o, &args);
        assert_eq!(cmd.get(field), *expected as u32);
    }
}

#[test]
fn generations_without_l1_policy_leave_it_alone() {
    let p = HwProfile::for_generation(HwGeneration::Gen12Lp);
    let args = SbaArgs {
        cache_policy_override: Some(CachePolicy::Streaming),
        ..SbaArgs::default()
    };
    let cmd = build_state_base_address(p, &DebugOverrides::default(), &args);
    assert_eq!(cmd.raw(3) & (0x7 << 4), 0);
    assert_eq!(cmd.get(p.state_base_address.stateless_mocs), p.mocs.stateless_default);
}

#[test]
fn encode_reserves_exact_size() {
    for gen in HwGeneration::ALL {
        let p = HwProfile::for_generation(gen);
        let mut stream = CommandStream::new(Segment::zeroed(128, None), 0);
        let overrides = DebugOverrides::default();
        let loc = encode_state_base_address(&mut stream, p, &overrides, &SbaArgs::default())
            .unwrap();
        assert_eq!(loc.len_bytes, state_base_address_size(p));
        assert_eq!(stream.used(), state_base_address_size(p));
    }
}
