#![cfg(not(target_arch = "wasm32"))]

use gfxcmd_encode::{encode_semaphore_wait, semaphore_wait_size, SemaphoreWait};
use gfxcmd_hw::{CmdDwords, CompareOperation, HwGeneration, HwProfile, WaitMode};
use gfxcmd_stream::{CommandStream, Segment};
use proptest::prelude::*;

fn arb_generation() -> impl Strategy<Value = HwGeneration> {
    prop::sample::select(HwGeneration::ALL.to_vec())
}

fn arb_compare() -> impl Strategy<Value = CompareOperation> {
    prop::sample::select(CompareOperation::ALL.to_vec())
}

proptest! {
    #[test]
    fn encoded_fields_read_back_exactly(
        gen in arb_generation(),
        address in any::<u64>().prop_map(|a| a & !0x3),
        data in any::<u32>(),
        compare in arb_compare(),
        polling in any::<bool>(),
    ) {
        let profile = HwProfile::for_generation(gen);
        let wait = SemaphoreWait {
            address,
            data,
            compare,
            mode: if polling { WaitMode::Polling } else { WaitMode::Signal },
            indirect: false,
        };

        let mut stream = CommandStream::new(Segment::zeroed(64, None), 0);
        let loc = encode_semaphore_wait(&mut stream, profile, &wait).unwrap();
        prop_assert_eq!(stream.used(), semaphore_wait_size(profile));
        prop_assert_eq!(loc.len_bytes, semaphore_wait_size(profile));

        let decoded = SemaphoreWait::decode(profile, &CmdDwords::from_le_bytes(stream.written()));
        prop_assert_eq!(decoded, Some(wait));
    }
}
