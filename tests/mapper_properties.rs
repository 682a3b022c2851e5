use proptest::prelude::*;
use statkeeper::record::map_cpu;
use statkeeper::system::snapshot::{CpuSnapshot, CpuTime};

fn cpu_time() -> impl Strategy<Value = CpuTime> {
    (any::<u64>(), any::<u64>(), any::<u64>(), any::<u64>()).prop_map(|(user, system, idle, steal)| {
        CpuTime {
            user,
            system,
            idle,
            steal,
            ..CpuTime::default()
        }
    })
}

proptest! {
    #[test]
    fn core_indices_are_contiguous_from_zero(
        cores in prop::collection::vec(cpu_time(), 0..256),
    ) {
        let raw = CpuSnapshot { cores: cores.clone(), ..CpuSnapshot::default() };
        let rec = map_cpu(&raw, 1);
        let indices: Vec<u32> = rec.cores.iter().map(|c| c.core_no).collect();
        let expected: Vec<u32> = (0..cores.len() as u32).collect();
        prop_assert_eq!(indices, expected);
    }

    #[test]
    fn core_counters_follow_kernel_order(
        cores in prop::collection::vec(cpu_time(), 1..64),
        created_at in any::<i64>(),
    ) {
        let raw = CpuSnapshot { cores: cores.clone(), ..CpuSnapshot::default() };
        let rec = map_cpu(&raw, created_at);
        for (child, source) in rec.cores.iter().zip(&cores) {
            prop_assert_eq!(&child.stat, source);
            prop_assert_eq!(child.created_at, created_at);
        }
    }

    #[test]
    fn aggregate_fields_are_copied(
        boot_time in any::<u64>(),
        irq in any::<u64>(),
        ctxt in any::<u64>(),
        total in cpu_time(),
    ) {
        let raw = CpuSnapshot {
            boot_time,
            irq_total: irq,
            context_switches: ctxt,
            total,
            ..CpuSnapshot::default()
        };
        let rec = map_cpu(&raw, 0);
        prop_assert_eq!(rec.boot_time, boot_time);
        prop_assert_eq!(rec.irq_total, irq);
        prop_assert_eq!(rec.context_switches, ctxt);
        prop_assert_eq!(rec.stat, total);
    }
}
