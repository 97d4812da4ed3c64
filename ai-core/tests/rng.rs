use ai_core::{DeterministicRng, EntityId, TickContext};

#[test]
fn agent_streams_are_reproducible() {
    let ctx = TickContext::new(4, 0.1, 99);
    let mut a = ctx.rng_for_agent(EntityId(1), 0);
    let mut b = ctx.rng_for_agent(EntityId(1), 0);
    for _ in 0..8 {
        assert_eq!(a.next_u64(), b.next_u64());
    }
}

#[test]
fn agent_streams_differ_by_agent() {
    let ctx = TickContext::new(4, 0.1, 99);
    let mut a = ctx.rng_for_agent(EntityId(1), 0);
    let mut b = ctx.rng_for_agent(EntityId(2), 0);
    assert_ne!(a.next_u64(), b.next_u64());
}

#[test]
fn ranges_stay_in_bounds() {
    let mut rng = TickContext::new(0, 0.0, 7).rng_for_agent(3u64, 1);
    for _ in 0..256 {
        let x = rng.next_f64_range(2.0, 5.0);
        assert!((2.0..5.0).contains(&x));
    }
    assert_eq!(rng.next_f64_range(3.0, 3.0), 3.0);
}

#[test]
fn chance_saturates_at_the_bounds() {
    let mut rng = TickContext::new(1, 0.0, 11).rng_for_agent(EntityId(5), 2);
    for _ in 0..64 {
        assert!(rng.chance(1.0));
        assert!(!rng.chance(0.0));
    }
}
