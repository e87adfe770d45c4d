//! Property tests for the fixed-step clock.

use hearth_host::FixedStepClock;
use proptest::prelude::*;

// Binary fractions keep the arithmetic exact.
const STEP: f32 = 1.0 / 32.0;
const UNIT: f64 = 1.0 / 1024.0;

proptest! {
    #[test]
    fn test_step_count_independent_of_jitter(frames in prop::collection::vec(0u32..=256, 1..200)) {
        let mut jittery = FixedStepClock::new(STEP, 16, 0.25);
        let steps: u64 = frames
            .iter()
            .map(|&units| u64::from(jittery.accumulate(f64::from(units) * UNIT)))
            .sum();

        let total_units: u64 = frames.iter().map(|&u| u64::from(u)).sum();
        prop_assert_eq!(steps, total_units / 32);
        prop_assert_eq!(jittery.accumulator(), (total_units % 32) as f64 * UNIT);
        prop_assert_eq!(jittery.stats().capped_frames, 0);
    }

    #[test]
    fn test_steps_bounded_and_accumulator_below_step(
        frames in prop::collection::vec(-1.0f64..10.0, 1..100),
        max_steps in 1u32..6,
    ) {
        let mut clock = FixedStepClock::new(0.01, max_steps, 0.25);
        for delta in frames {
            let steps = clock.accumulate(delta);
            prop_assert!(steps <= max_steps);
            prop_assert!(clock.accumulator() >= 0.0);
            prop_assert!(clock.accumulator() < f64::from(clock.step()));
        }
    }
}

#[test]
fn test_stall_then_recover() {
    let mut clock = FixedStepClock::new(STEP, 4, 0.25);
    assert_eq!(clock.accumulate(5.0), 4);
    assert_eq!(clock.accumulator(), 0.0);
    assert_eq!(clock.accumulate(f64::from(STEP)), 1);
}
