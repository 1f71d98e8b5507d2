//! Property-based invariant tests for near-bottom tracking, the follow
//! engine and the heuristic locator.
//!
//! 1. Near-bottom is a pure function of the four inputs
//! 2. The baseline always equals the last observed height
//! 3. No frame is ever requested while paused
//! 4. At most one frame is pending at a time
//! 5. The tallest candidate wins regardless of order
//! 6. Failing probes never hide a qualifying candidate

use feedfollow_core::FollowConfig;
use feedfollow_core::error::HostError;
use feedfollow_core::follow::{FollowEngine, FrameAction, Growth};
use feedfollow_core::locator::select_tallest;
use feedfollow_core::probe::{ElementProbe, Overflow, ScrollMetrics};
use feedfollow_core::tracker::is_near_bottom;
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Batch(u32),
    Frame,
    Toggle,
    ScrollAway,
    ScrollBottom,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u32..5_000).prop_map(Op::Batch),
        2 => Just(Op::Frame),
        1 => Just(Op::Toggle),
        1 => Just(Op::ScrollAway),
        1 => Just(Op::ScrollBottom),
    ]
}

fn probe(client_height: u32) -> ElementProbe {
    ElementProbe {
        client_height: f64::from(client_height),
        scroll_height: f64::from(client_height) * 2.0,
        overflow_y: Overflow::Scroll,
        has_block_children: true,
        visible: true,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Near-bottom purity
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn near_bottom_matches_formula(
        scroll_height in 0.0f64..100_000.0,
        scroll_top in 0.0f64..100_000.0,
        client_height in 0.0f64..5_000.0,
        threshold in 0.0f64..500.0,
    ) {
        let metrics = ScrollMetrics { scroll_height, scroll_top, client_height };
        let expected = scroll_height - scroll_top - client_height < threshold;
        prop_assert_eq!(is_near_bottom(&metrics, threshold), expected);
        // Same inputs, same answer.
        prop_assert_eq!(is_near_bottom(&metrics, threshold), is_near_bottom(&metrics, threshold));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 2-4. Engine invariants over arbitrary op sequences
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn engine_invariants_hold(
        baseline in 0u32..5_000,
        ops in proptest::collection::vec(op_strategy(), 1..64),
    ) {
        let mut engine = FollowEngine::new(f64::from(baseline), 100.0);
        for op in ops {
            match op {
                Op::Batch(height) => {
                    let was_pending = engine.frame_pending();
                    let paused = engine.state().paused;
                    let growth = engine.on_mutations(f64::from(height));
                    prop_assert_eq!(engine.state().last_known_scroll_height, f64::from(height));
                    if let Growth::Follow { .. } = growth {
                        prop_assert!(!paused, "frame requested while paused");
                        prop_assert!(!was_pending, "second frame requested while one pending");
                    }
                }
                Op::Frame => {
                    let paused = engine.state().paused;
                    if engine.on_frame() == FrameAction::ScrollToBottom {
                        prop_assert!(!paused);
                    }
                    prop_assert!(!engine.frame_pending());
                }
                Op::Toggle => {
                    engine.toggle();
                }
                Op::ScrollAway => {
                    engine.on_scroll(Ok(ScrollMetrics {
                        scroll_height: 10_000.0,
                        scroll_top: 0.0,
                        client_height: 500.0,
                    }));
                }
                Op::ScrollBottom => {
                    engine.on_scroll(Ok(ScrollMetrics {
                        scroll_height: 10_000.0,
                        scroll_top: 9_500.0,
                        client_height: 500.0,
                    }));
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 5-6. Locator reducer
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn tallest_wins_in_any_order(
        heights in proptest::collection::hash_set(101u32..5_000, 1..20),
        seed in any::<u64>(),
    ) {
        let config = FollowConfig::default();
        let mut candidates: Vec<u32> = heights.into_iter().collect();
        let max = candidates.iter().copied().max().unwrap_or(0);

        // Deterministic shuffle driven by the seed.
        let mut state = seed | 1;
        for i in (1..candidates.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let j = (state % (i as u64 + 1)) as usize;
            candidates.swap(i, j);
        }

        let (best, _) = select_tallest(
            candidates.iter().map(|&h| (h, Ok::<_, HostError>(probe(h)))),
            &config,
        );
        prop_assert_eq!(best.map(|b| b.node), Some(max));
    }

    #[test]
    fn failing_probes_are_skipped(
        good in 101u32..5_000,
        failures in 0usize..10,
    ) {
        let config = FollowConfig::default();
        let mut candidates: Vec<(u32, Result<ElementProbe, HostError>)> = (0..failures)
            .map(|i| (i as u32, Err(HostError::Probe("style threw".into()))))
            .collect();
        candidates.insert(failures / 2, (good, Ok(probe(good))));
        let (best, tally) = select_tallest(candidates, &config);
        prop_assert_eq!(best.map(|b| b.node), Some(good));
        prop_assert_eq!(tally.total() as usize, failures);
    }
}
