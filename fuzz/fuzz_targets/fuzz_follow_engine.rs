#![no_main]

use arbitrary::Arbitrary;
use feedfollow_core::error::HostError;
use feedfollow_core::follow::{FollowEngine, FrameAction, Growth};
use feedfollow_core::probe::ScrollMetrics;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Batch(u32),
    Frame,
    Toggle,
    Scroll { height: u32, top: u32, client: u16 },
    ScrollFailed,
}

#[derive(Debug, Arbitrary)]
struct Input {
    baseline: u32,
    threshold: u16,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let mut engine = FollowEngine::new(f64::from(input.baseline), f64::from(input.threshold));

    for op in input.ops.into_iter().take(512) {
        match op {
            Op::Batch(height) => {
                let paused = engine.state().paused;
                let pending = engine.frame_pending();
                let growth = engine.on_mutations(f64::from(height));
                assert_eq!(engine.state().last_known_scroll_height, f64::from(height));
                if matches!(growth, Growth::Follow { .. }) {
                    assert!(!paused, "follow requested while paused");
                    assert!(!pending, "second frame requested");
                    assert!(engine.frame_pending());
                }
            }
            Op::Frame => {
                let paused = engine.state().paused;
                if engine.on_frame() == FrameAction::ScrollToBottom {
                    assert!(!paused, "scroll while paused");
                }
                assert!(!engine.frame_pending());
            }
            Op::Toggle => {
                let before = engine.state().paused;
                engine.toggle();
                assert_ne!(before, engine.state().paused);
            }
            Op::Scroll { height, top, client } => {
                let metrics = ScrollMetrics {
                    scroll_height: f64::from(height),
                    scroll_top: f64::from(top),
                    client_height: f64::from(client),
                };
                let near = engine.on_scroll(Ok(metrics));
                assert_eq!(near, engine.state().near_bottom);
            }
            Op::ScrollFailed => {
                assert!(engine.on_scroll(Err(HostError::Metrics("fuzz".into()))));
            }
        }
    }
});
