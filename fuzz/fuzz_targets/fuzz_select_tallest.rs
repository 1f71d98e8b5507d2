#![no_main]

use arbitrary::Arbitrary;
use feedfollow_core::FollowConfig;
use feedfollow_core::error::HostError;
use feedfollow_core::locator::{HEURISTIC_CRITERIA, select_tallest, verdict};
use feedfollow_core::probe::{ElementProbe, Overflow};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Candidate {
    client_height: u16,
    scroll_height: u16,
    overflow: u8,
    has_block_children: bool,
    visible: bool,
    fails: bool,
}

fuzz_target!(|input: (bool, Vec<Candidate>)| {
    let (conservative, candidates) = input;
    let config = if conservative {
        FollowConfig::conservative()
    } else {
        FollowConfig::aggressive()
    };
    let total = candidates.len();
    let probed: Vec<(usize, Result<ElementProbe, HostError>)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let probe = if c.fails {
                Err(HostError::Probe("fuzz".into()))
            } else {
                Ok(ElementProbe {
                    client_height: f64::from(c.client_height),
                    scroll_height: f64::from(c.scroll_height),
                    overflow_y: match c.overflow % 5 {
                        0 => Overflow::Visible,
                        1 => Overflow::Hidden,
                        2 => Overflow::Clip,
                        3 => Overflow::Auto,
                        _ => Overflow::Scroll,
                    },
                    has_block_children: c.has_block_children,
                    visible: c.visible,
                })
            };
            (i, probe)
        })
        .collect();

    let accepted: Vec<(usize, f64)> = probed
        .iter()
        .filter_map(|(i, probe)| match probe {
            Ok(p) if verdict(HEURISTIC_CRITERIA, p, &config).is_ok() => Some((*i, p.client_height)),
            _ => None,
        })
        .collect();

    let (best, tally) = select_tallest(probed, &config);
    assert_eq!(accepted.len(), total - tally.total() as usize);
    match best {
        Some(ranked) => {
            let winner = &candidates[ranked.node];
            assert!(!winner.fails);
            assert!(f64::from(winner.client_height) > config.heuristic_min_client_height_px);
            assert!(winner.scroll_height > winner.client_height);
            // First accepted candidate of maximal height.
            let max = accepted.iter().map(|(_, h)| *h).fold(f64::MIN, f64::max);
            let first = accepted.iter().find(|(_, h)| *h == max).map(|(i, _)| *i);
            assert_eq!(Some(ranked.node), first);
        }
        None => assert!(accepted.is_empty()),
    }
});
