#![forbid(unsafe_code)]

//! Container discovery.
//!
//! Two passes, first success wins:
//!
//! 1. **Selector pass**: for each configured selector in order, the first
//!    match (document order) that overflows, is taller than the selector
//!    floor and has block children.
//! 2. **Heuristic pass**: every element matched by the scan selector whose
//!    `overflow-y` is `auto`/`scroll`, that overflows and is taller than the
//!    heuristic floor. The tallest one wins; among equal heights the first in
//!    document order wins.
//!
//! Each pass is a list of [`Criterion`] predicates over an [`ElementProbe`]
//! followed, for the heuristic pass, by a max-by-height reducer. A candidate
//! whose probe fails is rejected and the scan continues.

use std::collections::BTreeMap;

use crate::config::FollowConfig;
use crate::error::HostError;
use crate::host::FeedDocument;
use crate::probe::ElementProbe;

/// Why a candidate was not accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rejection {
    /// Content fits in the box (`scrollHeight <= clientHeight`).
    NoOverflow,
    /// `clientHeight` at or below the floor.
    TooShort,
    /// No block-level descendants.
    EmptyShell,
    /// `overflow-y` is neither `auto` nor `scroll`.
    NotScrollable,
    /// Not rendered.
    Hidden,
    /// Reading the element threw.
    ProbeFailed,
}

/// One named predicate of a locate pass.
#[derive(Clone, Copy)]
pub struct Criterion {
    pub name: &'static str,
    pub rejection: Rejection,
    test: fn(&ElementProbe, &FollowConfig) -> bool,
}

impl Criterion {
    #[must_use]
    pub fn accepts(&self, probe: &ElementProbe, config: &FollowConfig) -> bool {
        (self.test)(probe, config)
    }
}

impl std::fmt::Debug for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Criterion")
            .field("name", &self.name)
            .field("rejection", &self.rejection)
            .finish()
    }
}

/// Predicates for selector matches.
pub const SELECTOR_CRITERIA: &[Criterion] = &[
    Criterion {
        name: "overflows",
        rejection: Rejection::NoOverflow,
        test: |p, _| p.overflows(),
    },
    Criterion {
        name: "min_height",
        rejection: Rejection::TooShort,
        test: |p, c| p.client_height > c.selector_min_client_height_px,
    },
    Criterion {
        name: "block_children",
        rejection: Rejection::EmptyShell,
        test: |p, _| p.has_block_children,
    },
];

/// Predicates for the heuristic scan.
pub const HEURISTIC_CRITERIA: &[Criterion] = &[
    Criterion {
        name: "visible",
        rejection: Rejection::Hidden,
        test: |p, c| !c.require_visible || p.visible,
    },
    Criterion {
        name: "scrollable",
        rejection: Rejection::NotScrollable,
        test: |p, _| p.overflow_y.is_scrollable(),
    },
    Criterion {
        name: "overflows",
        rejection: Rejection::NoOverflow,
        test: |p, _| p.overflows(),
    },
    Criterion {
        name: "min_height",
        rejection: Rejection::TooShort,
        test: |p, c| p.client_height > c.heuristic_min_client_height_px,
    },
];

/// First failing criterion, or `Ok` if all pass.
pub fn verdict(
    criteria: &[Criterion],
    probe: &ElementProbe,
    config: &FollowConfig,
) -> Result<(), Rejection> {
    match criteria.iter().find(|c| !c.accepts(probe, config)) {
        Some(failed) => Err(failed.rejection),
        None => Ok(()),
    }
}

/// Per-reason rejection counts for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionTally {
    counts: BTreeMap<Rejection, u32>,
}

impl RejectionTally {
    pub fn record(&mut self, rejection: Rejection) {
        *self.counts.entry(rejection).or_default() += 1;
    }

    #[must_use]
    pub fn count(&self, rejection: Rejection) -> u32 {
        self.counts.get(&rejection).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.counts.values().sum()
    }
}

/// Winner of the heuristic reducer.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<N> {
    pub node: N,
    pub client_height: f64,
}

/// Heuristic reducer: tallest accepted candidate, first in order on ties.
pub fn select_tallest<N, I>(candidates: I, config: &FollowConfig) -> (Option<Ranked<N>>, RejectionTally)
where
    I: IntoIterator<Item = (N, Result<ElementProbe, HostError>)>,
{
    let mut best: Option<Ranked<N>> = None;
    let mut tally = RejectionTally::default();
    for (node, probe) in candidates {
        let probe = match probe {
            Ok(probe) => probe,
            Err(err) => {
                tracing::trace!(target: "feedfollow.locate", error = %err, "candidate probe failed");
                tally.record(Rejection::ProbeFailed);
                continue;
            }
        };
        if let Err(rejection) = verdict(HEURISTIC_CRITERIA, &probe, config) {
            tally.record(rejection);
            continue;
        }
        // Strictly greater: an equal height never displaces an earlier winner.
        if best
            .as_ref()
            .is_none_or(|b| probe.client_height > b.client_height)
        {
            best = Some(Ranked {
                node,
                client_height: probe.client_height,
            });
        }
    }
    (best, tally)
}

/// Which pass produced the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatePass {
    Selector { index: usize, selector: String },
    Heuristic,
}

/// A located container.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<N> {
    pub node: N,
    pub pass: LocatePass,
    pub client_height: f64,
}

/// Summary of a pass that found nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocateReport {
    pub selector_matches: usize,
    pub failed_selectors: usize,
    pub scanned: usize,
    pub selector_rejections: RejectionTally,
    pub heuristic_rejections: RejectionTally,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocateOutcome<N> {
    Found(Located<N>),
    NotFound(LocateReport),
}

/// Run both passes against `doc`.
pub fn locate<D: FeedDocument>(doc: &D, config: &FollowConfig) -> LocateOutcome<D::Node> {
    let mut report = LocateReport::default();

    for (index, selector) in config.selectors.iter().enumerate() {
        let matches = match doc.query_selector_all(selector) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::debug!(target: "feedfollow.locate", %selector, error = %err, "selector skipped");
                report.failed_selectors += 1;
                continue;
            }
        };
        report.selector_matches += matches.len();
        for node in matches {
            let accepted = match doc.probe(&node) {
                Ok(probe) => verdict(SELECTOR_CRITERIA, &probe, config).map(|()| probe),
                Err(err) => {
                    tracing::trace!(target: "feedfollow.locate", %selector, error = %err, "candidate probe failed");
                    Err(Rejection::ProbeFailed)
                }
            };
            match accepted {
                Ok(probe) => {
                    return LocateOutcome::Found(Located {
                        node,
                        pass: LocatePass::Selector {
                            index,
                            selector: selector.clone(),
                        },
                        client_height: probe.client_height,
                    });
                }
                Err(rejection) => report.selector_rejections.record(rejection),
            }
        }
    }

    let scan = match doc.query_selector_all(&config.heuristic_scan_selector) {
        Ok(scan) => scan,
        Err(err) => {
            tracing::debug!(target: "feedfollow.locate", error = %err, "heuristic scan query failed");
            return LocateOutcome::NotFound(report);
        }
    };
    report.scanned = scan.len();
    let probed = scan.into_iter().map(|node| {
        let probe = doc.probe(&node);
        (node, probe)
    });
    let (best, tally) = select_tallest(probed, config);
    report.heuristic_rejections = tally;
    match best {
        Some(ranked) => LocateOutcome::Found(Located {
            node: ranked.node,
            pass: LocatePass::Heuristic,
            client_height: ranked.client_height,
        }),
        None => LocateOutcome::NotFound(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Overflow;

    fn scrollable(client_height: f64) -> ElementProbe {
        ElementProbe {
            client_height,
            scroll_height: client_height * 3.0,
            overflow_y: Overflow::Auto,
            has_block_children: true,
            visible: true,
        }
    }

    #[test]
    fn selector_verdict_reports_first_failure() {
        let config = FollowConfig::default();
        let mut probe = scrollable(400.0);
        assert_eq!(verdict(SELECTOR_CRITERIA, &probe, &config), Ok(()));

        probe.has_block_children = false;
        assert_eq!(
            verdict(SELECTOR_CRITERIA, &probe, &config),
            Err(Rejection::EmptyShell)
        );

        probe.client_height = 100.0;
        assert_eq!(
            verdict(SELECTOR_CRITERIA, &probe, &config),
            Err(Rejection::TooShort)
        );

        probe.scroll_height = 100.0;
        assert_eq!(
            verdict(SELECTOR_CRITERIA, &probe, &config),
            Err(Rejection::NoOverflow)
        );
    }

    #[test]
    fn selector_pass_ignores_overflow_style() {
        let config = FollowConfig::default();
        let mut probe = scrollable(400.0);
        probe.overflow_y = Overflow::Visible;
        assert_eq!(verdict(SELECTOR_CRITERIA, &probe, &config), Ok(()));
        assert_eq!(
            verdict(HEURISTIC_CRITERIA, &probe, &config),
            Err(Rejection::NotScrollable)
        );
    }

    #[test]
    fn visibility_only_checked_when_required() {
        let mut probe = scrollable(400.0);
        probe.visible = false;
        assert_eq!(
            verdict(HEURISTIC_CRITERIA, &probe, &FollowConfig::aggressive()),
            Ok(())
        );
        assert_eq!(
            verdict(HEURISTIC_CRITERIA, &probe, &FollowConfig::conservative()),
            Err(Rejection::Hidden)
        );
    }

    #[test]
    fn tallest_wins() {
        let config = FollowConfig::default();
        let (best, tally) = select_tallest(
            [("a", Ok(scrollable(400.0))), ("b", Ok(scrollable(600.0)))],
            &config,
        );
        assert_eq!(best.map(|b| b.node), Some("b"));
        assert_eq!(tally.total(), 0);

        let (best, _) = select_tallest(
            [("b", Ok(scrollable(600.0))), ("a", Ok(scrollable(400.0)))],
            &config,
        );
        assert_eq!(best.map(|b| b.node), Some("b"));
    }

    #[test]
    fn equal_heights_keep_first() {
        let config = FollowConfig::default();
        let (best, _) = select_tallest(
            [
                ("first", Ok(scrollable(500.0))),
                ("second", Ok(scrollable(500.0))),
            ],
            &config,
        );
        assert_eq!(best.map(|b| b.node), Some("first"));
    }

    #[test]
    fn failing_probe_does_not_abort_scan() {
        let config = FollowConfig::default();
        let (best, tally) = select_tallest(
            [
                ("broken", Err(HostError::Probe("getComputedStyle threw".into()))),
                ("ok", Ok(scrollable(300.0))),
            ],
            &config,
        );
        assert_eq!(best.map(|b| b.node), Some("ok"));
        assert_eq!(tally.count(Rejection::ProbeFailed), 1);
    }

    #[test]
    fn floor_is_exclusive() {
        let config = FollowConfig::conservative();
        let (best, tally) = select_tallest([("exact", Ok(scrollable(300.0)))], &config);
        assert!(best.is_none());
        assert_eq!(tally.count(Rejection::TooShort), 1);
    }
}
