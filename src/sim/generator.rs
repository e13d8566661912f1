//! Route generation
//!
//! Greedy, non-backtracking walk over the segment pool:
//! - The route opens with the fixed plain start segment
//! - After a tunnel segment, a weighted coin usually keeps the tunnel going
//! - Otherwise (or if no tunnel fits) the normal pool is scanned
//! - Each pool is scanned in a freshly shuffled order; first fit wins
//! - The fixed end segment is appended without an oracle check
//!
//! A position with no compatible candidate fails the whole run. The route is
//! never returned truncated.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use super::compat::can_follow;
use super::segment::{LandmarkPlacement, Opening, Segment};
use crate::consts::CLEARANCE_MARGIN;
use crate::error::GenerationError;
use crate::segment_origin;

/// Authored segments available to the generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentPool {
    pub normal: Vec<Segment>,
    pub tunnel: Vec<Segment>,
}

/// Generator tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Clearance subtracted from both ends of each entry opening
    pub margin: i32,
    /// Probability of staying in the tunnel pool after a tunnel segment
    pub tunnel_continue_chance: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            margin: CLEARANCE_MARGIN,
            tunnel_continue_chance: 10.0 / 11.0,
        }
    }
}

/// Ordered sequence of placed segments for one session
///
/// Each segment is a deep copy whose origin is its route-space x
/// (`index * SEGMENT_WIDTH`). The route is not modified after generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    segments: Vec<Segment>,
}

impl Route {
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total route-space width
    pub fn width(&self) -> f64 {
        segment_origin(self.segments.len())
    }

    /// Number of tunnel segments in the route
    pub fn tunnel_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_tunnel_variant).count()
    }
}

/// Build a route of exactly `length` segments
pub fn generate<R: Rng + ?Sized>(
    pool: &SegmentPool,
    length: usize,
    start: &Segment,
    end: &Segment,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Result<Route, GenerationError> {
    if length < 2 {
        return Err(GenerationError::RouteTooShort { length });
    }

    let mut segments = Vec::with_capacity(length);
    let mut first = start.clone();
    first.is_terminal = false;
    first.landmark = None;
    first.place_at(0.0);
    segments.push(first);

    let mut normal_order: Vec<usize> = (0..pool.normal.len()).collect();
    let mut tunnel_order: Vec<usize> = (0..pool.tunnel.len()).collect();

    for position in 1..length - 1 {
        let previous = &segments[position - 1];
        let exits = &previous.exit_intervals;

        let mut next = None;
        if previous.is_tunnel_variant
            && rng.random_bool(config.tunnel_continue_chance.clamp(0.0, 1.0))
        {
            next = first_fit(&pool.tunnel, &mut tunnel_order, exits, config.margin, rng);
        }
        if next.is_none() {
            if pool.normal.is_empty() {
                return Err(GenerationError::EmptyPool);
            }
            next = first_fit(&pool.normal, &mut normal_order, exits, config.margin, rng);
        }

        match next {
            Some(candidate) => {
                let mut placed = candidate.clone();
                placed.place_at(segment_origin(position));
                segments.push(placed);
            }
            None => {
                log::warn!(
                    "Route generation dead-ended at position {} after `{}`",
                    position,
                    previous.id
                );
                return Err(GenerationError::DeadEnd {
                    position,
                    previous: previous.id.clone(),
                });
            }
        }
    }

    let mut last = end.clone();
    last.is_terminal = true;
    last.landmark = Some(LandmarkPlacement::terminal());
    last.place_at(segment_origin(length - 1));
    segments.push(last);

    let route = Route { segments };
    log::info!(
        "Generated route: {} segments, {} tunnel",
        route.len(),
        route.tunnel_count()
    );
    Ok(route)
}

/// Shuffle the scan order, then return the first compatible candidate
fn first_fit<'p, R: Rng + ?Sized>(
    candidates: &'p [Segment],
    order: &mut [usize],
    exits: &[Opening],
    margin: i32,
    rng: &mut R,
) -> Option<&'p Segment> {
    order.shuffle(rng);
    order
        .iter()
        .map(|&i| &candidates[i])
        .find(|candidate| can_follow(candidate, exits, margin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SEGMENT_WIDTH;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn seg(id: &str, entry: (i32, i32), exit: (i32, i32), tunnel: bool) -> Segment {
        Segment::new(
            id,
            Vec::new(),
            vec![Opening::new(entry.0, entry.1)],
            vec![Opening::new(exit.0, exit.1)],
            tunnel,
        )
    }

    fn plain() -> Segment {
        seg("plain", (0, 448), (0, 448), false)
    }

    #[test]
    fn test_route_has_requested_length_and_fixed_ends() {
        let pool = SegmentPool {
            normal: vec![seg("a", (0, 448), (0, 448), false)],
            tunnel: Vec::new(),
        };
        let mut rng = Pcg32::seed_from_u64(7);
        let route =
            generate(&pool, 10, &plain(), &plain(), &GeneratorConfig::default(), &mut rng).unwrap();

        assert_eq!(route.len(), 10);
        assert_eq!(route.get(0).unwrap().id, "plain");
        let last = route.get(9).unwrap();
        assert!(last.is_terminal);
        assert!(last.landmark.is_some());
        for (i, s) in route.segments().iter().enumerate() {
            assert_eq!(s.origin_x, i as f64 * SEGMENT_WIDTH);
        }
        assert!(route.segments()[..9].iter().all(|s| !s.is_terminal));
    }

    #[test]
    fn test_too_short_route_rejected() {
        let pool = SegmentPool::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let err = generate(&pool, 1, &plain(), &plain(), &GeneratorConfig::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err, GenerationError::RouteTooShort { length: 1 });
    }

    #[test]
    fn test_two_segment_route_needs_no_pool() {
        let pool = SegmentPool::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let route =
            generate(&pool, 2, &plain(), &plain(), &GeneratorConfig::default(), &mut rng).unwrap();
        assert_eq!(route.len(), 2);
    }

    #[test]
    fn test_empty_pool_rejected() {
        let pool = SegmentPool::default();
        let mut rng = Pcg32::seed_from_u64(1);
        let err = generate(&pool, 5, &plain(), &plain(), &GeneratorConfig::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err, GenerationError::EmptyPool);
    }

    #[test]
    fn test_unreachable_segment_fails_instead_of_truncating() {
        // The only candidate enters far below anything the start exits through
        let pool = SegmentPool {
            normal: vec![seg("pit", (500, 640), (500, 640), false)],
            tunnel: Vec::new(),
        };
        let start = seg("plain", (0, 320), (0, 320), false);
        let mut rng = Pcg32::seed_from_u64(3);
        let config = GeneratorConfig::default();
        let err = generate(&pool, 6, &start, &plain(), &config, &mut rng).unwrap_err();
        assert_eq!(
            err,
            GenerationError::DeadEnd {
                position: 1,
                previous: "plain".to_string()
            }
        );
    }

    #[test]
    fn test_tunnel_continues_when_coin_favors_it() {
        let pool = SegmentPool {
            normal: vec![seg("ground", (0, 448), (0, 448), false)],
            tunnel: vec![seg("tube", (0, 448), (0, 448), true)],
        };
        let start = seg("entry", (0, 448), (0, 448), true);
        let config = GeneratorConfig {
            tunnel_continue_chance: 1.0,
            ..Default::default()
        };
        let mut rng = Pcg32::seed_from_u64(11);
        let route = generate(&pool, 8, &start, &plain(), &config, &mut rng).unwrap();
        assert!(route.segments()[1..7].iter().all(|s| s.id == "tube"));

        let config = GeneratorConfig {
            tunnel_continue_chance: 0.0,
            ..Default::default()
        };
        let route = generate(&pool, 8, &start, &plain(), &config, &mut rng).unwrap();
        assert!(route.segments()[1..7].iter().all(|s| s.id == "ground"));
    }

    #[test]
    fn test_tunnel_only_pool_serves_a_tunnel_run() {
        let pool = SegmentPool {
            normal: Vec::new(),
            tunnel: vec![seg("tube", (0, 448), (0, 448), true)],
        };
        let start = seg("entry", (0, 448), (0, 448), true);
        let config = GeneratorConfig {
            tunnel_continue_chance: 1.0,
            ..Default::default()
        };
        let mut rng = Pcg32::seed_from_u64(13);
        let route = generate(&pool, 6, &start, &plain(), &config, &mut rng).unwrap();
        assert_eq!(route.len(), 6);
        assert!(route.segments()[1..5].iter().all(|s| s.id == "tube"));

        // Once the run stops, the empty normal pool is reported
        let config = GeneratorConfig {
            tunnel_continue_chance: 0.0,
            ..Default::default()
        };
        let err = generate(&pool, 6, &start, &plain(), &config, &mut rng).unwrap_err();
        assert_eq!(err, GenerationError::EmptyPool);
    }

    #[test]
    fn test_tunnel_scan_failure_falls_back_to_normal() {
        let pool = SegmentPool {
            normal: vec![seg("ground", (0, 448), (0, 448), false)],
            tunnel: vec![seg("deep", (600, 640), (600, 640), true)],
        };
        let start = seg("entry", (0, 448), (0, 448), true);
        let config = GeneratorConfig {
            tunnel_continue_chance: 1.0,
            ..Default::default()
        };
        let mut rng = Pcg32::seed_from_u64(5);
        let route = generate(&pool, 4, &start, &plain(), &config, &mut rng).unwrap();
        assert_eq!(route.get(1).unwrap().id, "ground");
    }

    #[test]
    fn test_same_seed_same_route() {
        let pool = SegmentPool {
            normal: (0..6)
                .map(|i| seg(&format!("n{i}"), (0, 448), (0, 448), i % 2 == 0))
                .collect(),
            tunnel: (0..3)
                .map(|i| seg(&format!("t{i}"), (0, 448), (0, 448), true))
                .collect(),
        };
        let config = GeneratorConfig::default();
        let a = generate(&pool, 30, &plain(), &plain(), &config, &mut Pcg32::seed_from_u64(42))
            .unwrap();
        let b = generate(&pool, 30, &plain(), &plain(), &config, &mut Pcg32::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_self_compatible_pool_never_dead_ends(
            bands in prop::collection::vec((0i32..320, 200i32..320), 1..8),
            tunnel_flags in prop::collection::vec(any::<bool>(), 8),
            length in 2usize..60,
            seed in any::<u64>(),
        ) {
            // Every band contains [320, 520] so each exit overlaps every shrunken entry
            let normal: Vec<Segment> = bands
                .iter()
                .enumerate()
                .map(|(i, &(lo, len))| {
                    let band = (lo, 520 + len);
                    seg(&format!("n{i}"), band, band, tunnel_flags[i])
                })
                .collect();
            let pool = SegmentPool { tunnel: normal.clone(), normal };
            let start = seg("plain", (0, 640), (0, 640), false);
            let mut rng = Pcg32::seed_from_u64(seed);
            let config = GeneratorConfig::default();
            let route = generate(&pool, length, &start, &start, &config, &mut rng);
            prop_assert!(route.is_ok());
            prop_assert_eq!(route.unwrap().len(), length);
        }
    }
}
