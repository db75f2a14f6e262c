mod config;
pub mod join;
pub mod manual;
pub mod schema;

use log::{debug, error, info, warn};

use std::collections::{BTreeMap, HashSet};

pub use crate::config::*;
use crate::join::inner_join;

/// Attaches to every department the identity of its region.
///
/// All the departments are kept. The ones pointing to an unknown region come
/// last, with empty region fields. Blank cells become empty fields and a
/// blank code never matches. Areas with an empty field are dropped when
/// joining the ballots.
pub fn merge_areas(regions: &[RegionRecord], departments: &[DepartmentRecord]) -> Vec<AreaRecord> {
    info!(
        "merge_areas: {:?} regions, {:?} departments",
        regions.len(),
        departments.len()
    );
    let outcome = inner_join(
        departments,
        regions,
        |d| non_blank(&d.region_code),
        |r| non_blank(&r.code_reg),
        |d, r| {
            Some(AreaRecord {
                code_reg: non_blank(&r.code_reg),
                name_reg: non_blank(&r.name_reg),
                code_dep: DepartmentCode::parse(&d.code_dep),
                name_dep: non_blank(&d.name_dep),
            })
        },
    );

    for d in outcome.unmatched.iter() {
        warn!(
            "merge_areas: department {:?} ({:?}) refers to unknown region {:?}",
            d.code_dep, d.name_dep, d.region_code
        );
    }

    let mut areas = outcome.matched;
    areas.extend(outcome.unmatched.iter().map(|d| AreaRecord {
        code_reg: None,
        name_reg: None,
        code_dep: DepartmentCode::parse(&d.code_dep),
        name_dep: non_blank(&d.name_dep),
    }));

    let incomplete = areas.iter().filter(|a| !a.is_complete()).count();
    if incomplete > 0 {
        warn!(
            "merge_areas: {:?} areas out of {:?} have an empty field",
            incomplete,
            areas.len()
        );
    }
    areas
}

/// Resolves every ballot line to its mainland area, using the default
/// exclusion list `EXCLUDED_REGION_CODES`.
pub fn join_ballots(ballots: &[BallotRecord], areas: &[AreaRecord]) -> JoinedTable {
    join_ballots_excluding(ballots, areas, EXCLUDED_REGION_CODES)
}

/// Resolves every ballot line to its area.
///
/// The areas of the `excluded` regions are removed first. A ballot line
/// survives only if its (padded) department code matches a complete area
/// (known region, no blank field); the other lines end up in
/// `JoinedTable::dropped`.
pub fn join_ballots_excluding<S: AsRef<str>>(
    ballots: &[BallotRecord],
    areas: &[AreaRecord],
    excluded: &[S],
) -> JoinedTable {
    let excluded: HashSet<&str> = excluded.iter().map(|s| s.as_ref()).collect();
    let mainland: Vec<AreaRecord> = areas
        .iter()
        .filter(|a| match a.code_reg.as_deref() {
            Some(code) => !excluded.contains(code),
            None => true,
        })
        .cloned()
        .collect();
    let excluded_areas = areas.len() - mainland.len();
    debug!(
        "join_ballots: excluded {:?} areas out of {:?}",
        excluded_areas,
        areas.len()
    );

    let outcome = inner_join(
        ballots,
        &mainland,
        |b| DepartmentCode::parse(&b.department_code),
        |a| a.code_dep.clone(),
        |b, a| {
            // Any empty field of the area rejects the pair.
            Some(JoinedRecord {
                department_code: DepartmentCode::normalize(&b.department_code),
                counts: b.counts,
                code_reg: a.code_reg.clone()?,
                name_reg: a.name_reg.clone()?,
                code_dep: a.code_dep.clone()?,
                name_dep: a.name_dep.clone()?,
            })
        },
    );

    if !outcome.unmatched.is_empty() {
        let codes: Vec<&str> = outcome
            .unmatched
            .iter()
            .map(|b| b.department_code.as_str())
            .collect();
        warn!(
            "join_ballots: dropping {:?} ballot lines without a mainland area: {:?}",
            codes.len(),
            codes
        );
    }
    info!(
        "join_ballots: {:?} ballot lines in, {:?} joined, {:?} dropped",
        ballots.len(),
        outcome.matched.len(),
        outcome.unmatched.len()
    );

    JoinedTable {
        records: outcome.matched,
        dropped: outcome.unmatched,
        excluded_areas,
    }
}

/// Sums the ballot counts of each region.
///
/// Only the regions with at least one joined line are present. The rows are
/// sorted by region code, but callers should not depend on it.
pub fn aggregate_by_region(joined: &[JoinedRecord]) -> Vec<RegionResult> {
    let mut groups: BTreeMap<(&str, &str), BallotCounts> = BTreeMap::new();
    for j in joined.iter() {
        let e = groups
            .entry((j.code_reg.as_str(), j.name_reg.as_str()))
            .or_insert(BallotCounts::EMPTY);
        *e = match e.checked_add(&j.counts) {
            Some(sum) => sum,
            None => {
                error!(
                    "aggregate_by_region: the counts of region {} overflow, saturating",
                    j.code_reg
                );
                e.saturating_add(&j.counts)
            }
        };
    }
    debug!("aggregate_by_region: {:?} groups", groups.len());

    groups
        .into_iter()
        .map(|((code_reg, name_reg), counts)| RegionResult {
            code_reg: code_reg.to_string(),
            name_reg: name_reg.to_string(),
            counts,
        })
        .collect()
}

/// Attaches its boundary to every regional result and computes the share of
/// choice A among the expressed ballots.
///
/// The boundaries are matched on the region *name*, exactly. A result without
/// boundary is kept (it cannot be drawn but its ratio is computed).
pub fn compute_ratio_map(
    region_results: &[RegionResult],
    geometry: &[GeometryRecord],
) -> Vec<MapResult> {
    let outcome = inner_join(
        region_results,
        geometry,
        |r| Some(r.name_reg.as_str()),
        |g| Some(g.name.as_str()),
        |r, g| Some(map_result(r, Some(g.boundary.clone()))),
    );

    for r in outcome.unmatched.iter() {
        warn!(
            "compute_ratio_map: no boundary named {:?} (region {})",
            r.name_reg, r.code_reg
        );
    }

    let mut res = outcome.matched;
    res.extend(outcome.unmatched.iter().map(|r| map_result(r, None)));
    res
}

fn map_result(result: &RegionResult, boundary: Option<geo::MultiPolygon<f64>>) -> MapResult {
    let ratio = result.counts.choice_a_ratio();
    if ratio.is_none() {
        warn!(
            "compute_ratio_map: region {} has no expressed ballot, the ratio is undefined",
            result.code_reg
        );
    }
    MapResult {
        result: result.clone(),
        boundary,
        ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn region(code: &str, name: &str) -> RegionRecord {
        RegionRecord {
            code_reg: code.to_string(),
            name_reg: name.to_string(),
        }
    }

    fn department(code: &str, name: &str, region_code: &str) -> DepartmentRecord {
        DepartmentRecord {
            code_dep: code.to_string(),
            name_dep: name.to_string(),
            region_code: region_code.to_string(),
        }
    }

    fn ballot(code: &str, counts: [u64; 5]) -> BallotRecord {
        BallotRecord {
            department_code: code.to_string(),
            counts: BallotCounts {
                registered: counts[0],
                abstentions: counts[1],
                null_votes: counts[2],
                choice_a: counts[3],
                choice_b: counts[4],
            },
        }
    }

    fn square(name: &str) -> GeometryRecord {
        GeometryRecord {
            name: name.to_string(),
            boundary: MultiPolygon(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0),
            ]]),
        }
    }

    fn regions() -> Vec<RegionRecord> {
        vec![
            region("11", "Île-de-France"),
            region("84", "Auvergne-Rhône-Alpes"),
            region("94", "Corse"),
            region("COM", "Collectivités d'Outre-Mer"),
        ]
    }

    fn departments() -> Vec<DepartmentRecord> {
        vec![
            department("01", "Ain", "84"),
            department("03", "Allier", "84"),
            department("2A", "Corse-du-Sud", "94"),
            department("75", "Paris", "11"),
            department("975", "Saint-Pierre-et-Miquelon", "COM"),
            department("XX", "Nowhere", "00"),
        ]
    }

    fn ballots() -> Vec<BallotRecord> {
        vec![
            ballot("1", [100, 10, 5, 40, 45]),
            ballot("01", [50, 5, 5, 20, 20]),
            ballot("3", [80, 20, 0, 30, 30]),
            ballot("2A", [60, 6, 4, 10, 40]),
            ballot("75", [300, 30, 10, 160, 100]),
            ballot("975", [20, 2, 1, 7, 10]),
            ballot("XX", [10, 1, 1, 4, 4]),
            ballot("99", [10, 1, 1, 4, 4]),
        ]
    }

    fn run(ballots: &[BallotRecord]) -> Vec<RegionResult> {
        let areas = merge_areas(&regions(), &departments());
        let joined = join_ballots(ballots, &areas);
        aggregate_by_region(&joined.records)
    }

    fn as_set(results: &[RegionResult]) -> HashSet<RegionResult> {
        results.iter().cloned().collect()
    }

    #[test]
    fn department_code_padding() {
        assert_eq!(DepartmentCode::normalize("1").as_str(), "01");
        assert_eq!(DepartmentCode::normalize("01").as_str(), "01");
        assert_eq!(DepartmentCode::normalize("2A").as_str(), "2A");
        assert_eq!(DepartmentCode::normalize("971").as_str(), "971");
        assert_eq!(DepartmentCode::normalize("A").as_str(), "0A");
        assert_eq!(DepartmentCode::parse("  "), None);
    }

    #[test]
    fn merge_areas_keeps_all_departments() {
        init();
        let regions = regions();
        let areas = merge_areas(&regions, &departments());
        assert_eq!(areas.len(), departments().len());

        let known: HashSet<&str> = regions.iter().map(|r| r.code_reg.as_str()).collect();
        for a in areas.iter() {
            match a.code_reg.as_deref() {
                Some(code) => assert!(known.contains(code)),
                None => assert_eq!(a.code_dep, DepartmentCode::parse("XX")),
            }
        }
        let unresolved: Vec<&AreaRecord> = areas.iter().filter(|a| !a.is_complete()).collect();
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].name_reg, None);
    }

    #[test]
    fn merge_areas_columns() {
        let areas = merge_areas(&regions(), &departments());
        let ain = areas
            .iter()
            .find(|a| a.code_dep == DepartmentCode::parse("01"))
            .unwrap();
        assert_eq!(
            ain,
            &AreaRecord {
                code_reg: Some("84".to_string()),
                name_reg: Some("Auvergne-Rhône-Alpes".to_string()),
                code_dep: Some(DepartmentCode::normalize("01")),
                name_dep: Some("Ain".to_string()),
            }
        );
    }

    #[test]
    fn single_department_scenario() {
        init();
        let areas = merge_areas(&[region("R1", "Alpha")], &[department("01", "One", "R1")]);
        let joined = join_ballots(&[ballot("1", [100, 10, 5, 40, 45])], &areas);
        assert_eq!(joined.records.len(), 1);
        assert!(joined.dropped.is_empty());

        let results = aggregate_by_region(&joined.records);
        assert_eq!(
            results,
            vec![RegionResult {
                code_reg: "R1".to_string(),
                name_reg: "Alpha".to_string(),
                counts: BallotCounts {
                    registered: 100,
                    abstentions: 10,
                    null_votes: 5,
                    choice_a: 40,
                    choice_b: 45,
                },
            }]
        );

        let map = compute_ratio_map(&results, &[square("Alpha")]);
        assert_eq!(map.len(), 1);
        assert!(map[0].boundary.is_some());
        let ratio = map[0].ratio.unwrap();
        assert!((ratio - 40.0 / 85.0).abs() < 1e-12);
        assert!((ratio - 0.4706).abs() < 1e-4);
    }

    #[test]
    fn unknown_department_code_is_dropped() {
        init();
        let areas = merge_areas(&regions(), &departments());
        let with_unknown = join_ballots(&ballots(), &areas);
        assert!(with_unknown
            .dropped
            .iter()
            .any(|b| b.department_code == "99"));
        assert!(with_unknown
            .records
            .iter()
            .all(|j| j.department_code.as_str() != "99"));

        let without: Vec<BallotRecord> = ballots()
            .into_iter()
            .filter(|b| b.department_code != "99")
            .collect();
        assert_eq!(as_set(&run(&ballots())), as_set(&run(&without)));
    }

    #[test]
    fn excluded_regions_are_removed() {
        let areas = merge_areas(&regions(), &departments());
        let joined = join_ballots(&ballots(), &areas);
        assert_eq!(joined.excluded_areas, 1);
        assert!(joined.dropped.iter().any(|b| b.department_code == "975"));
        assert!(joined.records.iter().all(|j| j.code_reg != "COM"));

        // Without the exclusion, the same ballot line is kept.
        let none: [&str; 0] = [];
        let all = join_ballots_excluding(&ballots(), &areas, &none);
        assert_eq!(all.excluded_areas, 0);
        assert!(all.records.iter().any(|j| j.code_reg == "COM"));
    }

    #[test]
    fn unresolved_areas_do_not_survive() {
        let areas = merge_areas(&regions(), &departments());
        let joined = join_ballots(&ballots(), &areas);
        assert!(joined.dropped.iter().any(|b| b.department_code == "XX"));
        assert!(joined.records.iter().all(|j| j.code_dep.as_str() != "XX"));
        // 975 (excluded), XX (unknown region), 99 (unknown department)
        assert_eq!(joined.dropped.len(), 3);
        assert_eq!(joined.records.len() + joined.dropped.len(), ballots().len());
    }

    #[test]
    fn joined_table_does_not_mutate_inputs() {
        let areas = merge_areas(&regions(), &departments());
        let before = areas.clone();
        let _ = join_ballots(&ballots(), &areas);
        assert_eq!(areas, before);
    }

    #[test]
    fn aggregation_sums_each_column() {
        let results = run(&ballots());
        assert_eq!(results.len(), 3);
        let ara = results.iter().find(|r| r.code_reg == "84").unwrap();
        assert_eq!(ara.name_reg, "Auvergne-Rhône-Alpes");
        assert_eq!(
            ara.counts,
            BallotCounts {
                registered: 230,
                abstentions: 35,
                null_votes: 10,
                choice_a: 90,
                choice_b: 95,
            }
        );
        // No row for a region without joined ballots.
        assert!(results.iter().all(|r| r.code_reg != "COM"));
    }

    #[test]
    fn registered_sum_invariant() {
        let input: u64 = ballots().iter().map(|b| b.counts.registered).sum();
        let output: u64 = run(&ballots()).iter().map(|r| r.counts.registered).sum();
        assert!(output < input);
        assert_eq!(input - output, 20 + 10 + 10);

        let clean: Vec<BallotRecord> = ballots()
            .into_iter()
            .filter(|b| !["975", "XX", "99"].contains(&b.department_code.as_str()))
            .collect();
        let input: u64 = clean.iter().map(|b| b.counts.registered).sum();
        let output: u64 = run(&clean).iter().map(|r| r.counts.registered).sum();
        assert_eq!(input, output);
    }

    #[test]
    fn pipeline_is_idempotent() {
        let first = run(&ballots());
        let second = run(&ballots());
        assert_eq!(as_set(&first), as_set(&second));
    }

    #[test]
    fn ratio_bounds() {
        let results = run(&ballots());
        let geometry: Vec<GeometryRecord> = results.iter().map(|r| square(&r.name_reg)).collect();
        for m in compute_ratio_map(&results, &geometry) {
            assert!(m.result.counts.expressed() > 0);
            let ratio = m.ratio.unwrap();
            assert!((0.0..=1.0).contains(&ratio));
        }
    }

    #[test]
    fn zero_expressed_ballots_give_undefined_ratio() {
        let results = vec![RegionResult {
            code_reg: "R0".to_string(),
            name_reg: "Empty".to_string(),
            counts: BallotCounts {
                registered: 10,
                abstentions: 8,
                null_votes: 2,
                choice_a: 0,
                choice_b: 0,
            },
        }];
        let map = compute_ratio_map(&results, &[square("Empty")]);
        assert_eq!(map.len(), 1);
        assert_eq!(map[0].ratio, None);

        let all_b = BallotCounts {
            choice_b: 3,
            ..BallotCounts::EMPTY
        };
        assert_eq!(all_b.choice_a_ratio(), Some(0.0));
    }

    #[test]
    fn geometry_is_matched_on_exact_name() {
        let results = vec![
            RegionResult {
                code_reg: "84".to_string(),
                name_reg: "Auvergne-Rhône-Alpes".to_string(),
                counts: BallotCounts {
                    choice_a: 1,
                    choice_b: 3,
                    ..BallotCounts::EMPTY
                },
            },
            RegionResult {
                code_reg: "11".to_string(),
                name_reg: "Île-de-France".to_string(),
                counts: BallotCounts {
                    choice_a: 1,
                    choice_b: 1,
                    ..BallotCounts::EMPTY
                },
            },
        ];
        // Accent and case differences do not match.
        let geometry = vec![square("Auvergne-Rhone-Alpes"), square("Île-de-France")];
        let map = compute_ratio_map(&results, &geometry);
        assert_eq!(map.len(), 2);

        let idf = map.iter().find(|m| m.result.code_reg == "11").unwrap();
        assert!(idf.boundary.is_some());
        assert_eq!(idf.ratio, Some(0.5));

        let ara = map.iter().find(|m| m.result.code_reg == "84").unwrap();
        assert!(ara.boundary.is_none());
        assert_eq!(ara.ratio, Some(0.25));
    }

    #[test]
    fn blank_department_code_is_never_a_key() {
        init();
        let areas = merge_areas(&[region("R1", "Alpha")], &[department("", "", "R1")]);
        assert_eq!(areas[0].code_dep, None);
        assert_eq!(areas[0].name_dep, None);
        assert!(!areas[0].is_complete());

        let joined = join_ballots(&[ballot("0", [5, 1, 0, 2, 2])], &areas);
        assert!(joined.records.is_empty());
        assert_eq!(joined.dropped.len(), 1);
        assert!(aggregate_by_region(&joined.records).is_empty());
    }

    #[test]
    fn areas_with_an_empty_field_receive_no_ballot() {
        init();
        let regions = vec![region("R1", ""), region("R2", "Beta"), region("", "Nameless")];
        let departments = vec![
            // blank region name
            department("01", "One", "R1"),
            // blank department name
            department("02", "  ", "R2"),
            // blank department code
            department("", "Three", "R2"),
            // blank region code, does not match the region without code
            department("04", "Four", ""),
            department("05", "Five", "R2"),
        ];
        let areas = merge_areas(&regions, &departments);
        assert_eq!(areas.len(), departments.len());
        assert_eq!(areas.iter().filter(|a| a.is_complete()).count(), 1);

        let ballots = vec![
            ballot("1", [10, 1, 1, 4, 4]),
            ballot("2", [10, 1, 1, 4, 4]),
            ballot("00", [10, 1, 1, 4, 4]),
            ballot("4", [10, 1, 1, 4, 4]),
            ballot("5", [20, 2, 2, 10, 6]),
        ];
        let joined = join_ballots(&ballots, &areas);
        assert_eq!(joined.dropped.len(), 4);
        assert_eq!(joined.records.len(), 1);
        assert_eq!(joined.records[0].name_dep, "Five");

        let results = aggregate_by_region(&joined.records);
        assert_eq!(
            results,
            vec![RegionResult {
                code_reg: "R2".to_string(),
                name_reg: "Beta".to_string(),
                counts: ballots[4].counts,
            }]
        );
    }

    #[test]
    fn counts_saturate_instead_of_overflowing() {
        let big = BallotCounts {
            registered: u64::MAX - 1,
            choice_a: u64::MAX,
            ..BallotCounts::EMPTY
        };
        let one = BallotCounts {
            registered: 1,
            choice_a: 1,
            choice_b: 1,
            ..BallotCounts::EMPTY
        };
        assert_eq!(big.checked_add(&one), None);
        assert_eq!(one.checked_add(&one).map(|c| c.registered), Some(2));
        assert_eq!(big.saturating_add(&one).registered, u64::MAX);
        assert_eq!(big.saturating_add(&one).choice_a, u64::MAX);
        assert_eq!(big.expressed(), u64::MAX);

        init();
        let areas = merge_areas(&[region("R1", "Alpha")], &[department("01", "One", "R1")]);
        let joined = join_ballots(
            &[
                BallotRecord {
                    department_code: "1".to_string(),
                    counts: big,
                },
                BallotRecord {
                    department_code: "1".to_string(),
                    counts: one,
                },
            ],
            &areas,
        );
        let results = aggregate_by_region(&joined.records);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].counts.registered, u64::MAX);
        assert_eq!(results[0].counts.choice_b, 1);
    }
}
