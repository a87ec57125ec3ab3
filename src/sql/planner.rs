//! # Range Planner
//!
//! Folds a conjunction of key comparisons into a single contiguous
//! `[min_key, max_key]` interval, detects conjunctions no row can satisfy,
//! and decides whether the index or a sequential heap scan should drive
//! the query.
//!
//! ## Folding
//!
//! Predicates are folded left-to-right into a running state of an
//! equality key, a lower bound, an upper bound, and a set of not-equals
//! residuals. A new bound replaces the current one only when it is
//! strictly tighter, so feeding the planner the same predicate twice
//! yields the same plan as feeding it once.
//!
//! ## Unsatisfiability
//!
//! After folding, a conjunction is unsatisfiable when the bounds cross,
//! meet with a strict side, leave an empty one-integer gap (`x > k AND
//! x < k+1`), fall off the 32-bit domain (`x > INT_MAX`), or exclude the
//! equality key. Bound arithmetic is widened to `i64` so the gap check
//! cannot itself overflow.
//!
//! ## Strategy
//!
//! The index drives the scan when one exists and either some range or
//! equality predicate mentions the key, or the query is a bare
//! `COUNT(*)` (the index counts entries without touching the heap).
//! Not-equals alone never selects the index — it still scans everything.

use smallvec::SmallVec;

use super::ast::{CompareOp, Predicate, Projection};

/// How the executor should run one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan<'a> {
    /// No row can satisfy the conjunction; the result set is empty.
    Unsat,
    /// Drive the index over `[min_key, max_key]`.
    IndexScan(IndexScanPlan<'a>),
    /// Walk the heap from the first record id.
    TableScan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexScanPlan<'a> {
    pub min_key: i32,
    pub max_key: i32,
    /// Whether each hit requires reading the heap tuple.
    pub need_value: bool,
    /// Key not-equals the range cannot enforce; re-checked per entry.
    pub key_not_equals: SmallVec<[i32; 4]>,
    /// Value comparisons; re-checked per tuple.
    pub value_predicates: SmallVec<[(CompareOp, &'a str); 4]>,
}

#[derive(Debug, Clone, Copy)]
struct Bound {
    key: i32,
    strict: bool,
}

impl Bound {
    fn effective_min(self) -> i64 {
        self.key as i64 + self.strict as i64
    }

    fn effective_max(self) -> i64 {
        self.key as i64 - self.strict as i64
    }
}

pub fn plan<'a>(
    predicates: &[Predicate<'a>],
    projection: Projection,
    index_available: bool,
) -> QueryPlan<'a> {
    let mut eq: Option<i32> = None;
    let mut low: Option<Bound> = None;
    let mut high: Option<Bound> = None;
    let mut not_equals: SmallVec<[i32; 4]> = SmallVec::new();
    let mut value_predicates: SmallVec<[(CompareOp, &'a str); 4]> = SmallVec::new();
    let mut has_range_predicate = false;

    for predicate in predicates {
        match *predicate {
            Predicate::Key(CompareOp::Eq, k) => {
                has_range_predicate = true;
                match eq {
                    Some(existing) if existing != k => return QueryPlan::Unsat,
                    _ => eq = Some(k),
                }
            }
            Predicate::Key(CompareOp::Ne, k) => {
                if eq == Some(k) {
                    return QueryPlan::Unsat;
                }
                not_equals.push(k);
            }
            Predicate::Key(CompareOp::Gt, k) => {
                has_range_predicate = true;
                tighten_low(&mut low, k, true);
            }
            Predicate::Key(CompareOp::Ge, k) => {
                has_range_predicate = true;
                tighten_low(&mut low, k, false);
            }
            Predicate::Key(CompareOp::Lt, k) => {
                has_range_predicate = true;
                tighten_high(&mut high, k, true);
            }
            Predicate::Key(CompareOp::Le, k) => {
                has_range_predicate = true;
                tighten_high(&mut high, k, false);
            }
            Predicate::Value(op, literal) => value_predicates.push((op, literal)),
        }
    }

    if let (Some(l), Some(h)) = (low, high) {
        if l.key > h.key {
            return QueryPlan::Unsat;
        }
        if l.key == h.key && (l.strict || h.strict) {
            return QueryPlan::Unsat;
        }
        if l.strict && h.strict && h.key as i64 - l.key as i64 == 1 {
            return QueryPlan::Unsat;
        }
    }
    if matches!(low, Some(l) if l.strict && l.key == i32::MAX) {
        return QueryPlan::Unsat;
    }
    if matches!(high, Some(h) if h.strict && h.key == i32::MIN) {
        return QueryPlan::Unsat;
    }
    if let Some(e) = eq {
        let min = low.map_or(i32::MIN as i64, Bound::effective_min);
        let max = high.map_or(i32::MAX as i64, Bound::effective_max);
        if (e as i64) < min || (e as i64) > max {
            return QueryPlan::Unsat;
        }
    }

    let count_everything = projection == Projection::Count && predicates.is_empty();
    if !index_available || !(has_range_predicate || count_everything) {
        return QueryPlan::TableScan;
    }

    // strict bounds were cleared of the domain edges above, so the nudge
    // inward cannot overflow
    let (min_key, max_key) = match eq {
        Some(e) => (e, e),
        None => (
            low.map_or(i32::MIN, |l| if l.strict { l.key + 1 } else { l.key }),
            high.map_or(i32::MAX, |h| if h.strict { h.key - 1 } else { h.key }),
        ),
    };

    let need_value = projection.needs_value() || !value_predicates.is_empty();

    QueryPlan::IndexScan(IndexScanPlan {
        min_key,
        max_key,
        need_value,
        key_not_equals: not_equals,
        value_predicates,
    })
}

/// Replaces the lower bound only when the candidate is strictly tighter:
/// `> k` beats `>= k'` iff `k >= k'`, `>= k` beats `> k'` iff `k > k'`,
/// and a same-kind bound must exceed the current key.
fn tighten_low(current: &mut Option<Bound>, key: i32, strict: bool) {
    let replace = match *current {
        None => true,
        Some(c) => match (strict, c.strict) {
            (true, false) => key >= c.key,
            _ => key > c.key,
        },
    };
    if replace {
        *current = Some(Bound { key, strict });
    }
}

fn tighten_high(current: &mut Option<Bound>, key: i32, strict: bool) {
    let replace = match *current {
        None => true,
        Some(c) => match (strict, c.strict) {
            (true, false) => key <= c.key,
            _ => key < c.key,
        },
    };
    if replace {
        *current = Some(Bound { key, strict });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(op: CompareOp, k: i32) -> Predicate<'static> {
        Predicate::Key(op, k)
    }

    fn index_plan<'a>(predicates: &[Predicate<'a>]) -> IndexScanPlan<'a> {
        match plan(predicates, Projection::All, true) {
            QueryPlan::IndexScan(p) => p,
            other => panic!("expected an index scan, got {:?}", other),
        }
    }

    #[test]
    fn no_predicates_without_index_scans_the_table() {
        assert_eq!(plan(&[], Projection::All, false), QueryPlan::TableScan);
        assert_eq!(plan(&[], Projection::All, true), QueryPlan::TableScan);
    }

    #[test]
    fn bare_count_uses_the_index_without_values() {
        let p = match plan(&[], Projection::Count, true) {
            QueryPlan::IndexScan(p) => p,
            other => panic!("expected an index scan, got {:?}", other),
        };
        assert_eq!((p.min_key, p.max_key), (i32::MIN, i32::MAX));
        assert!(!p.need_value);

        assert_eq!(plan(&[], Projection::Count, false), QueryPlan::TableScan);
    }

    #[test]
    fn crossing_bounds_are_unsat() {
        assert_eq!(
            plan(&[key(CompareOp::Gt, 5), key(CompareOp::Lt, 5)], Projection::All, true),
            QueryPlan::Unsat
        );
        assert_eq!(
            plan(&[key(CompareOp::Ge, 6), key(CompareOp::Le, 5)], Projection::All, true),
            QueryPlan::Unsat
        );
    }

    #[test]
    fn one_integer_gap_is_unsat() {
        assert_eq!(
            plan(&[key(CompareOp::Gt, 4), key(CompareOp::Lt, 5)], Projection::All, true),
            QueryPlan::Unsat
        );
        // the same gap with a non-strict side is a single key
        let p = index_plan(&[key(CompareOp::Ge, 5), key(CompareOp::Lt, 6)]);
        assert_eq!((p.min_key, p.max_key), (5, 5));
    }

    #[test]
    fn gap_check_does_not_overflow_at_domain_edges() {
        let p = index_plan(&[key(CompareOp::Gt, i32::MIN), key(CompareOp::Lt, i32::MAX)]);
        assert_eq!((p.min_key, p.max_key), (i32::MIN + 1, i32::MAX - 1));
    }

    #[test]
    fn strict_bounds_at_domain_edges_are_unsat() {
        assert_eq!(
            plan(&[key(CompareOp::Gt, i32::MAX)], Projection::All, true),
            QueryPlan::Unsat
        );
        assert_eq!(
            plan(&[key(CompareOp::Lt, i32::MIN)], Projection::All, true),
            QueryPlan::Unsat
        );
    }

    #[test]
    fn conflicting_equalities_are_unsat() {
        assert_eq!(
            plan(&[key(CompareOp::Eq, 3), key(CompareOp::Eq, 4)], Projection::All, true),
            QueryPlan::Unsat
        );

        let p = index_plan(&[key(CompareOp::Eq, 3), key(CompareOp::Eq, 3)]);
        assert_eq!((p.min_key, p.max_key), (3, 3));
    }

    #[test]
    fn not_equal_against_the_equality_key_is_unsat() {
        assert_eq!(
            plan(&[key(CompareOp::Eq, 3), key(CompareOp::Ne, 3)], Projection::All, true),
            QueryPlan::Unsat
        );
    }

    #[test]
    fn equality_outside_the_bounds_is_unsat() {
        assert_eq!(
            plan(&[key(CompareOp::Eq, 5), key(CompareOp::Gt, 10)], Projection::All, true),
            QueryPlan::Unsat
        );
        let p = index_plan(&[
            key(CompareOp::Eq, 15),
            key(CompareOp::Gt, 10),
            key(CompareOp::Lt, 20),
        ]);
        assert_eq!((p.min_key, p.max_key), (15, 15));
    }

    #[test]
    fn lower_bounds_tighten_per_strictness() {
        let p = index_plan(&[key(CompareOp::Gt, 5), key(CompareOp::Gt, 10)]);
        assert_eq!(p.min_key, 11);

        // GT 9 does not beat GE 10 (same effective bound, GE already set)
        let p = index_plan(&[key(CompareOp::Ge, 10), key(CompareOp::Gt, 9)]);
        assert_eq!(p.min_key, 10);

        // GE 10 beats GT 9
        let p = index_plan(&[key(CompareOp::Gt, 9), key(CompareOp::Ge, 10)]);
        assert_eq!(p.min_key, 10);

        // GT 10 beats GE 10
        let p = index_plan(&[key(CompareOp::Ge, 10), key(CompareOp::Gt, 10)]);
        assert_eq!(p.min_key, 11);
    }

    #[test]
    fn upper_bounds_tighten_per_strictness() {
        let p = index_plan(&[key(CompareOp::Le, 20), key(CompareOp::Lt, 15)]);
        assert_eq!(p.max_key, 14);

        let p = index_plan(&[key(CompareOp::Le, 14), key(CompareOp::Lt, 15)]);
        assert_eq!(p.max_key, 14);

        let p = index_plan(&[key(CompareOp::Lt, 15), key(CompareOp::Le, 14)]);
        assert_eq!(p.max_key, 14);
    }

    #[test]
    fn not_equals_alone_never_selects_the_index() {
        assert_eq!(
            plan(&[key(CompareOp::Ne, 5)], Projection::All, true),
            QueryPlan::TableScan
        );
    }

    #[test]
    fn not_equals_ride_along_as_residuals() {
        let p = index_plan(&[
            key(CompareOp::Ge, 0),
            key(CompareOp::Ne, 5),
            key(CompareOp::Ne, 7),
        ]);
        assert_eq!(p.min_key, 0);
        assert_eq!(p.key_not_equals.as_slice(), &[5, 7]);
    }

    #[test]
    fn value_predicates_alone_scan_the_table() {
        let preds = [Predicate::Value(CompareOp::Eq, "x")];
        assert_eq!(plan(&preds, Projection::All, true), QueryPlan::TableScan);
    }

    #[test]
    fn value_predicates_force_heap_reads_on_index_scans() {
        let preds = [
            Predicate::Key(CompareOp::Ge, 10),
            Predicate::Key(CompareOp::Le, 20),
            Predicate::Value(CompareOp::Ne, "x"),
        ];
        let p = match plan(&preds, Projection::Count, true) {
            QueryPlan::IndexScan(p) => p,
            other => panic!("expected an index scan, got {:?}", other),
        };
        assert_eq!((p.min_key, p.max_key), (10, 20));
        assert!(p.need_value);
        assert_eq!(p.value_predicates.as_slice(), &[(CompareOp::Ne, "x")]);
    }

    #[test]
    fn key_only_projections_skip_heap_reads() {
        let p = index_plan(&[key(CompareOp::Ge, 10)]);
        assert!(p.need_value); // Projection::All needs the value

        let preds = [key(CompareOp::Ge, 10)];
        let p = match plan(&preds, Projection::Key, true) {
            QueryPlan::IndexScan(p) => p,
            other => panic!("expected an index scan, got {:?}", other),
        };
        assert!(!p.need_value);
    }

    #[test]
    fn planning_is_idempotent() {
        let once = [key(CompareOp::Gt, 5), key(CompareOp::Le, 30)];
        let twice = [
            key(CompareOp::Gt, 5),
            key(CompareOp::Le, 30),
            key(CompareOp::Gt, 5),
            key(CompareOp::Le, 30),
        ];
        assert_eq!(
            plan(&once, Projection::All, true),
            plan(&twice, Projection::All, true)
        );
    }

    #[test]
    fn folded_range_agrees_with_direct_evaluation() {
        let cases: Vec<Vec<Predicate<'static>>> = vec![
            vec![key(CompareOp::Gt, -3), key(CompareOp::Le, 4)],
            vec![key(CompareOp::Ge, 0), key(CompareOp::Lt, 1)],
            vec![key(CompareOp::Eq, 2), key(CompareOp::Ge, -5)],
            vec![key(CompareOp::Gt, 1), key(CompareOp::Gt, 3), key(CompareOp::Lt, 9)],
            vec![key(CompareOp::Ge, -8), key(CompareOp::Ne, 0), key(CompareOp::Le, 8)],
            vec![key(CompareOp::Lt, -9), key(CompareOp::Gt, 9)],
            vec![key(CompareOp::Gt, 4), key(CompareOp::Lt, 5)],
        ];

        for predicates in &cases {
            let planned = plan(predicates, Projection::Key, true);
            for candidate in -20..=20 {
                let direct = predicates.iter().all(|p| p.matches(candidate, ""));
                let via_plan = match &planned {
                    QueryPlan::Unsat => false,
                    QueryPlan::IndexScan(p) => {
                        candidate >= p.min_key
                            && candidate <= p.max_key
                            && !p.key_not_equals.contains(&candidate)
                    }
                    QueryPlan::TableScan => direct,
                };
                assert_eq!(
                    direct, via_plan,
                    "{:?} disagrees on key {}",
                    predicates, candidate
                );
            }
        }
    }
}
