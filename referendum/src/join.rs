//! The join primitive shared by the pipeline stages.

use std::collections::HashMap;
use std::hash::Hash;

/// The rows produced by a join, and the left rows that produced none.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct JoinOutcome<M, L> {
    pub matched: Vec<M>,
    pub unmatched: Vec<L>,
}

/// Inner join of `left` and `right`, keeping track of the left rows that did
/// not survive.
///
/// A missing key (`None`) never matches. `combine` may also reject a pair by
/// returning `None`, which is how rows with missing fields are dropped. A left
/// row matching several right rows yields one row per match. The matched rows
/// follow the order of `left`.
pub fn inner_join<'a, L, R, K, M, FL, FR, FC>(
    left: &'a [L],
    right: &'a [R],
    left_key: FL,
    right_key: FR,
    combine: FC,
) -> JoinOutcome<M, L>
where
    L: Clone,
    K: Eq + Hash,
    FL: Fn(&'a L) -> Option<K>,
    FR: Fn(&'a R) -> Option<K>,
    FC: Fn(&'a L, &'a R) -> Option<M>,
{
    let mut index: HashMap<K, Vec<&'a R>> = HashMap::new();
    for r in right.iter() {
        if let Some(k) = right_key(r) {
            index.entry(k).or_default().push(r);
        }
    }

    let mut matched: Vec<M> = Vec::new();
    let mut unmatched: Vec<L> = Vec::new();
    for l in left.iter() {
        let rows: Vec<M> = match left_key(l).and_then(|k| index.get(&k)) {
            Some(candidates) => candidates.iter().filter_map(|&r| combine(l, r)).collect(),
            None => Vec::new(),
        };
        if rows.is_empty() {
            unmatched.push(l.clone());
        } else {
            matched.extend(rows);
        }
    }
    JoinOutcome { matched, unmatched }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs<'a>(
        left: &'a [(u32, &'a str)],
        right: &'a [(u32, &'a str)],
    ) -> JoinOutcome<String, (u32, &'a str)> {
        inner_join(
            left,
            right,
            |l| Some(l.0),
            |r| Some(r.0),
            |l, r| Some(format!("{}-{}", l.1, r.1)),
        )
    }

    #[test]
    fn keeps_unmatched_left_rows() {
        let left = [(1, "a"), (2, "b"), (3, "c")];
        let right = [(1, "x"), (3, "z")];
        let res = pairs(&left, &right);
        assert_eq!(res.matched, vec!["a-x".to_string(), "c-z".to_string()]);
        assert_eq!(res.unmatched, vec![(2, "b")]);
    }

    #[test]
    fn one_row_per_match() {
        let left = [(1, "a")];
        let right = [(1, "x"), (1, "y")];
        let res = pairs(&left, &right);
        assert_eq!(res.matched, vec!["a-x".to_string(), "a-y".to_string()]);
        assert!(res.unmatched.is_empty());
    }

    #[test]
    fn missing_keys_and_rejected_pairs_are_unmatched() {
        let left: [(Option<u32>, &str); 3] = [(None, "a"), (Some(1), "b"), (Some(2), "c")];
        let right: [(u32, Option<&str>); 2] = [(1, None), (2, Some("z"))];
        let res = inner_join(
            &left,
            &right,
            |l| l.0,
            |r| Some(r.0),
            |l, r| r.1.map(|s| format!("{}-{}", l.1, s)),
        );
        assert_eq!(res.matched, vec!["c-z".to_string()]);
        assert_eq!(res.unmatched, vec![(None, "a"), (Some(1), "b")]);
    }

    #[test]
    fn empty_right_side() {
        let left = [(1, "a")];
        let res = pairs(&left, &[]);
        assert!(res.matched.is_empty());
        assert_eq!(res.unmatched.len(), 1);
    }
}
