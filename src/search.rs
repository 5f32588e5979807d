//! Tester search: who has found the most bugs on a set of devices.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;

use diesel::sqlite::SqliteConnection;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::models::Experience;
use crate::store;

/// Country restriction for a search. `ALL` disables the restriction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryFilter {
    All,
    Code(String),
}

impl CountryFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("ALL") {
            return Some(CountryFilter::All);
        }
        country_code(raw).map(CountryFilter::Code)
    }

    fn code(&self) -> Option<&str> {
        match self {
            CountryFilter::All => None,
            CountryFilter::Code(code) => Some(code),
        }
    }
}

impl fmt::Display for CountryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountryFilter::All => f.write_str("ALL"),
            CountryFilter::Code(code) => f.write_str(code),
        }
    }
}

/// Two ASCII letters, uppercased.
pub fn country_code(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() == 2 && raw.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(raw.to_ascii_uppercase())
    } else {
        None
    }
}

/// Parse the comma separated device list used in result URLs (`1,2,7`).
/// Repeated ids are dropped, first occurrence wins.
pub fn parse_device_list(raw: &str) -> Option<Vec<i32>> {
    let mut ids = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = part.parse::<i32>().ok()?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Some(ids)
}

pub fn format_device_list(ids: &[i32]) -> String {
    ids.iter().map(i32::to_string).collect::<Vec<_>>().join(",")
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    /// tester id -> bugs summed over every matching experience row
    pub totals: HashMap<i32, i64>,
    /// tester id -> the rows that made up the total
    pub experiences: HashMap<i32, Vec<Experience>>,
    /// tester ids, most bugs first; equal totals by ascending id
    pub ordering: Vec<i32>,
}

/// Fold experience rows into per-tester totals and rank the testers.
pub fn aggregate<I>(rows: I) -> SearchResults
where
    I: IntoIterator<Item = Experience>,
{
    let mut results = SearchResults::default();

    for exp in rows {
        let tester = exp.tester_id;
        *results.totals.entry(tester).or_insert(0) += i64::from(exp.bugs);
        results.experiences.entry(tester).or_default().push(exp);
    }

    let mut ordering: Vec<i32> = results.totals.keys().copied().collect();
    ordering.sort_by_key(|id| (Reverse(results.totals[id]), *id));
    results.ordering = ordering;

    results
}

/// Run a search against the store, one device at a time.
pub fn search(
    conn: &mut SqliteConnection,
    country: &CountryFilter,
    device_ids: &[i32],
) -> Result<SearchResults> {
    let mut rows = Vec::new();
    for &device_id in device_ids {
        let found = store::experiences_for_device(conn, device_id, country.code())?;
        rows.extend(found);
    }
    debug!(%country, devices = device_ids.len(), rows = rows.len(), "Search rows loaded");
    Ok(aggregate(rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::lifecycle;
    use crate::models::Pair;
    use crate::store::fixtures;

    fn exp(id: i32, tester_id: i32, device_id: i32, bugs: i32) -> Experience {
        Experience {
            id,
            device_id,
            tester_id,
            bugs,
        }
    }

    #[test]
    fn sums_bugs_across_devices() {
        let results = aggregate(vec![exp(1, 5, 1, 3), exp(2, 5, 2, 2), exp(3, 7, 1, 1)]);

        assert_eq!(results.totals, HashMap::from([(5, 5), (7, 1)]));
        assert_eq!(results.ordering, vec![5, 7]);
        assert_eq!(results.experiences[&5].len(), 2);
        assert_eq!(results.experiences[&7], vec![exp(3, 7, 1, 1)]);
    }

    #[test]
    fn totals_match_contributing_rows() {
        let rows = vec![
            exp(1, 1, 1, 4),
            exp(2, 2, 1, 9),
            exp(3, 1, 2, 6),
            exp(4, 3, 3, 0),
            exp(5, 1, 3, 1),
        ];
        let results = aggregate(rows);

        for (tester, total) in &results.totals {
            let sum: i64 = results.experiences[tester]
                .iter()
                .map(|e| i64::from(e.bugs))
                .sum();
            assert_eq!(*total, sum);
        }
        assert_eq!(results.ordering, vec![1, 2, 3]);
    }

    #[test]
    fn equal_totals_rank_by_tester_id() {
        let results = aggregate(vec![exp(1, 9, 1, 2), exp(2, 4, 1, 2), exp(3, 6, 1, 5)]);
        assert_eq!(results.ordering, vec![6, 4, 9]);
    }

    #[test]
    fn no_rows_no_results() {
        let results = aggregate(Vec::new());
        assert!(results.ordering.is_empty());
        assert!(results.totals.is_empty());
    }

    #[test]
    fn country_filter_parsing() {
        assert_eq!(CountryFilter::parse("ALL"), Some(CountryFilter::All));
        assert_eq!(CountryFilter::parse("all"), Some(CountryFilter::All));
        assert_eq!(CountryFilter::parse("us"), Some(CountryFilter::Code("US".into())));
        assert_eq!(CountryFilter::parse("USA"), None);
        assert_eq!(CountryFilter::parse("1A"), None);
        assert_eq!(CountryFilter::Code("GB".into()).to_string(), "GB");
    }

    #[test]
    fn device_list_parsing() {
        assert_eq!(parse_device_list("1,2,7"), Some(vec![1, 2, 7]));
        assert_eq!(parse_device_list("2, 2,1"), Some(vec![2, 1]));
        assert_eq!(parse_device_list(""), Some(vec![]));
        assert_eq!(parse_device_list("1,x"), None);
        assert_eq!(format_device_list(&[3, 1]), "3,1");
    }

    #[test]
    fn search_respects_country_and_devices() {
        let mut conn = test_connection();
        let iphone = fixtures::device(&mut conn, "iPhone 4");
        let galaxy = fixtures::device(&mut conn, "Galaxy S3");
        let nexus = fixtures::device(&mut conn, "Nexus 4");
        let ann = fixtures::tester(&mut conn, "Ann", "US");
        let bob = fixtures::tester(&mut conn, "Bob", "GB");

        let file = |conn: &mut SqliteConnection, device_id, tester_id, times| {
            let pair = Pair::new(device_id, tester_id);
            for _ in 0..times {
                lifecycle::add_bug(conn, pair).unwrap();
            }
        };
        file(&mut conn, iphone.id, ann.id, 3);
        file(&mut conn, galaxy.id, ann.id, 2);
        file(&mut conn, iphone.id, bob.id, 4);
        file(&mut conn, nexus.id, bob.id, 9);

        let devices = [iphone.id, galaxy.id];
        let all = search(&mut conn, &CountryFilter::All, &devices).unwrap();
        assert_eq!(all.totals, HashMap::from([(ann.id, 5), (bob.id, 4)]));
        assert_eq!(all.ordering, vec![ann.id, bob.id]);

        let gb_only = CountryFilter::Code("GB".into());
        let gb = search(&mut conn, &gb_only, &devices).unwrap();
        assert_eq!(gb.totals, HashMap::from([(bob.id, 4)]));
        for tester in gb.totals.keys() {
            assert!(all.totals.contains_key(tester));
        }

        let fr_only = CountryFilter::Code("FR".into());
        let nobody = search(&mut conn, &fr_only, &devices).unwrap();
        assert!(nobody.ordering.is_empty());

        let none = search(&mut conn, &CountryFilter::All, &[]).unwrap();
        assert!(none.ordering.is_empty());
    }
}
