//! Group rows by regime label for per-segment descriptive statistics.

use crate::domain::Regime;
use crate::table::MarketTable;

/// Row indices per regime, in canonical regime order, regimes with no rows
/// omitted. Returns None when the table carries no regime column.
pub fn regime_rows(table: &MarketTable, column: &str) -> Option<Vec<(Regime, Vec<usize>)>> {
    let labels = table.category(column)?;
    let mut groups: Vec<(Regime, Vec<usize>)> = Regime::ALL
        .iter()
        .map(|&r| (r, Vec::new()))
        .collect();
    for (i, label) in labels.iter().enumerate() {
        if let Some(regime) = Regime::from_name(label) {
            groups[regime.id()].1.push(i);
        }
    }
    groups.retain(|(_, rows)| !rows.is_empty());
    Some(groups)
}

/// Pick the values at `rows` from a series.
pub fn select(values: &[f64], rows: &[usize]) -> Vec<f64> {
    rows.iter().map(|&i| values[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_table;

    #[test]
    fn groups_rows_by_label() {
        let mut table = make_table(&[100.0, 101.0, 102.0, 103.0]);
        table
            .set_category(
                "regime",
                vec![
                    "Panic".into(),
                    "Trending".into(),
                    "Panic".into(),
                    "Unknown".into(),
                ],
            )
            .unwrap();
        let groups = regime_rows(&table, "regime").unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, Regime::Trending);
        assert_eq!(groups[0].1, vec![1]);
        assert_eq!(groups[1].0, Regime::Panic);
        assert_eq!(groups[1].1, vec![0, 2]);
    }

    #[test]
    fn absent_column_is_none() {
        let table = make_table(&[100.0, 101.0]);
        assert!(regime_rows(&table, "regime").is_none());
    }

    #[test]
    fn select_picks_rows() {
        assert_eq!(select(&[10.0, 20.0, 30.0], &[0, 2]), vec![10.0, 30.0]);
    }
}
