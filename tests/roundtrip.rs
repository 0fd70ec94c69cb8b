use export_verify::{cli::QuoteStyle, export, verify};
use proptest::prelude::*;
use tempfile::tempdir;

fn cell() -> impl Strategy<Value = String> {
    "[a-z ,\"\r\n]{0,8}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn written_rows_read_back_unchanged(
        rows in prop::collection::vec((cell(), cell()), 0..12),
        always in any::<bool>(),
    ) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let headers = vec!["a".to_string(), "b".to_string()];
        let records = rows
            .iter()
            .map(|(a, b)| vec![a.clone(), b.clone()])
            .collect::<Vec<_>>();
        let style = if always { QuoteStyle::Always } else { QuoteStyle::Necessary };

        let written = export::write_records(&path, &headers, &records, style).unwrap();
        let snapshot = verify::read_snapshot(&path).unwrap();

        prop_assert_eq!(written, records.len());
        prop_assert_eq!(snapshot.row_count(), records.len());
        prop_assert_eq!(snapshot.headers, headers);
        prop_assert_eq!(snapshot.rows, records);
    }

    #[test]
    fn reordering_twice_is_a_no_op(rows in prop::collection::vec((cell(), cell()), 0..6)) {
        let snapshot = verify::CsvSnapshot {
            headers: vec!["b".into(), "a".into()],
            rows: rows.iter().map(|(a, b)| vec![b.clone(), a.clone()]).collect(),
        };
        let order = vec!["a".to_string(), "b".to_string()];
        let once = snapshot.reorder(&order).unwrap();
        let twice = once.reorder(&order).unwrap();
        prop_assert_eq!(once, twice);
    }
}
