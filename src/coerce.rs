//! Type-normalization pass applied to a snapshot before it is written.
//!
//! Each column is cast to the category its declared type maps to (see
//! [`TypeCategory::from_declared`]). Numeric casts are best effort: a value
//! that cannot be cast is kept as it was and counted as a fallback. Datetime
//! parsing is strict: unparseable values become missing and are counted as
//! failures. Every outcome lands in a per-column [`ColumnCoercion`].

use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{TableSchema, TableSnapshot, TypeCategory},
    data::{Value, parse_naive_datetime},
};

/// Outcome of casting a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum Coercion {
    /// Already of the target type (or missing).
    Unchanged(Option<Value>),
    /// Converted to the target type.
    Converted(Value),
    /// Could not be converted; the original value is kept.
    Fallback(Value),
    /// Could not be converted; the value becomes missing.
    Failed,
}

impl Coercion {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Coercion::Unchanged(value) => value,
            Coercion::Converted(value) | Coercion::Fallback(value) => Some(value),
            Coercion::Failed => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnCoercion {
    pub column: String,
    pub declared_type: String,
    pub category: Option<TypeCategory>,
    pub unchanged: usize,
    pub converted: usize,
    pub fallbacks: usize,
    pub failures: usize,
    /// First value that fell back or failed, kept for the log line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_problem: Option<String>,
}

impl ColumnCoercion {
    fn record(&mut self, outcome: &Coercion, original: Option<&Value>) {
        match outcome {
            Coercion::Unchanged(_) => self.unchanged += 1,
            Coercion::Converted(_) => self.converted += 1,
            Coercion::Fallback(_) => self.fallbacks += 1,
            Coercion::Failed => self.failures += 1,
        }
        if matches!(outcome, Coercion::Fallback(_) | Coercion::Failed)
            && self.first_problem.is_none()
        {
            self.first_problem = original.map(Value::as_display);
        }
    }

    pub fn has_problems(&self) -> bool {
        self.fallbacks > 0 || self.failures > 0
    }
}

/// Casts one value to `category`.
pub fn coerce_value(value: Option<Value>, category: TypeCategory) -> Coercion {
    let Some(value) = value else {
        return Coercion::Unchanged(None);
    };
    match category {
        TypeCategory::Integer => to_integer(value),
        TypeCategory::Float => to_float(value),
        TypeCategory::DateTime => to_datetime(value),
        TypeCategory::Text => Coercion::Unchanged(Some(value)),
    }
}

fn to_integer(value: Value) -> Coercion {
    match value {
        Value::Integer(_) => Coercion::Unchanged(Some(value)),
        Value::Float(f)
            if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 =>
        {
            Coercion::Converted(Value::Integer(f as i64))
        }
        Value::Text(ref s) => match s.trim().parse::<i64>() {
            Ok(parsed) => Coercion::Converted(Value::Integer(parsed)),
            Err(_) => Coercion::Fallback(value),
        },
        other => Coercion::Fallback(other),
    }
}

fn to_float(value: Value) -> Coercion {
    match value {
        Value::Float(_) => Coercion::Unchanged(Some(value)),
        Value::Integer(i) => Coercion::Converted(Value::Float(i as f64)),
        Value::Text(ref s) => match s.trim().parse::<f64>() {
            Ok(parsed) => Coercion::Converted(Value::Float(parsed)),
            Err(_) => Coercion::Fallback(value),
        },
        other => Coercion::Fallback(other),
    }
}

fn to_datetime(value: Value) -> Coercion {
    match value {
        Value::DateTime(_) => Coercion::Unchanged(Some(value)),
        Value::Text(ref s) => match parse_naive_datetime(s) {
            Ok(parsed) => Coercion::Converted(Value::DateTime(parsed)),
            Err(_) => Coercion::Failed,
        },
        _ => Coercion::Failed,
    }
}

/// Normalizes every column of `snapshot` in place. Columns the schema does
/// not know are left untouched.
pub fn normalize_snapshot(
    table: &str,
    schema: &TableSchema,
    snapshot: &mut TableSnapshot,
) -> Vec<ColumnCoercion> {
    let mut reports = snapshot
        .headers
        .iter()
        .map(|header| {
            let declared = schema.column(header);
            ColumnCoercion {
                column: header.clone(),
                declared_type: declared.map(|c| c.declared_type.clone()).unwrap_or_default(),
                category: declared.map(|c| c.category()),
                ..ColumnCoercion::default()
            }
        })
        .collect::<Vec<_>>();

    for row in &mut snapshot.rows {
        for (idx, cell) in row.iter_mut().enumerate() {
            let Some(report) = reports.get_mut(idx) else {
                continue;
            };
            let Some(category) = report.category else {
                continue;
            };
            let original = cell.take();
            let outcome = coerce_value(original.clone(), category);
            report.record(&outcome, original.as_ref());
            *cell = outcome.into_value();
        }
    }

    for report in reports.iter().filter(|r| r.has_problems()) {
        warn!(
            "Table '{}' column '{}' ({}): {} value(s) kept uncast, {} value(s) set missing (first: {:?})",
            table,
            report.column,
            report.declared_type,
            report.fallbacks,
            report.failures,
            report.first_problem.as_deref().unwrap_or("")
        );
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnDef;
    use chrono::NaiveDate;

    fn text(value: &str) -> Option<Value> {
        Some(Value::Text(value.to_string()))
    }

    #[test]
    fn integer_cast_is_best_effort() {
        assert_eq!(
            coerce_value(text(" 42 "), TypeCategory::Integer),
            Coercion::Converted(Value::Integer(42))
        );
        assert_eq!(
            coerce_value(Some(Value::Float(7.0)), TypeCategory::Integer),
            Coercion::Converted(Value::Integer(7))
        );
        assert_eq!(
            coerce_value(Some(Value::Float(7.5)), TypeCategory::Integer),
            Coercion::Fallback(Value::Float(7.5))
        );
        assert_eq!(
            coerce_value(text("POINT(1 2)"), TypeCategory::Integer),
            Coercion::Fallback(Value::Text("POINT(1 2)".into()))
        );
    }

    #[test]
    fn float_cast_handles_decimal_text() {
        assert_eq!(
            coerce_value(text("19.99"), TypeCategory::Float),
            Coercion::Converted(Value::Float(19.99))
        );
        assert_eq!(
            coerce_value(Some(Value::Integer(3)), TypeCategory::Float),
            Coercion::Converted(Value::Float(3.0))
        );
        assert_eq!(
            coerce_value(text("n/a"), TypeCategory::Float),
            Coercion::Fallback(Value::Text("n/a".into()))
        );
    }

    #[test]
    fn unparseable_datetime_becomes_missing() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(
            coerce_value(text("2024-01-05 10:00:00"), TypeCategory::DateTime),
            Coercion::Converted(Value::DateTime(expected))
        );
        assert_eq!(
            coerce_value(text("0000-00-00 00:00:00"), TypeCategory::DateTime),
            Coercion::Failed
        );
        assert_eq!(
            coerce_value(Some(Value::Integer(5)), TypeCategory::DateTime),
            Coercion::Failed
        );
    }

    #[test]
    fn missing_values_stay_missing_for_every_category() {
        for category in [
            TypeCategory::Integer,
            TypeCategory::Float,
            TypeCategory::DateTime,
            TypeCategory::Text,
        ] {
            assert_eq!(coerce_value(None, category), Coercion::Unchanged(None));
        }
    }

    #[test]
    fn normalize_snapshot_collects_per_column_counts() {
        let schema = TableSchema::new(vec![
            ColumnDef::new("id", "int(11)"),
            ColumnDef::new("total", "decimal(10,2)"),
            ColumnDef::new("created_at", "datetime"),
        ]);
        let mut snapshot = TableSnapshot::new(vec![
            "id".into(),
            "total".into(),
            "created_at".into(),
            "extra".into(),
        ]);
        snapshot.rows = vec![
            vec![
                Some(Value::Integer(1)),
                text("10.50"),
                text("2024-01-05 10:00:00"),
                text("x"),
            ],
            vec![Some(Value::Integer(2)), None, text("garbage"), None],
        ];

        let reports = normalize_snapshot("orders", &schema, &mut snapshot);
        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].unchanged, 2);
        assert_eq!(reports[1].converted, 1);
        assert_eq!(reports[1].unchanged, 1);
        assert_eq!(reports[2].failures, 1);
        assert_eq!(reports[2].first_problem.as_deref(), Some("garbage"));
        assert!(reports[3].category.is_none());

        assert_eq!(snapshot.rows[0][1], Some(Value::Float(10.5)));
        assert_eq!(snapshot.rows[1][1], None);
        assert_eq!(snapshot.rows[1][2], None);
        assert_eq!(snapshot.rows[0][3], text("x"));
    }
}
