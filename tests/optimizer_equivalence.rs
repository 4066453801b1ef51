//! The optimizer must never change query results, only plan shape.

use raql::catalog::Catalog;
use raql::execution::ExecutionContext;
use raql::table::Table;
use raql::value::Value;

fn load_catalog() -> Catalog {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/uni");
    Catalog::load_dir(dir).unwrap()
}

fn sorted_rows(table: &Table) -> Vec<String> {
    let mut rows: Vec<String> = table.rows().iter().map(|r| format!("{:?}", r)).collect();
    rows.sort();
    rows
}

const QUERY_CORPUS: &[&str] = &[
    "studenten",
    "pi Name, Semester studenten",
    "pi distinct Semester studenten",
    "sigma Semester > 4 studenten",
    "sigma Semester > 4 and MatrNr < 28000 studenten",
    "sigma 1 = 1 studenten",
    "pi Name sigma Semester > 4 studenten",
    "sigma studenten.Semester > 4 (studenten join studenten.MatrNr = hoeren.MatrNr hoeren)",
    "sigma hoeren.VorlNr = 5001 (studenten join studenten.MatrNr = hoeren.MatrNr hoeren)",
    "sigma VorlNr = 5041 (studenten natural left join hoeren)",
    "studenten hash join studenten.MatrNr = hoeren.MatrNr hoeren",
    "sigma MatrNr > 27000 ((pi MatrNr studenten) union (pi MatrNr hoeren))",
    "gamma Boss aggregate total as sum(PersNr) assistenten",
    "tau Semester studenten",
    "sigma Semester > 4 tau Semester studenten",
    "pi Name sigma Rang > \"C3\" professoren",
];

#[test]
fn test_optimized_plans_return_identical_rows() {
    let optimized = ExecutionContext::new(load_catalog());
    let unoptimized = ExecutionContext::new(load_catalog()).with_optimization(false);

    for query in QUERY_CORPUS {
        let fast = optimized.query_one(query).unwrap();
        let slow = unoptimized.query_one(query).unwrap();
        assert_eq!(
            sorted_rows(&fast.table),
            sorted_rows(&slow.table),
            "results diverge for: {}",
            query
        );
        assert_eq!(
            fast.table.schema().column_names(),
            slow.table.schema().column_names(),
            "schemas diverge for: {}",
            query
        );
        assert_eq!(
            fast.table.schema().column_types(),
            slow.table.schema().column_types(),
            "column types diverge for: {}",
            query
        );
    }
}

fn explain_lines(ctx: &ExecutionContext, query: &str) -> Vec<String> {
    ctx.query_one(&format!("explain {}", query))
        .unwrap()
        .table
        .rows()
        .iter()
        .map(|row| row[0].to_string())
        .collect()
}

#[test]
fn test_index_seek_substitution_is_visible_in_explain() {
    let mut ctx = ExecutionContext::new(load_catalog());
    ctx.create_index("studenten", "MatrNr").unwrap();

    let lines = explain_lines(&ctx, "sigma MatrNr = 26120 studenten");
    assert_eq!(
        lines,
        vec!["IndexSeek(table=studenten, column=MatrNr, key=26120)"]
    );

    // result matches the plain scan
    let result = ctx.query_one("sigma MatrNr = 26120 studenten").unwrap();
    assert_eq!(result.table.row_count(), 1);
    assert_eq!(result.table.rows()[0][1], Value::Varchar("Fichte".to_string()));
}

#[test]
fn test_selection_is_pushed_below_projection() {
    let ctx = ExecutionContext::new(load_catalog());
    let lines = explain_lines(&ctx, "sigma Semester > 4 pi Name, Semester studenten");
    assert_eq!(
        lines,
        vec![
            "Projection(columns=[Name, Semester])",
            "->Selection(condition=Semester > 4)",
            "--->TableScan(table=studenten)",
        ]
    );
}

#[test]
fn test_conjunction_is_split_and_pushed_into_join() {
    let ctx = ExecutionContext::new(load_catalog());
    let lines = explain_lines(
        &ctx,
        "sigma studenten.Semester > 4 and hoeren.VorlNr = 5001 \
         (studenten join studenten.MatrNr = hoeren.MatrNr hoeren)",
    );
    assert_eq!(
        lines,
        vec![
            "NestedLoopsJoin(type=INNER, condition=studenten.MatrNr = hoeren.MatrNr)",
            "->Selection(condition=studenten.Semester > 4)",
            "--->TableScan(table=studenten)",
            "->Selection(condition=hoeren.VorlNr = 5001)",
            "--->TableScan(table=hoeren)",
        ]
    );
}

#[test]
fn test_tautology_is_simplified_away() {
    let ctx = ExecutionContext::new(load_catalog());
    let lines = explain_lines(&ctx, "sigma 1 = 1 studenten");
    assert_eq!(lines, vec!["TableScan(table=studenten)"]);
}
