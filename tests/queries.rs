//! End-to-end queries against the university fixture tables.

use raql::catalog::Catalog;
use raql::error::QueryError;
use raql::execution::ExecutionContext;
use raql::table::Table;
use raql::value::Value;

fn context() -> ExecutionContext {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/uni");
    ExecutionContext::new(Catalog::load_dir(dir).unwrap())
}

fn run(query: &str) -> Table {
    context().query_one(query).unwrap().table
}

fn sorted_rows(table: &Table) -> Vec<String> {
    let mut rows: Vec<String> = table.rows().iter().map(|r| format!("{:?}", r)).collect();
    rows.sort();
    rows
}

#[test]
fn test_meta_tables_list_every_relation() {
    let table = run("#tables");
    let names: Vec<String> = table.rows().iter().map(|r| r[0].to_string()).collect();
    assert_eq!(
        names,
        vec![
            "#columns",
            "#tables",
            "assistenten",
            "hoeren",
            "professoren",
            "studenten",
            "voraussetzen",
            "vorlesungen",
        ]
    );
}

#[test]
fn test_projection() {
    let table = run("pi Name, Semester studenten");
    assert_eq!(table.row_count(), 8);
    assert_eq!(
        table.schema().column_names(),
        ["studenten.Name", "studenten.Semester"]
    );
}

#[test]
fn test_selection_with_string_comparison() {
    let table = run("sigma Rang > \"C3\" professoren");
    assert_eq!(table.row_count(), 4);
    for row in table.rows() {
        assert_eq!(row[2], Value::Varchar("C4".to_string()));
    }
}

#[test]
fn test_equi_join() {
    let table = run("studenten join studenten.MatrNr = hoeren.MatrNr hoeren");
    assert_eq!(table.row_count(), 10);
    assert_eq!(table.schema().len(), 5);
    for row in table.rows() {
        assert_eq!(row[0], row[3]);
    }
}

#[test]
fn test_natural_left_outer_join_pads_unmatched_rows() {
    let table = run("studenten natural left join hoeren");
    assert_eq!(table.row_count(), 14);
    // the duplicate MatrNr column from the right side is elided
    assert_eq!(table.schema().len(), 4);

    let unmatched: Vec<_> = table
        .rows()
        .iter()
        .filter(|row| row[3] == Value::Null)
        .collect();
    assert_eq!(unmatched.len(), 4);
    assert!(unmatched.iter().any(|row| row[0] == Value::Int(24002)));
}

#[test]
fn test_grouped_aggregation() {
    let table = run("gamma Boss aggregate total as sum(PersNr) assistenten");
    assert_eq!(table.row_count(), 4);
    let sokrates = table
        .rows()
        .iter()
        .find(|row| row[0] == Value::Int(2125))
        .unwrap();
    assert_eq!(sokrates[1], Value::Int(6005));
}

#[test]
fn test_whole_table_aggregation() {
    let table = run("gamma aggregate n as count(PersNr) professoren");
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.rows()[0][0], Value::Int(7));
}

#[test]
fn test_ordering_is_stable() {
    let table = run("tau Semester studenten");
    assert_eq!(table.rows()[0][2], Value::Int(2));
    // both second-semester rows keep their input order
    assert_eq!(table.rows()[0][1], Value::Varchar("Theophrastos".to_string()));
    assert_eq!(table.rows()[1][1], Value::Varchar("Feuerbach".to_string()));
    assert_eq!(table.rows()[7][2], Value::Int(18));
}

#[test]
fn test_distinct_keeps_first_occurrence_order() {
    let table = run("pi distinct Semester studenten");
    assert_eq!(table.row_count(), 7);
    assert_eq!(table.rows()[0][0], Value::Int(18));
    assert_eq!(table.rows()[6][0], Value::Int(2));
}

#[test]
fn test_ordering_is_idempotent() {
    let once = run("tau Semester studenten");
    let twice = run("tau Semester tau Semester studenten");
    assert_eq!(once.rows(), twice.rows());
    assert_eq!(once.schema(), twice.schema());
}

#[test]
fn test_distinct_is_idempotent() {
    let once = run("pi distinct Semester studenten");
    let twice = run("pi distinct Semester (pi distinct Semester studenten)");
    assert_eq!(once.rows(), twice.rows());
    assert_eq!(once.schema(), twice.schema());
}

#[test]
fn test_cross_join_cardinality() {
    let table = run("professoren cross join studenten");
    assert_eq!(table.row_count(), 7 * 8);
    assert_eq!(table.schema().len(), 7);
}

#[test]
fn test_union_keeps_duplicates() {
    let table = run("(pi MatrNr studenten) union (pi MatrNr hoeren)");
    assert_eq!(table.row_count(), 18);
}

#[test]
fn test_intersect() {
    let table = run("(pi MatrNr studenten) intersect (pi distinct MatrNr hoeren)");
    assert_eq!(table.row_count(), 4);
}

#[test]
fn test_except() {
    let table = run("(pi MatrNr studenten) except (pi MatrNr hoeren)");
    assert_eq!(table.row_count(), 4);
    for row in table.rows() {
        assert_ne!(row[0], Value::Int(26120));
    }
}

#[test]
fn test_hash_and_merge_join_match_nested_loops() {
    let baseline = run("studenten join studenten.MatrNr = hoeren.MatrNr hoeren");
    let hashed = run("studenten hash join studenten.MatrNr = hoeren.MatrNr hoeren");
    let merged = run(
        "(tau MatrNr studenten) merge join studenten.MatrNr = hoeren.MatrNr (tau MatrNr hoeren)",
    );
    assert_eq!(sorted_rows(&baseline), sorted_rows(&hashed));
    assert_eq!(sorted_rows(&baseline), sorted_rows(&merged));
}

#[test]
fn test_merge_join_requires_sorted_operands() {
    let result = context().query_one("studenten merge join studenten.MatrNr = hoeren.MatrNr hoeren");
    assert!(matches!(result, Err(QueryError::TableNotSorted(_))));
}

#[test]
fn test_self_join_requires_renaming() {
    let result = context().query_one("studenten natural join studenten");
    assert!(matches!(
        result,
        Err(QueryError::SelfJoinWithoutRenaming(_))
    ));
}

#[test]
fn test_self_join_with_alias() {
    let table = run("vorlesungen join vorlesungen.VorlNr = v.Vorgaenger (voraussetzen as v)");
    assert_eq!(table.row_count(), 7);
}

#[test]
fn test_union_schema_mismatch() {
    let result = context().query_one("(pi MatrNr studenten) union (pi Titel vorlesungen)");
    assert!(matches!(
        result,
        Err(QueryError::TableSchemaDoesNotMatch(_))
    ));
}

#[test]
fn test_varchar_sum_is_rejected() {
    let result = context().query_one("gamma aggregate s as sum(Name) studenten");
    assert!(matches!(result, Err(QueryError::Aggregate(_))));
}

#[test]
fn test_projection_with_arithmetic_alias() {
    let table = run("pi doubled as Semester * 2 studenten");
    assert_eq!(table.schema().column_names(), ["studenten.doubled"]);
    assert_eq!(table.rows()[0][0], Value::Int(36));
}

#[test]
fn test_explain_renders_plan_tree() {
    let table = run("explain sigma Rang > \"C3\" professoren");
    assert_eq!(table.schema().column_names(), ["explain.Operator"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(
        table.rows()[0][0],
        Value::Varchar("Selection(condition=Rang > \"C3\")".to_string())
    );
    assert_eq!(
        table.rows()[1][0],
        Value::Varchar("->TableScan(table=professoren)".to_string())
    );
}

#[test]
fn test_statement_sequence() {
    let results = context()
        .query("pi Name studenten; sigma Semester > 10 studenten")
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].table.row_count(), 8);
    assert_eq!(results[1].table.row_count(), 2);
}
