//! Leaf access paths: full table scan and secondary-index point lookup.

use crate::catalog::Catalog;
use crate::error::{QueryError, Result};
use crate::expr::Expr;
use crate::schema::{simple_name, Schema};
use crate::table::Table;
use crate::value::{ComparativeOp, Value};

/// Scan node
#[derive(Debug, Clone, PartialEq)]
pub struct ScanNode {
    pub table: String,
    pub alias: Option<String>,
}

impl ScanNode {
    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        let schema = catalog.retrieve(&self.table)?.schema();
        Ok(match &self.alias {
            Some(alias) => schema.rename(alias),
            None => schema.clone(),
        })
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let table = catalog.retrieve(&self.table)?;
        // cloning keeps the canonical stored table out of reach of renames
        Ok(match &self.alias {
            Some(alias) => table.renamed(alias),
            None => table.clone(),
        })
    }

    pub fn repr(&self) -> String {
        match &self.alias {
            Some(alias) => format!("TableScan(table={}, alias={})", self.table, alias),
            None => format!("TableScan(table={})", self.table),
        }
    }
}

/// Index seek node, the point-lookup replacement for a scan filtered on a
/// single `column = literal` equality.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSeekNode {
    pub table: String,
    pub alias: Option<String>,
    pub column: String,
    pub key: Value,
}

impl IndexSeekNode {
    /// Validate a selection condition over a scan as an index seek. Only a
    /// single `column = literal` equality qualifies, the column must resolve
    /// in the scan's schema, and the catalog must hold an index on it.
    pub fn from_selection(scan: &ScanNode, condition: &Expr, catalog: &Catalog) -> Result<Self> {
        let Expr::Comparative {
            left,
            op: ComparativeOp::Eq,
            right,
        } = condition
        else {
            return Err(QueryError::IndexSeekConditionNotSupported(
                condition.to_string(),
            ));
        };
        let (column, key) = match (&**left, &**right) {
            (Expr::Column(column), Expr::Literal(value))
            | (Expr::Literal(value), Expr::Column(column)) => (column, value.clone()),
            _ => {
                return Err(QueryError::IndexSeekConditionNotSupported(
                    condition.to_string(),
                ));
            }
        };
        if !scan.schema(catalog)?.resolves(column) {
            return Err(QueryError::IndexSeekCondition(format!(
                "column {} does not resolve in table {}",
                column, scan.table
            )));
        }
        if !catalog.has_index(&scan.table, simple_name(column)) {
            return Err(QueryError::IndexSeekCondition(format!(
                "no index on {}.{}",
                scan.table,
                simple_name(column)
            )));
        }
        Ok(IndexSeekNode {
            table: scan.table.clone(),
            alias: scan.alias.clone(),
            column: column.clone(),
            key,
        })
    }

    pub fn schema(&self, catalog: &Catalog) -> Result<Schema> {
        let schema = catalog.retrieve(&self.table)?.schema();
        Ok(match &self.alias {
            Some(alias) => schema.rename(alias),
            None => schema.clone(),
        })
    }

    pub fn evaluate(&self, catalog: &Catalog) -> Result<Table> {
        let schema = self.schema(catalog)?;
        let index = catalog.retrieve_index(&self.table, simple_name(&self.column))?;
        let rows = index.lookup(&self.key).to_vec();
        Ok(Table::new(schema, rows))
    }

    pub fn repr(&self) -> String {
        match &self.alias {
            Some(alias) => format!(
                "IndexSeek(table={}, alias={}, column={}, key={})",
                self.table, alias, self.column, self.key
            ),
            None => format!(
                "IndexSeek(table={}, column={}, key={})",
                self.table, self.column, self.key
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SchemaType;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.register(Table::new(
            Schema::new(
                "t",
                vec![
                    ("a".to_string(), SchemaType::Int),
                    ("b".to_string(), SchemaType::Int),
                ],
            ),
            vec![vec![Value::Int(1), Value::Int(10)]],
        ));
        catalog.create_index("t", "a").unwrap();
        catalog
    }

    fn scan() -> ScanNode {
        ScanNode {
            table: "t".to_string(),
            alias: None,
        }
    }

    #[test]
    fn test_seek_from_equality() {
        let condition = Expr::column("a").eq(Expr::literal(Value::Int(1)));
        let seek = IndexSeekNode::from_selection(&scan(), &condition, &catalog()).unwrap();
        assert_eq!(seek.column, "a");
        assert_eq!(seek.key, Value::Int(1));
    }

    #[test]
    fn test_range_condition_is_rejected() {
        let condition = Expr::column("a").gt(Expr::literal(Value::Int(0)));
        assert!(matches!(
            IndexSeekNode::from_selection(&scan(), &condition, &catalog()),
            Err(QueryError::IndexSeekConditionNotSupported(_))
        ));
    }

    #[test]
    fn test_missing_index_is_rejected() {
        let condition = Expr::column("b").eq(Expr::literal(Value::Int(10)));
        assert!(matches!(
            IndexSeekNode::from_selection(&scan(), &condition, &catalog()),
            Err(QueryError::IndexSeekCondition(_))
        ));
        let condition = Expr::column("missing").eq(Expr::literal(Value::Int(0)));
        assert!(matches!(
            IndexSeekNode::from_selection(&scan(), &condition, &catalog()),
            Err(QueryError::IndexSeekCondition(_))
        ));
    }
}
