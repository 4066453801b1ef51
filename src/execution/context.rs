//! Execution context - main entry point for query execution

use crate::catalog::Catalog;
use crate::compiler::Compiler;
use crate::error::Result;
use crate::optimizer::Optimizer;
use crate::parser::{self, QueryAst};
use crate::table::Table;
use std::time::{Duration, Instant};
use tracing::debug;

/// Query execution result
#[derive(Debug)]
pub struct QueryResult {
    /// Result rows
    pub table: Table,
    /// Execution metrics
    pub metrics: QueryMetrics,
}

/// Query execution metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct QueryMetrics {
    /// Time spent parsing
    pub parse_time: Duration,
    /// Time spent compiling the plan
    pub compile_time: Duration,
    /// Time spent optimizing
    pub optimize_time: Duration,
    /// Time spent executing
    pub execute_time: Duration,
    /// Total time
    pub total_time: Duration,
}

/// Execution context - owns the catalog and runs queries against it
pub struct ExecutionContext {
    catalog: Catalog,
    optimizer: Optimizer,
    optimize: bool,
}

impl ExecutionContext {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            optimizer: Optimizer::new(),
            optimize: true,
        }
    }

    /// Enable or disable the optimizer pass. Useful for comparing plans.
    pub fn with_optimization(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn set_optimization(&mut self, optimize: bool) {
        self.optimize = optimize;
    }

    pub fn optimization(&self) -> bool {
        self.optimize
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn register_table(&mut self, table: Table) {
        self.catalog.register(table);
    }

    pub fn create_index(&mut self, table: &str, column: &str) -> Result<()> {
        self.catalog.create_index(table, column)
    }

    /// List registered tables
    pub fn table_names(&self) -> Vec<&str> {
        self.catalog.table_names()
    }

    /// Execute the statements in `text` in order and return one result per
    /// statement. Parse time is attributed to the first statement.
    pub fn query(&self, text: &str) -> Result<Vec<QueryResult>> {
        let parse_start = Instant::now();
        let statements = parser::parse_statements(text)?;
        let mut parse_time = parse_start.elapsed();

        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            results.push(self.run(statement, parse_time)?);
            parse_time = Duration::ZERO;
        }
        Ok(results)
    }

    /// Execute a single-statement query
    pub fn query_one(&self, text: &str) -> Result<QueryResult> {
        let parse_start = Instant::now();
        let statement = parser::parse_query(text)?;
        let parse_time = parse_start.elapsed();
        self.run(&statement, parse_time)
    }

    fn run(&self, statement: &QueryAst, parse_time: Duration) -> Result<QueryResult> {
        let start = Instant::now();
        let mut metrics = QueryMetrics {
            parse_time,
            ..QueryMetrics::default()
        };

        let compile_start = Instant::now();
        let compiler = Compiler::new(&self.catalog);
        let mut plan = compiler.compile(statement)?;
        metrics.compile_time = compile_start.elapsed();
        debug!(plan = %plan.repr(), "compiled statement");

        if self.optimize {
            let optimize_start = Instant::now();
            plan = self.optimizer.optimize(plan, &self.catalog)?;
            metrics.optimize_time = optimize_start.elapsed();
            debug!(plan = %plan.repr(), "optimized plan");
        }

        let execute_start = Instant::now();
        let table = plan.evaluate(&self.catalog)?;
        metrics.execute_time = execute_start.elapsed();

        metrics.total_time = parse_time + start.elapsed();
        debug!(
            rows = table.row_count(),
            elapsed = ?metrics.execute_time,
            "executed statement"
        );

        Ok(QueryResult { table, metrics })
    }
}
