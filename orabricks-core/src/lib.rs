// Orabricks Core Library
//
// Rule-driven conversion of Oracle SQL scripts into Databricks SQL.
// An ordered list of rewrite rules runs over the script; every rule records
// what it did, and constructs that cannot be converted safely are kept
// behind inline review markers.

pub mod annotate;
pub mod config;
pub mod error;
pub mod lexer;
pub mod metadata;
pub mod rules;
pub mod types;

use std::sync::OnceLock;

// Re-export main types and functions for easy use
pub use annotate::{render, review_marker, with_banner, Rendered, ReviewStatus, HEADER_BANNER};
pub use config::ConverterConfig;
pub use error::ConversionError;
pub use rules::{RuleEngine, RuleList};
pub use types::*;

/// The example script offered to users who have nothing to paste yet.
pub const EXAMPLE_ORACLE_SQL: &str = "-- Example Oracle script
CREATE TABLE employees (
  emp_id NUMBER(10) PRIMARY KEY,
  emp_name VARCHAR2(100),
  hire_date DATE DEFAULT SYSDATE,
  salary NUMBER(10,2),
  notes CLOB
);

INSERT INTO employees (emp_id, emp_name, hire_date, salary)
VALUES (emp_seq.NEXTVAL, NVL('John Doe', 'Unknown'), SYSDATE, 5000);

SELECT emp_name || ' - ' || TO_CHAR(hire_date, 'YYYY-MM-DD') AS emp_info,
       DECODE(status, 'A', 'Active', 'I', 'Inactive', 'Unknown') as status_text
FROM employees;
";

fn default_engine() -> &'static Result<RuleEngine, ConversionError> {
    static ENGINE: OnceLock<Result<RuleEngine, ConversionError>> = OnceLock::new();
    ENGINE.get_or_init(|| RuleEngine::new(ConverterConfig::default()))
}

/// Convert a script with the default configuration.
///
/// Never panics and never fails: if the standard rules cannot be built the
/// source comes back untouched apart from the banner, with the error in the
/// log.
pub fn convert(source: &str) -> ConvertedSql {
    match default_engine() {
        Ok(engine) => {
            let rendered = render(&engine.convert(source));
            ConvertedSql {
                log_text: rendered.log_text(),
                output_text: rendered.display_output,
            }
        }
        Err(e) => ConvertedSql {
            output_text: with_banner(source),
            log_text: format!("[FAULT] engine: conversion unavailable: {e}"),
        },
    }
}
