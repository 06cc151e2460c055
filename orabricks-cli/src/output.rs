use anyhow::{Context, Result};
use orabricks_core::metadata::RunMetadata;
use orabricks_core::{render, ConversionResult, Rendered, ReviewStatus, TransformTrace};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// The converted script only; the log goes to stderr or --log
    Text,
    /// One JSON document with the script, changelog, trace and run metadata
    Json,
}

/// JSON view of one run
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub output_text: &'a str,
    pub changelog: &'a str,
    pub status: ReviewStatus,
    pub success: bool,
    pub trace: &'a TransformTrace,
    pub metadata: &'a RunMetadata,
}

impl<'a> Report<'a> {
    pub fn new(result: &'a ConversionResult, rendered: &'a Rendered) -> Self {
        Self {
            output_text: &rendered.display_output,
            changelog: &rendered.changelog,
            status: rendered.status,
            success: result.success,
            trace: &result.trace,
            metadata: &result.metadata,
        }
    }
}

/// Read the script from `path`, or from stdin when no path is given
pub fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(p) => fs::read_to_string(p).with_context(|| format!("Failed to read input script: {p}")),
        None => {
            let mut source = String::new();
            io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read input script from stdin")?;
            Ok(source)
        }
    }
}

/// Write `text` to `path`, or to stdout when no path is given
pub fn write_text(path: Option<&str>, text: &str) -> Result<()> {
    match path {
        Some(p) => {
            fs::write(p, text).with_context(|| format!("Failed to write {p}"))?;
            info!(path = p, bytes = text.len(), "saved");
        }
        None => print!("{text}"),
    }
    Ok(())
}

/// Format the main output of a run
pub fn format_output(result: &ConversionResult, rendered: &Rendered, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(rendered.display_output.clone()),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&Report::new(result, rendered))?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Write the converted script (or JSON report) and the log, then hand back
/// the rendering so the caller can decide the exit code.
pub fn write_result(
    result: &ConversionResult,
    format: OutputFormat,
    output_path: Option<&str>,
    log_path: Option<&str>,
) -> Result<Rendered> {
    let rendered = render(result);
    write_text(output_path, &format_output(result, &rendered, format)?)?;

    let log = rendered.log_text();
    match log_path {
        Some(p) => {
            fs::write(p, format!("{log}\n")).with_context(|| format!("Failed to write log {p}"))?;
            info!(path = p, "log saved");
        }
        None => eprintln!("{log}"),
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orabricks_core::{ConverterConfig, RuleEngine};
    use serde_json::Value;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("orabricks-{}-{name}", std::process::id()))
    }

    fn convert(sql: &str) -> ConversionResult {
        RuleEngine::new(ConverterConfig::default()).unwrap().convert(sql)
    }

    #[test]
    fn test_text_output_is_the_script() {
        let result = convert("SELECT SYSDATE FROM dual;");
        let rendered = render(&result);
        let text = format_output(&result, &rendered, OutputFormat::Text).unwrap();
        assert!(text.ends_with("SELECT CURRENT_TIMESTAMP() FROM dual;"));
    }

    #[test]
    fn test_json_report_fields() {
        let result = convert("SELECT s.NEXTVAL FROM dual;");
        let rendered = render(&result);
        let json = format_output(&result, &rendered, OutputFormat::Json).unwrap();
        let report: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(report["success"], Value::Bool(true));
        assert_eq!(report["status"]["status"], "needs_review");
        assert_eq!(report["status"]["flagged"], 1);
        assert_eq!(report["metadata"]["ruleset_version"], "1.0.0");
        let kinds: Vec<&str> = report["trace"]
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| entry["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["applied", "flagged"]);
    }

    #[test]
    fn test_result_and_log_written_to_files() {
        let output = scratch_path("out.sql");
        let log = scratch_path("out.log");
        let result = convert("SELECT NVL(a, 0) FROM t;");

        let rendered = write_result(
            &result,
            OutputFormat::Text,
            output.to_str(),
            log.to_str(),
        )
        .unwrap();
        assert!(rendered.status.is_clean());

        let written = fs::read_to_string(&output).unwrap();
        assert_eq!(written, result.output_text);
        let log_text = fs::read_to_string(&log).unwrap();
        assert!(log_text.starts_with("[INFO] nvl-to-coalesce: 1 occurrence(s) rewritten"));

        fs::remove_file(output).ok();
        fs::remove_file(log).ok();
    }

    #[test]
    fn test_missing_input_names_the_path() {
        let err = read_input(Some("/nonexistent/script.sql")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/script.sql"));
    }
}
