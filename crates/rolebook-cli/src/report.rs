//! Human and JSON output for CLI commands.
//!
//! The resolver only returns values; everything user-facing (banners,
//! counts, "... and N more" summaries, not-found messages) is produced here.

use std::io::{self, Write};
use std::path::Path;

use rolebook_core::logging::TraceEntry;
use rolebook_core::{ConfigRecord, DefinitionKind, TreeReport};
use serde_json::json;

const RULE_WIDTH: usize = 60;

/// Writes command results to `out` as text or JSON.
pub struct Reporter<W: Write> {
    out: W,
    json: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    /// Consume the reporter, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn rule(&mut self) -> io::Result<()> {
        writeln!(self.out, "{}", "=".repeat(RULE_WIDTH))
    }

    fn banner(&mut self, title: &str) -> io::Result<()> {
        self.rule()?;
        writeln!(self.out, "{title}")?;
        self.rule()
    }

    fn name_list(&mut self, names: &[String], limit: usize, empty: &str) -> io::Result<()> {
        if names.is_empty() {
            return writeln!(self.out, "   ({empty})");
        }
        for name in names.iter().take(limit) {
            writeln!(self.out, "   ✓ {name}")?;
        }
        if names.len() > limit {
            writeln!(self.out, "   ... and {} more", names.len() - limit)?;
        }
        Ok(())
    }

    /// Print the agent listing.
    pub fn agents(&mut self, agents: &[String]) -> io::Result<()> {
        if self.json {
            return writeln!(self.out, "{}", json!(agents));
        }
        writeln!(self.out, "Available agents ({}):", agents.len())?;
        self.name_list(agents, usize::MAX, "no agents found")
    }

    /// Print the tool listing.
    pub fn tools(&mut self, tools: &[String]) -> io::Result<()> {
        if self.json {
            return writeln!(self.out, "{}", json!(tools));
        }
        writeln!(self.out, "Available tools ({}):", tools.len())?;
        self.name_list(tools, usize::MAX, "no tools found")
    }

    /// Print one resolved record, or a not-found line when `record` is `None`.
    pub fn record(
        &mut self,
        kind: DefinitionKind,
        name: &str,
        record: Option<&ConfigRecord>,
    ) -> io::Result<()> {
        if self.json {
            let value = json!({ "kind": kind, "name": name, "record": record });
            return writeln!(self.out, "{value}");
        }
        match record {
            Some(record) => {
                for (key, value) in record.iter() {
                    writeln!(self.out, "{key}: {value}")?;
                }
                Ok(())
            }
            None => writeln!(self.out, "No {kind} definition named '{name}' was found."),
        }
    }

    /// Print where a definition lives, or a not-found line.
    pub fn path(&mut self, kind: DefinitionKind, name: &str, path: Option<&Path>) -> io::Result<()> {
        if self.json {
            let path = path.map(|p| p.display().to_string());
            let value = json!({ "kind": kind, "name": name, "path": path });
            return writeln!(self.out, "{value}");
        }
        match path {
            Some(path) => writeln!(self.out, "{}", path.display()),
            None => writeln!(self.out, "No {kind} definition named '{name}' was found."),
        }
    }

    /// Print the overview: listings plus sample lookups.
    ///
    /// Tools beyond `preview_limit` are summarised as "... and N more".
    pub fn overview(
        &mut self,
        agents: &[String],
        tools: &[String],
        preview_limit: usize,
        samples: &[(DefinitionKind, &str, Option<ConfigRecord>)],
    ) -> io::Result<()> {
        if self.json {
            let samples: Vec<_> = samples
                .iter()
                .map(|(kind, name, record)| json!({ "kind": kind, "name": name, "record": record }))
                .collect();
            let value = json!({ "agents": agents, "tools": tools, "samples": samples });
            return writeln!(self.out, "{value}");
        }

        self.banner("Rolebook catalog")?;
        writeln!(self.out)?;
        writeln!(self.out, "Available agents:")?;
        self.name_list(agents, usize::MAX, "no agents found")?;
        writeln!(self.out)?;
        writeln!(self.out, "Available tools:")?;
        self.name_list(tools, preview_limit, "no tools found")?;

        for (kind, name, record) in samples {
            writeln!(self.out)?;
            self.banner(&format!("Example: loading {kind} '{name}'"))?;
            match record {
                Some(record) => {
                    writeln!(self.out, "✓ Loaded {kind} configuration")?;
                    let keys: Vec<&str> = record.keys().collect();
                    writeln!(self.out, "  Keys: {}", keys.join(", "))?;
                }
                None => writeln!(self.out, "No {kind} definition named '{name}' was found.")?,
            }
        }
        Ok(())
    }

    /// Print per-file check results followed by a summary line.
    pub fn check(&mut self, report: &TreeReport) -> io::Result<()> {
        if self.json {
            let files: Vec<_> = report
                .files
                .iter()
                .map(|f| {
                    json!({
                        "kind": f.kind,
                        "name": f.name,
                        "path": f.path.display().to_string(),
                        "keys": f.outcome.as_ref().ok(),
                        "error": f.outcome.as_ref().err().map(|e| e.to_string()),
                    })
                })
                .collect();
            return writeln!(self.out, "{}", json!({ "files": files }));
        }

        for file in &report.files {
            match &file.outcome {
                Ok(keys) => writeln!(self.out, "  ✓ {} ({keys} keys)", file.path.display())?,
                Err(e) => {
                    writeln!(self.out, "  ✗ {}", file.path.display())?;
                    writeln!(self.out, "     {e}")?;
                }
            }
        }
        let failures = report.failure_count();
        if failures == 0 {
            writeln!(self.out, "Checked {} files: all loaded.", report.files.len())
        } else {
            writeln!(
                self.out,
                "Checked {} files: {failures} failed to load.",
                report.files.len()
            )
        }
    }

    /// Print captured resolver diagnostics.
    pub fn explain(&mut self, entries: &[TraceEntry], dropped: usize) -> io::Result<()> {
        writeln!(self.out, "Resolution trace:")?;
        if dropped > 0 {
            writeln!(self.out, "  ({dropped} earlier events dropped)")?;
        }
        for entry in entries {
            writeln!(self.out, "  {entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rolebook_test_utils::CatalogFixture;

    fn text(render: impl FnOnce(&mut Reporter<Vec<u8>>) -> io::Result<()>) -> String {
        let mut reporter = Reporter::new(Vec::new(), false);
        render(&mut reporter).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn json_out(render: impl FnOnce(&mut Reporter<Vec<u8>>) -> io::Result<()>) -> serde_json::Value {
        let mut reporter = Reporter::new(Vec::new(), true);
        render(&mut reporter).unwrap();
        serde_json::from_slice(&reporter.into_inner()).unwrap()
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("tool_{i:02}")).collect()
    }

    #[test]
    fn test_overview_truncates_tools() {
        let out = text(|r| r.overview(&[], &names(13), 10, &[]));
        assert!(out.contains("   (no agents found)"));
        assert!(out.contains("   ✓ tool_09"));
        assert!(!out.contains("tool_10"));
        assert!(out.contains("   ... and 3 more"));
    }

    #[test]
    fn test_overview_exact_limit_has_no_summary() {
        let out = text(|r| r.overview(&[], &names(10), 10, &[]));
        assert!(!out.contains("more"));
    }

    #[test]
    fn test_overview_samples() {
        let record: ConfigRecord = [("name", "Coder"), ("model", "gpt")].into_iter().collect();
        let samples = [
            (DefinitionKind::Agent, "coder-agent", Some(record)),
            (DefinitionKind::Tool, "write_python", None),
        ];
        let out = text(|r| r.overview(&["coder-agent".to_string()], &[], 10, &samples));
        assert!(out.contains("Keys: model, name"));
        assert!(out.contains("No tool definition named 'write_python' was found."));
    }

    #[test]
    fn test_record_text_and_not_found() {
        let record: ConfigRecord = [("b", "2"), ("a", "1")].into_iter().collect();
        let out = text(|r| r.record(DefinitionKind::Agent, "x", Some(&record)));
        assert_eq!(out, "a: 1\nb: 2\n");

        let out = text(|r| r.record(DefinitionKind::Agent, "ghost", None));
        assert_eq!(out, "No agent definition named 'ghost' was found.\n");
    }

    #[test]
    fn test_record_json() {
        let record: ConfigRecord = [("name", "Coder")].into_iter().collect();
        let value = json_out(|r| r.record(DefinitionKind::Agent, "coder", Some(&record)));
        assert_eq!(
            value,
            json!({ "kind": "agent", "name": "coder", "record": { "name": "Coder" } })
        );

        let value = json_out(|r| r.record(DefinitionKind::Tool, "ghost", None));
        assert_eq!(value["record"], serde_json::Value::Null);
    }

    #[test]
    fn test_listing_json() {
        let value = json_out(|r| r.tools(&names(2)));
        assert_eq!(value, json!(["tool_00", "tool_01"]));
    }

    #[test]
    fn test_check_output() {
        let catalog = CatalogFixture::new()
            .tool("good.yaml", "a: b\n")
            .bytes("tool/zz_bad.yaml", &[0xff]);
        let report = catalog.resolver().check_tree().unwrap();

        let out = text(|r| r.check(&report));
        assert!(out.contains("✓"));
        assert!(out.contains("(1 keys)"));
        assert!(out.contains("✗"));
        assert!(out.contains("Checked 2 files: 1 failed to load."));

        let value = json_out(|r| r.check(&report));
        assert_eq!(value["files"][0]["keys"], json!(1));
        assert!(value["files"][1]["error"].is_string());
    }
}
