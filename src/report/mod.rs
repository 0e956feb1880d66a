use colored::Colorize;
use jiff::Timestamp;
use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};

use crate::scanner::{Audience, Item, ScanResult};

mod format;

pub use format::{format_age, layout_table, normalize_title, truncate_title};

/// Maximum displayed title width
pub const TITLE_WIDTH: usize = 70;

/// Writes a scan result as a grouped text report
pub struct Printer<W: Write> {
    out: W,
    color: bool,
    now: Timestamp,
}

impl<W: Write> Printer<W> {
    pub fn new(out: W) -> Self {
        Printer {
            out,
            color: true,
            now: Timestamp::now(),
        }
    }

    /// Enable or disable bold headings
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Reference time used for item ages
    pub fn with_now(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Print every enabled section followed by the summary
    pub fn print(&mut self, result: &ScanResult) -> io::Result<()> {
        if result.include_issues {
            self.print_section("external issues", &result.external_issues, result.audience)?;
            self.print_section("internal issues", &result.internal_issues, result.audience)?;
        }

        if result.include_prs {
            self.print_section("external prs", &result.external_prs, result.audience)?;
            self.print_section("internal prs", &result.internal_prs, result.audience)?;
        }

        writeln!(self.out)?;
        writeln!(self.out, "{}", self.heading("summary"))?;
        writeln!(
            self.out,
            "{}",
            self.heading(&format!("repositories scanned ({})", result.total_repos))
        )?;
        if result.include_issues {
            writeln!(
                self.out,
                "{}",
                self.heading(&format!(
                    "issues ({} external, {} internal)",
                    result.external_issues.len(),
                    result.internal_issues.len()
                ))
            )?;
        }
        if result.include_prs {
            writeln!(
                self.out,
                "{}",
                self.heading(&format!(
                    "prs ({} external, {} internal)",
                    result.external_prs.len(),
                    result.internal_prs.len()
                ))
            )?;
        }

        self.out.flush()
    }

    fn print_section(&mut self, label: &str, items: &[Item], audience: Audience) -> io::Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        writeln!(self.out)?;
        writeln!(self.out, "{}", self.heading(&format!("{} ({})", label, items.len())))?;
        writeln!(self.out, "{}", self.heading(&format!("audience ({})", audience)))?;
        writeln!(
            self.out,
            "{}",
            self.heading(&format!("repos ({})", unique_repo_count(items)))
        )?;
        writeln!(self.out)?;

        for line in layout_table(&self.grouped_rows(items)) {
            writeln!(self.out, "{}", line)?;
        }
        writeln!(self.out)
    }

    /// Rows grouped by repository, repositories sorted by name
    fn grouped_rows(&self, items: &[Item]) -> Vec<[String; 5]> {
        let mut by_repo: BTreeMap<&str, Vec<&Item>> = BTreeMap::new();
        for item in items {
            by_repo.entry(item.repo.as_str()).or_default().push(item);
        }

        let mut rows = Vec::with_capacity(items.len());
        for (repo, repo_items) in by_repo {
            for (i, item) in repo_items.into_iter().enumerate() {
                let repo_cell = if i == 0 { repo.to_string() } else { String::new() };
                rows.push([
                    repo_cell,
                    format!("#{}", item.number),
                    truncate_title(&normalize_title(&item.title), TITLE_WIDTH),
                    format_age(item.created_at, self.now),
                    item.author.to_lowercase(),
                ]);
            }
        }
        rows
    }

    fn heading(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}

fn unique_repo_count(items: &[Item]) -> usize {
    items
        .iter()
        .map(|item| item.repo.as_str())
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{item, test_timestamp};
    use jiff::ToSpan;

    fn render(result: &ScanResult) -> String {
        let mut printer = Printer::new(Vec::new())
            .with_color(false)
            .with_now(test_timestamp() + 3.hours());
        printer.print(result).unwrap();
        String::from_utf8(printer.into_inner()).unwrap()
    }

    #[test]
    fn test_print_groups_by_repo() {
        let mut second = item("infra-api", 9, "Carol");
        second.title = "feat: Add retries".to_string();
        let result = ScanResult {
            external_issues: vec![
                item("infra-web", 4, "bob"),
                second,
                item("infra-web", 2, "dave"),
            ],
            total_repos: 2,
            include_issues: true,
            include_prs: true,
            ..Default::default()
        };

        let output = render(&result);
        let expected = [
            "",
            "external issues (3)",
            "audience (all)",
            "repos (2)",
            "",
            "infra-api  #9  add retries          today  carol",
            "infra-web  #4  item 4 in infra-web  today  bob",
            "           #2  item 2 in infra-web  today  dave",
            "",
            "",
            "summary",
            "repositories scanned (2)",
            "issues (3 external, 0 internal)",
            "prs (0 external, 0 internal)",
            "",
        ]
        .join("\n");

        assert_eq!(output, expected);
    }

    #[test]
    fn test_print_omits_disabled_and_empty_sections() {
        let result = ScanResult {
            internal_prs: vec![item("infra-core", 1, "alice")],
            total_repos: 1,
            include_issues: false,
            include_prs: true,
            audience: Audience::Internal,
            ..Default::default()
        };

        let output = render(&result);

        assert!(!output.contains("issues"));
        assert!(!output.contains("external prs"));
        assert!(output.contains("internal prs (1)"));
        assert!(output.contains("audience (internal)"));
        assert!(output.contains("prs (0 external, 1 internal)"));
    }

    #[test]
    fn test_unique_repo_count() {
        let items = vec![
            item("infra-core", 1, "alice"),
            item("infra-core", 2, "bob"),
            item("infra-web", 3, "bob"),
        ];
        assert_eq!(unique_repo_count(&items), 2);
    }
}
