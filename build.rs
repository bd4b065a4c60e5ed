use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Source directories whose edits must re-run the hygiene scan.
const WATCHED: [&str; 6] = ["decode", "stats", "dataset", "topic", "tests", "benches"];

// Directories that are never scanned: build output and vendored reference material.
const SKIPPED: [&str; 2] = ["./target", "./examples"];

/// The project-wide rules every Rust source file must obey.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Rule {
    UnderscorePrefix,
    ForbiddenWord,
    StarsInComment,
    AllCapsComment,
    AllowDeadCode,
}

impl Rule {
    const ALL: [Rule; 5] = [
        Rule::UnderscorePrefix,
        Rule::ForbiddenWord,
        Rule::StarsInComment,
        Rule::AllCapsComment,
        Rule::AllowDeadCode,
    ];

    fn pattern(self) -> &'static str {
        match self {
            Rule::UnderscorePrefix => r"\b(_[a-zA-Z0-9_]+)\b",
            Rule::ForbiddenWord => {
                r"(//|/\*|///).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE)"
            }
            Rule::StarsInComment => r"(//|/\*).*\*\*",
            Rule::AllCapsComment => r"(//|/\*|///).*",
            Rule::AllowDeadCode => r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
        }
    }

    // The comment rules would trip over their own patterns in this file.
    fn scans_build_script(self) -> bool {
        matches!(self, Rule::UnderscorePrefix)
    }

    fn description(self) -> &'static str {
        match self {
            Rule::UnderscorePrefix => "underscore-prefixed identifiers",
            Rule::ForbiddenWord => "comments with forbidden edit markers",
            Rule::StarsInComment => "'**' outside doc comments",
            Rule::AllCapsComment => "comments whose letters are all uppercase",
            Rule::AllowDeadCode => "#[allow(dead_code)] attributes",
        }
    }

    fn advice(self) -> &'static str {
        match self {
            Rule::UnderscorePrefix => {
                "Either use the binding (removing the underscore) or remove it completely."
            }
            Rule::ForbiddenWord => {
                "Comments must describe the code, not its edit history. Remove the marker."
            }
            Rule::StarsInComment => "'**' is only allowed in doc comments.",
            Rule::AllCapsComment => "Strongly consider deleting the comment completely.",
            Rule::AllowDeadCode => "Either use the code or remove it completely.",
        }
    }

    /// Second-stage filter on a line the regex already matched.
    fn is_violation(self, line: &str) -> bool {
        let trimmed = line.trim_start();
        match self {
            Rule::UnderscorePrefix => !is_comment(trimmed) && !underscore_in_string(line),
            Rule::ForbiddenWord | Rule::AllowDeadCode => true,
            Rule::StarsInComment => !trimmed.starts_with("///"),
            Rule::AllCapsComment => comment_text(trimmed).is_some_and(|text| {
                let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
                !letters.is_empty() && letters.iter().all(|c| c.is_uppercase())
            }),
        }
    }
}

fn is_comment(trimmed: &str) -> bool {
    trimmed.starts_with("//") || trimmed.starts_with("/*")
}

// Odd-numbered segments between double quotes are string contents.
fn underscore_in_string(line: &str) -> bool {
    line.split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'))
}

fn comment_text(trimmed: &str) -> Option<&str> {
    if let Some(rest) = trimmed.strip_prefix("///") {
        Some(rest.trim())
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        Some(rest.trim())
    } else {
        let start = trimmed.find("/*")? + 2;
        let body = &trimmed[start..];
        Some(body.find("*/").map_or(body, |end| &body[..end]).trim())
    }
}

// Collects every matching line of one file that breaks the rule.
struct ViolationCollector {
    rule: Rule,
    violations: Vec<String>,
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if self.rule.is_violation(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn rust_sources() -> Vec<PathBuf> {
    WalkDir::new(".")
        .into_iter()
        .filter_entry(|e| !SKIPPED.iter().any(|skip| e.path().starts_with(skip)))
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn scan(rule: Rule, files: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(rule.pattern())?;
    let mut searcher = Searcher::new();

    for path in files {
        if !rule.scans_build_script() && path.file_name().is_some_and(|n| n == "build.rs") {
            continue;
        }
        let mut collector = ViolationCollector {
            rule,
            violations: Vec::new(),
        };
        searcher.search_path(&matcher, path, &mut collector)?;
        if !collector.violations.is_empty() {
            return Err(format_violations(rule, path, &collector.violations).into());
        }
    }
    Ok(())
}

fn format_violations(rule: Rule, path: &Path, violations: &[String]) -> String {
    let mut message = format!(
        "\n❌ ERROR: Found {} {} in {}:\n",
        violations.len(),
        rule.description(),
        path.display()
    );
    for violation in violations {
        message.push_str(&format!("   {violation}\n"));
    }
    message.push_str(&format!(
        "\n⚠️ These are STRICTLY FORBIDDEN in this project.\n   {}\n",
        rule.advice()
    ));
    message
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in WATCHED {
        println!("cargo:rerun-if-changed={dir}");
    }

    let files = rust_sources();
    for rule in Rule::ALL {
        if let Err(e) = scan(rule, &files) {
            // eprintln is what surfaces the message in cargo's output.
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
