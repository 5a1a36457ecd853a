use std::collections::BTreeMap;

use camino::Utf8PathBuf;
use console::{Alignment, Style, pad_str};
use serde::Serialize;

use crate::engine::{DryRunReport, TestedReport};
use crate::locator;
use crate::mutants::{MutantRecord, TestOutcome};
use crate::runner;
use crate::stats::{FileStats, RunStats};

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

const HEADERS: [&str; 6] = ["File", "Total", "Killed", "Survived", "Timeout", "Score"];

struct Row {
    cells: [String; 6],
    bold: bool,
}

fn stats_row(name: &str, stats: &FileStats, bold: bool) -> Row {
    Row {
        cells: [
            name.to_string(),
            stats.total.to_string(),
            stats.killed.to_string(),
            stats.survived.to_string(),
            stats.timed_out.to_string(),
            format!("{:.1}%", stats.score_pct()),
        ],
        bold,
    }
}

/// Render rows as a padded table. Column 0 is left aligned, the rest right.
pub fn render_table(stats: &RunStats) -> String {
    let mut rows: Vec<Row> = stats
        .files
        .iter()
        .map(|(path, s)| stats_row(path.as_str(), s, false))
        .collect();
    rows.push(stats_row("OVERALL", &stats.overall, true));

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (i, cell) in row.cells.iter().enumerate() {
            widths[i] = widths[i].max(console::measure_text_width(cell));
        }
    }

    let column_styles = [
        Style::new().cyan(),
        Style::new(),
        Style::new().green(),
        Style::new().red(),
        Style::new().yellow(),
        Style::new(),
    ];

    let mut out = String::new();
    let header: Vec<String> = HEADERS
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let align = if i == 0 { Alignment::Left } else { Alignment::Right };
            Style::new()
                .bold()
                .apply_to(pad_str(h, widths[i], align, None))
                .to_string()
        })
        .collect();
    out.push_str(&header.join("  "));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    out.push_str(&Style::new().dim().apply_to(rule.join("  ")).to_string());
    out.push('\n');

    for row in &rows {
        let cells: Vec<String> = row
            .cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let align = if i == 0 { Alignment::Left } else { Alignment::Right };
                let mut style = column_styles[i].clone();
                if row.bold {
                    style = style.bold();
                }
                style
                    .apply_to(pad_str(cell, widths[i], align, None))
                    .to_string()
            })
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
    }
    out
}

fn describe(o: &TestOutcome) -> String {
    format!("{}:{} [{}] {} → {}", o.file, o.line, o.operator, o.original, o.replacement)
}

pub fn print_tested(report: &TestedReport) {
    println!("{}", Style::new().cyan().bold().apply_to("Mutation Test Results"));
    println!();
    print!("{}", render_table(&report.stats));

    let dim = Style::new().dim();
    if report.discovered > report.records.len() && !report.cancelled {
        println!(
            "  {} {} of {} mutants tested (max mutants)",
            dim.apply_to("·"),
            report.records.len(),
            report.discovered
        );
    }
    if report.cancelled {
        println!("  {} run interrupted; results are partial", dim.apply_to("·"));
    }
    let infra = report.infrastructure_failures();
    if infra > 0 {
        println!(
            "  {} {} mutants hit infrastructure failures (excluded from score)",
            dim.apply_to("·"),
            infra
        );
    }
    let skipped = report.skipped_mutants();
    if skipped > 0 {
        println!("  {} {} mutants could not be applied", dim.apply_to("·"), skipped);
    }
    if !report.skipped_files.is_empty() {
        println!(
            "  {} {} files skipped (parse errors)",
            dim.apply_to("·"),
            report.skipped_files.len()
        );
    }

    let survivors: Vec<&TestOutcome> = report.outcomes().filter(|o| o.survived()).collect();
    if !survivors.is_empty() {
        println!();
        println!("{}", Style::new().yellow().bold().apply_to("Surviving mutants:"));
        let op_style = Style::new().magenta();
        for o in survivors {
            println!("  {}", op_style.apply_to(describe(o)));
        }
    }

    println!();
    let stats = &report.stats;
    let verdict = format!(
        "Overall kill rate: {:.1}% (minimum {:.1}%)",
        stats.overall.score_pct(),
        stats.min_score_pct
    );
    if stats.pass {
        print_success(&format!("{} PASS", verdict));
    } else {
        let style = Style::new().red().bold();
        println!("{} {} FAIL", style.apply_to("✗"), verdict);
    }
}

pub fn print_dry_run(report: &DryRunReport, verbose: bool) {
    let scan = &report.scan;
    let mut per_file: BTreeMap<&str, usize> = BTreeMap::new();
    for site in &scan.sites {
        *per_file.entry(site.file.as_str()).or_default() += 1;
    }

    let width = per_file
        .iter()
        .map(|(f, _)| f.len())
        .max()
        .unwrap_or(0)
        .max("File".len());
    let file_style = Style::new().cyan();
    println!(
        "{}  {}",
        Style::new().bold().apply_to(pad_str("File", width, Alignment::Left, None)),
        Style::new().bold().apply_to("Mutants")
    );
    for (file, count) in &per_file {
        println!(
            "{}  {:>7}",
            file_style.apply_to(pad_str(file, width, Alignment::Left, None)),
            count
        );
    }

    if verbose {
        let dim = Style::new().dim();
        for site in &scan.sites {
            let Some(file) = scan.files.get(&site.file) else {
                continue;
            };
            println!();
            println!("{}", Style::new().cyan().bold().apply_to(site));
            match locator::mutate(file, site) {
                Ok(mutant) => {
                    for line in runner::generate_diff(&file.text, &mutant.mutated_text).lines() {
                        let style = if line.starts_with('-') {
                            Style::new().red()
                        } else {
                            Style::new().green()
                        };
                        println!("  {}", style.apply_to(line));
                    }
                }
                Err(e) => println!("  {}", dim.apply_to(e)),
            }
        }
        println!();
    }

    print_success(&format!(
        "Found {} mutants across {} files (dry run, no tests executed)",
        report.discovered,
        scan.files.len()
    ));
    if report.discovered > scan.sites.len() {
        println!(
            "  {} only the first {} would be tested (max mutants)",
            Style::new().dim().apply_to("·"),
            scan.sites.len()
        );
    }
}

#[derive(Serialize)]
struct JsonFailure<'a> {
    mutant_id: String,
    reason: &'a str,
}

#[derive(Serialize)]
struct JsonTested<'a> {
    dry_run: bool,
    pass: bool,
    min_score_pct: f64,
    cancelled: bool,
    discovered: usize,
    overall: &'a FileStats,
    files: &'a BTreeMap<Utf8PathBuf, FileStats>,
    survived_mutants: Vec<&'a TestOutcome>,
    timed_out_mutants: Vec<&'a TestOutcome>,
    infrastructure_failures: Vec<JsonFailure<'a>>,
    skipped_mutants: Vec<JsonFailure<'a>>,
    skipped_files: &'a [Utf8PathBuf],
}

fn failures(records: &[MutantRecord], infrastructure: bool) -> Vec<JsonFailure<'_>> {
    records
        .iter()
        .filter_map(|r| match r {
            MutantRecord::Infrastructure { site, reason } if infrastructure => Some(JsonFailure {
                mutant_id: site.id(),
                reason,
            }),
            MutantRecord::Skipped { site, reason } if !infrastructure => Some(JsonFailure {
                mutant_id: site.id(),
                reason,
            }),
            _ => None,
        })
        .collect()
}

pub fn tested_json(report: &TestedReport) -> serde_json::Value {
    let doc = JsonTested {
        dry_run: false,
        pass: report.stats.pass,
        min_score_pct: report.stats.min_score_pct,
        cancelled: report.cancelled,
        discovered: report.discovered,
        overall: &report.stats.overall,
        files: &report.stats.files,
        survived_mutants: report.outcomes().filter(|o| o.survived()).collect(),
        timed_out_mutants: report.outcomes().filter(|o| o.timed_out).collect(),
        infrastructure_failures: failures(&report.records, true),
        skipped_mutants: failures(&report.records, false),
        skipped_files: &report.skipped_files,
    };
    serde_json::to_value(doc).unwrap_or(serde_json::Value::Null)
}

pub fn dry_run_json(report: &DryRunReport) -> serde_json::Value {
    serde_json::json!({
        "dry_run": true,
        "discovered": report.discovered,
        "files": report.scan.files.len(),
        "mutants": report.scan.sites,
        "skipped_files": report.scan.skipped,
    })
}
