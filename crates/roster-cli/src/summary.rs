use std::collections::BTreeMap;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use roster_model::{CorrectionSource, FixKind};

use crate::commands::{BatchResult, FileResult};

pub fn print_summary(result: &BatchResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("File"),
        header_cell("Read"),
        header_cell("Skipped"),
        header_cell("Output"),
        header_cell("Dropped"),
        header_cell("Repaired"),
        header_cell("Auto"),
        header_cell("Manual"),
        header_cell("Defaults"),
        header_cell("Written to"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=8 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    let mut by_kind: BTreeMap<FixKind, usize> = BTreeMap::new();
    for file in &result.files {
        match file {
            FileResult::Converted(outcome) => {
                let report = &outcome.conversion.report;
                for (kind, count) in &report.corrections_by_kind {
                    *by_kind.entry(*kind).or_default() += count;
                }
                let auto = report
                    .corrections_by_source
                    .get(&CorrectionSource::Auto)
                    .copied()
                    .unwrap_or(0);
                table.add_row(vec![
                    file_cell(&outcome.input.display().to_string()),
                    Cell::new(report.rows_read),
                    count_cell(report.rows_skipped.total(), Color::DarkGrey),
                    Cell::new(report.rows_output).add_attribute(Attribute::Bold),
                    count_cell(report.rows_dropped.len(), Color::Red),
                    count_cell(report.rows_repaired, Color::Yellow),
                    count_cell(auto, Color::Green),
                    count_cell(report.manual_fixes, Color::Yellow),
                    count_cell(report.override_applications, Color::Cyan),
                    match &outcome.output {
                        Some(path) => Cell::new(path.display()),
                        None if outcome.declined => dim_cell("not exported"),
                        None => dim_cell("dry run"),
                    },
                ]);
            }
            FileResult::Failed { input, .. } => {
                table.add_row(vec![
                    file_cell(&input.display().to_string()),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    dim_cell("-"),
                    Cell::new("FAILED")
                        .fg(Color::Red)
                        .add_attribute(Attribute::Bold),
                ]);
            }
        }
    }
    println!("{table}");
    print_kind_table(&by_kind);

    if result.has_failures() {
        eprintln!("Errors:");
        for file in &result.files {
            if let FileResult::Failed { input, error } = file {
                eprintln!("- {}: {error}", input.display());
            }
        }
    }
}

fn print_kind_table(by_kind: &BTreeMap<FixKind, usize>) {
    if by_kind.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![header_cell("Correction"), header_cell("Cells")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for (kind, count) in by_kind {
        table.add_row(vec![Cell::new(kind.as_str()), Cell::new(count)]);
    }
    println!();
    println!("Automatic corrections:");
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(165);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn file_cell(path: &str) -> Cell {
    Cell::new(path).fg(Color::Blue).add_attribute(Attribute::Bold)
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
