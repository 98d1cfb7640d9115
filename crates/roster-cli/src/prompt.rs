//! Terminal front end for pipeline decisions.

use comfy_table::{Cell, Table};
use dialoguer::{Confirm, Input, Select};
use tracing::warn;

use roster_core::{DecisionMaker, DecisionRequest, DecisionResponse, RowRepair, VariationMatch};
use roster_map::{Ambiguity, AmbiguityKind};
use roster_model::{CellIssue, FieldKey, RawRow};

use crate::summary::{apply_table_style, dim_cell, header_cell};

/// Asks the operator on the terminal. A failed prompt aborts the run.
#[derive(Debug, Default)]
pub struct TerminalDecisions;

impl DecisionMaker for TerminalDecisions {
    fn decide(&mut self, request: &DecisionRequest) -> DecisionResponse {
        match ask(request) {
            Ok(response) => response,
            Err(error) => {
                warn!(decision = request.kind(), %error, "prompt failed, aborting");
                DecisionResponse::Abort
            }
        }
    }
}

fn ask(request: &DecisionRequest) -> dialoguer::Result<DecisionResponse> {
    match request {
        DecisionRequest::OfferDefault {
            display, rejected, ..
        } => offer_default(display, rejected.as_deref()),
        DecisionRequest::ConfirmRowRemoval {
            leading,
            trailing,
            notes,
        } => confirm_row_removal(leading, trailing, notes),
        DecisionRequest::ChooseHeaderRow { preview, notes } => choose_header_row(preview, notes),
        DecisionRequest::ConfirmVariationMatches { matches } => confirm_variations(matches),
        DecisionRequest::ResolveColumn {
            ambiguity,
            unmapped,
        } => resolve_column(ambiguity, unmapped),
        DecisionRequest::RepairRow { repair } => repair_row(repair),
        DecisionRequest::SupplyMissingDefault { display, .. } => supply_default(display),
        DecisionRequest::ConfirmSynthesizedColumn { display, value, .. } => {
            let fill = Confirm::new()
                .with_prompt(format!(
                    "{display} has no column. Fill it with {value:?} on every row?"
                ))
                .default(true)
                .interact()?;
            Ok(accept_or_decline(fill))
        }
        DecisionRequest::ReviewAutofixes { issues } => review_autofixes(issues),
        DecisionRequest::ReviewAutofix { issue } => review_autofix(issue),
        DecisionRequest::ManualValue { issue, display } => manual_value(issue, display),
        DecisionRequest::ConfirmExport { destination, rows } => {
            let export = Confirm::new()
                .with_prompt(format!("Export {rows} rows to {destination}?"))
                .default(true)
                .interact()?;
            Ok(accept_or_decline(export))
        }
    }
}

fn accept_or_decline(accepted: bool) -> DecisionResponse {
    if accepted {
        DecisionResponse::Accept
    } else {
        DecisionResponse::Decline
    }
}

fn print_notes(notes: &[String]) {
    for note in notes {
        println!("  note: {note}");
    }
}

fn rows_table(rows: &[RawRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Line"), header_cell("Cells")]);
    apply_table_style(&mut table);
    for row in rows {
        table.add_row(vec![Cell::new(row.line), Cell::new(row.cells.join(" | "))]);
    }
    table
}

fn read_value(prompt: String) -> dialoguer::Result<Option<String>> {
    let value: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

fn confirm_row_removal(
    leading: &[RawRow],
    trailing: &[RawRow],
    notes: &[String],
) -> dialoguer::Result<DecisionResponse> {
    if !leading.is_empty() {
        println!("Rows above the header:\n{}", rows_table(leading));
    }
    if !trailing.is_empty() {
        println!("Rows below the data:\n{}", rows_table(trailing));
    }
    print_notes(notes);
    let remove = Confirm::new()
        .with_prompt("Remove these rows? (declining keeps the rows below the data)")
        .default(true)
        .interact()?;
    Ok(accept_or_decline(remove))
}

fn choose_header_row(preview: &[RawRow], notes: &[String]) -> dialoguer::Result<DecisionResponse> {
    println!("No row looks like the column headers.");
    print_notes(notes);
    let mut items: Vec<String> = preview
        .iter()
        .map(|row| format!("line {}: {}", row.line, row.cells.join(" | ")))
        .collect();
    items.push("Abort".to_string());
    let choice = Select::new()
        .with_prompt("Which row holds the column headers?")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(if choice < preview.len() {
        DecisionResponse::SelectRow(choice)
    } else {
        DecisionResponse::Abort
    })
}

fn confirm_variations(matches: &[VariationMatch]) -> dialoguer::Result<DecisionResponse> {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Header"),
        header_cell("Field"),
        header_cell("Confidence"),
    ]);
    apply_table_style(&mut table);
    for candidate in matches {
        table.add_row(vec![
            Cell::new(candidate.column + 1),
            Cell::new(&candidate.header),
            Cell::new(candidate.field.as_str()),
            Cell::new(format!("{:.0}%", candidate.confidence * 100.0)),
        ]);
    }
    println!("Headers matched by known alternative names:\n{table}");
    if let [_] = matches {
        let accept = Confirm::new()
            .with_prompt("Use this match?")
            .default(true)
            .interact()?;
        return Ok(accept_or_decline(accept));
    }
    let choice = Select::new()
        .with_prompt("Use these matches?")
        .items(&["Accept all", "Review each", "Decline all"])
        .default(0)
        .interact()?;
    Ok(match choice {
        0 => DecisionResponse::Accept,
        1 => DecisionResponse::ReviewEach,
        _ => DecisionResponse::Decline,
    })
}

fn describe(kind: &AmbiguityKind) -> String {
    match kind {
        AmbiguityKind::Conflict => "matches more than one field".to_string(),
        AmbiguityKind::AlreadyClaimed { by_column } => {
            format!("names a field already taken by column {}", by_column + 1)
        }
        AmbiguityKind::Unrecognized => "is not recognised".to_string(),
    }
}

fn resolve_column(
    ambiguity: &Ambiguity,
    unmapped: &[FieldKey],
) -> dialoguer::Result<DecisionResponse> {
    println!(
        "Column {} ({:?}) {}.",
        ambiguity.column + 1,
        ambiguity.header,
        describe(&ambiguity.kind)
    );
    let mut fields: Vec<&FieldKey> = ambiguity
        .candidates
        .iter()
        .map(|candidate| &candidate.field)
        .collect();
    let others: Vec<&FieldKey> = unmapped
        .iter()
        .filter(|field| !fields.contains(field))
        .collect();
    fields.extend(others);

    let mut items: Vec<String> = ambiguity
        .candidates
        .iter()
        .map(|candidate| {
            format!(
                "{} (similarity {:.0}%)",
                candidate.field,
                candidate.score * 100.0
            )
        })
        .collect();
    items.extend(
        fields[ambiguity.candidates.len()..]
            .iter()
            .map(|field| field.to_string()),
    );
    items.push("Skip column".to_string());
    items.push("Abort".to_string());

    let choice = Select::new()
        .with_prompt("Map this column to")
        .items(&items)
        .default(if ambiguity.candidates.is_empty() {
            fields.len()
        } else {
            0
        })
        .interact()?;
    Ok(match fields.get(choice) {
        Some(field) => DecisionResponse::AssignField((*field).clone()),
        None if choice == fields.len() => DecisionResponse::Skip,
        None => DecisionResponse::Abort,
    })
}

/// One entry of the row-repair menu.
enum RepairPick {
    Respond(DecisionResponse),
    EnterValue,
}

fn repair_row(repair: &RowRepair) -> dialoguer::Result<DecisionResponse> {
    println!(
        "Line {} has {} cells, the header has {}:",
        repair.line,
        repair.cells.len(),
        repair.expected
    );
    let mut table = Table::new();
    table.set_header(vec![header_cell("#"), header_cell("Cell")]);
    apply_table_style(&mut table);
    for (index, cell) in repair.cells.iter().enumerate() {
        let value = if cell.is_empty() {
            dim_cell("(empty)")
        } else {
            Cell::new(cell)
        };
        table.add_row(vec![Cell::new(index + 1), value]);
    }
    println!("{table}");

    let mut picks: Vec<(String, RepairPick)> = Vec::new();
    if let (Some(field), Some(suggested)) = (&repair.field, &repair.suggested) {
        picks.push((
            format!("Merge into {field}: {suggested:?}"),
            RepairPick::Respond(DecisionResponse::Accept),
        ));
    }
    if let Some(field) = &repair.field {
        picks.push((format!("Enter the {field} value"), RepairPick::EnterValue));
    }
    picks.push((
        "Skip this row".to_string(),
        RepairPick::Respond(DecisionResponse::Skip),
    ));
    picks.push((
        "Abort".to_string(),
        RepairPick::Respond(DecisionResponse::Abort),
    ));

    let labels: Vec<&str> = picks.iter().map(|(label, _)| label.as_str()).collect();
    let choice = Select::new()
        .with_prompt("How should this row be handled?")
        .items(&labels)
        .default(0)
        .interact()?;
    match picks.swap_remove(choice).1 {
        RepairPick::Respond(response) => Ok(response),
        RepairPick::EnterValue => {
            let field = repair
                .field
                .as_ref()
                .map_or_else(String::new, ToString::to_string);
            Ok(read_value(format!("{field} for line {}", repair.line))?
                .map_or(DecisionResponse::Skip, DecisionResponse::Value))
        }
    }
}

fn supply_default(display: &str) -> dialoguer::Result<DecisionResponse> {
    println!("{display} is required but the input has no {display} column.");
    Ok(
        read_value(format!("{display} for every row (leave empty to stop)"))?
            .map_or(DecisionResponse::Decline, DecisionResponse::Value),
    )
}

fn offer_default(display: &str, rejected: Option<&str>) -> dialoguer::Result<DecisionResponse> {
    if let Some(reason) = rejected {
        println!("  not accepted, {reason}");
    }
    Ok(
        read_value(format!("Default {display} for every row (leave empty for none)"))?
            .map_or(DecisionResponse::Skip, DecisionResponse::Value),
    )
}

fn review_autofixes(issues: &[CellIssue]) -> dialoguer::Result<DecisionResponse> {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Line"),
        header_cell("Field"),
        header_cell("Current"),
        header_cell("Proposed"),
        header_cell("Fix"),
    ]);
    apply_table_style(&mut table);
    for issue in issues {
        table.add_row(vec![
            Cell::new(issue.line),
            Cell::new(issue.field.as_str()),
            Cell::new(format!("{:?}", issue.raw)),
            Cell::new(format!("{:?}", issue.proposed().unwrap_or_default())),
            Cell::new(issue.fix_kind().map_or("-", |kind| kind.as_str())),
        ]);
    }
    println!("Proposed corrections:\n{table}");
    let choice = Select::new()
        .with_prompt(format!("Apply {} correction(s)?", issues.len()))
        .items(&["Accept all", "Review each", "Decline all", "Abort"])
        .default(0)
        .interact()?;
    Ok(match choice {
        0 => DecisionResponse::Accept,
        1 => DecisionResponse::ReviewEach,
        2 => DecisionResponse::Decline,
        _ => DecisionResponse::Abort,
    })
}

fn review_autofix(issue: &CellIssue) -> dialoguer::Result<DecisionResponse> {
    let proposed = issue.proposed().unwrap_or_default();
    println!(
        "Line {}, {}: {:?} -> {:?}",
        issue.line, issue.field, issue.raw, proposed
    );
    let choice = Select::new()
        .with_prompt("Apply this correction?")
        .items(&["Accept", "Enter a different value", "Decline"])
        .default(0)
        .interact()?;
    Ok(match choice {
        0 => DecisionResponse::Accept,
        1 => read_value(format!("{} for line {}", issue.field, issue.line))?
            .map_or(DecisionResponse::Decline, DecisionResponse::Value),
        _ => DecisionResponse::Decline,
    })
}

fn manual_value(issue: &CellIssue, display: &str) -> dialoguer::Result<DecisionResponse> {
    println!("Line {}, {display}: {:?}", issue.line, issue.raw);
    if let Some(reason) = issue.reason() {
        println!("  {reason}");
    }
    Ok(
        read_value(format!("{display} for line {} (leave empty to skip)", issue.line))?
            .map_or(DecisionResponse::Skip, DecisionResponse::Value),
    )
}
