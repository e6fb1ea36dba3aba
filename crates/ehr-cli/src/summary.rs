use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use ehr_core::{PipelineOutput, SourceSummary};
use ehr_features::FeatureSummary;
use ehr_schema::Registry;

pub fn print_merge_summary(output: &PipelineOutput) {
    println!("{}", merge_summary_table(&output.sources));
    println!(
        "Merged: {} rows x {} columns",
        output.table.height(),
        output.table.width()
    );
    match &output.output_path {
        Some(path) => println!("Output: {}", path.display()),
        None => println!("Output: not written (dry run)"),
    }
}

pub fn merge_summary_table(sources: &[SourceSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Role"),
        header_cell("Raw rows"),
        header_cell("Prepared rows"),
        header_cell("Columns"),
        header_cell("Imputed"),
        header_cell("Dropped"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 2..7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total_raw = 0usize;
    let mut total_imputed = 0usize;
    for summary in sources {
        total_raw += summary.raw_rows;
        total_imputed += summary.imputed_cells;
        table.add_row(vec![
            Cell::new(&summary.source)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            role_cell(summary.role),
            Cell::new(summary.raw_rows),
            Cell::new(summary.prepared_rows),
            Cell::new(summary.columns),
            count_cell(summary.imputed_cells, Color::Yellow),
            count_cell(summary.dropped_rows, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_raw).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(total_imputed).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    table
}

pub fn registry_table(registry: &Registry) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("File"),
        header_cell("Role"),
        header_cell("Key"),
        header_cell("Columns"),
    ]);
    apply_table_style(&mut table);
    for source in registry.sources() {
        let key = source
            .key
            .columns()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let columns = source
            .columns
            .iter()
            .map(|c| format!("{} <- {} ({})", c.name, c.raw, c.kind))
            .collect::<Vec<_>>()
            .join("\n");
        table.add_row(vec![
            Cell::new(&source.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(source.file.display()),
            role_cell(source.key.label()),
            Cell::new(key),
            Cell::new(columns),
        ]);
    }
    table
}

pub fn print_feature_summary(summary: &FeatureSummary) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Rows"), header_cell("Count")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("input"), Cell::new(summary.input_rows)]);
    table.add_row(vec![
        Cell::new("dropped: incomplete"),
        count_cell(summary.dropped_incomplete, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("dropped: age out of range"),
        count_cell(summary.dropped_age, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("output").add_attribute(Attribute::Bold),
        Cell::new(summary.output_rows).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
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
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn role_cell(role: &str) -> Cell {
    match role {
        "primary" => Cell::new(role).fg(Color::Green),
        _ => Cell::new(role).fg(Color::DarkGrey),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
