use tracing::debug;

use super::contains_any;
use crate::config::Markers;
use crate::model::{ParamRecord, Role};
use crate::parser::tree::TableData;

const MIN_CELLS: usize = 4;

#[derive(Debug, Default)]
pub struct ParsedParams {
    pub inputs: Vec<ParamRecord>,
    pub outputs: Vec<ParamRecord>,
    pub other: Vec<ParamRecord>,
    /// Rows with fewer than four cells.
    pub malformed: usize,
    /// Blank separator rows and repeated header rows.
    pub skipped: usize,
}

/// Read parameter rows from a table laid out as
/// `role | name | type | description`. The first row is the header.
pub fn parse_table(table: &TableData, markers: &Markers) -> ParsedParams {
    let mut parsed = ParsedParams::default();

    for (i, cells) in table.rows.iter().enumerate().skip(1) {
        if cells.len() < MIN_CELLS {
            debug!("Table row {} has {} cells, skipping", i, cells.len());
            parsed.malformed += 1;
            continue;
        }

        let role_label = cells[0].trim();
        let name = cells[1].trim();
        let data_type = cells[2].trim();
        let description = cells[3].trim();

        if role_label.is_empty() && name.is_empty() && data_type.is_empty() && description.is_empty() {
            parsed.skipped += 1;
            continue;
        }

        if is_header_row(role_label, name, markers) {
            debug!("Table row {} repeats the header, skipping", i);
            parsed.skipped += 1;
            continue;
        }

        let role = classify_role(role_label, markers);
        let param = ParamRecord {
            name: name.to_string(),
            data_type: data_type.to_string(),
            description: description.to_string(),
            role,
            required: true,
        };

        match role {
            Role::Input => parsed.inputs.push(param),
            Role::Output => parsed.outputs.push(param),
            Role::Other => parsed.other.push(param),
        }
    }

    parsed
}

/// Exact token match; anything else (an empty label included) is `Other`.
pub fn classify_role(label: &str, markers: &Markers) -> Role {
    if label == markers.input {
        Role::Input
    } else if label == markers.output {
        Role::Output
    } else {
        Role::Other
    }
}

fn is_header_row(role_label: &str, name: &str, markers: &Markers) -> bool {
    contains_any(role_label, std::slice::from_ref(&markers.header_role))
        || contains_any(name, std::slice::from_ref(&markers.header_name))
}
