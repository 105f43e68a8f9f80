use crate::config::Markers;
use crate::guide::{Guide, NavItem};
use crate::model::{NodeRecord, NodeSummary, ParamRecord};

const OTHER_LABEL: &str = "other";

/// Markdown listing grouped by category, categories in first-appearance
/// order. The `" - <axis_b>"` suffix the guide puts on its category headings
/// is dropped for display.
pub fn catalog_markdown(axis_a: &str, axis_b: &str, items: &[NodeSummary]) -> String {
    let mut out = format!("# Node list ({} - {})\n\n", axis_a, axis_b);

    if items.is_empty() {
        out.push_str("No nodes found.\n");
        return out;
    }

    let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(c, _)| *c == item.category) {
            Some((_, names)) => names.push(item.name.as_str()),
            None => groups.push((item.category.as_str(), vec![item.name.as_str()])),
        }
    }

    let suffix = format!(" - {}", axis_b);
    for (category, names) in groups {
        out.push_str(&format!("- **{}**\n", category.replace(&suffix, "")));
        for name in names {
            out.push_str(&format!("  - **{}**\n", name));
        }
        out.push('\n');
    }

    out
}

/// Markdown detail view: description, one parameter table (inputs, outputs,
/// then everything else) and the example in a fenced block.
pub fn record_markdown(record: &NodeRecord, markers: &Markers) -> String {
    let mut out = format!("# {}\n\n**Description**: {}\n\n", record.name, record.description);

    if !(record.inputs.is_empty() && record.outputs.is_empty() && record.other.is_empty()) {
        out.push_str("**Parameters**:\n\n");
        out.push_str("| Role | Name | Type | Description |\n");
        out.push_str("|------|------|------|-------------|\n");

        let rows = [
            (markers.input.as_str(), &record.inputs),
            (markers.output.as_str(), &record.outputs),
            (OTHER_LABEL, &record.other),
        ];
        for (label, params) in rows {
            for p in params {
                out.push_str(&param_row(label, p));
            }
        }
        out.push('\n');
    }

    if !record.example.is_empty() {
        out.push_str(&format!("**Example**:\n```\n{}\n```\n\n", record.example));
    }

    out
}

/// One `axis_a: axis_b, ...` line per registered family.
pub fn routes_text(routes: &[(String, Vec<String>)]) -> String {
    routes
        .iter()
        .map(|(a, bs)| format!("{}: {}\n", a, bs.join(", ")))
        .collect()
}

/// Numbered `[title](id)` list of guide documents.
pub fn navigation_markdown(items: &[NavItem]) -> String {
    if items.is_empty() {
        return "No guide documents found.\n".to_string();
    }
    let mut out = String::from("# Guide documents\n\n");
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. [{}]({})\n", i + 1, item.title, item.id));
    }
    out.push('\n');
    out
}

pub fn guide_markdown(guide: &Guide) -> String {
    format!("# {}\n\n{}\n\n[Source]({})\n\n", guide.title, guide.content, guide.url)
}

fn param_row(label: &str, p: &ParamRecord) -> String {
    format!(
        "| {} | **{}** | {} | {} |\n",
        cell(label),
        cell(&p.name),
        cell(&p.data_type),
        cell(&p.description)
    )
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::model::Role;

    fn summary(name: &str, category: &str) -> NodeSummary {
        NodeSummary {
            name: name.into(),
            description: String::new(),
            category: category.into(),
        }
    }

    fn param(name: &str, role: Role) -> ParamRecord {
        ParamRecord {
            name: name.into(),
            data_type: "int".into(),
            description: "a | b".into(),
            role,
            required: true,
        }
    }

    #[test]
    fn catalog_groups_by_first_appearance() {
        let items = vec![
            summary("a", "通用查询 - 查询节点"),
            summary("b", "变量查询 - 查询节点"),
            summary("c", "通用查询 - 查询节点"),
        ];
        let md = catalog_markdown("服务器节点", "查询节点", &items);
        assert_eq!(
            md,
            "# Node list (服务器节点 - 查询节点)\n\n\
             - **通用查询**\n  - **a**\n  - **c**\n\n\
             - **变量查询**\n  - **b**\n\n"
        );
    }

    #[test]
    fn empty_catalog_says_so() {
        let md = catalog_markdown("A", "p", &[]);
        assert_eq!(md, "# Node list (A - p)\n\nNo nodes found.\n");
    }

    #[test]
    fn record_table_orders_roles() {
        let record = NodeRecord {
            name: "Alpha".into(),
            description: "does alpha".into(),
            category: "X".into(),
            inputs: vec![param("id", Role::Input)],
            outputs: vec![param("ok", Role::Output)],
            other: vec![param("mode", Role::Other)],
            example: "Alpha(1)".into(),
            extracted_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let md = record_markdown(&record, &Markers::default());

        let id = md.find("| 入参 | **id** | int | a \\| b |").unwrap();
        let ok = md.find("| 出参 | **ok** |").unwrap();
        let mode = md.find("| other | **mode** |").unwrap();
        assert!(id < ok && ok < mode);
        assert!(md.starts_with("# Alpha\n\n**Description**: does alpha\n\n"));
        assert!(md.ends_with("**Example**:\n```\nAlpha(1)\n```\n\n"));
    }

    #[test]
    fn record_without_params_or_example() {
        let record = NodeRecord {
            name: "Beta".into(),
            description: String::new(),
            category: "X".into(),
            inputs: vec![],
            outputs: vec![],
            other: vec![],
            example: String::new(),
            extracted_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let md = record_markdown(&record, &Markers::default());
        assert_eq!(md, "# Beta\n\n**Description**: \n\n");
    }

    #[test]
    fn routes_one_line_per_family() {
        let routes = vec![("A".to_string(), vec!["p".to_string(), "q".to_string()])];
        assert_eq!(routes_text(&routes), "A: p, q\n");
    }

    #[test]
    fn navigation_is_numbered() {
        let items = vec![
            NavItem { title: "Intro".into(), id: "doc-1".into() },
            NavItem { title: "Nodes".into(), id: "doc-2".into() },
        ];
        assert_eq!(
            navigation_markdown(&items),
            "# Guide documents\n\n1. [Intro](doc-1)\n2. [Nodes](doc-2)\n\n"
        );
        assert_eq!(navigation_markdown(&[]), "No guide documents found.\n");
    }

    #[test]
    fn guide_links_its_source() {
        let guide = Guide {
            id: "doc-1".into(),
            title: "Intro".into(),
            content: "line one\nline two".into(),
            url: "https://x/doc-1".into(),
        };
        assert_eq!(
            guide_markdown(&guide),
            "# Intro\n\nline one\nline two\n\n[Source](https://x/doc-1)\n\n"
        );
    }
}
