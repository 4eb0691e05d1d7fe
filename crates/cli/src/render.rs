//! Plain-text rendering of table summaries for `weave tables`.

use std::fmt::Write;

use weave_core::{ElementSummary, TableRef, TableSummary};

/// Renders one root table as an indented tree:
///
/// ```text
/// library -> LibraryBuilder
///   @name            set_name
///   <book>           add_book -> BookBuilder
///     <section>      add_section -> self
/// ```
pub fn render_table(root: &str, summary: &TableSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} -> {}", root, summary.builder);
    render_body(&mut out, summary, 1);
    out
}

fn line(out: &mut String, depth: usize, label: &str, member: &str) {
    let indent = "  ".repeat(depth);
    let _ = writeln!(out, "{}{:<16} {}", indent, label, member);
}

fn render_body(out: &mut String, summary: &TableSummary, depth: usize) {
    if let Some(member) = &summary.qualified_name {
        line(out, depth, "=name", member);
    }
    for (name, member) in &summary.attributes {
        line(out, depth, &format!("@{}", name), member);
    }
    if let Some(member) = &summary.any_attribute {
        line(out, depth, "@*", member);
    }
    for (name, element) in &summary.elements {
        render_element(out, &format!("<{}>", name), element, depth);
    }
    if let Some(element) = &summary.any_element {
        render_element(out, "<*>", element, depth);
    }
    if let Some(member) = &summary.content {
        line(out, depth, "#text", member);
    }
    if let Some(member) = &summary.comment {
        line(out, depth, "#comment", member);
    }
}

fn render_element(out: &mut String, label: &str, element: &ElementSummary, depth: usize) {
    match &element.table {
        TableRef::Table(sub) => {
            line(
                out,
                depth,
                label,
                &format!("{} -> {}", element.member, sub.builder),
            );
            render_body(out, sub, depth + 1);
        }
        TableRef::Cycle(target) => {
            line(out, depth, label, &format!("{} -> {}", element.member, target));
        }
    }
}
