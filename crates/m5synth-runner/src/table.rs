//! Command table rendering for `m5synth table`.

use std::fmt::Write;

use m5synth_protocol::{CommandSpec, FieldSpec, Profile};

use crate::error::Result;

fn describe_field(field: &FieldSpec) -> String {
    let mut text = format!("{}[{}..{}]", field.name, field.min, field.max);
    if field.width == 2 {
        text.push_str(if field.signed { ":i16le" } else { ":u16le" });
    }
    if let Some(default) = field.default {
        let _ = write!(text, "={}", default);
    }
    text
}

fn describe_fields(spec: &CommandSpec) -> String {
    if spec.fields.is_empty() {
        return "(none)".to_string();
    }
    spec.fields
        .iter()
        .map(describe_field)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a profile's table as a box-drawn text table.
pub fn render(profile: Profile) -> String {
    let rows: Vec<(String, &str, String, String)> = profile
        .table()
        .iter()
        .map(|spec| {
            (
                format!("0x{:02X}", spec.id),
                spec.operation.name(),
                spec.min_len().to_string(),
                describe_fields(spec),
            )
        })
        .collect();
    let fields_width = rows
        .iter()
        .map(|r| r.3.chars().count())
        .max()
        .unwrap_or(0)
        .max("Payload".len());

    let rule = |left: &str, mid: &str, right: &str| {
        format!(
            "{}{}{}{}{}{}{}{}{}\n",
            left,
            "─".repeat(6),
            mid,
            "─".repeat(24),
            mid,
            "─".repeat(5),
            mid,
            "─".repeat(fields_width + 2),
            right
        )
    };

    let mut out = String::new();
    out.push_str(&format!("{} command table\n", profile));
    out.push_str(&rule("┌", "┬", "┐"));
    out.push_str(&format!(
        "│ {:^4} │ {:^22} │ {:^3} │ {:^w$} │\n",
        "Id",
        "Operation",
        "Min",
        "Payload",
        w = fields_width
    ));
    out.push_str(&rule("├", "┼", "┤"));
    for (id, name, min_len, fields) in &rows {
        out.push_str(&format!(
            "│ {:4} │ {:22} │ {:>3} │ {:w$} │\n",
            id,
            name,
            min_len,
            fields,
            w = fields_width
        ));
    }
    out.push_str(&rule("└", "┴", "┘"));
    out
}

/// Render a profile's table as pretty JSON.
pub fn render_json(profile: Profile) -> Result<String> {
    Ok(serde_json::to_string_pretty(profile.table())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_every_row() {
        let text = render(Profile::Canonical);
        assert!(text.starts_with("canonical command table\n"));
        assert!(text.contains("│ 0x03 │ set_note_on"));
        assert!(text.contains("baud[1..65535]:u16le=31250"));
        assert!(text.contains("bend[-8192..8191]:i16le"));
        // header, 3 rules, title, one line per row
        assert_eq!(text.lines().count(), 5 + Profile::Canonical.table().len());
    }

    #[test]
    fn test_render_json() {
        let json = render_json(Profile::Legacy).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let rows = value.as_array().unwrap();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[4]["operation"], "set_note_off");
        assert_eq!(rows[4]["id"], 5);
        assert_eq!(rows[4]["fields"][2]["default"], 0);
    }
}
