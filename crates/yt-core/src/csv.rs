//! CSV output for export rows.
//!
//! Fields containing a comma are wrapped in double quotes. Embedded quotes
//! are written as-is.

use std::borrow::Cow;
use std::io::{self, Write};

use crate::export::{ExportRow, ExportSettings};

fn field(text: &str) -> Cow<'_, str> {
    if text.contains(',') {
        Cow::Owned(format!("\"{text}\""))
    } else {
        Cow::Borrowed(text)
    }
}

fn write_line<'a, W: Write>(out: &mut W, cells: impl Iterator<Item = &'a str>) -> io::Result<()> {
    let line = cells.map(field).collect::<Vec<_>>().join(",");
    writeln!(out, "{line}")
}

/// Writes a header row of display names followed by one line per row.
pub fn write_csv<W: Write>(
    out: &mut W,
    rows: &[ExportRow],
    settings: &ExportSettings,
) -> io::Result<()> {
    let columns = settings.resolved_columns();
    write_line(
        out,
        settings
            .export_columns
            .iter()
            .map(|key| settings.display_name(key)),
    )?;
    for row in rows {
        write_line(
            out,
            columns
                .iter()
                .map(|column| column.map_or("", |column| row.cell(column))),
        )?;
    }
    Ok(())
}

/// [`write_csv`] into a string.
pub fn render_csv(rows: &[ExportRow], settings: &ExportSettings) -> String {
    let mut out = Vec::new();
    // Writing to a Vec cannot fail.
    let _ = write_csv(&mut out, rows, settings);
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use insta::assert_snapshot;

    use super::*;
    use crate::export::build_rows;
    use crate::interval::Interval;
    use crate::timer::Timer;

    /// 2025-01-27T09:00:00Z
    const MONDAY_9AM: f64 = 1_737_968_400.0;

    fn settings(columns: &[&str]) -> ExportSettings {
        ExportSettings {
            export_columns: columns.iter().map(ToString::to_string).collect(),
            ..ExportSettings::default()
        }
    }

    #[test]
    fn comma_fields_are_quoted() {
        assert_eq!(field("a,b"), "\"a,b\"");
        assert_eq!(field("plain text"), "plain text");
        assert_eq!(field("say \"hi\""), "say \"hi\"");
    }

    #[test]
    fn header_uses_display_names() {
        let csv = render_csv(&[], &settings(&["title", "duration", "color"]));
        assert_eq!(csv, "Ticket Title,Duration,color\n");
    }

    #[test]
    fn unknown_column_renders_empty_cells() {
        let mut timer = Timer::new("A", "", "jira");
        timer
            .intervals
            .replace_all(vec![Interval::new(MONDAY_9AM, MONDAY_9AM + 1800.0).unwrap()]);
        let settings = ExportSettings {
            export_summary_rows: false,
            ..settings(&["title", "color", "duration"])
        };
        let rows = build_rows(&[timer], &settings, &Utc).unwrap();
        assert_eq!(
            render_csv(&rows, &settings),
            "Ticket Title,color,Duration\nA,,0h 30m\n"
        );
    }

    #[test]
    fn renders_full_and_summary_rows() {
        let mut timer = Timer::new("COE-4840", "Login, again", "jira");
        timer.intervals.replace_all(vec![
            Interval::new(MONDAY_9AM, MONDAY_9AM + 4500.0)
                .unwrap()
                .with_note("fixed redirect"),
            Interval::new(MONDAY_9AM + 7200.0, MONDAY_9AM + 9900.0)
                .unwrap()
                .with_exported(true)
                .with_note("wrote tests"),
        ]);
        let settings = ExportSettings {
            export_all: true,
            ..ExportSettings::default()
        };
        let rows = build_rows(&[timer], &settings, &Utc).unwrap();
        assert_snapshot!(render_csv(&rows, &settings), @r#"
        Full/Summary,Source,Already Exported?,Ticket Title,Ticket Description,Work Date,Start Time,End Time,Duration,Work Description
        Full,jira,False,COE-4840,"Login, again",2025-01-27,09:00,10:15,1h 15m,fixed redirect
        Full,jira,True,COE-4840,"Login, again",2025-01-27,11:00,11:45,0h 45m,wrote tests
        Summary,jira,,COE-4840,"Login, again",2025-01-27,,,2.0,fixed redirect. wrote tests.
        "#);
    }
}
