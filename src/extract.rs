use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// One normalized data row: lowercased+trimmed column name -> trimmed value.
pub type Record = BTreeMap<String, String>;

const SECTION_MARKER: &str = "-----";

/// Look up a field by column name, case- and whitespace-insensitively.
/// Missing fields read as empty.
pub fn field<'a>(rec: &'a Record, name: &str) -> &'a str {
    rec.get(&name.to_ascii_lowercase())
        .map_or("", String::as_str)
}

/// Extract normalized records from a multi-section delimited export.
///
/// Sections are delimited by `-----<Name>-----` marker lines; only rows of
/// the named section are parsed. If no matching marker exists anywhere, the
/// whole document is parsed as a single table (first line = header) as a
/// best-effort path for malformed or foreign exports.
pub fn extract_records(text: &str, section: &str) -> Result<Vec<Record>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if let Some(lines) = section_lines(text, section) {
        return parse_table(&lines);
    }

    tracing::warn!(section, "section marker not found, parsing whole document");
    let mut lines: Vec<&str> = text.lines().collect();
    if lines
        .first()
        .is_some_and(|l| l.trim().starts_with(SECTION_MARKER))
    {
        lines.remove(0);
    }
    parse_table(&lines)
}

/// Lines belonging to the named section (header first), or `None` if no
/// marker for it exists in the document.
fn section_lines<'a>(text: &'a str, section: &str) -> Option<Vec<&'a str>> {
    let mut collecting = false;
    let mut out: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with(SECTION_MARKER) {
            if trimmed.contains(section) {
                collecting = true;
                continue;
            }
            if collecting {
                break;
            }
            continue;
        }

        if collecting {
            out.push(line);
        }
    }

    collecting.then_some(out)
}

/// Parse header + data lines with the csv tokenizer, trimming names and
/// values and dropping rows that are empty after trimming.
fn parse_table(lines: &[&str]) -> Result<Vec<Record>> {
    let mut nonempty = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty());

    let Some(header) = nonempty.next() else {
        return Ok(Vec::new());
    };

    let mut content = String::from(header);
    for line in nonempty {
        content.push('\n');
        content.push_str(line);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = rdr.headers().context("reading csv header")?.clone();
    let mut out: Vec<Record> = Vec::new();

    for row in rdr.records() {
        let row = row.context("parsing csv row")?;

        let mut rec = Record::new();
        for (name, value) in headers.iter().zip(row.iter()) {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            rec.insert(name.to_ascii_lowercase(), value.trim().to_string());
        }

        if rec.values().any(|v| !v.is_empty()) {
            out.push(rec);
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
-----Cardio-----
Date,Duration
\"18/01/2026\",\"00:30\"
-----Strength-----
Date,Time,Exercise,# of Reps,Weight,Notes
\"19/01/2026\",\"18:34\",\"Bicep Curl\",\"6\",\"50\",\"Right\"
\"19/01/2026\",\"18:40\",\"Bicep Curl\",\"8\",\"52.5\",\"\"
-----Measurements-----
Date,Weight
\"19/01/2026\",\"80\"
";

    #[test]
    fn isolates_the_named_section() {
        let recs = extract_records(EXPORT, "Strength").unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(field(&recs[0], "Exercise"), "Bicep Curl");
        assert_eq!(field(&recs[1], "Weight"), "52.5");
        // Cardio and Measurements rows must not leak in.
        assert_eq!(field(&recs[0], "Duration"), "");
    }

    #[test]
    fn field_lookup_is_case_insensitive() {
        let recs = extract_records(EXPORT, "Strength").unwrap();
        assert_eq!(field(&recs[0], "exercise"), "Bicep Curl");
        assert_eq!(field(&recs[0], "# OF REPS"), "6");
        assert_eq!(field(&recs[0], "no such column"), "");
    }

    #[test]
    fn trims_header_names_and_values() {
        let text = "-----Strength-----\n Date , Exercise \n\" 19/01/2026 \",\"  Squat \"\n";
        let recs = extract_records(text, "Strength").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(field(&recs[0], "date"), "19/01/2026");
        assert_eq!(field(&recs[0], "exercise"), "Squat");
    }

    #[test]
    fn drops_rows_empty_after_trimming() {
        let text = "-----Strength-----\nDate,Exercise\n\"\",\"  \"\n\n\"19/01/2026\",\"Squat\"\n";
        let recs = extract_records(text, "Strength").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(field(&recs[0], "exercise"), "Squat");
    }

    #[test]
    fn quoted_values_may_contain_commas() {
        let text = "-----Strength-----\nDate,Exercise,Notes\n\"19/01/2026\",\"Squat\",\"slow, paused reps\"\n";
        let recs = extract_records(text, "Strength").unwrap();
        assert_eq!(field(&recs[0], "notes"), "slow, paused reps");
    }

    #[test]
    fn falls_back_to_whole_document_without_marker() {
        let text = "Date,Time,Exercise\n\"19/01/2026\",\"18:34\",\"Bicep Curl\"\n";
        let recs = extract_records(text, "Strength").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(field(&recs[0], "exercise"), "Bicep Curl");
    }

    #[test]
    fn fallback_skips_a_leading_foreign_marker() {
        let text = "-----Cardio-----\nDate,Exercise\n\"19/01/2026\",\"Row\"\n";
        let recs = extract_records(text, "Strength").unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(field(&recs[0], "exercise"), "Row");
    }

    #[test]
    fn header_only_section_yields_zero_records() {
        let text = "-----Strength-----\nDate,Time,Exercise,# of Reps,Weight,Notes\n";
        let recs = extract_records(text, "Strength").unwrap();
        assert!(recs.is_empty());
    }

    #[test]
    fn strips_a_utf8_bom() {
        let text = "\u{feff}-----Strength-----\nDate,Exercise\n\"19/01/2026\",\"Squat\"\n";
        let recs = extract_records(text, "Strength").unwrap();
        assert_eq!(recs.len(), 1);
    }
}
