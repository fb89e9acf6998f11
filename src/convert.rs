use crate::dlog;
use crate::extract::{self, Record, field};
use crate::schema;
use crate::types::ConvertSummary;
use crate::utils::{new_uid, parse_timestamp_ms};
use anyhow::{Context, Result, bail};
use rusqlite::{Connection, Transaction, params};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Section of the export this converter consumes.
const SECTION: &str = "Strength";

/// Convert one CSV export into a fresh SQLite backup file.
///
/// The whole hierarchy build runs inside a single transaction: either every
/// row lands in the output file or none does, so a mid-run failure never
/// leaves a half-populated backup behind.
pub fn convert(input: &Path, output: &Path) -> Result<ConvertSummary> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }

    let text = fs::read_to_string(input)
        .with_context(|| format!("Reading input: {}", input.display()))?;

    let records = extract::extract_records(&text, SECTION)?;
    tracing::info!(rows = records.len(), "extracted data rows");

    if records.is_empty() {
        bail!("No data rows found in {}", input.display());
    }

    // The backup format is snapshot-only: any previous file is replaced.
    if output.exists() {
        fs::remove_file(output)
            .with_context(|| format!("Removing stale output: {}", output.display()))?;
    }

    let mut conn = Connection::open(output)
        .with_context(|| format!("Opening SQLite DB: {}", output.display()))?;

    // Constraints are declared by the schema but not enforced during the
    // bulk load; re-enabled once every row is written.
    conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
    schema::create_schema(&conn)?;

    let tx = conn.transaction().context("Starting import transaction")?;
    let summary = build_hierarchy(&tx, &records)?;
    tx.commit().context("Committing import transaction")?;

    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    tracing::info!(
        exercises = summary.exercises,
        workouts = summary.workouts,
        workout_exercises = summary.workout_exercises,
        sets = summary.sets,
        "conversion done"
    );

    Ok(summary)
}

/// Materialize the workout -> workout-exercise -> set hierarchy from the
/// flat record sequence.
///
/// Identity maps live here and die with the call: exercise names are
/// deduplicated globally across the run, workouts per raw date string,
/// workout-exercises per (workout, exercise) pair.
fn build_hierarchy(tx: &Transaction<'_>, records: &[Record]) -> Result<ConvertSummary> {
    let mut exercises: HashMap<String, i64> = HashMap::new();
    let mut workouts: HashMap<String, i64> = HashMap::new();
    let mut workout_exercises: HashMap<(i64, i64), i64> = HashMap::new();
    let mut set_count = 0usize;

    // Rows without a date cannot be attached to a workout.
    let mut by_date: BTreeMap<&str, Vec<&Record>> = BTreeMap::new();
    for rec in records {
        let date = field(rec, "date");
        if !date.is_empty() {
            by_date.entry(date).or_default().push(rec);
        }
    }

    tracing::info!(days = by_date.len(), "found unique workout days");

    // Most recent workout first; only affects id minting and insert order,
    // kept for output determinism.
    for (&date, day_rows) in by_date.iter().rev() {
        let earliest = day_rows.iter().map(|r| time_of(r)).min().unwrap_or("00:00");
        let latest = day_rows.iter().map(|r| time_of(r)).max().unwrap_or("00:00");

        let started_at = parse_timestamp_ms(date, earliest);
        let completed_at = parse_timestamp_ms(date, latest);

        let workout_id = insert_workout(tx, started_at, completed_at)?;
        workouts.insert(date.to_string(), workout_id);

        dlog!("workout date={date} rows={} start={earliest} end={latest}", day_rows.len());

        // Sub-group by exercise name, preserving first-seen order.
        let mut day_exercises: Vec<(&str, Vec<&Record>)> = Vec::new();
        for &rec in day_rows {
            let name = field(rec, "exercise");
            if name.is_empty() {
                continue;
            }
            match day_exercises.iter_mut().find(|(n, _)| *n == name) {
                Some((_, group)) => group.push(rec),
                None => day_exercises.push((name, vec![rec])),
            }
        }

        for (order, (name, group)) in day_exercises.into_iter().enumerate() {
            let exercise_id = match exercises.get(name) {
                Some(&id) => id,
                None => {
                    let id = insert_exercise(tx, name, started_at)?;
                    exercises.insert(name.to_string(), id);
                    id
                }
            };

            // Note and timestamps for the session entry come from the
            // exercise's first set of the day.
            let first = group[0];
            let performed_at = parse_timestamp_ms(date, time_of(first));
            let note = non_empty(field(first, "notes"));

            let we_id = insert_workout_exercise(
                tx,
                workout_id,
                exercise_id,
                order as i64,
                note,
                performed_at,
            )?;
            workout_exercises.insert((workout_id, exercise_id), we_id);

            for (set_index, rec) in group.into_iter().enumerate() {
                let performed_at = parse_timestamp_ms(date, time_of(rec));

                let weight_raw = field(rec, "weight");
                let weight: Option<f64> = parse_opt(weight_raw).with_context(|| {
                    format!("Parsing weight {weight_raw:?} for {name:?} on {date}")
                })?;

                let reps_raw = field(rec, "# of reps");
                let reps: Option<i64> = parse_opt(reps_raw).with_context(|| {
                    format!("Parsing reps {reps_raw:?} for {name:?} on {date}")
                })?;

                insert_set(
                    tx,
                    &SetRow {
                        workout_id,
                        exercise_id,
                        workout_exercise_id: we_id,
                        set_index: set_index as i64,
                        weight,
                        reps,
                        note: non_empty(field(rec, "notes")),
                        performed_at,
                    },
                )?;
                set_count += 1;
            }
        }
    }

    Ok(ConvertSummary {
        exercises: exercises.len(),
        workouts: workouts.len(),
        workout_exercises: workout_exercises.len(),
        sets: set_count,
    })
}

/// Time-of-day field, defaulting to midnight when absent.
fn time_of(rec: &Record) -> &str {
    let t = field(rec, "time");
    if t.is_empty() { "00:00" } else { t }
}

fn non_empty(s: &str) -> Option<&str> {
    (!s.is_empty()).then_some(s)
}

/// Blank -> absent; non-blank must parse, anything else is fatal for the
/// run (no silent defaulting, no per-row skipping).
fn parse_opt<T: std::str::FromStr>(raw: &str) -> Result<Option<T>, T::Err> {
    if raw.is_empty() {
        Ok(None)
    } else {
        raw.parse().map(Some)
    }
}

fn insert_workout(tx: &Transaction<'_>, started_at: i64, completed_at: i64) -> Result<i64> {
    tx.execute(
        "INSERT INTO workouts (uid, started_at, completed_at) VALUES (?1, ?2, ?3)",
        params![new_uid(), started_at, completed_at],
    )
    .context("Inserting workout")?;
    Ok(tx.last_insert_rowid())
}

fn insert_exercise(tx: &Transaction<'_>, name: &str, created_at: i64) -> Result<i64> {
    tx.execute(
        "INSERT INTO exercises (uid, name, created_at) VALUES (?1, ?2, ?3)",
        params![new_uid(), name, created_at],
    )
    .with_context(|| format!("Inserting exercise {name:?}"))?;
    Ok(tx.last_insert_rowid())
}

fn insert_workout_exercise(
    tx: &Transaction<'_>,
    workout_id: i64,
    exercise_id: i64,
    order_index: i64,
    note: Option<&str>,
    performed_at: i64,
) -> Result<i64> {
    tx.execute(
        "INSERT INTO workout_exercises
           (uid, workout_id, exercise_id, order_index, note, performed_at, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            new_uid(),
            workout_id,
            exercise_id,
            order_index,
            note,
            performed_at,
            performed_at,
        ],
    )
    .context("Inserting workout exercise")?;
    Ok(tx.last_insert_rowid())
}

struct SetRow<'a> {
    workout_id: i64,
    exercise_id: i64,
    workout_exercise_id: i64,
    set_index: i64,
    weight: Option<f64>,
    reps: Option<i64>,
    note: Option<&'a str>,
    performed_at: i64,
}

fn insert_set(tx: &Transaction<'_>, s: &SetRow<'_>) -> Result<()> {
    tx.execute(
        "INSERT INTO sets
           (uid, workout_id, exercise_id, workout_exercise_id, set_index,
            weight_kg, reps, note, performed_at, is_warmup)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
        params![
            new_uid(),
            s.workout_id,
            s.exercise_id,
            s.workout_exercise_id,
            s.set_index,
            s.weight,
            s.reps,
            s.note,
            s.performed_at,
        ],
    )
    .context("Inserting set")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_numeric_fields_are_absent() {
        assert_eq!(parse_opt::<f64>("").unwrap(), None);
        assert_eq!(parse_opt::<i64>("").unwrap(), None);
        assert_eq!(parse_opt::<f64>("52.5").unwrap(), Some(52.5));
        assert_eq!(parse_opt::<i64>("8").unwrap(), Some(8));
    }

    #[test]
    fn non_numeric_fields_are_errors() {
        assert!(parse_opt::<f64>("heavy").is_err());
        assert!(parse_opt::<i64>("6-8").is_err());
    }
}
