use anyhow::{Context, Result};
use rusqlite::Connection;

/// Schema of the consuming app's backup format. This is an external
/// contract: table and column names, constraints and indexes must match
/// what the app's restore path expects, byte for byte where it matters.
///
/// Referential actions (CASCADE from workouts, RESTRICT from exercises)
/// are declared here but only enforced once the bulk load re-enables
/// `foreign_keys`.
const DDL: &str = r"
    CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY NOT NULL,
        e1rm_formula TEXT NOT NULL,
        unit_preference TEXT NOT NULL,
        theme_preference TEXT NOT NULL DEFAULT 'system'
    );

    CREATE TABLE IF NOT EXISTS exercises (
        id INTEGER PRIMARY KEY NOT NULL,
        uid TEXT,
        name TEXT NOT NULL UNIQUE,
        description TEXT,
        muscle_group TEXT,
        equipment TEXT,
        is_bodyweight INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER,
        last_rest_seconds INTEGER,
        is_pinned INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS workouts (
        id INTEGER PRIMARY KEY NOT NULL,
        uid TEXT,
        started_at INTEGER NOT NULL,
        completed_at INTEGER,
        note TEXT
    );

    CREATE TABLE IF NOT EXISTS workout_exercises (
        id INTEGER PRIMARY KEY NOT NULL,
        uid TEXT,
        workout_id INTEGER NOT NULL,
        exercise_id INTEGER NOT NULL,
        order_index INTEGER,
        note TEXT,
        current_weight REAL,
        current_reps INTEGER,
        completed_at INTEGER,
        performed_at INTEGER,
        FOREIGN KEY(workout_id) REFERENCES workouts(id) ON DELETE CASCADE,
        FOREIGN KEY(exercise_id) REFERENCES exercises(id) ON DELETE RESTRICT
    );

    CREATE TABLE IF NOT EXISTS sets (
        id INTEGER PRIMARY KEY NOT NULL,
        uid TEXT,
        workout_id INTEGER NOT NULL,
        exercise_id INTEGER NOT NULL,
        workout_exercise_id INTEGER,
        set_group_id TEXT,
        set_index INTEGER,
        weight_kg REAL,
        reps INTEGER,
        rpe REAL,
        rir REAL,
        is_warmup INTEGER NOT NULL DEFAULT 0,
        note TEXT,
        superset_group_id TEXT,
        performed_at INTEGER,
        FOREIGN KEY(workout_id) REFERENCES workouts(id) ON DELETE CASCADE,
        FOREIGN KEY(exercise_id) REFERENCES exercises(id) ON DELETE RESTRICT,
        FOREIGN KEY(workout_exercise_id) REFERENCES workout_exercises(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS pr_events (
        id INTEGER PRIMARY KEY NOT NULL,
        uid TEXT,
        set_id INTEGER NOT NULL,
        exercise_id INTEGER NOT NULL,
        type TEXT NOT NULL,
        metric_value REAL NOT NULL,
        occurred_at INTEGER NOT NULL,
        FOREIGN KEY(set_id) REFERENCES sets(id) ON DELETE CASCADE,
        FOREIGN KEY(exercise_id) REFERENCES exercises(id) ON DELETE RESTRICT
    );

    CREATE INDEX IF NOT EXISTS idx_sets_workout_id ON sets(workout_id);
    CREATE INDEX IF NOT EXISTS idx_sets_exercise_id ON sets(exercise_id);
    CREATE INDEX IF NOT EXISTS idx_sets_performed_at ON sets(performed_at);
    CREATE INDEX IF NOT EXISTS idx_workout_exercises_order ON workout_exercises(workout_id, order_index);

    CREATE UNIQUE INDEX IF NOT EXISTS idx_exercises_uid ON exercises(uid);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_workouts_uid ON workouts(uid);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_workout_exercises_uid ON workout_exercises(uid);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_sets_uid ON sets(uid);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_pr_events_uid ON pr_events(uid);
";

pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(DDL).context("Creating database schema")?;

    conn.execute(
        "INSERT OR IGNORE INTO settings (id, e1rm_formula, unit_preference, theme_preference)
         VALUES (1, 'epley', 'kg', 'system')",
        [],
    )
    .context("Inserting default settings row")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_applies_and_seeds_default_settings() {
        let conn = Connection::open_in_memory().unwrap();
        create_schema(&conn).unwrap();

        let (formula, unit, theme): (String, String, String) = conn
            .query_row(
                "SELECT e1rm_formula, unit_preference, theme_preference FROM settings WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(formula, "epley");
        assert_eq!(unit, "kg");
        assert_eq!(theme, "system");

        // Idempotent: a second application must not duplicate the row.
        create_schema(&conn).unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM settings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }
}
