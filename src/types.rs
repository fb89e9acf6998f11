/// Entity counts produced by one conversion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertSummary {
    pub exercises: usize,
    pub workouts: usize,
    pub workout_exercises: usize,
    pub sets: usize,
}
