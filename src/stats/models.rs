use chrono::NaiveDate;
use serde::Serialize;

/// Controls how song occurrences are labelled before counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Count covers, labelled "<song> (<original artist> Cover)".
    /// When false, covers are dropped entirely.
    pub include_covers: bool,
    /// Count annotated versions separately, labelled "<song> (<info>)".
    pub include_variations: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            include_covers: true,
            include_variations: false,
        }
    }
}

/// Play statistics for one normalized song label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongStat {
    pub name: String,
    pub count: u32,
    /// Share of concerts the song was played at, rounded to a whole percent.
    pub percentage: u32,
    /// Plays per year, one slot per entry of [`Aggregation::years`].
    pub trend: Vec<u32>,
}

/// One attended concert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcertSummary {
    pub date: NaiveDate,
    pub city: String,
    pub venue: String,
    pub tour: Option<String>,
    /// Songs counted for this concert under the run's options.
    pub song_count: u32,
    pub url: String,
}

/// Result of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    /// Sorted by descending count; ties keep first-seen order.
    pub songs: Vec<SongStat>,
    /// Same order as the input setlists.
    pub concerts: Vec<ConcertSummary>,
    /// Distinct concert years, ascending. Indexes every `SongStat::trend`.
    pub years: Vec<i32>,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.concerts.is_empty()
    }
}
