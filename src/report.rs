//! Presentation-side projection of an [`Aggregation`].
//!
//! The aggregator always computes trends; whether they are shown is decided
//! here, by leaving the field out of the rows.

use chrono::NaiveDate;
use serde::Serialize;

use crate::stats::{Aggregation, ConcertSummary, SongStat};

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Which tables a run should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Songs,
    Concerts,
    Both,
}

impl View {
    pub fn songs(self) -> bool {
        matches!(self, Self::Songs | Self::Both)
    }

    pub fn concerts(self) -> bool {
        matches!(self, Self::Concerts | Self::Both)
    }
}

/// A song statistics row as displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongRow {
    pub song: String,
    pub percent: u32,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Vec<u32>>,
}

/// Project song stats into display rows, dropping the trend unless asked for.
pub fn song_rows(songs: &[SongStat], show_trend: bool) -> Vec<SongRow> {
    songs
        .iter()
        .map(|s| SongRow {
            song: s.name.clone(),
            percent: s.percentage,
            count: s.count,
            trend: show_trend.then(|| s.trend.clone()),
        })
        .collect()
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    years: Option<&'a [i32]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    songs: Option<Vec<SongRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    concerts: Option<&'a [ConcertSummary]>,
}

/// Render the requested tables as pretty-printed JSON.
///
/// `years` is only emitted alongside trends, since it labels their slots.
pub fn to_json(agg: &Aggregation, view: View, show_trend: bool) -> serde_json::Result<String> {
    let report = JsonReport {
        years: (view.songs() && show_trend).then_some(agg.years.as_slice()),
        songs: view.songs().then(|| song_rows(&agg.songs, show_trend)),
        concerts: view.concerts().then_some(agg.concerts.as_slice()),
    };
    serde_json::to_string_pretty(&report)
}

/// Render a trend vector as a unicode sparkline scaled to its own maximum.
/// Years without plays get the lowest bar.
pub fn sparkline(trend: &[u32]) -> String {
    let max = trend.iter().copied().max().unwrap_or(0);
    let top = (SPARK_BARS.len() - 1) as u32;
    trend
        .iter()
        .map(|&v| {
            if max == 0 || v == 0 {
                SPARK_BARS[0]
            } else {
                // ceil(v * top / max) so every play shows above the floor
                let level = (v * top).div_ceil(max).clamp(1, top);
                SPARK_BARS[level as usize]
            }
        })
        .collect()
}

/// Concert dates display as `DD.MM.YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Truncate to `width` characters, marking the cut with "...".
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let keep = width.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
