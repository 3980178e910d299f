pub mod models;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::setlist::models::{Setlist, Song};
pub use models::{AggregateOptions, Aggregation, ConcertSummary, SongStat};

/// A setlist too broken to count. Aggregation stops at the first one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Setlist {setlist}: invalid event date {date:?}")]
    InvalidDate { setlist: String, date: String },
    #[error("Setlist {setlist}: missing {field}")]
    MissingField {
        setlist: String,
        field: &'static str,
    },
}

/// Running counts for one song label.
struct SongTally {
    name: String,
    count: u32,
    by_year: BTreeMap<i32, u32>,
}

/// Song tallies in first-seen order, indexed by label.
#[derive(Default)]
struct SongCounter {
    index: HashMap<String, usize>,
    tallies: Vec<SongTally>,
}

impl SongCounter {
    fn record(&mut self, label: String, year: i32) {
        let idx = match self.index.get(&label) {
            Some(&idx) => idx,
            None => {
                let idx = self.tallies.len();
                self.index.insert(label.clone(), idx);
                self.tallies.push(SongTally {
                    name: label,
                    count: 0,
                    by_year: BTreeMap::new(),
                });
                idx
            }
        };
        let tally = &mut self.tallies[idx];
        tally.count += 1;
        *tally.by_year.entry(year).or_insert(0) += 1;
    }
}

/// Build song statistics and concert summaries from already-filtered setlists.
///
/// Every counter lives inside this call. The first structurally broken
/// setlist (bad date, no venue/city, no URL, no song lists, a cover without
/// its original artist) aborts the run.
pub fn aggregate(
    setlists: &[Setlist],
    options: &AggregateOptions,
) -> Result<Aggregation, DataError> {
    if setlists.is_empty() {
        log::info!("No setlists to aggregate");
        return Ok(Aggregation::default());
    }

    let mut counter = SongCounter::default();
    let mut years = BTreeSet::new();
    let mut concerts = Vec::with_capacity(setlists.len());

    for (i, setlist) in setlists.iter().enumerate() {
        let label = describe(setlist, i);
        let date = concert_date(setlist, &label)?;
        let (venue, city) = venue_and_city(setlist, &label)?;
        let url = setlist
            .url
            .clone()
            .ok_or_else(|| missing(&label, "url"))?;

        let year = date.year();
        years.insert(year);

        let mut song_count = 0;
        for song in setlist_songs(setlist, &label)? {
            let nameless_cover = song.cover.as_ref().is_some_and(|c| c.name.is_none());
            if nameless_cover && !song.name.trim().is_empty() {
                return Err(missing(&label, "cover artist"));
            }
            if let Some(name) = song_label(song, options) {
                counter.record(name, year);
                song_count += 1;
            }
        }
        log::debug!("{date} {venue}, {city}: {song_count} songs");

        concerts.push(ConcertSummary {
            date,
            city,
            venue,
            tour: setlist.tour.as_ref().and_then(|t| t.name.clone()),
            song_count,
            url,
        });
    }

    let years: Vec<i32> = years.into_iter().collect();
    let concert_count = concerts.len();

    let mut songs: Vec<SongStat> = counter
        .tallies
        .into_iter()
        .map(|t| SongStat {
            trend: years
                .iter()
                .map(|y| t.by_year.get(y).copied().unwrap_or(0))
                .collect(),
            percentage: percentage(t.count, concert_count),
            count: t.count,
            name: t.name,
        })
        .collect();

    // Stable: equal counts stay in first-seen order
    songs.sort_by(|a, b| b.count.cmp(&a.count));

    log::info!(
        "Aggregated {} concerts across {} years: {} distinct songs",
        concert_count,
        years.len(),
        songs.len()
    );

    Ok(Aggregation {
        songs,
        concerts,
        years,
    })
}

/// Label a song occurrence for counting, or `None` if it doesn't count.
///
/// Unknown (blank) songs never count. Covers are dropped unless
/// `include_covers`, in which case the original artist is appended; a
/// variation annotation is appended after that when `include_variations`.
/// A cover with no original artist gets no label.
pub fn song_label(song: &Song, options: &AggregateOptions) -> Option<String> {
    if song.name.trim().is_empty() {
        return None;
    }

    let mut label = match &song.cover {
        Some(_) if !options.include_covers => return None,
        Some(cover) => format!("{} ({} Cover)", song.name, cover.name.as_deref()?),
        None => song.name.clone(),
    };

    if options.include_variations {
        if let Some(info) = song.info.as_deref().filter(|i| !i.trim().is_empty()) {
            label = format!("{label} ({info})");
        }
    }

    Some(label)
}

/// Parse an event date in either `YYYY-MM-DD` or setlist.fm's `DD-MM-YYYY`.
///
/// The layout is picked by which end holds the four-digit year.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let first = raw.split('-').next()?;
    let last = raw.rsplit('-').next()?;

    let format = if first.len() == 4 {
        "%Y-%m-%d"
    } else if last.len() == 4 {
        "%d-%m-%Y"
    } else {
        return None;
    };
    NaiveDate::parse_from_str(raw, format).ok()
}

/// Share of `concerts` a song with `count` plays appeared at.
/// Halves round to even.
fn percentage(count: u32, concerts: usize) -> u32 {
    if concerts == 0 {
        return 0;
    }
    (f64::from(count) / concerts as f64 * 100.0).round_ties_even() as u32
}

fn describe(setlist: &Setlist, index: usize) -> String {
    setlist
        .id
        .clone()
        .unwrap_or_else(|| format!("#{}", index + 1))
}

fn missing(setlist: &str, field: &'static str) -> DataError {
    DataError::MissingField {
        setlist: setlist.to_string(),
        field,
    }
}

fn concert_date(setlist: &Setlist, label: &str) -> Result<NaiveDate, DataError> {
    let raw = setlist
        .event_date
        .as_deref()
        .ok_or_else(|| missing(label, "event date"))?;
    parse_event_date(raw).ok_or_else(|| DataError::InvalidDate {
        setlist: label.to_string(),
        date: raw.to_string(),
    })
}

fn venue_and_city(setlist: &Setlist, label: &str) -> Result<(String, String), DataError> {
    let venue = setlist.venue.as_ref().ok_or_else(|| missing(label, "venue"))?;
    let name = venue.name.clone().ok_or_else(|| missing(label, "venue name"))?;
    let city = venue
        .city
        .as_ref()
        .and_then(|c| c.name.clone())
        .ok_or_else(|| missing(label, "venue city"))?;
    Ok((name, city))
}

fn setlist_songs<'a>(setlist: &'a Setlist, label: &str) -> Result<Vec<&'a Song>, DataError> {
    let sets = setlist
        .sets
        .as_ref()
        .and_then(|s| s.set.as_ref())
        .ok_or_else(|| missing(label, "sets"))?;

    let mut songs = Vec::new();
    for set in sets {
        let list = set
            .song
            .as_ref()
            .ok_or_else(|| missing(label, "song list"))?;
        songs.extend(list);
    }
    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setlist::models::{Artist, City, Cover, Set, Sets, Tour, Venue};

    fn song(name: &str) -> Song {
        Song {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn cover(name: &str, original: &str) -> Song {
        Song {
            name: name.to_string(),
            cover: Some(Cover {
                name: Some(original.to_string()),
            }),
            ..Default::default()
        }
    }

    fn variant(name: &str, info: &str) -> Song {
        Song {
            name: name.to_string(),
            info: Some(info.to_string()),
            ..Default::default()
        }
    }

    fn concert(id: &str, date: &str, sets: Vec<Vec<Song>>) -> Setlist {
        Setlist {
            id: Some(id.to_string()),
            event_date: Some(date.to_string()),
            artist: Artist {
                name: "Die Ärzte".to_string(),
                mbid: None,
            },
            venue: Some(Venue {
                name: Some(format!("Halle {id}")),
                city: Some(City {
                    name: Some("Berlin".to_string()),
                }),
            }),
            tour: None,
            url: Some(format!("https://www.setlist.fm/setlist/{id}.html")),
            sets: Some(Sets {
                set: Some(
                    sets.into_iter()
                        .map(|songs| Set {
                            name: None,
                            encore: None,
                            song: Some(songs),
                        })
                        .collect(),
                ),
            }),
        }
    }

    fn names(agg: &Aggregation) -> Vec<&str> {
        agg.songs.iter().map(|s| s.name.as_str()).collect()
    }

    fn stat<'a>(agg: &'a Aggregation, name: &str) -> &'a SongStat {
        agg.songs
            .iter()
            .find(|s| s.name == name)
            .unwrap_or_else(|| panic!("no stat for {name}"))
    }

    fn covers_on() -> AggregateOptions {
        AggregateOptions {
            include_covers: true,
            include_variations: false,
        }
    }

    #[test]
    fn test_two_years_counts_percent_trend() {
        let setlists = vec![
            concert("c1", "2019-06-01", vec![vec![song("A"), song("B")]]),
            concert("c2", "2021-07-10", vec![vec![song("A")]]),
        ];
        let agg = aggregate(&setlists, &covers_on()).unwrap();

        assert_eq!(agg.years, vec![2019, 2021]);
        assert_eq!(names(&agg), vec!["A", "B"]);

        let a = stat(&agg, "A");
        assert_eq!((a.count, a.percentage), (2, 100));
        assert_eq!(a.trend, vec![1, 1]);

        let b = stat(&agg, "B");
        assert_eq!((b.count, b.percentage), (1, 50));
        assert_eq!(b.trend, vec![1, 0]);
    }

    #[test]
    fn test_cover_excluded_when_covers_off() {
        let setlists = vec![concert(
            "c1",
            "2019-06-01",
            vec![vec![song("A"), cover("Y", "X")]],
        )];
        let options = AggregateOptions {
            include_covers: false,
            include_variations: false,
        };
        let agg = aggregate(&setlists, &options).unwrap();

        assert_eq!(names(&agg), vec!["A"]);
        assert_eq!(agg.concerts[0].song_count, 1);
    }

    #[test]
    fn test_cover_labelled_when_covers_on() {
        let setlists = vec![concert("c1", "2019-06-01", vec![vec![cover("Y", "X")]])];
        let agg = aggregate(&setlists, &covers_on()).unwrap();

        assert_eq!(names(&agg), vec!["Y (X Cover)"]);
        assert_eq!(agg.concerts[0].song_count, 1);
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let agg = aggregate(&[], &covers_on()).unwrap();
        assert!(agg.songs.is_empty());
        assert!(agg.concerts.is_empty());
        assert!(agg.years.is_empty());
        assert!(agg.is_empty());
    }

    #[test]
    fn test_blank_names_never_counted() {
        let setlists = vec![concert(
            "c1",
            "2019-06-01",
            vec![vec![song(""), song("A"), song("   ")], vec![song("")]],
        )];
        let agg = aggregate(&setlists, &covers_on()).unwrap();

        assert_eq!(names(&agg), vec!["A"]);
        assert_eq!(agg.concerts[0].song_count, 1);
    }

    #[test]
    fn test_variations_split_only_when_enabled() {
        let setlists = vec![concert(
            "c1",
            "2019-06-01",
            vec![vec![song("Zu spät"), variant("Zu spät", "acoustic")]],
        )];

        let merged = aggregate(&setlists, &covers_on()).unwrap();
        assert_eq!(names(&merged), vec!["Zu spät"]);
        assert_eq!(stat(&merged, "Zu spät").count, 2);

        let split = aggregate(
            &setlists,
            &AggregateOptions {
                include_covers: true,
                include_variations: true,
            },
        )
        .unwrap();
        assert_eq!(names(&split), vec!["Zu spät", "Zu spät (acoustic)"]);
    }

    #[test]
    fn test_cover_then_variation_suffix() {
        let mut s = cover("Y", "X");
        s.info = Some("with intro".to_string());
        let options = AggregateOptions {
            include_covers: true,
            include_variations: true,
        };
        assert_eq!(
            song_label(&s, &options).as_deref(),
            Some("Y (X Cover) (with intro)")
        );
    }

    #[test]
    fn test_blank_info_is_not_a_variation() {
        let options = AggregateOptions {
            include_covers: true,
            include_variations: true,
        };
        assert_eq!(song_label(&variant("A", "  "), &options).as_deref(), Some("A"));
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let setlists = vec![
            concert("c1", "2019-06-01", vec![vec![song("C"), song("B"), song("A")]]),
            concert("c2", "2019-06-02", vec![vec![song("A"), song("D")]]),
        ];
        let agg = aggregate(&setlists, &covers_on()).unwrap();
        assert_eq!(names(&agg), vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_repeated_runs_identical() {
        let setlists = vec![
            concert("c1", "2018-01-01", vec![vec![song("B"), song("A")]]),
            concert("c2", "2020-01-01", vec![vec![song("A"), song("C")], vec![song("B")]]),
            concert("c3", "2019-01-01", vec![vec![song("C")]]),
        ];
        let first = aggregate(&setlists, &covers_on()).unwrap();
        let second = aggregate(&setlists, &covers_on()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_trend_length_and_sum_match_count() {
        let setlists = vec![
            concert("c1", "2016-05-01", vec![vec![song("A"), song("B")]]),
            concert("c2", "2019-05-01", vec![vec![song("A")], vec![song("A")]]),
            concert("c3", "2016-09-01", vec![vec![song("C"), song("B")]]),
            concert("c4", "2023-01-01", vec![vec![song("C")]]),
        ];
        let agg = aggregate(&setlists, &covers_on()).unwrap();

        assert_eq!(agg.years, vec![2016, 2019, 2023]);
        for s in &agg.songs {
            assert_eq!(s.trend.len(), agg.years.len(), "{}", s.name);
            assert_eq!(s.trend.iter().sum::<u32>(), s.count, "{}", s.name);
            assert!(s.percentage <= 100, "{}", s.name);
        }
        assert_eq!(stat(&agg, "A").trend, vec![1, 2, 0]);
        assert_eq!(stat(&agg, "C").trend, vec![1, 0, 1]);
    }

    #[test]
    fn test_percentage_rounds_half_to_even() {
        assert_eq!(percentage(1, 8), 12);
        assert_eq!(percentage(3, 8), 38);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(5, 5), 100);
        assert_eq!(percentage(1, 0), 0);
    }

    #[test]
    fn test_concert_summaries_keep_input_order() {
        let mut later = concert("late", "2022-03-03", vec![vec![song("A"), song("B")]]);
        later.tour = Some(Tour {
            name: Some("Dunkel Tour".to_string()),
        });
        let setlists = vec![later, concert("early", "03-03-2012", vec![vec![song("A")]])];
        let agg = aggregate(&setlists, &covers_on()).unwrap();

        let c = &agg.concerts;
        assert_eq!(c[0].date, NaiveDate::from_ymd_opt(2022, 3, 3).unwrap());
        assert_eq!(c[0].tour.as_deref(), Some("Dunkel Tour"));
        assert_eq!(c[0].song_count, 2);
        assert_eq!(c[0].venue, "Halle late");
        assert_eq!(c[0].city, "Berlin");
        assert_eq!(c[0].url, "https://www.setlist.fm/setlist/late.html");
        assert_eq!(c[1].date, NaiveDate::from_ymd_opt(2012, 3, 3).unwrap());
        assert!(c[1].tour.is_none());
        assert_eq!(agg.years, vec![2012, 2022]);
    }

    #[test]
    fn test_concert_with_no_songs_still_counts() {
        let setlists = vec![
            concert("c1", "2019-06-01", vec![vec![song("A")]]),
            concert("c2", "2019-06-02", vec![]),
        ];
        let agg = aggregate(&setlists, &covers_on()).unwrap();
        assert_eq!(agg.concerts[1].song_count, 0);
        assert_eq!(stat(&agg, "A").percentage, 50);
    }

    #[test]
    fn test_parse_event_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1993, 8, 23);
        assert_eq!(parse_event_date("1993-08-23"), expected);
        assert_eq!(parse_event_date("23-08-1993"), expected);
        assert_eq!(parse_event_date(" 23-08-1993 "), expected);

        assert_eq!(parse_event_date("2019-13-01"), None);
        assert_eq!(parse_event_date("31-02-2019"), None);
        assert_eq!(parse_event_date("19-08-23"), None);
        assert_eq!(parse_event_date(""), None);
        assert_eq!(parse_event_date("yesterday"), None);
    }

    #[test]
    fn test_invalid_date_fails() {
        let setlists = vec![concert("bad", "2019/06/01", vec![vec![song("A")]])];
        let err = aggregate(&setlists, &covers_on()).unwrap_err();
        assert_eq!(
            err,
            DataError::InvalidDate {
                setlist: "bad".to_string(),
                date: "2019/06/01".to_string()
            }
        );
    }

    #[test]
    fn test_missing_structure_fails() {
        let mut no_venue = concert("v", "2019-06-01", vec![vec![song("A")]]);
        no_venue.venue = None;
        let mut no_city = concert("c", "2019-06-01", vec![vec![song("A")]]);
        no_city.venue.as_mut().unwrap().city = None;
        let mut no_sets = concert("s", "2019-06-01", vec![]);
        no_sets.sets = None;
        let mut no_songs = concert("n", "2019-06-01", vec![vec![song("A")]]);
        no_songs.sets.as_mut().unwrap().set.as_mut().unwrap()[0].song = None;
        let mut no_url = concert("u", "2019-06-01", vec![vec![song("A")]]);
        no_url.url = None;
        let mut no_date = concert("d", "2019-06-01", vec![vec![song("A")]]);
        no_date.event_date = None;

        let cases = [
            (no_venue, "venue"),
            (no_city, "venue city"),
            (no_sets, "sets"),
            (no_songs, "song list"),
            (no_url, "url"),
            (no_date, "event date"),
        ];
        for (setlist, field) in cases {
            let id = setlist.id.clone().unwrap();
            let err = aggregate(&[setlist], &covers_on()).unwrap_err();
            assert_eq!(err, DataError::MissingField { setlist: id, field });
        }
    }

    #[test]
    fn test_nameless_tour_is_no_tour() {
        let mut s = concert("t", "2019-06-01", vec![vec![song("A")]]);
        s.tour = Some(Tour { name: None });
        let agg = aggregate(&[s], &covers_on()).unwrap();
        assert!(agg.concerts[0].tour.is_none());
    }

    #[test]
    fn test_cover_without_original_artist_fails() {
        let mut nameless = song("Y");
        nameless.cover = Some(Cover { name: None });
        let setlists = vec![concert("c", "2019-06-01", vec![vec![song("A"), nameless]])];

        for include_covers in [true, false] {
            let options = AggregateOptions {
                include_covers,
                include_variations: false,
            };
            let err = aggregate(&setlists, &options).unwrap_err();
            assert_eq!(
                err,
                DataError::MissingField {
                    setlist: "c".to_string(),
                    field: "cover artist"
                }
            );
        }
        let unlabelled = Song {
            cover: Some(Cover { name: None }),
            ..song("Y")
        };
        assert_eq!(song_label(&unlabelled, &covers_on()), None);
    }

    #[test]
    fn test_broken_setlist_discards_everything() {
        let mut broken = concert("b", "2020-01-01", vec![vec![song("A")]]);
        broken.venue = None;
        let setlists = vec![concert("ok", "2019-01-01", vec![vec![song("A")]]), broken];
        assert!(aggregate(&setlists, &covers_on()).is_err());
    }

    #[test]
    fn test_error_names_setlist_by_position_without_id() {
        let mut s = concert("x", "not-a-date", vec![]);
        s.id = None;
        let err = aggregate(&[concert("ok", "2019-01-01", vec![]), s], &covers_on()).unwrap_err();
        assert_eq!(err.to_string(), "Setlist #2: invalid event date \"not-a-date\"");
    }
}
