use serde::{Deserialize, Serialize};

/// One page of `GET /user/{userId}/attended`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendedPage {
    /// Grand total of attended setlists for the user, across all pages.
    pub total: usize,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub items_per_page: u32,
    #[serde(default)]
    pub setlist: Vec<Setlist>,
}

/// A single attended concert as setlist.fm reports it.
///
/// Everything except the artist is optional at the wire level; the
/// aggregator decides which missing pieces are fatal.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setlist {
    #[serde(default)]
    pub id: Option<String>,
    /// `dd-MM-yyyy` on the wire.
    #[serde(default)]
    pub event_date: Option<String>,
    pub artist: Artist,
    #[serde(default)]
    pub venue: Option<Venue>,
    #[serde(default)]
    pub tour: Option<Tour>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub sets: Option<Sets>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub mbid: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Venue {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub city: Option<City>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct City {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Tour {
    #[serde(default)]
    pub name: Option<String>,
}

/// Wrapper object: setlist.fm nests the set array one level deeper.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Sets {
    #[serde(default)]
    pub set: Option<Vec<Set>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Set {
    #[serde(default)]
    pub name: Option<String>,
    /// 1-based encore number, absent for the main set.
    #[serde(default)]
    pub encore: Option<u32>,
    #[serde(default)]
    pub song: Option<Vec<Song>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Song {
    /// Empty when the song is unknown.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cover: Option<Cover>,
    /// Free-text annotation ("acoustic", "with intro", ...).
    #[serde(default)]
    pub info: Option<String>,
    #[serde(default)]
    pub tape: bool,
}

/// Original artist of a covered song.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Cover {
    #[serde(default)]
    pub name: Option<String>,
}
