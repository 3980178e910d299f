pub mod models;

use std::thread;
use std::time::Duration;

use indicatif::ProgressBar;
use thiserror::Error;

use models::{AttendedPage, Setlist};

/// setlist.fm REST API root.
pub const DEFAULT_BASE_URL: &str = "https://api.setlist.fm/rest/1.0";

/// Upper bound on pages requested for one user.
pub const DEFAULT_MAX_PAGES: u32 = 100;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("User id must not be empty")]
    InvalidUser,
    #[error("setlist.fm returned HTTP {code} for page {page}")]
    Status { page: u32, code: u16 },
    #[error("Request for page {page} failed: {message}")]
    Transport { page: u32, message: String },
    #[error("Page {page} is not a valid attended-setlists response: {message}")]
    Malformed { page: u32, message: String },
    #[error("Page {page} came back empty with {fetched} of {total} setlists fetched")]
    ShortPage { page: u32, fetched: usize, total: usize },
    #[error("Gave up after {max_pages} pages with {fetched} of {total} setlists fetched")]
    PageCapExceeded {
        max_pages: u32,
        fetched: usize,
        total: usize,
    },
}

impl FetchError {
    /// The request itself failed (network, timeout, non-2xx status).
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Transport { .. })
    }

    /// The server answered, but what it delivered can't be trusted.
    pub fn is_data_integrity(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::ShortPage { .. } | Self::PageCapExceeded { .. }
        )
    }
}

/// Anything that can deliver one page of a user's attended setlists.
#[cfg_attr(test, mockall::automock)]
pub trait PageSource {
    /// Fetch page `page` (1-based) of `user_id`'s attended setlists.
    fn fetch_page(&self, user_id: &str, page: u32) -> Result<AttendedPage, FetchError>;
}

/// Blocking setlist.fm client authenticated with a static API key.
pub struct SetlistFmClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl SetlistFmClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn attended_url(&self, user_id: &str) -> String {
        format!(
            "{}/user/{}/attended",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(user_id)
        )
    }
}

impl PageSource for SetlistFmClient {
    fn fetch_page(&self, user_id: &str, page: u32) -> Result<AttendedPage, FetchError> {
        let url = self.attended_url(user_id);
        log::debug!("Fetching {url}?p={page}");

        let mut response = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .header("x-api-key", self.api_key.as_str())
            .query("p", page.to_string())
            .call()
            .map_err(|e| match e {
                ureq::Error::StatusCode(code) => FetchError::Status { page, code },
                other => FetchError::Transport {
                    page,
                    message: other.to_string(),
                },
            })?;

        response
            .body_mut()
            .read_json::<AttendedPage>()
            .map_err(|e| match e {
                ureq::Error::Json(err) => FetchError::Malformed {
                    page,
                    message: err.to_string(),
                },
                other => FetchError::Transport {
                    page,
                    message: other.to_string(),
                },
            })
    }
}

/// Walks every page of a user's attended setlists.
pub struct Fetcher<S> {
    source: S,
    max_pages: u32,
    page_delay: Duration,
    progress: ProgressBar,
}

impl<S: PageSource> Fetcher<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_pages: DEFAULT_MAX_PAGES,
            page_delay: Duration::ZERO,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Pause between consecutive page requests.
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Report progress on `progress`; its length is set to the declared total.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Fetch all attended setlists for `user_id` and keep those by `artist`.
    ///
    /// Artist matching is exact and case-sensitive. Order is the API's.
    pub fn fetch(&self, user_id: &str, artist: &str) -> Result<Vec<Setlist>, FetchError> {
        let all = self.fetch_all(user_id)?;
        let fetched = all.len();
        let matching = filter_artist(all, artist);
        log::info!(
            "{} of {fetched} attended setlists are by {artist}",
            matching.len()
        );
        Ok(matching)
    }

    /// Fetch every page until the declared total is reached.
    ///
    /// Any failing page discards everything fetched so far.
    pub fn fetch_all(&self, user_id: &str) -> Result<Vec<Setlist>, FetchError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(FetchError::InvalidUser);
        }

        let result = self.paginate(user_id);
        self.progress.finish_and_clear();
        result
    }

    fn paginate(&self, user_id: &str) -> Result<Vec<Setlist>, FetchError> {
        let first = self.source.fetch_page(user_id, 1)?;
        let total = first.total;
        let mut setlists = first.setlist;
        log::debug!("Page 1: {} setlists, {total} declared", setlists.len());

        self.progress.set_length(total as u64);
        self.progress.set_position(setlists.len() as u64);

        let mut page = 1;
        while setlists.len() < total {
            if page >= self.max_pages {
                return Err(FetchError::PageCapExceeded {
                    max_pages: self.max_pages,
                    fetched: setlists.len(),
                    total,
                });
            }
            page += 1;

            if !self.page_delay.is_zero() {
                thread::sleep(self.page_delay);
            }

            let next = self.source.fetch_page(user_id, page)?;
            if next.setlist.is_empty() {
                return Err(FetchError::ShortPage {
                    page,
                    fetched: setlists.len(),
                    total,
                });
            }
            log::debug!("Page {page}: {} setlists", next.setlist.len());
            setlists.extend(next.setlist);
            self.progress.set_position(setlists.len() as u64);
        }

        log::info!("Fetched {} attended setlists in {page} page(s)", setlists.len());
        Ok(setlists)
    }
}

/// Keep only setlists whose artist name equals `artist` exactly.
pub fn filter_artist(setlists: Vec<Setlist>, artist: &str) -> Vec<Setlist> {
    setlists
        .into_iter()
        .filter(|s| s.artist.name == artist)
        .collect()
}
