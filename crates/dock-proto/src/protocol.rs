//! JSON wire types for the media server's REST API.
//!
//! Every struct tolerates unknown fields and missing optional ones: the server
//! decorates several payloads with extras (formatted sizes, TMDB data) that the
//! console either ignores or recomputes locally.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

pub type MediaId = i64;
pub type EpisodeId = i64;
pub type JobId = i64;

// ── Library ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Movie,
    Tv,
}

impl MediaType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Movie => "Movie",
            Self::Tv => "TV",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub title: String,
    #[serde(default)]
    pub tmdb_id: Option<i64>,
    #[serde(default)]
    pub media_type: MediaType,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub backdrop_url: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub folder_path: String,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub season: u32,
    pub episode: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub duration: Option<u64>,
}

impl Episode {
    /// `S01E02`
    pub fn code(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }

    pub fn label(&self) -> String {
        match self.title.as_deref() {
            Some(t) if !t.is_empty() => format!("{} {}", self.code(), t),
            _ => self.code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CastMember {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

/// Detail view: library fields plus TMDB enrichment and the episode list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaDetails {
    #[serde(flatten)]
    pub item: MediaItem,
    #[serde(default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub episodes: Vec<Episode>,
}

impl From<MediaItem> for MediaDetails {
    fn from(item: MediaItem) -> Self {
        Self {
            item,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanReport {
    #[serde(default)]
    pub scanned: u32,
    #[serde(default)]
    pub imported: u32,
    #[serde(default)]
    pub skipped: u32,
    #[serde(default)]
    pub errors: u32,
    #[serde(default)]
    pub imported_items: Vec<String>,
    #[serde(default)]
    pub skipped_items: Vec<String>,
}

impl ScanReport {
    pub fn summary(&self) -> String {
        format!(
            "Scan complete: {} scanned, {} imported, {} skipped, {} errors",
            self.scanned, self.imported, self.skipped, self.errors
        )
    }
}

// ── Transfers ───────────────────────────────────────────────────────────────

/// Lifecycle of a transfer as reported by the torrent client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferState {
    Downloading,
    Seeding,
    Paused,
    Completed,
    Error,
    Queued,
    Checking,
    #[default]
    Unknown,
}

impl TransferState {
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "downloading" => Self::Downloading,
            "seeding" => Self::Seeding,
            "paused" => Self::Paused,
            "completed" => Self::Completed,
            "error" => Self::Error,
            "queued" => Self::Queued,
            "checking" => Self::Checking,
            _ => Self::Unknown,
        }
    }

    /// `completed` or `seeding`: the transfer needs no further user action.
    pub fn is_terminal_success(self) -> bool {
        matches!(self, Self::Completed | Self::Seeding)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Downloading => "downloading",
            Self::Seeding => "seeding",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Queued => "queued",
            Self::Checking => "checking",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl<'de> Deserialize<'de> for TransferState {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(d)?;
        Ok(s.as_deref().map(Self::parse).unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transfer {
    pub hash: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: TransferState,
    /// 0.0 ..= 1.0
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub progress_percent: f64,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub downloaded: u64,
    #[serde(default)]
    pub uploaded: u64,
    #[serde(default)]
    pub download_speed: u64,
    #[serde(default)]
    pub upload_speed: u64,
    /// Seconds; negative or 8 640 000 mean unknown.
    #[serde(default)]
    pub eta: i64,
    #[serde(default)]
    pub ratio: f64,
    #[serde(default)]
    pub save_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransferStats {
    #[serde(default)]
    pub download_speed: u64,
    #[serde(default)]
    pub upload_speed: u64,
    #[serde(default)]
    pub downloaded_total: u64,
    #[serde(default)]
    pub uploaded_total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTransferRequest {
    pub magnet_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_path: Option<String>,
}

/// `{status, message}` acknowledgement returned by mutation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

// ── Transcode jobs ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    #[serde(default)]
    pub media_id: Option<MediaId>,
    #[serde(default)]
    pub episode_id: Option<EpisodeId>,
    #[serde(default)]
    pub source_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub status: JobStatus,
    /// 0 ..= 100
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
}

/// Body of a manual transcode request. The server checks that
/// `source_path` exists on its side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub source_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_id: Option<MediaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<EpisodeId>,
}

impl Job {
    pub fn file_name(&self) -> &str {
        self.source_path
            .rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.source_path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QueueStatus {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub current_job_id: Option<JobId>,
    #[serde(default)]
    pub pending: u32,
    #[serde(default)]
    pub processing: u32,
    #[serde(default)]
    pub complete: u32,
    #[serde(default)]
    pub failed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClearedCount {
    #[serde(default)]
    pub cleared: u64,
}

// ── Playback progress ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub media_id: MediaId,
    #[serde(default)]
    pub episode_id: Option<EpisodeId>,
    #[serde(default)]
    pub position: u64,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub progress_percent: f64,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub position: u64,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<EpisodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
}

// ── Settings & status ───────────────────────────────────────────────────────

pub const THEMES: &[&str] = &["dark", "light"];
pub const QUALITIES: &[&str] = &["480p", "720p", "1080p", "original"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub theme: String,
    pub default_quality: String,
    pub max_concurrent_jobs: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            default_quality: "1080p".to_string(),
            max_concurrent_jobs: 1,
        }
    }
}

impl Settings {
    /// The server stores settings as a flat string map.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let defaults = Self::default();
        Self {
            theme: map.get("theme").cloned().unwrap_or(defaults.theme),
            default_quality: map
                .get("default_quality")
                .cloned()
                .unwrap_or(defaults.default_quality),
            max_concurrent_jobs: map
                .get("max_concurrent_jobs")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
        }
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("theme".to_string(), self.theme.clone()),
            ("default_quality".to_string(), self.default_quality.clone()),
            (
                "max_concurrent_jobs".to_string(),
                self.max_concurrent_jobs.to_string(),
            ),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub settings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceFlags {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub qbittorrent: String,
    #[serde(default)]
    pub tmdb: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub server_ip: String,
    #[serde(default)]
    pub services: ServiceFlags,
}

impl ServiceStatus {
    pub fn database_ok(&self) -> bool {
        self.services.database == "connected"
    }

    pub fn torrent_client_ok(&self) -> bool {
        self.services.qbittorrent == "connected"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Health {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub service: String,
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transfer_state_tolerates_unknown_values() {
        let t: Transfer = serde_json::from_value(json!({
            "hash": "abc", "name": "x", "state": "stalledUP", "size_formatted": "1 GB"
        }))
        .unwrap();
        assert_eq!(t.state, TransferState::Unknown);

        let t: Transfer = serde_json::from_value(json!({"hash": "abc", "state": "Seeding"})).unwrap();
        assert!(t.state.is_terminal_success());
    }

    #[test]
    fn terminal_success_set() {
        let terminal: Vec<_> = [
            TransferState::Downloading,
            TransferState::Seeding,
            TransferState::Paused,
            TransferState::Completed,
            TransferState::Error,
            TransferState::Queued,
            TransferState::Checking,
            TransferState::Unknown,
        ]
        .into_iter()
        .filter(|s| s.is_terminal_success())
        .collect();
        assert_eq!(terminal, vec![TransferState::Seeding, TransferState::Completed]);
    }

    #[test]
    fn details_accept_nulls_and_extras() {
        let d: MediaDetails = serde_json::from_value(json!({
            "id": 7, "title": "Dune", "media_type": "movie", "folder_path": "/m/dune",
            "genres": ["Sci-Fi"], "cast": null, "creators": [], "networks": [],
            "runtime": 155
        }))
        .unwrap();
        assert_eq!(d.item.id, 7);
        assert_eq!(d.genres, vec!["Sci-Fi"]);
        assert!(d.cast.is_empty());
        assert!(d.episodes.is_empty());
        assert_eq!(d.runtime, Some(155));
    }

    #[test]
    fn progress_update_omits_absent_episode() {
        let body = serde_json::to_value(ProgressUpdate {
            position: 61,
            completed: false,
            episode_id: None,
            duration: None,
        })
        .unwrap();
        assert_eq!(body, json!({"position": 61, "completed": false}));
    }

    #[test]
    fn settings_map_round_trip_defaults() {
        let mut map = BTreeMap::new();
        map.insert("theme".to_string(), "light".to_string());
        map.insert("max_concurrent_jobs".to_string(), "not a number".to_string());
        let s = Settings::from_map(&map);
        assert_eq!(s.theme, "light");
        assert_eq!(s.default_quality, "1080p");
        assert_eq!(s.max_concurrent_jobs, 1);
        assert_eq!(s.to_map()["max_concurrent_jobs"], "1");
    }

    #[test]
    fn job_file_name_strips_directories() {
        let job = Job {
            source_path: "/media/shows/Show/S01E01.mkv".into(),
            ..Job::default()
        };
        assert_eq!(job.file_name(), "S01E01.mkv");
    }

    #[test]
    fn episode_code_is_zero_padded() {
        let ep = Episode {
            season: 1,
            episode: 2,
            title: Some("Pilot".into()),
            ..Episode::default()
        };
        assert_eq!(ep.code(), "S01E02");
        assert_eq!(ep.label(), "S01E02 Pilot");
    }
}
