//! Fetched state → display rows.
//!
//! No terminal access here; components render whatever these return.

use dock_proto::format::{format_bytes, format_eta, format_speed, format_timestamp};
use dock_proto::protocol::{
    Episode, Job, JobId, JobStatus, MediaDetails, MediaId, MediaItem, MediaType, Transfer, TransferState,
    TransferStats,
};

use crate::player::{PlayerSnapshot, ResumeState};

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRow {
    pub hash: String,
    pub name: String,
    pub state: TransferState,
    pub percent: f64,
    pub size: String,
    pub speed: String,
    pub eta: String,
    pub can_pause: bool,
    pub can_resume: bool,
}

pub fn transfer_rows(transfers: &[Transfer]) -> Vec<TransferRow> {
    transfers
        .iter()
        .map(|t| {
            let percent = if t.progress_percent > 0.0 {
                t.progress_percent
            } else {
                t.progress * 100.0
            };
            TransferRow {
                hash: t.hash.clone(),
                name: t.name.clone(),
                state: t.state,
                percent: percent.clamp(0.0, 100.0),
                size: format_bytes(t.size),
                speed: format_speed(t.download_speed),
                eta: match t.state {
                    TransferState::Downloading => format_eta(t.eta),
                    _ => "-".to_string(),
                },
                can_pause: matches!(
                    t.state,
                    TransferState::Downloading
                        | TransferState::Seeding
                        | TransferState::Queued
                        | TransferState::Checking
                ),
                can_resume: matches!(t.state, TransferState::Paused | TransferState::Error),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRow {
    pub id: JobId,
    pub file_name: String,
    pub status: JobStatus,
    pub percent: u8,
    pub error: Option<String>,
    pub can_cancel: bool,
    pub can_restart: bool,
    pub can_retry: bool,
}

pub fn job_rows(jobs: &[Job]) -> Vec<JobRow> {
    jobs.iter()
        .map(|j| JobRow {
            id: j.id,
            file_name: j.file_name().to_string(),
            status: j.status,
            percent: j.progress.min(100),
            error: j.error_message.clone().filter(|e| !e.is_empty()),
            can_cancel: j.status == JobStatus::Pending,
            can_restart: matches!(j.status, JobStatus::Processing | JobStatus::Failed),
            can_retry: j.status == JobStatus::Failed,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Movies,
    Shows,
}

impl KindFilter {
    pub fn next(self) -> Self {
        match self {
            KindFilter::All => KindFilter::Movies,
            KindFilter::Movies => KindFilter::Shows,
            KindFilter::Shows => KindFilter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            KindFilter::All => "all",
            KindFilter::Movies => "movies",
            KindFilter::Shows => "shows",
        }
    }

    fn admits(self, media_type: MediaType) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Movies => media_type == MediaType::Movie,
            KindFilter::Shows => media_type == MediaType::Tv,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryFilter {
    pub kind: KindFilter,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryCard {
    pub id: MediaId,
    pub title: String,
    pub subtitle: String,
    pub media_type: MediaType,
}

pub fn library_cards(items: &[MediaItem], filter: &LibraryFilter) -> Vec<LibraryCard> {
    let needle = filter.query.trim().to_lowercase();
    items
        .iter()
        .filter(|m| filter.kind.admits(m.media_type))
        .filter(|m| needle.is_empty() || m.title.to_lowercase().contains(&needle))
        .map(|m| LibraryCard {
            id: m.id,
            title: match m.year {
                Some(y) => format!("{} ({})", m.title, y),
                None => m.title.clone(),
            },
            subtitle: card_subtitle(m),
            media_type: m.media_type,
        })
        .collect()
}

fn card_subtitle(m: &MediaItem) -> String {
    match (m.media_type, m.episode_count) {
        (MediaType::Tv, Some(1)) => "TV · 1 episode".to_string(),
        (MediaType::Tv, Some(n)) => format!("TV · {} episodes", n),
        (kind, _) => kind.label().to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub title: String,
    pub episode: Option<String>,
    pub tagline: Option<String>,
    pub facts: Vec<String>,
    pub overview: Option<String>,
    pub cast: Option<String>,
    pub prompt: Option<String>,
    /// Whole seconds left before the prompt answers itself.
    pub countdown: Option<u64>,
    pub status: &'static str,
    pub clock: String,
    pub ratio: f64,
}

pub fn player_view(details: &MediaDetails, episode: Option<&Episode>, snap: &PlayerSnapshot) -> PlayerView {
    let item = &details.item;
    let mut facts = Vec::new();
    if let Some(y) = item.year {
        facts.push(y.to_string());
    }
    if let Some(r) = details.runtime.filter(|r| *r > 0) {
        facts.push(format!("{} min", r));
    }
    if !details.genres.is_empty() {
        facts.push(details.genres.join(", "));
    }
    if let Some(v) = details.vote_average.filter(|v| *v > 0.0) {
        facts.push(format!("★ {:.1}", v));
    }
    if let Some(d) = details.director.as_deref().filter(|d| !d.is_empty()) {
        facts.push(format!("dir. {}", d));
    }

    let cast = (!details.cast.is_empty()).then(|| {
        details
            .cast
            .iter()
            .take(5)
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    });

    let (prompt, countdown) = match snap.resume {
        ResumeState::Prompting { saved, .. } => (
            Some(format!("Resume from {}?", format_timestamp(saved as f64))),
            snap.prompt_remaining.map(|d| d.as_millis().div_ceil(1000) as u64),
        ),
        _ => (None, None),
    };

    let status = if snap.session.is_none() {
        "stopped"
    } else if matches!(snap.resume, ResumeState::Prompting { .. }) {
        "waiting"
    } else if snap.paused {
        "paused"
    } else {
        "playing"
    };

    let duration = snap.duration.filter(|d| d.is_finite() && *d > 0.0);
    let clock = match duration {
        Some(d) => format!("{} / {}", format_timestamp(snap.position), format_timestamp(d)),
        None => format_timestamp(snap.position),
    };
    let ratio = duration.map_or(0.0, |d| (snap.position / d).clamp(0.0, 1.0));

    PlayerView {
        title: item.title.clone(),
        episode: episode.map(Episode::label),
        tagline: details.tagline.clone().filter(|t| !t.is_empty()),
        facts,
        overview: item.overview.clone().filter(|o| !o.is_empty()),
        cast,
        prompt,
        countdown,
        status,
        clock,
        ratio,
    }
}

pub fn stats_line(stats: &TransferStats) -> String {
    format!(
        "↓ {}  ↑ {}  (total ↓ {} ↑ {})",
        format_speed(stats.download_speed),
        format_speed(stats.upload_speed),
        format_bytes(stats.downloaded_total),
        format_bytes(stats.uploaded_total)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::MediaSession;
    use dock_proto::protocol::CastMember;
    use std::time::Duration;
    use tokio::time::Instant;

    fn transfer(state: TransferState) -> Transfer {
        Transfer {
            hash: "h".into(),
            name: "n".into(),
            state,
            progress: 0.25,
            eta: 125,
            size: 2048,
            ..Transfer::default()
        }
    }

    #[test]
    fn transfer_actions_follow_state() {
        let rows = transfer_rows(&[
            transfer(TransferState::Downloading),
            transfer(TransferState::Paused),
            transfer(TransferState::Error),
            transfer(TransferState::Completed),
        ]);
        let flags: Vec<_> = rows.iter().map(|r| (r.can_pause, r.can_resume)).collect();
        assert_eq!(flags, vec![(true, false), (false, true), (false, true), (false, false)]);

        assert_eq!(rows[0].percent, 25.0);
        assert_eq!(rows[0].eta, "2m 5s");
        assert_eq!(rows[0].size, "2.0 KB");
        assert_eq!(rows[3].eta, "-");
    }

    #[test]
    fn reported_percent_wins_over_fraction() {
        let t = Transfer {
            progress: 0.5,
            progress_percent: 51.3,
            ..transfer(TransferState::Downloading)
        };
        assert_eq!(transfer_rows(&[t])[0].percent, 51.3);
    }

    #[test]
    fn job_actions_follow_status() {
        let job = |id, status| Job {
            id,
            source_path: "/media/movies/Alien/alien.mkv".into(),
            status,
            ..Job::default()
        };
        let rows = job_rows(&[
            job(1, JobStatus::Pending),
            job(2, JobStatus::Processing),
            job(3, JobStatus::Failed),
            job(4, JobStatus::Complete),
        ]);
        let flags: Vec<_> = rows.iter().map(|r| (r.can_cancel, r.can_restart, r.can_retry)).collect();
        assert_eq!(
            flags,
            vec![
                (true, false, false),
                (false, true, false),
                (false, true, true),
                (false, false, false),
            ]
        );
        assert_eq!(rows[0].file_name, "alien.mkv");
    }

    #[test]
    fn library_filters_by_kind_and_text_in_order() {
        let item = |id, title: &str, media_type| MediaItem {
            id,
            title: title.into(),
            media_type,
            ..MediaItem::default()
        };
        let items = vec![
            item(3, "Dark", MediaType::Tv),
            item(1, "Alien", MediaType::Movie),
            item(2, "Aliens", MediaType::Movie),
        ];

        let all = library_cards(&items, &LibraryFilter::default());
        assert_eq!(all.iter().map(|c| c.id).collect::<Vec<_>>(), vec![3, 1, 2]);

        let movies = LibraryFilter {
            kind: KindFilter::Movies,
            query: " ALIEN".into(),
        };
        assert_eq!(
            library_cards(&items, &movies).iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![1, 2]
        );

        let shows = LibraryFilter {
            kind: KindFilter::Shows,
            query: String::new(),
        };
        assert_eq!(library_cards(&items, &shows).len(), 1);
        assert_eq!(KindFilter::Shows.next(), KindFilter::All);
    }

    #[test]
    fn card_text() {
        let show = MediaItem {
            id: 1,
            title: "Dark".into(),
            year: Some(2017),
            media_type: MediaType::Tv,
            episode_count: Some(26),
            ..MediaItem::default()
        };
        let card = &library_cards(&[show], &LibraryFilter::default())[0];
        assert_eq!(card.title, "Dark (2017)");
        assert_eq!(card.subtitle, "TV · 26 episodes");
    }

    fn details() -> MediaDetails {
        MediaDetails {
            item: MediaItem {
                id: 1,
                title: "Alien".into(),
                year: Some(1979),
                ..MediaItem::default()
            },
            genres: vec!["Horror".into(), "Science Fiction".into()],
            cast: vec![CastMember {
                name: "Sigourney Weaver".into(),
                character: Some("Ripley".into()),
            }],
            runtime: Some(117),
            ..MediaDetails::default()
        }
    }

    #[test]
    fn prompt_shows_saved_position_and_countdown() {
        let snap = PlayerSnapshot {
            session: Some(MediaSession {
                media_id: 1,
                episode_id: None,
                title: "Alien".into(),
                stream_url: "u".into(),
            }),
            resume: ResumeState::Prompting {
                saved: 120,
                deadline: Instant::now(),
            },
            prompt_remaining: Some(Duration::from_millis(3_200)),
            paused: true,
            ..PlayerSnapshot::default()
        };
        let view = player_view(&details(), None, &snap);
        assert_eq!(view.prompt.as_deref(), Some("Resume from 2:00?"));
        assert_eq!(view.countdown, Some(4));
        assert_eq!(view.status, "waiting");
        assert_eq!(view.facts, vec!["1979", "117 min", "Horror, Science Fiction"]);
        assert_eq!(view.cast.as_deref(), Some("Sigourney Weaver"));
    }

    #[test]
    fn playing_view_has_clock_and_no_prompt() {
        let snap = PlayerSnapshot {
            session: Some(MediaSession {
                media_id: 1,
                episode_id: Some(4),
                title: "Dark".into(),
                stream_url: "u".into(),
            }),
            resume: ResumeState::Resumed(0),
            position: 90.0,
            duration: Some(360.0),
            ..PlayerSnapshot::default()
        };
        let ep = Episode {
            id: 4,
            season: 1,
            episode: 2,
            title: Some("Lies".into()),
            ..Episode::default()
        };
        let view = player_view(&details(), Some(&ep), &snap);
        assert!(view.prompt.is_none());
        assert_eq!(view.episode.as_deref(), Some("S01E02 Lies"));
        assert_eq!(view.clock, "1:30 / 6:00");
        assert_eq!(view.ratio, 0.25);
        assert_eq!(view.status, "playing");
    }

    #[test]
    fn stats_line_shows_rates_and_totals() {
        let line = stats_line(&TransferStats {
            download_speed: 2048,
            upload_speed: 0,
            downloaded_total: 1024 * 1024,
            uploaded_total: 0,
        });
        assert_eq!(line, "↓ 2.0 KB/s  ↑ 0.0 B/s  (total ↓ 1.0 MB ↑ 0.0 B)");
    }
}
