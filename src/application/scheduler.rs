//! # Orchestrator
//!
//! Owns one recurring timer per job and turns monitor results into notifications.
//! A job's loop awaits its own run, so a job never overlaps itself, while the
//! different jobs run as separate tasks. On shutdown each loop stops at its next
//! tick boundary; a run in progress is allowed to finish.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::application::assigner::FairAssigner;
use crate::application::channel::{ChannelFilter, forwardable_text};
use crate::application::feed::FeedMonitor;
use crate::application::notify::Dispatcher;
use crate::application::official::OfficialAccountMonitor;
use crate::application::state::StateStore;
use crate::application::tracked::TrackedAccountsMonitor;
use crate::domain::config::{RecipientsConfig, ScheduleConfig};
use crate::strings::{logs, templates};

/// Command managers can send to get counters.
pub const STATS_COMMAND: &str = ".stats";

pub struct Orchestrator {
    pub official: Option<OfficialAccountMonitor>,
    pub tracked: Option<TrackedAccountsMonitor>,
    pub feed: Option<FeedMonitor>,
    pub assigner: FairAssigner,
    pub dispatcher: Dispatcher,
    pub recipients: RecipientsConfig,
    pub channel: Option<ChannelFilter>,
    pub state: StateStore,
}

impl Orchestrator {
    /// Official posts go to the team, using the live template when it applies.
    /// Returns the number of posts announced.
    pub async fn run_official(&self) -> usize {
        let Some(monitor) = &self.official else {
            return 0;
        };
        tracing::info!("{}", logs::CHECKING_OFFICIAL);

        let posts = monitor.check_for_new().await;
        for post in &posts {
            let message = if OfficialAccountMonitor::is_live_event(post) {
                templates::live_event(post)
            } else {
                templates::official_post(post)
            };
            self.dispatcher.broadcast(&self.recipients.team, &message).await;
        }
        posts.len()
    }

    /// New feed articles go to the team.
    pub async fn run_feed(&self) -> usize {
        let Some(monitor) = &self.feed else {
            return 0;
        };
        tracing::info!("{}", logs::CHECKING_FEED);

        let articles = monitor.check_for_new().await;
        for article in &articles {
            self.dispatcher
                .broadcast(&self.recipients.team, &templates::article(article))
                .await;
        }
        articles.len()
    }

    /// Each tracked-account mention goes to one fairly chosen manager.
    pub async fn run_tracked(&self) -> usize {
        let Some(monitor) = &self.tracked else {
            return 0;
        };
        tracing::info!("{}", logs::CHECKING_TRACKED);

        let posts = monitor.check_for_new().await;
        for post in &posts {
            let Some(manager) = self.assigner.assign().await else {
                tracing::warn!("{}", logs::NO_MANAGERS);
                break;
            };
            if self
                .dispatcher
                .send_to(&manager, &templates::tracked_post(post))
                .await
            {
                tracing::info!("{}", logs::tracked_assigned(&manager.name));
            }
        }
        posts.len()
    }

    pub async fn reload_roster(&self) -> usize {
        match &self.tracked {
            Some(monitor) => {
                tracing::info!("{}", logs::RELOADING_ROSTER);
                monitor.reload().await
            }
            None => 0,
        }
    }

    /// Forwards a post from the source channel to the team.
    /// Returns whether the post was forwarded.
    pub async fn handle_channel_post(
        &self,
        channel_id: &str,
        body: Option<&str>,
        caption: Option<&str>,
    ) -> bool {
        let Some(filter) = &self.channel else {
            return false;
        };
        if !filter.matches(channel_id) {
            return false;
        }
        let Some(text) = forwardable_text(body, caption) else {
            return false;
        };

        self.dispatcher
            .broadcast(&self.recipients.team, &templates::channel_post(text))
            .await;
        true
    }

    /// Answers `.stats` for managers; other rooms get a refusal.
    pub async fn handle_command(&self, room: &str, body: &str) -> bool {
        if body.trim() != STATS_COMMAND {
            return false;
        }
        if !self.recipients.is_manager_room(room) {
            self.dispatcher.reply(room, templates::STATS_DENIED).await;
            return true;
        }

        let snapshot = self.state.snapshot().await;
        let tracked = match &self.tracked {
            Some(monitor) => Some(monitor.accounts().await.len()),
            None => None,
        };
        let report = templates::stats(&snapshot, tracked, self.assigner.recipients());
        self.dispatcher.reply(room, &report).await;
        true
    }

    /// Spawns one loop per configured job. Intervals come from `schedule`.
    pub fn spawn_jobs(
        self: &Arc<Self>,
        schedule: &ScheduleConfig,
        token: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if self.official.is_some() {
            let this = self.clone();
            handles.push(spawn_job(
                "official",
                minutes(schedule.official_minutes),
                token.clone(),
                move || {
                    let this = this.clone();
                    async move {
                        this.run_official().await;
                    }
                },
            ));
        }
        if self.feed.is_some() {
            let this = self.clone();
            handles.push(spawn_job(
                "feed",
                minutes(schedule.feed_minutes),
                token.clone(),
                move || {
                    let this = this.clone();
                    async move {
                        this.run_feed().await;
                    }
                },
            ));
        }
        if self.tracked.is_some() {
            let this = self.clone();
            handles.push(spawn_job(
                "tracked",
                minutes(schedule.tracked_minutes),
                token.clone(),
                move || {
                    let this = this.clone();
                    async move {
                        this.run_tracked().await;
                    }
                },
            ));

            let this = self.clone();
            handles.push(spawn_job(
                "roster",
                minutes(schedule.roster_minutes),
                token.clone(),
                move || {
                    let this = this.clone();
                    async move {
                        this.reload_roster().await;
                    }
                },
            ));
        }

        handles
    }
}

fn minutes(value: u64) -> Duration {
    Duration::from_secs(value.max(1) * 60)
}

/// Runs `job` every `period`, first one `period` after start, until `token` is cancelled.
pub fn spawn_job<F, Fut>(
    name: &'static str,
    period: Duration,
    token: CancellationToken,
    job: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!("{}", logs::job_scheduled(name, period));

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("{}", logs::job_stopped(name));
                    break;
                }
                _ = ticker.tick() => {
                    job().await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::credentials::CredentialPool;
    use crate::application::notify::mock::MockNotifier;
    use crate::application::social::SocialClient;
    use crate::application::social::mock::MockSocialApi;
    use crate::application::tracked::TrackedSettings;
    use crate::application::tracked::mock::MockRoster;
    use crate::domain::config::Recipient;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn recipient(name: &str) -> Recipient {
        Recipient {
            name: name.to_string(),
            room: format!("!{}:example.org", name.to_lowercase()),
        }
    }

    struct Fixture {
        orchestrator: Orchestrator,
        notifier: Arc<MockNotifier>,
        _dir: TempDir,
    }

    fn fixture(api: Arc<MockSocialApi>, rows: &[&str], failing: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path().join("state.json"));
        let pool = CredentialPool::new(vec!["t1".to_string()], store.clone());
        let social = Arc::new(
            SocialClient::new(pool, api, store.clone()).with_batch(100, Duration::ZERO),
        );
        let recipients = RecipientsConfig {
            team: vec![recipient("Mika"), recipient("Marie")],
            managers: vec![recipient("Igor"), recipient("Roman")],
        };
        let notifier = Arc::new(MockNotifier {
            failing: failing.iter().map(|f| f.to_string()).collect(),
            ..Default::default()
        });

        let orchestrator = Orchestrator {
            official: Some(OfficialAccountMonitor::new(
                "official",
                5,
                social.clone(),
                store.clone(),
            )),
            tracked: Some(TrackedAccountsMonitor::new(
                TrackedSettings {
                    official_handle: "official".to_string(),
                    batch_cap: 50,
                    request_delay: Duration::ZERO,
                    page_size: 5,
                },
                social,
                Arc::new(MockRoster::with_rows(rows)),
                store.clone(),
            )),
            feed: None,
            assigner: FairAssigner::new(recipients.managers.clone(), store.clone()),
            dispatcher: Dispatcher::new(notifier.clone()),
            recipients,
            channel: Some(ChannelFilter::new("-1001234", "-100")),
            state: store,
        };
        Fixture {
            orchestrator,
            notifier,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_official_posts_reach_team_only() {
        let api = Arc::new(MockSocialApi::with_accounts(&[("official", "10")]));
        api.push_page("10", &[("2", "Join our space now"), ("1", "Release notes")]);
        let f = fixture(api, &[], &["!mika:example.org"]);

        assert_eq!(f.orchestrator.run_official().await, 2);
        let marie = f.notifier.sent_to("!marie:example.org");
        assert_eq!(marie.len(), 2);
        assert!(marie[0].contains("LIVE"));
        assert!(!marie[1].contains("LIVE"));
        assert!(f.notifier.sent_to("!igor:example.org").is_empty());
    }

    #[tokio::test]
    async fn test_tracked_posts_are_spread_over_managers() {
        let api = Arc::new(MockSocialApi::with_accounts(&[("alice", "1"), ("bob", "2")]));
        api.push_page("1", &[("A2", "@official one"), ("A1", "@official two")]);
        api.push_page("2", &[("B1", "cc @OFFICIAL")]);
        let f = fixture(api, &["alice", "bob"], &[]);

        f.orchestrator.reload_roster().await;
        assert_eq!(f.orchestrator.run_tracked().await, 3);
        assert_eq!(f.notifier.sent_to("!igor:example.org").len(), 2);
        assert_eq!(f.notifier.sent_to("!roman:example.org").len(), 1);
        assert!(f.notifier.sent_to("!mika:example.org").is_empty());
    }

    #[tokio::test]
    async fn test_channel_posts_are_filtered() {
        let f = fixture(Arc::new(MockSocialApi::default()), &[], &[]);

        assert!(!f.orchestrator.handle_channel_post("-999", Some("hi"), None).await);
        assert!(!f.orchestrator.handle_channel_post("-1001234", Some("  "), None).await);
        assert!(f.orchestrator.handle_channel_post("1234", None, Some("photo")).await);
        let mika = f.notifier.sent_to("!mika:example.org");
        assert_eq!(mika.len(), 1);
        assert!(mika[0].contains("photo"));
    }

    #[tokio::test]
    async fn test_stats_only_for_managers() {
        let f = fixture(Arc::new(MockSocialApi::default()), &["alice"], &[]);
        f.orchestrator.reload_roster().await;

        assert!(!f.orchestrator.handle_command("!igor:example.org", "hello").await);
        assert!(f.orchestrator.handle_command("!mika:example.org", ".stats").await);
        assert_eq!(
            f.notifier.sent_to("!mika:example.org"),
            vec![templates::STATS_DENIED.to_string()]
        );

        assert!(f.orchestrator.handle_command("!igor:example.org", " .stats ").await);
        let report = f.notifier.sent_to("!igor:example.org");
        assert_eq!(report.len(), 1);
        assert!(report[0].contains("Tracked accounts: 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_runs_each_period_until_cancelled() {
        let runs = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let counter = runs.clone();
        let handle = spawn_job("test", Duration::from_secs(60), token.clone(), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_secs(151)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        token.cancel();
        handle.await.unwrap();
        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
