//! Top-level sync run.
//!
//! Adds a uniquely named temporary remote for the template, diffs histories,
//! hands the candidates to the operator, and replays the chosen commits
//! oldest first. The temporary remote is removed on every exit path.

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::applier::UpdateApplier;
use crate::bump::PackageManager;
use crate::errors::SyncError;
use crate::git::GitClient;
use crate::history::{ExcludePattern, HistoryDiffer};
use crate::models::{Commit, SyncOutcome, UpdateSet};
use crate::operator::{self, Operator, SyncEvent};

/// Default prefix for the temporary template remote.
pub const DEFAULT_REMOTE_PREFIX: &str = "upstream-template";

/// Everything a run needs besides the repository itself.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub template_url: String,
    pub branch: String,
    pub exclude: ExcludePattern,
    pub package_manager: PackageManager,
    pub remote_prefix: String,
}

impl SyncOptions {
    pub fn new(template_url: impl Into<String>) -> Self {
        Self {
            template_url: template_url.into(),
            branch: "master".into(),
            exclude: ExcludePattern::none(),
            package_manager: PackageManager::default(),
            remote_prefix: DEFAULT_REMOTE_PREFIX.into(),
        }
    }
}

/// Orchestrates template synchronisation for one repository.
pub struct TemplateSync {
    git: GitClient,
    options: SyncOptions,
}

impl TemplateSync {
    pub fn new(git: GitClient, options: SyncOptions) -> Self {
        Self { git, options }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Detect unapplied upstream commits without touching the working tree.
    #[instrument(skip(self), fields(url = %self.options.template_url))]
    pub async fn check(&self) -> Result<UpdateSet, SyncError> {
        let remote = self.open_remote().await?;
        let result = self.find_updates(&remote).await;
        self.close_remote(&remote).await;
        result
    }

    /// Full interactive run: detect, select, apply.
    #[instrument(skip(self, operator), fields(url = %self.options.template_url))]
    pub async fn run(&self, operator: Arc<dyn Operator>) -> Result<SyncOutcome, SyncError> {
        let remote = self.remote_name();
        operator.notify(SyncEvent::FetchingTemplate {
            remote: &remote,
            url: &self.options.template_url,
        });
        self.prune_stale_remotes().await;
        self.add_remote(&remote).await?;
        operator.notify(SyncEvent::TemplateFetched { remote: &remote });

        let result = self.sync_from(&remote, &operator).await;
        self.close_remote(&remote).await;
        result
    }

    async fn sync_from(
        &self,
        remote: &str,
        operator: &Arc<dyn Operator>,
    ) -> Result<SyncOutcome, SyncError> {
        let updates = self.find_updates(remote).await?;
        if updates.is_empty() {
            info!("no new updates from upstream template");
            return Ok(SyncOutcome::UpToDate {
                fork_point: updates.fork_point,
            });
        }

        let candidates = updates.commits;
        operator.notify(SyncEvent::UpdatesFound {
            count: candidates.len(),
            fork_point: &updates.fork_point,
        });

        let selection = operator::choose_updates(operator, candidates.clone()).await?;
        let ordered = chronological(selection, &candidates);
        if ordered.is_empty() {
            info!(candidates = candidates.len(), "operator selected no updates");
            return Ok(SyncOutcome::NothingSelected {
                candidates: candidates.len(),
            });
        }

        let applier = UpdateApplier::new(
            &self.git,
            self.options.package_manager,
            Arc::clone(operator),
        );
        let total = ordered.len();
        let mut reports = Vec::with_capacity(total);
        for (index, commit) in ordered.iter().enumerate() {
            operator.notify(SyncEvent::Applying {
                index,
                total,
                commit,
            });
            let report = applier.apply(commit).await?;
            operator.notify(SyncEvent::Applied { report: &report });
            reports.push(report);
        }

        Ok(SyncOutcome::Applied {
            candidates: candidates.len(),
            reports,
        })
    }

    async fn find_updates(&self, remote: &str) -> Result<UpdateSet, SyncError> {
        let upstream_ref = format!("{}/{}", remote, self.options.branch);
        Ok(HistoryDiffer::new(&self.git)
            .find_updates(&upstream_ref, &self.options.exclude)
            .await?)
    }

    // -----------------------------------------------------------------------
    // Temporary remote lifecycle
    // -----------------------------------------------------------------------

    fn remote_name(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", self.options.remote_prefix, &suffix[..8])
    }

    async fn open_remote(&self) -> Result<String, SyncError> {
        let remote = self.remote_name();
        self.prune_stale_remotes().await;
        self.add_remote(&remote).await?;
        Ok(remote)
    }

    /// Add and fetch `remote`; on failure remove whatever was created.
    async fn add_remote(&self, remote: &str) -> Result<(), SyncError> {
        let url = &self.options.template_url;
        let detail = match self.git.add_remote(remote, url).await {
            Ok(outcome) if outcome.success() => return Ok(()),
            Ok(outcome) => outcome.output.trim().to_string(),
            Err(e) => e.to_string(),
        };
        warn!(remote, %url, %detail, "unable to add template remote");
        self.close_remote(remote).await;
        Err(SyncError::RemoteSetup {
            remote: remote.to_string(),
            url: url.clone(),
            detail,
        })
    }

    async fn close_remote(&self, remote: &str) {
        if !self.git.remove_remote(remote).await {
            warn!(remote, "temporary remote was not removed");
        }
    }

    /// Remove remotes left behind by interrupted runs.
    async fn prune_stale_remotes(&self) {
        let remotes = match self.git.list_remotes().await {
            Ok(remotes) => remotes,
            Err(e) => {
                warn!(error = %e, "could not list remotes");
                return;
            }
        };
        for name in remotes
            .iter()
            .filter(|r| is_temporary_remote(r, &self.options.remote_prefix))
        {
            info!(remote = %name, "removing stale template remote");
            self.git.remove_remote(name).await;
        }
    }
}

fn is_temporary_remote(name: &str, prefix: &str) -> bool {
    name == prefix
        || name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|suffix| suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Order `selection` oldest first for replay.
///
/// Ties on timestamp fall back to the candidates' log order, reversed, so a
/// batch of commits sharing a second still replays parent before child.
/// Commits that were not offered are dropped.
pub fn chronological(selection: Vec<Commit>, candidates: &[Commit]) -> Vec<Commit> {
    let mut ordered: Vec<(usize, Commit)> = selection
        .into_iter()
        .filter_map(|commit| {
            candidates
                .iter()
                .position(|c| c.hash == commit.hash)
                .map(|pos| (pos, commit))
        })
        .collect();
    ordered.sort_by_key(|(pos, commit)| (commit.timestamp, Reverse(*pos)));
    ordered.dedup_by(|a, b| a.0 == b.0);
    ordered.into_iter().map(|(_, commit)| commit).collect()
}
