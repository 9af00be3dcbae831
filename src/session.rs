use crate::config::Config;
use crate::models::{Sample, ScoreMap};
use crate::scoring;
use crate::shuffle::DisplayOrder;
use crate::store;
use anyhow::{Result, bail};
use rand::Rng;
use std::path::PathBuf;

/// Where a navigation request ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Saved and moved to the target sample
    Moved,
    /// Already at the first/last sample
    AtEdge,
    /// Current sample incomplete and the strict policy forbids leaving it
    Blocked,
    /// Current sample incomplete; the lenient policy wants an explicit
    /// confirm-and-save before moving
    NeedsConfirm,
}

/// One reviewer's scoring session: the batch, the in-memory score map, the
/// current page and the per-sample display order, all explicit state.
///
/// Every externally visible mutation (navigation, save, export) re-derives the
/// merged file content from the full score map and rewrites the backing file
/// wholesale.
#[derive(Debug)]
pub struct ReviewSession {
    reviewer_id: String,
    path: PathBuf,
    samples: Vec<Sample>,
    scores: ScoreMap,
    page: usize,
    order: Option<DisplayOrder>,
    config: Config,
}

impl ReviewSession {
    /// Open the backing file for a reviewer id (normalized: trimmed,
    /// uppercased) and seed the score map from previously stored results
    pub fn open(config: Config, raw_reviewer_id: &str) -> Result<Self> {
        let reviewer_id = store::normalize_reviewer_id(raw_reviewer_id);
        if reviewer_id.is_empty() {
            bail!("Reviewer id must not be empty");
        }

        let path = store::backing_file(&config.data_dir, &reviewer_id);
        let samples = store::load_samples(&path)?;
        if samples.is_empty() {
            bail!("Sample file is empty: {}", path.display());
        }
        let scores = store::scores_from_samples(&samples);

        Ok(Self {
            reviewer_id,
            path,
            samples,
            scores,
            page: 0,
            order: None,
            config,
        })
    }

    pub fn reviewer_id(&self) -> &str {
        &self.reviewer_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn scores(&self) -> &ScoreMap {
        &self.scores
    }

    pub fn scores_mut(&mut self) -> &mut ScoreMap {
        &mut self.scores
    }

    /// The sample currently on screen
    pub fn current(&self) -> &Sample {
        &self.samples[self.page]
    }

    /// Id of the current sample, falling back to its position when the batch
    /// carries samples without ids
    pub fn current_qid(&self) -> String {
        qid_at(&self.samples, self.page)
    }

    /// The display order bound to the current sample-viewing session,
    /// randomized on first use and stable until navigation
    pub fn display_order<R: Rng>(&mut self, rng: &mut R) -> DisplayOrder {
        let order = DisplayOrder::assign(self.order, rng);
        self.order = Some(order);
        order
    }

    /// Whether the current sample is complete under the configured policy
    pub fn is_current_scored(&self) -> bool {
        scoring::is_scored(
            &self.current_qid(),
            &self.scores,
            &self.config.dimensions,
            self.config.policy,
        )
    }

    /// How many samples in the batch are complete
    pub fn completed_count(&self) -> usize {
        (0..self.samples.len())
            .filter(|&i| {
                scoring::is_scored(
                    &qid_at(&self.samples, i),
                    &self.scores,
                    &self.config.dimensions,
                    self.config.policy,
                )
            })
            .count()
    }

    /// Merge the score map into the batch and rewrite the backing file.
    /// The in-memory state is untouched, so a failed write can be retried
    /// without losing entered scores.
    pub fn save(&self) -> Result<()> {
        let merged = store::merge(&self.samples, &self.scores);
        store::save_samples(&self.path, &merged)
    }

    /// Write a timestamped export of the merged batch and return its path
    pub fn export(&self, out_dir: Option<&std::path::Path>) -> Result<PathBuf> {
        let merged = store::merge(&self.samples, &self.scores);
        let dir = out_dir.unwrap_or(&self.config.data_dir);
        store::export(dir, &self.reviewer_id, &merged)
    }

    /// Move to the next sample, gated by the completion policy
    pub fn next(&mut self) -> Result<NavOutcome> {
        self.navigate(self.page.checked_add(1).filter(|&p| p < self.samples.len()))
    }

    /// Move to the previous sample, gated by the completion policy
    pub fn prev(&mut self) -> Result<NavOutcome> {
        self.navigate(self.page.checked_sub(1))
    }

    fn navigate(&mut self, target: Option<usize>) -> Result<NavOutcome> {
        let Some(target) = target else {
            return Ok(NavOutcome::AtEdge);
        };

        if !self.is_current_scored() {
            return Ok(match self.config.policy {
                crate::config::CompletionPolicy::Strict => NavOutcome::Blocked,
                crate::config::CompletionPolicy::Lenient => NavOutcome::NeedsConfirm,
            });
        }

        self.move_to(target)?;
        Ok(NavOutcome::Moved)
    }

    /// Confirmed override for the lenient policy: save and move despite the
    /// current sample being incomplete
    pub fn confirm_next(&mut self) -> Result<NavOutcome> {
        match self.page + 1 {
            p if p < self.samples.len() => self.move_to(p).map(|_| NavOutcome::Moved),
            _ => Ok(NavOutcome::AtEdge),
        }
    }

    /// Confirmed override for the lenient policy, backwards
    pub fn confirm_prev(&mut self) -> Result<NavOutcome> {
        match self.page.checked_sub(1) {
            Some(p) => self.move_to(p).map(|_| NavOutcome::Moved),
            None => Ok(NavOutcome::AtEdge),
        }
    }

    /// Jump straight to a sample by id, saving first. Jumps are not gated on
    /// completeness.
    pub fn jump(&mut self, q_id: &str) -> Result<NavOutcome> {
        let Some(target) = (0..self.samples.len()).find(|&i| qid_at(&self.samples, i) == q_id)
        else {
            bail!("No sample with id {q_id}");
        };
        self.move_to(target)?;
        Ok(NavOutcome::Moved)
    }

    /// Save, discard the display order, land on the target page
    fn move_to(&mut self, target: usize) -> Result<()> {
        self.save()?;
        self.order = None;
        self.page = target;
        Ok(())
    }
}

fn qid_at(samples: &[Sample], index: usize) -> String {
    samples[index]
        .q_id
        .clone()
        .unwrap_or_else(|| format!("id_{index}"))
}
