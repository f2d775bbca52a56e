//! Local feedback aggregation for one analysis run.
//!
//! A [`FeedbackDraft`] accumulates per-domain and per-item verdicts plus an overall
//! rating while the reviewer works through the results, then turns the non-empty
//! entries into [`FeedbackSubmission`]s. Entries with neither an accuracy verdict
//! nor a comment are skipped rather than posted.

// self
use crate::{
	_prelude::*,
	api::{AccuracyRating, FeedbackEntry, FeedbackKind, FeedbackSubmission, OverallFeedback},
};

/// Identifies a domain or item entry within a draft.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedbackTarget {
	/// Whether the target is a domain or an item.
	pub kind: FeedbackKind,
	/// Domain or item identifier.
	pub id: String,
}
impl FeedbackTarget {
	/// Targets an evaluated domain.
	pub fn domain(id: impl Into<String>) -> Self {
		Self { kind: FeedbackKind::Domain, id: id.into() }
	}

	/// Targets a checklist item.
	pub fn item(id: impl Into<String>) -> Self {
		Self { kind: FeedbackKind::Item, id: id.into() }
	}
}

/// Accumulated feedback for one analysis run.
#[derive(Clone, Debug, Default)]
pub struct FeedbackDraft {
	run_id: String,
	entries: BTreeMap<FeedbackTarget, FeedbackEntry>,
	overall: OverallFeedback,
}
impl FeedbackDraft {
	/// Creates an empty draft for the provided run.
	pub fn new(run_id: impl Into<String>) -> Self {
		Self {
			run_id: run_id.into(),
			entries: BTreeMap::new(),
			overall: OverallFeedback::default(),
		}
	}

	/// Returns the run this draft belongs to.
	pub fn run_id(&self) -> &str {
		&self.run_id
	}

	/// Records an accuracy verdict for a domain or item.
	pub fn set_accuracy(&mut self, target: FeedbackTarget, accuracy: AccuracyRating) {
		self.entries.entry(target).or_default().accuracy = Some(accuracy);
	}

	/// Records a comment for a domain or item. An empty comment clears the field.
	pub fn set_comment(&mut self, target: FeedbackTarget, comment: impl Into<String>) {
		let comment = comment.into();
		let entry = self.entries.entry(target).or_default();

		entry.comment = if comment.is_empty() { None } else { Some(comment) };
	}

	/// Returns the entry recorded for a target, if any.
	pub fn entry(&self, target: &FeedbackTarget) -> Option<&FeedbackEntry> {
		self.entries.get(target)
	}

	/// Records the overall rating (1 to 5).
	pub fn set_overall_rating(&mut self, rating: u8) {
		self.overall.rating = rating.min(5);
	}

	/// Records the overall comment.
	pub fn set_overall_comment(&mut self, comment: impl Into<String>) {
		self.overall.comment = comment.into();
	}

	/// Returns the overall feedback recorded so far.
	pub fn overall(&self) -> &OverallFeedback {
		&self.overall
	}

	/// Converts the draft into one submission per non-empty entry, the overall
	/// feedback last.
	pub fn submissions(&self) -> Result<Vec<FeedbackSubmission>> {
		let mut out = Vec::new();

		for (target, entry) in &self.entries {
			if entry.is_empty() {
				continue;
			}

			out.push(FeedbackSubmission::entry(&self.run_id, target.kind, &target.id, entry)?);
		}

		if !self.overall.is_empty() {
			out.push(FeedbackSubmission::overall(&self.run_id, &self.overall)?);
		}

		Ok(out)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn empty_entries_are_skipped() {
		let mut draft = FeedbackDraft::new("run-7");

		draft.set_comment(FeedbackTarget::domain("d1"), "");

		assert!(draft.submissions().expect("Submissions should build.").is_empty());
	}

	#[test]
	fn submissions_cover_entries_then_overall() {
		let mut draft = FeedbackDraft::new("run-7");

		draft.set_accuracy(FeedbackTarget::domain("d1"), AccuracyRating::Yes);
		draft.set_comment(FeedbackTarget::item("i2"), "unclear citation");
		draft.set_overall_rating(5);

		let submissions = draft.submissions().expect("Submissions should build.");

		assert_eq!(submissions.len(), 3);
		assert_eq!(submissions[0].feedback_type, FeedbackKind::Domain);
		assert_eq!(submissions[0].id.as_deref(), Some("d1"));
		assert_eq!(submissions[1].feedback_type, FeedbackKind::Item);
		assert_eq!(submissions[2].feedback_type, FeedbackKind::Overall);
		assert_eq!(submissions[2].id, None);
		assert!(submissions.iter().all(|s| s.run_id == "run-7"));
	}

	#[test]
	fn later_values_overwrite_earlier_ones() {
		let mut draft = FeedbackDraft::new("run-8");
		let target = FeedbackTarget::item("i1");

		draft.set_accuracy(target.clone(), AccuracyRating::No);
		draft.set_accuracy(target.clone(), AccuracyRating::NotUseful);
		draft.set_overall_rating(9);

		assert_eq!(
			draft.entry(&target).and_then(|entry| entry.accuracy),
			Some(AccuracyRating::NotUseful),
		);
		assert_eq!(draft.overall().rating, 5);
	}
}
