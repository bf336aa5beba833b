use crate::models::{Vote, WordCategory, WordField};
use crate::services::word_store::{WordListStore, WordSet, WordStoreError};
use std::sync::{Arc, Mutex, PoisonError};

/// Lower-case `text` and drop everything outside `a-z`, `0-9` and space
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect()
}

/// Split normalized text on single spaces
///
/// Runs of spaces produce empty tokens and so does empty input. Those
/// tokens are kept: they take part in classification like any other word.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text).split(' ').map(str::to_string).collect()
}

#[derive(Debug, Clone, Default)]
struct WordSets {
    approve: WordSet,
    reject: WordSet,
    review: WordSet,
}

/// Self-training word classifier for one profile field
///
/// The three word lists are loaded lazily on first use and cached on the
/// instance; call [`WordClassifier::reload`] to pick up manual edits.
/// Unknown words are learned into the review list as they are met.
pub struct WordClassifier {
    field: WordField,
    store: Arc<WordListStore>,
    sets: Mutex<Option<WordSets>>,
}

impl WordClassifier {
    pub fn new(field: WordField, store: Arc<WordListStore>) -> Self {
        Self {
            field,
            store,
            sets: Mutex::new(None),
        }
    }

    pub fn field(&self) -> WordField {
        self.field
    }

    /// Classify free text
    ///
    /// 1. any token approved: `Approve`
    /// 2. every token rejected: `Reject`
    /// 3. otherwise `Review`, and every token not rejected is added to the
    ///    review list, which is persisted right away
    pub fn classify(&self, text: &str) -> Result<Vote, WordStoreError> {
        let words = tokenize(text);

        let mut guard = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        let loaded = match guard.take() {
            Some(sets) => sets,
            None => self.load_sets()?,
        };
        let sets = guard.insert(loaded);

        if words.iter().any(|w| sets.approve.contains(w)) {
            tracing::trace!("At least one word in {} is approved: {}", self.field, text);
            return Ok(Vote::Approve);
        }

        if words.iter().all(|w| sets.reject.contains(w)) {
            tracing::trace!("All words in {} are rejected: {}", self.field, text);
            return Ok(Vote::Reject);
        }

        let unseen: WordSet = words
            .into_iter()
            .filter(|w| !sets.reject.contains(w) && !sets.approve.contains(w) && !sets.review.contains(w))
            .collect();

        if !unseen.is_empty() {
            tracing::debug!("Learning {} new {} word(s) for review: {:?}", unseen.len(), self.field, unseen);
            sets.review = self.store.insert(self.field, WordCategory::Review, unseen)?;
        }

        tracing::trace!("Words in {} are up for review: {}", self.field, text);
        Ok(Vote::Review)
    }

    /// Drop the cached word lists so the next classification re-reads them
    pub fn reload(&self) {
        *self.sets.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Words currently waiting for review
    pub fn review_words(&self) -> Result<WordSet, WordStoreError> {
        let mut guard = self.sets.lock().unwrap_or_else(PoisonError::into_inner);
        let loaded = match guard.take() {
            Some(sets) => sets,
            None => self.load_sets()?,
        };
        Ok(guard.insert(loaded).review.clone())
    }

    fn load_sets(&self) -> Result<WordSets, WordStoreError> {
        let sets = WordSets {
            approve: self.store.load(self.field, WordCategory::Approve)?,
            reject: self.store.load(self.field, WordCategory::Reject)?,
            review: self.store.load(self.field, WordCategory::Review)?,
        };

        tracing::debug!(
            "Loaded {} word lists: {} approve, {} reject, {} review",
            self.field,
            sets.approve.len(),
            sets.reject.len(),
            sets.review.len()
        );
        Ok(sets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn setup(approve: &[&str], reject: &[&str]) -> (tempfile::TempDir, Arc<WordListStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WordListStore::new(dir.path()));
        fs::write(
            store.path(WordField::School, WordCategory::Approve),
            serde_json::to_string(approve).unwrap(),
        )
        .unwrap();
        fs::write(
            store.path(WordField::School, WordCategory::Reject),
            serde_json::to_string(reject).unwrap(),
        )
        .unwrap();
        (dir, store)
    }

    fn persisted_review(store: &WordListStore) -> Vec<String> {
        let raw = fs::read_to_string(store.path(WordField::School, WordCategory::Review)).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_normalize_strips_punctuation_and_case() {
        assert_eq!(normalize("Vrije Universiteit, A'dam!"), "vrije universiteit adam");
        assert_eq!(normalize("École 42"), "cole 42");
    }

    #[test]
    fn test_tokenize_keeps_empty_tokens() {
        assert_eq!(tokenize("a  b"), vec!["a", "", "b"]);
        assert_eq!(tokenize(""), vec![""]);
    }

    #[test]
    fn test_unknown_words_go_to_review() {
        let (_dir, store) = setup(&[], &[]);
        let classifier = WordClassifier::new(WordField::School, store.clone());

        let vote = classifier.classify("Amsterdam University").unwrap();

        assert_eq!(vote, Vote::Review);
        assert_eq!(persisted_review(&store), vec!["amsterdam", "university"]);
    }

    #[test]
    fn test_all_rejected_words_reject_without_learning() {
        let (_dir, store) = setup(&[], &["highschool"]);
        let classifier = WordClassifier::new(WordField::School, store.clone());

        assert_eq!(classifier.classify("highschool").unwrap(), Vote::Reject);
        assert!(persisted_review(&store).is_empty());
    }

    #[test]
    fn test_approve_dominates_reject() {
        let (_dir, store) = setup(&["uva"], &["college"]);
        let classifier = WordClassifier::new(WordField::School, store);

        assert_eq!(classifier.classify("UvA College").unwrap(), Vote::Approve);
    }

    #[test]
    fn test_rejected_words_never_enter_review() {
        let (_dir, store) = setup(&[], &["hogeschool"]);
        let classifier = WordClassifier::new(WordField::School, store.clone());

        assert_eq!(classifier.classify("Hogeschool Utrecht").unwrap(), Vote::Review);
        assert_eq!(persisted_review(&store), vec!["utrecht"]);
    }

    #[test]
    fn test_learning_is_idempotent() {
        let (_dir, store) = setup(&[], &[]);
        let classifier = WordClassifier::new(WordField::School, store.clone());

        classifier.classify("Leiden").unwrap();
        classifier.classify("leiden").unwrap();
        let second = WordClassifier::new(WordField::School, store.clone());
        second.classify("LEIDEN").unwrap();

        assert_eq!(persisted_review(&store), vec!["leiden"]);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let (_dir, store) = setup(&["tu"], &["mbo"]);
        let classifier = WordClassifier::new(WordField::School, store);

        for text in ["TU Delft", "MBO", "ROC Amsterdam", ""] {
            let first = classifier.classify(text).unwrap();
            for _ in 0..3 {
                assert_eq!(classifier.classify(text).unwrap(), first);
            }
        }
    }

    #[test]
    fn test_double_space_yields_empty_review_word() {
        let (_dir, store) = setup(&[], &["a", "b"]);
        let classifier = WordClassifier::new(WordField::School, store.clone());

        assert_eq!(classifier.classify("a  b").unwrap(), Vote::Review);
        assert_eq!(persisted_review(&store), vec![""]);
    }

    #[test]
    fn test_empty_text_with_empty_lists() {
        let (_dir, store) = setup(&[], &[]);
        let classifier = WordClassifier::new(WordField::School, store.clone());

        assert_eq!(classifier.classify("").unwrap(), Vote::Review);
        assert_eq!(persisted_review(&store), vec![""]);
    }

    #[test]
    fn test_lists_stay_mutually_exclusive() {
        let (_dir, store) = setup(&["uva"], &["hbo", "mbo"]);
        let classifier = WordClassifier::new(WordField::School, store.clone());

        for text in ["HBO Rotterdam", "MBO", "UvA", "Erasmus MBO", "Saxion"] {
            classifier.classify(text).unwrap();
        }

        let review = classifier.review_words().unwrap();
        assert!(!review.contains("uva"));
        assert!(!review.contains("hbo"));
        assert!(!review.contains("mbo"));
        assert!(review.contains("rotterdam"));
        assert!(review.contains("saxion"));
    }

    #[test]
    fn test_reload_picks_up_manual_edits() {
        let (_dir, store) = setup(&[], &[]);
        let classifier = WordClassifier::new(WordField::School, store.clone());
        assert_eq!(classifier.classify("Wageningen").unwrap(), Vote::Review);

        fs::write(store.path(WordField::School, WordCategory::Approve), r#"["wageningen"]"#).unwrap();
        assert_eq!(classifier.classify("Wageningen").unwrap(), Vote::Review);

        classifier.reload();
        assert_eq!(classifier.classify("Wageningen").unwrap(), Vote::Approve);
    }

    #[test]
    fn test_lists_load_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(WordListStore::new(dir.path()));
        let classifier = WordClassifier::new(WordField::Bio, store.clone());

        assert!(!store.path(WordField::Bio, WordCategory::Approve).exists());
        classifier.classify("hello").unwrap();
        assert!(store.path(WordField::Bio, WordCategory::Approve).exists());
        assert!(store.path(WordField::Bio, WordCategory::Reject).exists());
    }
}
