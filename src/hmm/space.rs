use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{HmmError, Result};

/// An ordered set of labels with a stable index for each one.
///
/// Indices follow insertion order, so `labels[i]` always maps to `i` and back.
/// Used for both hidden states and observation symbols.
///
/// # Examples
///
/// ```
/// use viterbi_hmm::LabelSpace;
///
/// let states = LabelSpace::new(vec!['F', 'L']).unwrap();
/// assert_eq!(states.index_of(&'L').unwrap(), 1);
/// assert_eq!(states.label(0), Some(&'F'));
/// ```
#[derive(Debug, Clone)]
pub struct LabelSpace<L> {
    labels: Vec<L>,
    index: HashMap<L, usize>,
}

impl<L> LabelSpace<L>
where
    L: Eq + Hash + Clone + Debug,
{
    /// Builds a space from an ordered list of distinct labels.
    ///
    /// # Errors
    ///
    /// Returns `HmmError::EmptyModel` for an empty list and
    /// `HmmError::DuplicateLabel` if a label appears twice.
    pub fn new(labels: Vec<L>) -> Result<Self> {
        if labels.is_empty() {
            return Err(HmmError::EmptyModel);
        }
        let mut index = HashMap::with_capacity(labels.len());
        for (i, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), i).is_some() {
                return Err(HmmError::DuplicateLabel(format!("{:?}", label)));
            }
        }
        Ok(Self { labels, index })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.labels.iter()
    }

    pub fn as_slice(&self) -> &[L] {
        &self.labels
    }

    /// Returns the label at `index`, if any.
    pub fn label(&self, index: usize) -> Option<&L> {
        self.labels.get(index)
    }

    /// Returns the index of `label`.
    pub fn index_of(&self, label: &L) -> Result<usize> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| HmmError::UnknownLabel(format!("{:?}", label)))
    }

    /// Maps a sequence of labels to indices, failing on the first unknown label.
    pub fn indices(&self, sequence: &[L]) -> Result<Vec<usize>> {
        sequence.iter().map(|label| self.index_of(label)).collect()
    }

    /// Maps a sequence of indices back to labels.
    pub fn labels_for(&self, indices: &[usize]) -> Result<Vec<L>> {
        indices
            .iter()
            .map(|&i| {
                self.labels
                    .get(i)
                    .cloned()
                    .ok_or_else(|| HmmError::UnknownLabel(format!("index {}", i)))
            })
            .collect()
    }
}

impl LabelSpace<usize> {
    /// The integer space `0..n`.
    pub fn range(n: usize) -> Result<Self> {
        Self::new((0..n).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_indices() {
        let space = LabelSpace::new(vec!["1", "2", "3", "4", "5", "6"]).unwrap();
        assert_eq!(space.len(), 6);
        for (i, label) in space.iter().enumerate() {
            assert_eq!(space.index_of(label).unwrap(), i);
        }
    }

    #[test]
    fn test_round_trip_sequence() {
        let space = LabelSpace::new(vec!["Fair".to_string(), "Loaded".to_string()]).unwrap();
        let seq = vec!["Loaded".to_string(), "Fair".to_string(), "Loaded".to_string()];
        let idx = space.indices(&seq).unwrap();
        assert_eq!(idx, vec![1, 0, 1]);
        assert_eq!(space.labels_for(&idx).unwrap(), seq);
    }

    #[test]
    fn test_unknown_label() {
        let space = LabelSpace::new(vec!['a', 'b']).unwrap();
        assert_eq!(
            space.index_of(&'z'),
            Err(HmmError::UnknownLabel("'z'".to_string()))
        );
        assert!(space.indices(&['a', 'c']).is_err());
        assert!(space.labels_for(&[0, 2]).is_err());
    }

    #[test]
    fn test_duplicate_and_empty() {
        assert_eq!(
            LabelSpace::new(vec![1, 2, 1]).unwrap_err(),
            HmmError::DuplicateLabel("1".to_string())
        );
        assert_eq!(
            LabelSpace::<u8>::new(vec![]).unwrap_err(),
            HmmError::EmptyModel
        );
    }

    #[test]
    fn test_range() {
        let space = LabelSpace::range(3).unwrap();
        assert_eq!(space.as_slice(), &[0, 1, 2]);
        assert_eq!(space.label(3), None);
    }
}
