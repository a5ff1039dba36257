//! Outcomes of a sweep laid out over the Cartesian product of parameter values.

use serde::{Deserialize, Serialize};

/// One entry per combination, addressed by the per-parameter value indices.
///
/// Entries are stored flat in combination order: the first parameter varies
/// slowest, the last fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepGrid<T> {
    entries: Vec<T>,
    /// Number of values of each parameter
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<T> SweepGrid<T> {
    /// Wrap entries already in combination order; `None` if their count
    /// does not match `shape`
    pub fn from_data(shape: Vec<usize>, entries: Vec<T>) -> Option<Self> {
        if entries.len() != shape.iter().product::<usize>() {
            return None;
        }
        let strides = strides_of(&shape);
        Some(Self {
            entries,
            shape,
            strides,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Position of a combination in combination order
    pub fn flat_index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.shape.len() {
            return None;
        }
        indices
            .iter()
            .zip(&self.shape)
            .zip(&self.strides)
            .try_fold(0, |flat, ((&index, &size), &stride)| {
                (index < size).then_some(flat + index * stride)
            })
    }

    /// Value indices of the combination at `flat`
    pub fn multi_index(&self, flat: usize) -> Option<Vec<usize>> {
        if flat >= self.entries.len() {
            return None;
        }
        let mut remaining = flat;
        Some(
            self.strides
                .iter()
                .map(|&stride| {
                    let index = remaining / stride;
                    remaining %= stride;
                    index
                })
                .collect(),
        )
    }

    pub fn get(&self, indices: &[usize]) -> Option<&T> {
        self.flat_index(indices).map(|i| &self.entries[i])
    }

    pub fn data(&self) -> &[T] {
        &self.entries
    }

    pub fn into_data(self) -> Vec<T> {
        self.entries
    }

    /// Value indices of every combination, in combination order
    pub fn indices(&self) -> GridIndices {
        GridIndices::new(self.shape.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Vec<usize>, &T)> {
        self.indices().zip(self.entries.iter())
    }
}

fn strides_of(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (1..shape.len()).rev() {
        strides[i - 1] = strides[i] * shape[i];
    }
    strides
}

/// Odometer over the value indices of a sweep, last parameter fastest
pub struct GridIndices {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl GridIndices {
    pub fn new(shape: Vec<usize>) -> Self {
        let next = (!shape.contains(&0)).then(|| vec![0; shape.len()]);
        Self { shape, next }
    }
}

impl Iterator for GridIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for (index, &size) in following.iter_mut().zip(&self.shape).rev() {
            *index += 1;
            if *index < size {
                self.next = Some(following);
                break;
            }
            *index = 0;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_in_combination_order() {
        let indices: Vec<Vec<usize>> = GridIndices::new(vec![2, 3]).collect();
        assert_eq!(
            indices,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2],
            ]
        );
    }

    #[test]
    fn test_flat_and_multi_index_agree() {
        let grid = SweepGrid::from_data(vec![2, 3, 4], vec![0u8; 24]).unwrap();
        for (flat, indices) in grid.indices().enumerate() {
            assert_eq!(grid.flat_index(&indices), Some(flat));
            assert_eq!(grid.multi_index(flat), Some(indices));
        }
        assert_eq!(grid.flat_index(&[2, 0, 0]), None);
        assert_eq!(grid.flat_index(&[0, 0]), None);
        assert_eq!(grid.multi_index(24), None);
    }

    #[test]
    fn test_from_data_checks_length() {
        assert!(SweepGrid::from_data(vec![2, 2], vec![1, 2, 3]).is_none());
        let grid = SweepGrid::from_data(vec![2, 2], vec![1, 2, 3, 4]).unwrap();
        assert_eq!(grid.get(&[1, 0]), Some(&3));
        let pairs: Vec<(Vec<usize>, &i32)> = grid.iter().collect();
        assert_eq!(pairs[3], (vec![1, 1], &4));
    }

    #[test]
    fn test_empty_parameter_yields_nothing() {
        assert_eq!(GridIndices::new(vec![3, 0]).count(), 0);
        let grid = SweepGrid::<f64>::from_data(vec![3, 0], Vec::new()).unwrap();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_no_parameters_has_one_combination() {
        let indices: Vec<Vec<usize>> = GridIndices::new(vec![]).collect();
        assert_eq!(indices, vec![Vec::<usize>::new()]);
    }
}
