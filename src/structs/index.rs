use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::errors::ShapeError;
use crate::structs::layout::Layout;

/// One cell of a bivariate contingency table.
///
/// Variables and categories are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    pub first: usize,
    pub second: usize,
    pub first_category: usize,
    pub second_category: usize,
    /// Running identifier of the variable pair
    pub pair: usize,
    pub frequency: f64,
}

/// All cells of all bivariate contingency tables of a data set, pair by pair.
///
/// This is the only view of the data the estimation works with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexTable {
    records: Vec<IndexRecord>,
}

impl IndexTable {
    pub fn from_records(records: Vec<IndexRecord>) -> Self {
        Self { records }
    }

    /// Build the table from a numeric array with the columns
    /// `first, second, first_category, second_category, pair, frequency`.
    pub fn from_array(array: ArrayView2<f64>) -> Result<Self, ShapeError> {
        if array.ncols() != 6 {
            return Err(ShapeError::IndexColumns(array.ncols()));
        }
        let as_index = |row: usize, column: usize| -> Result<usize, ShapeError> {
            let value = array[[row, column]];
            if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
                Ok(value as usize)
            } else {
                Err(ShapeError::IndexEntry { row, column })
            }
        };
        let mut records = Vec::with_capacity(array.nrows());
        for row in 0..array.nrows() {
            records.push(IndexRecord {
                first: as_index(row, 0)?,
                second: as_index(row, 1)?,
                first_category: as_index(row, 2)?,
                second_category: as_index(row, 3)?,
                pair: as_index(row, 4)?,
                frequency: array[[row, 5]],
            });
        }
        Ok(Self { records })
    }

    /// Cross-tabulate every pair of variables `i < j` of an `n x P` matrix of
    /// 0-based categories.
    ///
    /// Every cell is kept, including the empty ones, so the table has
    /// `Σ_{i<j} categories[i] · categories[j]` records.
    pub fn from_observations(
        observations: ArrayView2<usize>,
        categories: &[usize],
    ) -> Result<Self, ShapeError> {
        let n_variables = categories.len();
        if observations.ncols() != n_variables {
            return Err(ShapeError::ObservationColumns {
                expected: n_variables,
                found: observations.ncols(),
            });
        }
        for ((row, column), &category) in observations.indexed_iter() {
            if category >= categories[column] {
                return Err(ShapeError::ObservationCategory {
                    row,
                    column,
                    category,
                    categories: categories[column],
                });
            }
        }

        let mut records = Vec::new();
        let mut pair = 0;
        for i in 0..n_variables.saturating_sub(1) {
            for j in (i + 1)..n_variables {
                let mut counts = vec![0usize; categories[i] * categories[j]];
                for row in observations.rows() {
                    counts[row[i] * categories[j] + row[j]] += 1;
                }
                for ci in 0..categories[i] {
                    for cj in 0..categories[j] {
                        records.push(IndexRecord {
                            first: i,
                            second: j,
                            first_category: ci,
                            second_category: cj,
                            pair,
                            frequency: counts[ci * categories[j] + cj] as f64,
                        });
                    }
                }
                pair += 1;
            }
        }
        Ok(Self { records })
    }

    /// Check that every record refers to existing variables and categories
    pub fn check_layout(&self, layout: &Layout) -> Result<(), ShapeError> {
        let categories = layout.categories();
        for (record, r) in self.records.iter().enumerate() {
            for variable in [r.first, r.second] {
                if variable >= layout.n_variables() {
                    return Err(ShapeError::VariableOutOfRange {
                        record,
                        variable,
                        n_variables: layout.n_variables(),
                    });
                }
            }
            if r.first == r.second {
                return Err(ShapeError::SelfPair {
                    record,
                    variable: r.first,
                });
            }
            for (variable, category) in [(r.first, r.first_category), (r.second, r.second_category)] {
                if category >= categories[variable] {
                    return Err(ShapeError::CategoryOutOfRange {
                        record,
                        variable,
                        category,
                        categories: categories[variable],
                    });
                }
            }
            if !(r.frequency >= 0.0 && r.frequency.is_finite()) {
                return Err(ShapeError::Frequency { record });
            }
        }
        if !(self.total_frequency() > 0.0) {
            return Err(ShapeError::EmptyTable);
        }
        Ok(())
    }

    pub fn records(&self) -> &[IndexRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexRecord> + '_ {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn frequencies(&self) -> Array1<f64> {
        self.records.iter().map(|r| r.frequency).collect()
    }

    pub fn total_frequency(&self) -> f64 {
        self.records.iter().map(|r| r.frequency).sum()
    }

    /// Number of distinct variable pairs
    pub fn n_pairs(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.pair)
            .max()
            .map_or(0, |max| max + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_observations() {
        let observations = array![[0, 1, 2], [1, 1, 0], [0, 0, 2], [0, 1, 2]];
        let categories = [2, 2, 3];
        let table = IndexTable::from_observations(observations.view(), &categories).unwrap();

        // 2x2 + 2x3 + 2x3 cells
        assert_eq!(table.len(), 16);
        assert_eq!(table.n_pairs(), 3);
        // Each pair table holds every observation once
        assert_eq!(table.total_frequency(), 12.0);

        let cell = table
            .iter()
            .find(|r| r.first == 0 && r.second == 2 && r.first_category == 0 && r.second_category == 2)
            .unwrap();
        assert_eq!(cell.frequency, 3.0);
        assert_eq!(cell.pair, 1);

        // Empty cells are kept
        assert!(table.iter().any(|r| r.frequency == 0.0));
    }

    #[test]
    fn test_from_observations_rejects_bad_category() {
        let observations = array![[0, 3]];
        assert_eq!(
            IndexTable::from_observations(observations.view(), &[2, 3]),
            Err(ShapeError::ObservationCategory {
                row: 0,
                column: 1,
                category: 3,
                categories: 3
            })
        );
    }

    #[test]
    fn test_from_array() {
        let raw = array![[0.0, 1.0, 0.0, 1.0, 0.0, 7.0], [0.0, 1.0, 1.0, 1.0, 0.0, 2.0]];
        let table = IndexTable::from_array(raw.view()).unwrap();
        assert_eq!(table.records()[0].second_category, 1);
        assert_eq!(table.frequencies(), array![7.0, 2.0]);

        let narrow = array![[0.0, 1.0, 0.0, 1.0, 0.0]];
        assert_eq!(
            IndexTable::from_array(narrow.view()),
            Err(ShapeError::IndexColumns(5))
        );

        let fractional = array![[0.0, 1.5, 0.0, 1.0, 0.0, 1.0]];
        assert_eq!(
            IndexTable::from_array(fractional.view()),
            Err(ShapeError::IndexEntry { row: 0, column: 1 })
        );
    }

    #[test]
    fn test_check_layout() {
        let layout = Layout::new(2, 2, &[2, 2]).unwrap();
        let ok = IndexTable::from_records(vec![IndexRecord {
            first: 0,
            second: 1,
            first_category: 1,
            second_category: 0,
            pair: 0,
            frequency: 4.0,
        }]);
        assert!(ok.check_layout(&layout).is_ok());

        let out_of_range = IndexTable::from_records(vec![IndexRecord {
            first: 0,
            second: 1,
            first_category: 2,
            second_category: 0,
            pair: 0,
            frequency: 4.0,
        }]);
        assert_eq!(
            out_of_range.check_layout(&layout),
            Err(ShapeError::CategoryOutOfRange {
                record: 0,
                variable: 0,
                category: 2,
                categories: 2
            })
        );

        let empty = IndexTable::from_records(vec![IndexRecord {
            first: 0,
            second: 1,
            first_category: 0,
            second_category: 0,
            pair: 0,
            frequency: 0.0,
        }]);
        assert_eq!(empty.check_layout(&layout), Err(ShapeError::EmptyTable));
    }
}
