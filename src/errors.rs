use thiserror::Error;

/// Inputs whose dimensions do not agree with each other.
///
/// These are raised before the EM loop starts; nothing inside the loop
/// produces them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("at least one group is required")]
    NoGroups,
    #[error("at least two variables are required, found {0}")]
    TooFewVariables(usize),
    #[error("expected {expected} category counts, found {found}")]
    CategoryCount { expected: usize, found: usize },
    #[error("variable {variable} has {categories} categories, at least 2 are required")]
    TooFewCategories { variable: usize, categories: usize },
    #[error("index table must have 6 columns, found {0}")]
    IndexColumns(usize),
    #[error("index table entry ({row}, {column}) is not a non-negative integer")]
    IndexEntry { row: usize, column: usize },
    #[error("index record {record} refers to variable {variable}, but there are {n_variables} variables")]
    VariableOutOfRange {
        record: usize,
        variable: usize,
        n_variables: usize,
    },
    #[error("index record {record} refers to category {category} of variable {variable}, which has {categories} categories")]
    CategoryOutOfRange {
        record: usize,
        variable: usize,
        category: usize,
        categories: usize,
    },
    #[error("index record {record} pairs variable {variable} with itself")]
    SelfPair { record: usize, variable: usize },
    #[error("index record {record} has a negative or non-finite frequency")]
    Frequency { record: usize },
    #[error("the index table has zero total frequency")]
    EmptyTable,
    #[error("expected {expected} groups in {what}, found {found}")]
    GroupCount {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{what} of group {group} has dimension {found}, expected {expected}")]
    Dimension {
        what: &'static str,
        group: usize,
        expected: usize,
        found: usize,
    },
    #[error("thresholds of variable {variable} have length {found}, expected {expected}")]
    ThresholdLength {
        variable: usize,
        expected: usize,
        found: usize,
    },
    #[error("parameter vector has length {found}, expected {expected}")]
    VectorLength { expected: usize, found: usize },
    #[error("responsibilities are {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    Responsibilities {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },
    #[error("observations have {found} columns, expected {expected}")]
    ObservationColumns { expected: usize, found: usize },
    #[error("observation ({row}, {column}) is category {category}, but the variable has {categories} categories")]
    ObservationCategory {
        row: usize,
        column: usize,
        category: usize,
        categories: usize,
    },
}

/// Parameter values that break the structural invariants of the model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("the mean of group 1 must be the zero vector")]
    AnchorMean,
    #[error("the covariance factor of group 1 must have a unit diagonal")]
    AnchorFactor,
    #[error("the covariance factor of group {group} is not upper triangular")]
    NotUpperTriangular { group: usize },
    #[error("the covariance factor of group {group} has a non-positive diagonal entry")]
    NonPositiveDiagonal { group: usize },
    #[error("the covariance of group {group} is not positive definite")]
    NotPositiveDefinite { group: usize },
    #[error("thresholds of variable {variable} must start at -inf and end at +inf")]
    OpenBounds { variable: usize },
    #[error("interior thresholds of variable {variable} are not finite and strictly increasing")]
    NotIncreasing { variable: usize },
    #[error("mixing weights must be non-negative and sum to 1, found sum {sum}")]
    Weights { sum: f64 },
}
