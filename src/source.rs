use crate::types::Float;

/// Logical access pattern of a labeled, time-indexed storage source.
///
/// The labels do not include the time column; each row carries one value per
/// label plus its own timestamp.
pub trait StorageSource {
    /// Ordered column labels, excluding time.
    fn labels(&self) -> &[String];

    /// Number of rows the source claims to hold.
    fn row_count(&self) -> usize;

    /// Timestamp of row `i`.
    fn row_time(&self, i: usize) -> Option<Float>;

    /// Flat values of row `i`, one per label.
    fn row_values(&self, i: usize) -> Option<&[Float]>;

    /// The full time column, in row order.
    fn time_column(&self) -> Vec<Float>;
}
