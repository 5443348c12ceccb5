//! Merging of historical and forecast batches.

use std::collections::HashMap;

use tracing::{info, warn};

use cornbelt_types::Batch;

/// Combine historical and forecast records for one location.
///
/// Records are deduplicated on `(date, location)`. When both inputs contain
/// the same key the forecast record wins. The output is sorted by date.
/// Returns `None` when either input has no records. Rows with unparsable
/// dates cannot be keyed and are not carried over.
///
/// # Example
///
/// ```
/// use cornbelt_core::merge::merge;
/// use cornbelt_types::{Batch, WeatherRecord, parse_date};
///
/// let day = parse_date("2024-09-01").unwrap();
/// let mut observed = WeatherRecord::new(day, "iowa_center");
/// observed.values.precipitation_sum = Some(1.0);
/// let mut predicted = WeatherRecord::new(day, "iowa_center");
/// predicted.values.precipitation_sum = Some(4.0);
///
/// let merged = merge(&Batch::new(vec![observed]), &Batch::new(vec![predicted])).unwrap();
/// assert_eq!(merged.records.len(), 1);
/// assert_eq!(merged.records[0].values.precipitation_sum, Some(4.0));
/// ```
pub fn merge(historical: &Batch, forecast: &Batch) -> Option<Batch> {
    if historical.records.is_empty() || forecast.records.is_empty() {
        warn!("Cannot merge: one of the batches has no records");
        return None;
    }

    let combined: Vec<_> = historical.iter().chain(forecast.iter()).collect();

    // position of the last occurrence of every key
    let mut last = HashMap::with_capacity(combined.len());
    for (i, record) in combined.iter().enumerate() {
        last.insert((record.date, record.location.as_str()), i);
    }

    let mut records: Vec<_> = combined
        .iter()
        .enumerate()
        .filter(|(i, r)| last.get(&(r.date, r.location.as_str())) == Some(i))
        .map(|(_, r)| (*r).clone())
        .collect();
    records.sort_by_key(|r| r.date);

    info!(
        "Merged {} historical and {} forecast records into {}",
        historical.records.len(),
        forecast.records.len(),
        records.len()
    );

    Some(Batch::new(records))
}
