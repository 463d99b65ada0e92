//! Observation cell.

use crate::provider::{AccessError, ResourceAccessor};
use chrono::{DateTime, Utc};

/// Holds the most recently fetched representation of a polled resource.
///
/// One cell belongs to one poll operation. Only [`ObservationCell::refresh`]
/// writes it; the classifier reads it between refreshes.
#[derive(Debug, Clone)]
pub struct ObservationCell<R> {
    value: Option<R>,
    refreshes: u32,
    last_refreshed: Option<DateTime<Utc>>,
}

impl<R> Default for ObservationCell<R> {
    fn default() -> Self {
        Self {
            value: None,
            refreshes: 0,
            last_refreshed: None,
        }
    }
}

impl<R> ObservationCell<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the cell with a representation the caller already holds.
    pub fn seeded(value: R) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn get(&self) -> Option<&R> {
        self.value.as_ref()
    }

    /// Number of completed refreshes.
    pub fn refreshes(&self) -> u32 {
        self.refreshes
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed
    }

    pub fn into_inner(self) -> Option<R> {
        self.value
    }

    /// Move the current value out, leaving the cell empty.
    pub fn take(&mut self) -> Option<R> {
        self.value.take()
    }

    /// Fetch the resource again and replace the cell's contents.
    ///
    /// A resource reported absent clears the cell. Errors leave the previous
    /// contents in place.
    pub async fn refresh<A>(&mut self, accessor: &A, id: &str) -> Result<Option<&R>, AccessError>
    where
        A: ResourceAccessor<R> + ?Sized,
    {
        let fetched = accessor.fetch(id).await?;
        self.value = fetched;
        self.refreshes += 1;
        self.last_refreshed = Some(Utc::now());
        Ok(self.value.as_ref())
    }
}
