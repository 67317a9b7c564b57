//! Cursor-based multi-page retrieval for Helix list endpoints.
//!
//! Each response carries `pagination.cursor`; passing it back as `after`
//! yields the next page. A missing or empty cursor means end of data.

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::client::TwitchClient;
use crate::error::TwitchError;
use crate::types::Page;

/// Maximum number of pages fetched in one call before returning an error.
/// Guards against cycling cursors.
///
/// Each page may itself be retried up to `max_retries` times, so the
/// worst-case request count is `MAX_PAGES * (1 + max_retries)`.
pub const MAX_PAGES: usize = 500;

/// Largest `first` value Helix accepts.
pub const MAX_PAGE_SIZE: usize = 100;

/// Takes records from one page in order until `room` is filled or `stop`
/// matches. The matching record is not taken.
///
/// Returns the taken records and whether `stop` fired.
pub(crate) fn take_until<T, F>(page: Vec<T>, room: usize, stop: &mut F) -> (Vec<T>, bool)
where
    F: FnMut(&T) -> bool,
{
    let mut taken = Vec::with_capacity(page.len().min(room));
    for record in page {
        if taken.len() >= room {
            break;
        }
        if stop(&record) {
            return (taken, true);
        }
        taken.push(record);
    }
    (taken, false)
}

impl TwitchClient {
    /// Fetches up to `target_count` records from a paged endpoint.
    ///
    /// Sends `first = min(per_page, remaining, 100)` and follows cursors until
    /// a page comes back empty, `target_count` is reached, no cursor is
    /// returned, or `stop` matches a record. Records are assumed to arrive in
    /// the order the caller's sort implies, so nothing at or after a `stop`
    /// match is emitted and no later page is requested.
    ///
    /// Records that fail to deserialize are logged and skipped.
    ///
    /// **All-or-nothing**: if any page request fails, records gathered from
    /// earlier pages are discarded and the error is returned.
    ///
    /// # Errors
    ///
    /// Propagates any error from [`TwitchClient::execute`].
    /// Returns [`TwitchError::Deserialize`] if a page envelope is malformed and
    /// [`TwitchError::PaginationLimit`] after [`MAX_PAGES`] pages.
    pub async fn fetch_pages<T, F>(
        &self,
        path: &str,
        params: &[(&str, String)],
        per_page: usize,
        target_count: usize,
        mut stop: F,
    ) -> Result<Vec<T>, TwitchError>
    where
        T: DeserializeOwned,
        F: FnMut(&T) -> bool,
    {
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        let mut records: Vec<T> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count = 0usize;

        while records.len() < target_count {
            page_count += 1;
            if page_count > MAX_PAGES {
                return Err(TwitchError::PaginationLimit {
                    path: path.to_owned(),
                    max_pages: MAX_PAGES,
                });
            }

            if page_count > 1 && !self.inter_page_delay.is_zero() {
                tokio::time::sleep(self.inter_page_delay).await;
            }

            let remaining = target_count - records.len();
            let mut query: Vec<(&str, String)> = params.to_vec();
            query.push(("first", per_page.min(remaining).to_string()));
            if let Some(after) = &cursor {
                query.push(("after", after.clone()));
            }

            let body = self.execute(Method::GET, path, &query).await?;
            let page: Page = serde_json::from_value(body).map_err(|e| TwitchError::Deserialize {
                context: format!("{path} page {page_count}"),
                source: e,
            })?;

            if page.data.is_empty() {
                break;
            }
            let next = page.next_cursor().map(str::to_owned);

            let parsed: Vec<T> = page
                .data
                .into_iter()
                .filter_map(|raw| match serde_json::from_value::<T>(raw) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(path, page = page_count, error = %e, "skipping malformed record");
                        None
                    }
                })
                .collect();

            let (taken, stopped) = take_until(parsed, remaining, &mut stop);
            records.extend(taken);

            if stopped {
                tracing::debug!(path, pages = page_count, collected = records.len(), "early stop");
                break;
            }
            match next {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_until_respects_room() {
        let (taken, stopped) = take_until(vec![1, 2, 3, 4], 2, &mut |_: &i32| false);
        assert_eq!(taken, vec![1, 2]);
        assert!(!stopped);
    }

    #[test]
    fn take_until_excludes_matching_record_and_rest() {
        let (taken, stopped) = take_until(vec![5, 4, 3, 2], 10, &mut |v: &i32| *v <= 3);
        assert_eq!(taken, vec![5, 4]);
        assert!(stopped);
    }

    #[test]
    fn take_until_stop_on_first_record() {
        let (taken, stopped) = take_until(vec![1, 2], 10, &mut |_: &i32| true);
        assert!(taken.is_empty());
        assert!(stopped);
    }

    #[test]
    fn take_until_room_filled_before_stop_is_not_a_stop() {
        let (taken, stopped) = take_until(vec![9, 8, 1], 2, &mut |v: &i32| *v == 1);
        assert_eq!(taken, vec![9, 8]);
        assert!(!stopped);
    }
}
