use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};
use thiserror::Error;
use uuid::Uuid;

use super::cursor::{Cursor, CursorError};

#[derive(Error, Debug)]
pub enum PageError {
    #[error(transparent)]
    MalformedCursor(#[from] CursorError),

    #[error("limit must be a positive integer")]
    InvalidLimit,
}

/// Rows that can be positioned in the keyset order.
///
/// The composite key `(created_at, id)` is a total order: `id` breaks ties
/// when two rows share a creation timestamp, and neither field changes after
/// insert.
pub trait SortKeyed {
    fn sort_key(&self) -> (DateTime<Utc>, Uuid);
}

/// A validated pagination request: page size plus the decoded cursor, if the
/// caller supplied one. First-page requests carry no cursor.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub limit: i64,
    pub cursor: Option<Cursor>,
}

impl PageRequest {
    /// Build from raw query parameters. The cursor token is decoded here,
    /// before any SQL runs, so a malformed token aborts the whole request.
    pub fn from_query(limit: Option<i64>, cursor_token: Option<&str>) -> Result<Self, PageError> {
        let limit = limit.filter(|l| *l > 0).ok_or(PageError::InvalidLimit)?;

        let max_limit = crate::config::CONFIG.pagination.max_limit;
        let limit = if limit > max_limit {
            tracing::warn!("page limit {} exceeds max {}, capping", limit, max_limit);
            max_limit
        } else {
            limit
        };

        let cursor = match cursor_token {
            Some(token) if !token.is_empty() => Some(Cursor::decode(token)?),
            _ => None,
        };

        Ok(Self { limit, cursor })
    }

    /// One row past the page size, to detect whether another page exists in
    /// the direction being walked.
    pub fn fetch_limit(&self) -> i64 {
        self.limit + 1
    }

    /// Backward fetches run in descending key order so the store returns the
    /// `limit + 1` rows nearest the anchor.
    pub fn is_descending(&self) -> bool {
        matches!(self.cursor, Some(c) if !c.points_next)
    }
}

/// Boundary tokens for the assembled page. `None` means there is no page in
/// that direction.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Pager {
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
}

/// One page of results in ascending display order, plus its boundary tokens.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pager,
}

/// Append the keyset range condition for a cursor-anchored fetch.
///
/// Forward: `created_at > $c OR (created_at = $c AND id > $i)`.
/// Backward: the same shape with `<`. The caller's own filter predicates are
/// ANDed around this; `column_prefix` qualifies the key columns when the
/// listing query joins other tables (e.g. `"t."`).
pub fn push_keyset_range(
    builder: &mut QueryBuilder<'_, Postgres>,
    column_prefix: &str,
    cursor: &Cursor,
) {
    let cmp = if cursor.points_next { ">" } else { "<" };

    builder.push(format!(" AND ({}created_at {} ", column_prefix, cmp));
    builder.push_bind(cursor.created_at);
    builder.push(format!(" OR ({}created_at = ", column_prefix));
    builder.push_bind(cursor.created_at);
    builder.push(format!(" AND {}id {} ", column_prefix, cmp));
    builder.push_bind(cursor.id);
    builder.push("))");
}

/// Append `ORDER BY created_at, id` in the fetch direction plus the
/// `limit + 1` row cap.
pub fn push_keyset_order(
    builder: &mut QueryBuilder<'_, Postgres>,
    column_prefix: &str,
    request: &PageRequest,
) {
    let dir = if request.is_descending() { "DESC" } else { "ASC" };

    builder.push(format!(
        " ORDER BY {p}created_at {d}, {p}id {d} LIMIT ",
        p = column_prefix,
        d = dir
    ));
    builder.push_bind(request.fetch_limit());
}

/// Turn a raw `limit + 1` fetch into a display page with boundary cursors.
///
/// `rows` arrive in fetch order: ascending for first-page and forward
/// fetches, descending for backward fetches. The returned page is always
/// ascending by sort key.
///
/// Cursor emission is deliberately asymmetric. Moving in one direction
/// always guarantees a cursor back the way the caller came; the cursor
/// further along is only emitted when the extra row proved more data exists:
/// - first page: `next` iff more rows, `prev` never;
/// - forward page: `next` iff more rows, `prev` always;
/// - backward page: `next` always, `prev` iff more rows.
pub fn assemble<T: SortKeyed>(mut rows: Vec<T>, request: &PageRequest) -> Page<T> {
    let limit = request.limit as usize;
    let has_more = rows.len() > limit;

    if request.is_descending() {
        rows.reverse();
    }

    if has_more {
        match request.cursor {
            // The extra row on a backward fetch is the far end of the
            // window, which sits at the front once reversed to ascending.
            Some(c) if !c.points_next => {
                let excess = rows.len() - limit;
                rows.drain(..excess);
            }
            _ => rows.truncate(limit),
        }
    }

    if rows.is_empty() {
        // Terminal in this direction; no cursor gets emitted either way.
        return Page { data: rows, pagination: Pager::default() };
    }

    let (first_at, first_id) = rows[0].sort_key();
    let (last_at, last_id) = rows[rows.len() - 1].sort_key();

    let mut pagination = Pager::default();
    match request.cursor {
        None => {
            if has_more {
                pagination.next_cursor = Some(Cursor::next(last_at, last_id).encode());
            }
        }
        Some(c) if c.points_next => {
            if has_more {
                pagination.next_cursor = Some(Cursor::next(last_at, last_id).encode());
            }
            pagination.prev_cursor = Some(Cursor::prev(first_at, first_id).encode());
        }
        Some(_) => {
            pagination.next_cursor = Some(Cursor::next(last_at, last_id).encode());
            if has_more {
                pagination.prev_cursor = Some(Cursor::prev(first_at, first_id).encode());
            }
        }
    }

    Page { data: rows, pagination }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        created_at: DateTime<Utc>,
        id: Uuid,
    }

    impl SortKeyed for Row {
        fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
            (self.created_at, self.id)
        }
    }

    impl Serialize for Row {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            self.id.serialize(serializer)
        }
    }

    fn rows(n: usize) -> Vec<Row> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Row {
                created_at: base + Duration::seconds(i as i64),
                id: Uuid::from_u128(i as u128 + 1),
            })
            .collect()
    }

    fn request(limit: i64, cursor: Option<Cursor>) -> PageRequest {
        PageRequest { limit, cursor }
    }

    fn is_ascending(rows: &[Row]) -> bool {
        rows.windows(2).all(|w| w[0].sort_key() < w[1].sort_key())
    }

    #[test]
    fn first_page_with_more_data() {
        // Executor fetched limit + 1 = 11 of the 15 matching rows.
        let all = rows(15);
        let fetched = all[..11].to_vec();

        let page = assemble(fetched, &request(10, None));

        assert_eq!(page.data.len(), 10);
        assert_eq!(page.data, all[..10]);
        assert!(is_ascending(&page.data));
        assert!(page.pagination.prev_cursor.is_none());

        let next = Cursor::decode(page.pagination.next_cursor.as_deref().unwrap()).unwrap();
        assert!(next.points_next);
        assert_eq!((next.created_at, next.id), all[9].sort_key());
    }

    #[test]
    fn first_page_without_more_data() {
        let all = rows(7);
        let page = assemble(all.clone(), &request(10, None));

        assert_eq!(page.data.len(), 7);
        assert!(page.pagination.next_cursor.is_none());
        assert!(page.pagination.prev_cursor.is_none());
    }

    #[test]
    fn forward_page_at_end_of_data() {
        // Followed row 10's next cursor; only rows 11..=15 remain.
        let all = rows(15);
        let (at, id) = all[9].sort_key();
        let req = request(10, Some(Cursor::next(at, id)));
        let fetched = all[10..].to_vec();

        let page = assemble(fetched, &req);

        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data, all[10..]);
        assert!(page.pagination.next_cursor.is_none(), "no rows past 15");

        // There is always a page behind a forward-advanced page.
        let prev = Cursor::decode(page.pagination.prev_cursor.as_deref().unwrap()).unwrap();
        assert!(!prev.points_next);
        assert_eq!((prev.created_at, prev.id), all[10].sort_key());
    }

    #[test]
    fn forward_page_in_the_middle() {
        let all = rows(30);
        let (at, id) = all[9].sort_key();
        let req = request(10, Some(Cursor::next(at, id)));
        let fetched = all[10..21].to_vec();

        let page = assemble(fetched, &req);

        assert_eq!(page.data, all[10..20]);
        assert!(page.pagination.next_cursor.is_some());
        assert!(page.pagination.prev_cursor.is_some());
    }

    #[test]
    fn backward_page_reverses_and_trims_the_far_end() {
        // Walking back from row 21: descending fetch returns rows 20..=10,
        // nearest the anchor first. Row 10 is the extra row.
        let all = rows(30);
        let (at, id) = all[20].sort_key();
        let req = request(10, Some(Cursor::prev(at, id)));
        let mut fetched = all[9..20].to_vec();
        fetched.reverse();

        let page = assemble(fetched, &req);

        assert_eq!(page.data.len(), 10);
        assert_eq!(page.data, all[10..20]);
        assert!(is_ascending(&page.data));

        // Backward pages always point forward again.
        let next = Cursor::decode(page.pagination.next_cursor.as_deref().unwrap()).unwrap();
        assert_eq!((next.created_at, next.id), all[19].sort_key());

        let prev = Cursor::decode(page.pagination.prev_cursor.as_deref().unwrap()).unwrap();
        assert_eq!((prev.created_at, prev.id), all[10].sort_key());
    }

    #[test]
    fn backward_page_at_start_of_data() {
        // Walking back from row 6 with limit 10: only rows 1..=5 precede it.
        let all = rows(15);
        let (at, id) = all[5].sort_key();
        let req = request(10, Some(Cursor::prev(at, id)));
        let mut fetched = all[..5].to_vec();
        fetched.reverse();

        let page = assemble(fetched, &req);

        assert_eq!(page.data, all[..5]);
        assert!(page.pagination.next_cursor.is_some());
        assert!(page.pagination.prev_cursor.is_none(), "nothing before row 1");
    }

    #[test]
    fn empty_page_is_terminal() {
        let page = assemble(Vec::<Row>::new(), &request(10, None));
        assert!(page.data.is_empty());
        assert_eq!(page.pagination, Pager::default());
    }

    #[test]
    fn page_size_bound_holds() {
        for fetched in [rows(1), rows(5), rows(6)] {
            let page = assemble(fetched, &request(5, None));
            assert!(page.data.len() <= 5);
        }
    }

    #[test]
    fn forward_range_sql_shape() {
        let anchor = Cursor::next(Utc::now(), Uuid::new_v4());
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM users WHERE TRUE");
        push_keyset_range(&mut qb, "", &anchor);

        assert_eq!(
            qb.sql(),
            "SELECT * FROM users WHERE TRUE AND (created_at > $1 OR (created_at = $2 AND id > $3))"
        );
    }

    #[test]
    fn backward_range_sql_uses_prefix_and_descending_order() {
        let anchor = Cursor::prev(Utc::now(), Uuid::new_v4());
        let req = request(10, Some(anchor));
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM tasks t WHERE TRUE");
        push_keyset_range(&mut qb, "t.", &anchor);
        push_keyset_order(&mut qb, "t.", &req);

        assert_eq!(
            qb.sql(),
            "SELECT * FROM tasks t WHERE TRUE \
             AND (t.created_at < $1 OR (t.created_at = $2 AND t.id < $3)) \
             ORDER BY t.created_at DESC, t.id DESC LIMIT $4"
        );
    }

    #[test]
    fn first_page_order_sql_is_ascending() {
        let req = request(25, None);
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM projects p WHERE TRUE");
        push_keyset_order(&mut qb, "p.", &req);

        assert_eq!(
            qb.sql(),
            "SELECT * FROM projects p WHERE TRUE ORDER BY p.created_at ASC, p.id ASC LIMIT $1"
        );
    }

    #[test]
    fn rejects_missing_or_non_positive_limit() {
        assert!(matches!(PageRequest::from_query(None, None), Err(PageError::InvalidLimit)));
        assert!(matches!(PageRequest::from_query(Some(0), None), Err(PageError::InvalidLimit)));
        assert!(matches!(PageRequest::from_query(Some(-3), None), Err(PageError::InvalidLimit)));
    }

    #[test]
    fn rejects_malformed_cursor_before_querying() {
        let err = PageRequest::from_query(Some(10), Some("$$$not base64$$$")).unwrap_err();
        assert!(matches!(err, PageError::MalformedCursor(_)));
    }

    #[test]
    fn empty_cursor_token_means_first_page() {
        let req = PageRequest::from_query(Some(10), Some("")).unwrap();
        assert!(req.cursor.is_none());
        assert!(!req.is_descending());
        assert_eq!(req.fetch_limit(), 11);
    }
}
