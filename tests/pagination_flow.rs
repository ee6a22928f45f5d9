//! End-to-end cursor walks over an in-memory row store.
//!
//! The store fetches rows the way the listing queries do: it applies the
//! cursor range, orders by `(created_at, id)` in the fetch direction, and
//! returns at most `limit + 1` rows. Pages are then assembled exactly as the
//! handlers assemble them, so a full forward/backward walk exercises the same
//! code paths minus the SQL executor.

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use teamtrack_api::pagination::{assemble, Page, PageError, PageRequest, SortKeyed};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
struct Record {
    seq: usize,
    created_at: DateTime<Utc>,
    id: Uuid,
}

impl SortKeyed for Record {
    fn sort_key(&self) -> (DateTime<Utc>, Uuid) {
        (self.created_at, self.id)
    }
}

struct Store {
    rows: Vec<Record>,
}

impl Store {
    /// `n` records, every third one sharing a timestamp with its predecessor
    /// so the id tiebreak actually gets exercised.
    fn seed(n: usize) -> Self {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let mut rows: Vec<Record> = (0..n)
            .map(|i| Record {
                seq: i,
                created_at: base + Duration::seconds((i - i % 3) as i64),
                id: Uuid::from_u128(i as u128 + 1),
            })
            .collect();
        rows.sort_by_key(|r| r.sort_key());
        Self { rows }
    }

    /// Fetch `limit + 1` rows past the cursor in the request's direction,
    /// mirroring what the keyset range and order clauses produce in SQL.
    fn fetch(&self, request: &PageRequest) -> Vec<Record> {
        let mut matched: Vec<Record> = self
            .rows
            .iter()
            .filter(|r| match &request.cursor {
                None => true,
                Some(c) if c.points_next => r.sort_key() > (c.created_at, c.id),
                Some(c) => r.sort_key() < (c.created_at, c.id),
            })
            .copied()
            .collect();

        matched.sort_by_key(|r| r.sort_key());
        if request.is_descending() {
            matched.reverse();
        }
        matched.truncate(request.fetch_limit() as usize);
        matched
    }

    fn page(&self, limit: i64, cursor: Option<&str>) -> Result<Page<Record>, PageError> {
        let request = PageRequest::from_query(Some(limit), cursor)?;
        Ok(assemble(self.fetch(&request), &request))
    }
}

fn seqs(page: &Page<Record>) -> Vec<usize> {
    page.data.iter().map(|r| r.seq).collect()
}

#[test]
fn forward_walk_covers_every_row_exactly_once() -> Result<()> {
    let store = Store::seed(45);
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = store.page(10, cursor.as_deref())?;
        assert!(page.data.len() <= 10);
        seen.extend(seqs(&page));

        match page.pagination.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(seen, (0..45).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn fifteen_rows_limit_ten_walks_in_two_pages() -> Result<()> {
    let store = Store::seed(15);

    let first = store.page(10, None)?;
    assert_eq!(seqs(&first), (0..10).collect::<Vec<_>>());
    assert!(first.pagination.prev_cursor.is_none());
    let next = first
        .pagination
        .next_cursor
        .ok_or_else(|| anyhow::anyhow!("expected next cursor"))?;

    let second = store.page(10, Some(&next))?;
    assert_eq!(seqs(&second), (10..15).collect::<Vec<_>>());
    assert!(second.pagination.next_cursor.is_none(), "no third page");
    assert!(second.pagination.prev_cursor.is_some());
    Ok(())
}

#[test]
fn backward_then_forward_returns_to_the_same_page() -> Result<()> {
    let store = Store::seed(40);

    // Advance to the third page.
    let p1 = store.page(10, None)?;
    let p2 = store.page(10, p1.pagination.next_cursor.as_deref())?;
    let p3 = store.page(10, p2.pagination.next_cursor.as_deref())?;
    assert_eq!(seqs(&p3), (20..30).collect::<Vec<_>>());

    // Step back, then forward again.
    let back = store.page(10, p3.pagination.prev_cursor.as_deref())?;
    assert_eq!(seqs(&back), seqs(&p2), "prev from page 3 is page 2");

    let forward = store.page(10, back.pagination.next_cursor.as_deref())?;
    assert_eq!(seqs(&forward), seqs(&p3), "next from page 2 is page 3 again");
    Ok(())
}

#[test]
fn backward_walk_from_the_end_reaches_the_first_row() -> Result<()> {
    let store = Store::seed(23);

    // Walk forward to the last page first.
    let mut last = store.page(7, None)?;
    while let Some(next) = last.pagination.next_cursor.clone() {
        last = store.page(7, Some(&next))?;
    }
    assert_eq!(seqs(&last), (21..23).collect::<Vec<_>>());

    // Now walk all the way back.
    let mut seen_backward = seqs(&last);
    let mut prev = last.pagination.prev_cursor;
    while let Some(token) = prev {
        let page = store.page(7, Some(&token))?;
        assert!(page.pagination.next_cursor.is_some(), "backward pages can always return");
        let mut rows = seqs(&page);
        rows.extend(seen_backward);
        seen_backward = rows;
        prev = page.pagination.prev_cursor;
    }

    assert_eq!(seen_backward, (0..23).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn empty_store_yields_a_terminal_page() -> Result<()> {
    let store = Store::seed(0);
    let page = store.page(10, None)?;

    assert!(page.data.is_empty());
    assert!(page.pagination.next_cursor.is_none());
    assert!(page.pagination.prev_cursor.is_none());
    Ok(())
}

#[test]
fn malformed_cursor_fails_before_any_fetch() {
    let store = Store::seed(5);

    let err = store.page(10, Some("not-a-cursor")).unwrap_err();
    assert!(matches!(err, PageError::MalformedCursor(_)));

    // Valid base64 wrapping garbage is just as malformed.
    let err = store.page(10, Some("bm90IGpzb24")).unwrap_err();
    assert!(matches!(err, PageError::MalformedCursor(_)));
}

#[test]
fn cursors_survive_url_transport() -> Result<()> {
    let store = Store::seed(12);
    let page = store.page(5, None)?;
    let token = page
        .pagination
        .next_cursor
        .ok_or_else(|| anyhow::anyhow!("expected next cursor"))?;

    assert!(
        token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
        "token should need no percent-encoding: {token}"
    );

    let again = store.page(5, Some(&token))?;
    assert_eq!(seqs(&again), (5..10).collect::<Vec<_>>());
    Ok(())
}
