//! In-memory [`Store`] used by tests and local experiments.
//!
//! Mirrors the parts of the relational store the handlers depend on: ids and
//! timestamps are assigned on insert, `updated_at` is refreshed on update,
//! `is_active` defaults to true, and `created_at` is strictly increasing so
//! newest-first ordering is deterministic.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};
use time::{format_description::well_known::Rfc3339, Duration, OffsetDateTime};

use super::{Filter, Operation, Query, Row, Store, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    next_id: i64,
    last_created: Option<OffsetDateTime>,
    rows: HashMap<String, Vec<Row>>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    failure: Mutex<Option<String>>,
    drop_inserts: AtomicBool,
    executed: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent query fail with [`StoreError::Unavailable`].
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(message.to_string());
    }

    pub fn recover(&self) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Makes inserts succeed without storing or returning a row, the way
    /// PostgREST answers when row-level security hides the new record.
    pub fn empty_inserts(&self, enabled: bool) {
        self.drop_inserts.store(enabled, AtomicOrdering::SeqCst);
    }

    /// Number of queries that reached the store (including failed ones).
    pub fn executed(&self) -> usize {
        self.executed.load(AtomicOrdering::SeqCst)
    }

    /// Stores a row exactly as given, bypassing defaults.
    pub fn insert_raw(&self, table: &str, row: Row) {
        let mut tables = self.lock();
        tables.rows.entry(table.to_string()).or_default().push(row);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().rows.get(table).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Tables {
    fn next_timestamp(&mut self) -> OffsetDateTime {
        let mut now = OffsetDateTime::now_utc();
        if let Some(last) = self.last_created {
            if now <= last {
                now = last + Duration::microseconds(1);
            }
        }
        self.last_created = Some(now);
        now
    }
}

fn timestamp(t: OffsetDateTime) -> StoreResult<Value> {
    t.format(&Rfc3339)
        .map(Value::String)
        .map_err(|e| StoreError::Unavailable(e.to_string()))
}

fn matches(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| match filter {
        Filter::Eq(col, value) => row.get(col).unwrap_or(&Value::Null) == value,
        Filter::ILike(col, pattern) => match row.get(col) {
            Some(Value::String(s)) => ilike(s, pattern),
            _ => false,
        },
    })
}

/// SQL `ILIKE`: `%` matches any run of characters, `_` exactly one.
pub fn ilike(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let pattern: Vec<char> = pattern.to_lowercase().chars().collect();

    // reachable[j]: pattern[..i] matches text[..j]
    let mut reachable = vec![false; text.len() + 1];
    reachable[0] = true;
    for p in &pattern {
        let mut next = vec![false; text.len() + 1];
        match p {
            '%' => {
                let mut seen = false;
                for j in 0..=text.len() {
                    seen |= reachable[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=text.len() {
                    next[j] = reachable[j - 1];
                }
            }
            c => {
                for j in 1..=text.len() {
                    next[j] = reachable[j - 1] && text[j - 1] == *c;
                }
            }
        }
        reachable = next;
    }
    reachable[text.len()]
}

/// Orders by column value. Strings that are both RFC 3339 timestamps compare
/// as instants, since fractional seconds have no fixed width.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (
                OffsetDateTime::parse(a, &Rfc3339),
                OffsetDateTime::parse(b, &Rfc3339),
            ) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn execute(&self, query: Query) -> StoreResult<Vec<Row>> {
        self.executed.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(message) = self
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(StoreError::Unavailable(message));
        }

        let mut tables = self.lock();
        let Query {
            table,
            operation,
            filters,
            order,
        } = query;

        let mut result = match operation {
            Operation::Select => tables
                .rows
                .get(&table)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| matches(r, &filters))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default(),
            Operation::Insert(_) if self.drop_inserts.load(AtomicOrdering::SeqCst) => vec![],
            Operation::Insert(mut row) => {
                tables.next_id += 1;
                let id = tables.next_id;
                let now = timestamp(tables.next_timestamp())?;
                row.insert("id".into(), json!(id));
                row.entry("is_active").or_insert(json!(true));
                row.insert("created_at".into(), now.clone());
                row.insert("updated_at".into(), now);
                tables.rows.entry(table).or_default().push(row.clone());
                vec![row]
            }
            Operation::Update(changes) => {
                let now = timestamp(OffsetDateTime::now_utc())?;
                let mut updated = vec![];
                if let Some(rows) = tables.rows.get_mut(&table) {
                    for row in rows.iter_mut().filter(|r| matches(r, &filters)) {
                        for (k, v) in &changes {
                            row.insert(k.clone(), v.clone());
                        }
                        row.insert("updated_at".into(), now.clone());
                        updated.push(row.clone());
                    }
                }
                updated
            }
            Operation::Delete => {
                let mut removed = vec![];
                if let Some(rows) = tables.rows.get_mut(&table) {
                    let (gone, kept): (Vec<Row>, Vec<Row>) =
                        rows.drain(..).partition(|r| matches(r, &filters));
                    *rows = kept;
                    removed = gone;
                }
                removed
            }
        };

        if let Some(order) = order {
            result.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }

        Ok(result)
    }
}
