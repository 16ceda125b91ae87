//! Catalog query model: filters, sorting and paging.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use shared::pagination::{total_pages, PageRequest, DEFAULT_PAGE_SIZE};
use thiserror::Error;

use super::event::{Event, EventStatus, EventView};

/// Rejection of a malformed query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct InvalidQuery(pub String);

/// Attribute events are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedDate,
    Title,
    EventDate,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::CreatedDate => "created_date",
            SortKey::Title => "title",
            SortKey::EventDate => "event_date",
        }
    }
}

impl FromStr for SortKey {
    type Err = InvalidQuery;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_date" => Ok(SortKey::CreatedDate),
            "title" => Ok(SortKey::Title),
            "event_date" => Ok(SortKey::EventDate),
            other => Err(InvalidQuery(format!("Unknown sort key '{}'", other))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }

    /// SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = InvalidQuery;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ascending" => Ok(SortDirection::Ascending),
            "descending" => Ok(SortDirection::Descending),
            other => Err(InvalidQuery(format!("Unknown sort direction '{}'", other))),
        }
    }
}

/// Inclusive calendar date range. An absent bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        Self { from, to }
    }

    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Undated events never fall inside a range.
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        let Some(date) = date else {
            return false;
        };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Sorting applied to a catalog query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl EventSort {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Total order over events for this sort.
    ///
    /// Titles compare case-insensitively. Undated events come after every
    /// dated event in both directions. Ties fall back to ascending id.
    pub fn compare(&self, a: &Event, b: &Event) -> Ordering {
        let primary = match self.key {
            SortKey::CreatedDate => self.directed(a.created_at.cmp(&b.created_at)),
            SortKey::Title => self.directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
            SortKey::EventDate => match (a.date, b.date) {
                (Some(x), Some(y)) => self.directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }

    fn directed(&self, ordering: Ordering) -> Ordering {
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Store-facing predicates for a catalog scan. All present predicates must
/// hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub status: EventStatus,
    pub category_slug: Option<String>,
    pub date_range: Option<DateRange>,
    pub location_contains: Option<String>,
    pub search: Option<String>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self {
            status: EventStatus::Published,
            category_slug: None,
            date_range: None,
            location_contains: None,
            search: None,
        }
    }
}

/// A catalog query as received by the engine.
///
/// Nothing is clamped or defaulted here; [`QuerySpec::validate`] rejects
/// anything out of range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub page: u32,
    pub page_size: u32,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub category_slug: Option<String>,
    pub date_range: Option<DateRange>,
    pub location: Option<String>,
    pub search: Option<String>,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort_key: SortKey::default(),
            sort_direction: SortDirection::default(),
            category_slug: None,
            date_range: None,
            location: None,
            search: None,
        }
    }
}

impl QuerySpec {
    /// Parses the sort key and direction from their textual names.
    pub fn with_sort_names(mut self, key: &str, direction: &str) -> Result<Self, InvalidQuery> {
        self.sort_key = key.parse()?;
        self.sort_direction = direction.parse()?;
        Ok(self)
    }

    /// Checks the query and splits it into store filter, sort and page.
    pub fn validate(
        &self,
        max_page_size: u32,
    ) -> Result<(EventFilter, EventSort, PageRequest), InvalidQuery> {
        let page = PageRequest::new(self.page, self.page_size, max_page_size)
            .map_err(|e| InvalidQuery(e.to_string()))?;

        if let Some(range) = &self.date_range {
            if let (Some(from), Some(to)) = (range.from, range.to) {
                if from > to {
                    return Err(InvalidQuery(format!(
                        "Date range start {} is after end {}",
                        from, to
                    )));
                }
            }
        }

        let filter = EventFilter {
            status: EventStatus::Published,
            category_slug: non_blank("category", &self.category_slug)?,
            date_range: self.date_range.filter(|r| !r.is_open()),
            location_contains: non_blank("location", &self.location)?,
            search: non_blank("search", &self.search)?,
        };

        Ok((
            filter,
            EventSort::new(self.sort_key, self.sort_direction),
            page,
        ))
    }
}

fn non_blank(field: &str, value: &Option<String>) -> Result<Option<String>, InvalidQuery> {
    match value {
        None => Ok(None),
        Some(v) if v.trim().is_empty() => {
            Err(InvalidQuery(format!("Filter '{}' must not be blank", field)))
        }
        Some(v) => Ok(Some(v.trim().to_string())),
    }
}

/// One page of catalog results.
#[derive(Debug, Clone, Serialize)]
pub struct EventPage {
    pub items: Vec<EventView>,
    pub total_count: u64,
    pub total_pages: u64,
    pub page: u32,
    pub page_size: u32,
}

impl EventPage {
    pub fn new(items: Vec<EventView>, total_count: u64, page: PageRequest) -> Self {
        Self {
            items,
            total_count,
            total_pages: total_pages(total_count, page.page_size()),
            page: page.page(),
            page_size: page.page_size(),
        }
    }

    pub fn has_next(&self) -> bool {
        (self.page as u64) < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EventId;
    use chrono::{TimeZone, Utc};

    fn event(id: i64, title: &str, date: Option<NaiveDate>, created_secs: i64) -> Event {
        let created = Utc.timestamp_opt(1_700_000_000 + created_secs, 0).unwrap();
        Event {
            id: EventId(id),
            title: title.to_string(),
            body: String::new(),
            status: EventStatus::Published,
            author_id: 1,
            date,
            time: None,
            location: String::new(),
            capacity: 0,
            categories: vec![],
            created_at: created,
            modified_at: created,
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn sorted_ids(mut events: Vec<Event>, sort: EventSort) -> Vec<i64> {
        events.sort_by(|a, b| sort.compare(a, b));
        events.iter().map(|e| e.id.0).collect()
    }

    // ===========================================
    // Parsing
    // ===========================================

    #[test]
    fn test_sort_key_parse_is_strict() {
        assert_eq!("title".parse::<SortKey>().unwrap(), SortKey::Title);
        assert_eq!("event_date".parse::<SortKey>().unwrap(), SortKey::EventDate);
        assert!("Title".parse::<SortKey>().is_err());
        assert!("date".parse::<SortKey>().is_err());
        assert!("descending".parse::<SortDirection>().is_ok());
        assert!("desc".parse::<SortDirection>().is_err());
    }

    #[test]
    fn test_with_sort_names() {
        let spec = QuerySpec::default()
            .with_sort_names("event_date", "ascending")
            .unwrap();
        assert_eq!(spec.sort_key, SortKey::EventDate);
        assert_eq!(spec.sort_direction, SortDirection::Ascending);
        assert!(QuerySpec::default().with_sort_names("popularity", "ascending").is_err());
    }

    // ===========================================
    // Validation
    // ===========================================

    #[test]
    fn test_default_spec_is_valid() {
        let (filter, sort, page) = QuerySpec::default().validate(100).unwrap();
        assert_eq!(filter, EventFilter::default());
        assert_eq!(sort.key, SortKey::CreatedDate);
        assert_eq!(sort.direction, SortDirection::Descending);
        assert_eq!(page.page(), 1);
        assert_eq!(page.page_size(), 10);
    }

    #[test]
    fn test_validate_rejects_out_of_range_paging() {
        let spec = QuerySpec { page: 0, ..Default::default() };
        assert!(spec.validate(100).is_err());

        let spec = QuerySpec { page_size: 101, ..Default::default() };
        assert!(spec.validate(100).is_err());

        let spec = QuerySpec { page_size: 0, ..Default::default() };
        assert!(spec.validate(100).is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let spec = QuerySpec {
            date_range: Some(DateRange::new(ymd(2026, 2, 1), ymd(2026, 1, 1))),
            ..Default::default()
        };
        let err = spec.validate(100).unwrap_err();
        assert!(err.0.contains("after"));
    }

    #[test]
    fn test_validate_rejects_blank_filters() {
        for spec in [
            QuerySpec { category_slug: Some("  ".into()), ..Default::default() },
            QuerySpec { location: Some(String::new()), ..Default::default() },
            QuerySpec { search: Some("\t".into()), ..Default::default() },
        ] {
            assert!(spec.validate(100).is_err());
        }
    }

    #[test]
    fn test_validate_trims_filters_and_drops_open_range() {
        let spec = QuerySpec {
            location: Some("  Hall ".into()),
            date_range: Some(DateRange::default()),
            ..Default::default()
        };
        let (filter, _, _) = spec.validate(100).unwrap();
        assert_eq!(filter.location_contains.as_deref(), Some("Hall"));
        assert_eq!(filter.date_range, None);
    }

    // ===========================================
    // Ordering
    // ===========================================

    #[test]
    fn test_date_range_contains() {
        let jan = DateRange::new(ymd(2026, 1, 1), ymd(2026, 1, 31));
        assert!(jan.contains(ymd(2026, 1, 1)));
        assert!(jan.contains(ymd(2026, 1, 31)));
        assert!(!jan.contains(ymd(2026, 2, 1)));
        assert!(!jan.contains(None));

        let open_end = DateRange::new(ymd(2026, 1, 1), None);
        assert!(open_end.contains(ymd(2030, 6, 1)));
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let events = vec![
            event(5, "Same", None, 0),
            event(2, "Same", None, 0),
            event(9, "Same", None, 0),
        ];
        for direction in [SortDirection::Ascending, SortDirection::Descending] {
            for key in [SortKey::CreatedDate, SortKey::Title, SortKey::EventDate] {
                assert_eq!(
                    sorted_ids(events.clone(), EventSort::new(key, direction)),
                    vec![2, 5, 9]
                );
            }
        }
    }

    #[test]
    fn test_title_sort_is_case_insensitive() {
        let events = vec![
            event(1, "banana", None, 0),
            event(2, "Apple", None, 0),
            event(3, "cherry", None, 0),
        ];
        let sort = EventSort::new(SortKey::Title, SortDirection::Ascending);
        assert_eq!(sorted_ids(events, sort), vec![2, 1, 3]);
    }

    #[test]
    fn test_undated_events_sort_last_both_directions() {
        let events = vec![
            event(1, "a", None, 0),
            event(2, "b", ymd(2026, 1, 10), 0),
            event(3, "c", ymd(2026, 1, 20), 0),
        ];
        let asc = EventSort::new(SortKey::EventDate, SortDirection::Ascending);
        let desc = EventSort::new(SortKey::EventDate, SortDirection::Descending);
        assert_eq!(sorted_ids(events.clone(), asc), vec![2, 3, 1]);
        assert_eq!(sorted_ids(events, desc), vec![3, 2, 1]);
    }

    #[test]
    fn test_created_date_descending_default() {
        let events = vec![event(1, "a", None, 10), event(2, "b", None, 30), event(3, "c", None, 20)];
        assert_eq!(sorted_ids(events, EventSort::default()), vec![2, 3, 1]);
    }

    #[test]
    fn test_event_page_totals() {
        let page = PageRequest::new(3, 10, 100).unwrap();
        let result = EventPage::new(vec![], 25, page);
        assert_eq!(result.total_pages, 3);
        assert!(result.has_prev());
        assert!(!result.has_next());

        let empty = EventPage::new(vec![], 0, PageRequest::default());
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next());
    }
}
