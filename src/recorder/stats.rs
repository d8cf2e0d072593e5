//! Aggregates over locally stored access records.

use crate::protocol::models::ContentId;
use crate::recorder::AccessRecord;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Entries kept in [`LocalStats::popular_content`].
pub const POPULAR_CONTENT_LIMIT: usize = 10;

/// View count for one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentViews {
    /// Content id.
    pub content_id: ContentId,
    /// Number of recorded accesses.
    pub views: u64,
}

/// Totals over a set of access records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalStats {
    /// Number of records.
    pub total_views: u64,
    /// Distinct anonymized client addresses. Records without an address
    /// are not counted.
    pub unique_visitors: u64,
    /// Most viewed items, most views first, ties by ascending id.
    pub popular_content: Vec<ContentViews>,
}

impl LocalStats {
    /// Aggregate a set of records.
    pub fn from_records(records: &[AccessRecord]) -> Self {
        let visitors: HashSet<&str> = records
            .iter()
            .filter_map(|r| r.client_address.as_deref())
            .collect();

        let mut per_content: HashMap<ContentId, u64> = HashMap::new();
        for record in records {
            *per_content.entry(record.content_id).or_default() += 1;
        }

        let mut popular_content: Vec<ContentViews> = per_content
            .into_iter()
            .map(|(content_id, views)| ContentViews { content_id, views })
            .collect();
        popular_content.sort_by(|a, b| b.views.cmp(&a.views).then(a.content_id.cmp(&b.content_id)));
        popular_content.truncate(POPULAR_CONTENT_LIMIT);

        Self {
            total_views: records.len() as u64,
            unique_visitors: visitors.len() as u64,
            popular_content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::Map;

    fn record(content_id: ContentId, fingerprint: &str) -> AccessRecord {
        record_from(content_id, fingerprint, None)
    }

    fn record_from(content_id: ContentId, fingerprint: &str, address: Option<&str>) -> AccessRecord {
        AccessRecord {
            id: 0,
            content_id,
            token_fingerprint: fingerprint.to_string(),
            access_time: Utc::now(),
            claims_snapshot: Map::new(),
            client_address: address.map(String::from),
            user_agent: String::new(),
        }
    }

    #[test]
    fn counts_views_per_content() {
        let records = vec![record(1, "a"), record(1, "a"), record(2, "b"), record(3, "a")];
        let stats = LocalStats::from_records(&records);
        assert_eq!(stats.total_views, 4);
        assert_eq!(stats.unique_visitors, 0);
        assert_eq!(stats.popular_content[0], ContentViews { content_id: 1, views: 2 });
        assert_eq!(stats.popular_content[1].content_id, 2);
        assert_eq!(stats.popular_content[2].content_id, 3);
    }

    #[test]
    fn shared_token_from_several_networks_counts_each_address() {
        let records = vec![
            record_from(1, "a", Some("203.0.113.0")),
            record_from(1, "a", Some("198.51.100.0")),
            record_from(1, "a", Some("192.0.2.0")),
        ];
        assert_eq!(LocalStats::from_records(&records).unique_visitors, 3);
    }

    #[test]
    fn several_tokens_behind_one_address_count_once() {
        let records = vec![
            record_from(1, "a", Some("203.0.113.0")),
            record_from(2, "b", Some("203.0.113.0")),
            record_from(3, "c", Some("203.0.113.0")),
            record_from(3, "d", None),
        ];
        let stats = LocalStats::from_records(&records);
        assert_eq!(stats.total_views, 4);
        assert_eq!(stats.unique_visitors, 1);
    }

    #[test]
    fn popular_content_is_capped() {
        let records: Vec<AccessRecord> = (1..=15).map(|id| record(id, "a")).collect();
        let stats = LocalStats::from_records(&records);
        assert_eq!(stats.popular_content.len(), POPULAR_CONTENT_LIMIT);
        assert_eq!(stats.popular_content[0].content_id, 1);
    }

    #[test]
    fn empty_input() {
        assert_eq!(LocalStats::from_records(&[]), LocalStats::default());
    }
}
