#[cfg(test)]
mod tests {
    use crate::cache::{generate_search_key, TtlCache, DEFAULT_TTL_SECS};
    use crate::clock::{ManualClock, SharedClock};
    use crate::models::{SearchRequest, SortField, SortOrder};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn cache_with_clock() -> (TtlCache<Value>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        ));
        let shared: SharedClock = clock.clone();
        (TtlCache::new(DEFAULT_TTL_SECS, shared), clock)
    }

    fn full_request() -> SearchRequest {
        SearchRequest {
            q: "react".to_string(),
            language: Some("javascript".to_string()),
            created: Some(">=2024-01-01".to_string()),
            sort: Some(SortField::Stars),
            order: Some(SortOrder::Desc),
            per_page: Some(25),
            page: Some(1),
        }
    }

    #[test]
    fn test_set_and_get() {
        let (mut cache, _) = cache_with_clock();
        cache.set("test-key", json!({ "data": "test-value" }));

        assert_eq!(cache.get("test-key"), Some(json!({ "data": "test-value" })));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (mut cache, clock) = cache_with_clock();
        cache.set_with_ttl("k", json!("v"), 1);
        assert_eq!(cache.get("k"), Some(json!("v")));

        clock.advance(Duration::milliseconds(1001));
        assert_eq!(cache.get("k"), None);
        assert!(!cache.has("k"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_is_dead_exactly_at_expiry() {
        let (mut cache, clock) = cache_with_clock();
        cache.set_with_ttl("k", json!(1), 10);

        clock.advance(Duration::seconds(10));
        assert!(!cache.has("k"));
    }

    #[test]
    fn test_default_ttl_is_five_minutes() {
        let (mut cache, clock) = cache_with_clock();
        cache.set("k", json!(1));

        clock.advance(Duration::seconds(299));
        assert!(cache.has("k"));
        clock.advance(Duration::seconds(1));
        assert!(!cache.has("k"));
    }

    #[test]
    fn test_zero_ttl_uses_default() {
        let (mut cache, clock) = cache_with_clock();
        cache.set_with_ttl("k", json!(1), 0);

        clock.advance(Duration::seconds(60));
        assert!(cache.has("k"));
    }

    #[test]
    fn test_overwrite_resets_expiry() {
        let (mut cache, clock) = cache_with_clock();
        cache.set_with_ttl("k", json!("old"), 10);
        clock.advance(Duration::seconds(8));
        cache.set_with_ttl("k", json!("new"), 10);
        clock.advance(Duration::seconds(8));

        assert_eq!(cache.get("k"), Some(json!("new")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete_and_clear() {
        let (mut cache, _) = cache_with_clock();
        cache.set("key1", json!("value1"));
        cache.set("key2", json!("value2"));

        assert!(cache.delete("key1"));
        assert!(!cache.delete("key1"));
        assert_eq!(cache.get("key1"), None);

        cache.clear();
        assert_eq!(cache.get("key2"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_blank_keys_are_ignored() {
        let (mut cache, _) = cache_with_clock();
        for key in ["", "   ", "\t\n"] {
            cache.set(key, json!("x"));
            assert_eq!(cache.get(key), None);
            assert!(!cache.has(key));
            assert!(!cache.delete(key));
        }
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cleanup_removes_only_expired() {
        let (mut cache, clock) = cache_with_clock();
        cache.set_with_ttl("short1", json!(1), 1);
        cache.set_with_ttl("short2", json!(2), 1);
        cache.set_with_ttl("long", json!(3), 600);

        clock.advance(Duration::seconds(2));
        assert_eq!(cache.cleanup(), 2);
        assert_eq!(cache.cleanup(), 0);
        assert!(cache.has("long"));
    }

    #[test]
    fn test_stats_scan_entries() {
        let (mut cache, clock) = cache_with_clock();
        cache.set_with_ttl("a", json!(1), 1);
        cache.set_with_ttl("b", json!(2), 600);
        clock.advance(Duration::seconds(5));

        let stats = cache.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_hit_rate() {
        let (mut cache, _) = cache_with_clock();
        cache.set("a", json!(1));
        cache.get("a");
        cache.get("a");
        cache.get("a");
        cache.get("missing");

        assert!((cache.stats().hit_rate - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_search_key_format() {
        let key = generate_search_key("react", &full_request());
        assert_eq!(key, "search:react:javascript:>=2024-01-01:stars:desc:25:1");
    }

    #[test]
    fn test_search_key_keeps_colons_in_query_apart() {
        let qualified = SearchRequest::new("user:octo");
        let split = SearchRequest {
            language: Some("octo".to_string()),
            ..SearchRequest::new("user")
        };
        let qualified_key = generate_search_key("user:octo", &qualified);
        assert_eq!(qualified_key, "search:user%3Aocto::::::");
        assert_ne!(qualified_key, generate_search_key("user", &split));
    }

    #[test]
    fn test_search_key_is_deterministic() {
        let request = full_request();
        assert_eq!(
            generate_search_key("react", &request),
            generate_search_key("react", &request)
        );
    }

    #[test]
    fn test_search_key_changes_with_any_field() {
        let base = full_request();
        let base_key = generate_search_key("react", &base);

        let variants = vec![
            SearchRequest { language: Some("typescript".into()), ..base.clone() },
            SearchRequest { created: Some(">=2023-01-01".into()), ..base.clone() },
            SearchRequest { sort: Some(SortField::Forks), ..base.clone() },
            SearchRequest { order: Some(SortOrder::Asc), ..base.clone() },
            SearchRequest { per_page: Some(50), ..base.clone() },
            SearchRequest { page: Some(2), ..base.clone() },
        ];
        for variant in &variants {
            assert_ne!(generate_search_key("react", variant), base_key);
        }
        assert_ne!(generate_search_key("vue", &base), base_key);
    }

    #[test]
    fn test_search_key_with_absent_options() {
        let key = generate_search_key("", &SearchRequest::default());
        assert_eq!(key, "search:::::::");
    }
}
