//! Integration tests for the URL codec and the query builders
//!
//! Covers the documented end-to-end examples: sanitizing a raw state,
//! encoding it for a shareable URL, counting active filters and building an
//! Airtable formula.

use filters::prelude::*;

fn full_state() -> FilterState {
    FilterState::new()
        .with_search("test query")
        .with_status(["active", "pending"])
        .with_date_range(DateRange::new(Some("2024-01-01"), Some("2024-12-31")))
        .with_pagination(2, 50)
}

#[test]
fn test_sanitize_drops_empty_values() {
    let raw = FilterState {
        search: Some(String::new()),
        status: Some(vec![]),
        priority: Some(vec!["high".to_string(), String::new()]),
        date_range: Some(DateRange::new(Some(""), Some("2024-12-31"))),
        pagination: Some(Pagination::new(1, 20)),
        ..Default::default()
    };

    let expected = FilterState {
        priority: Some(vec!["high".to_string()]),
        date_range: Some(DateRange::new(None, Some("2024-12-31"))),
        pagination: Some(Pagination::new(1, 20)),
        ..Default::default()
    };
    assert_eq!(sanitize_filter_state(&raw), expected);
    assert_eq!(sanitize_filter_state(&expected), expected);
}

#[test]
fn test_encode_produces_exact_query_string() {
    assert_eq!(
        encode_filters_to_url(&full_state()).to_query_string(),
        "search=test+query&status=active%2Cpending&dateStart=2024-01-01&dateEnd=2024-12-31&page=2&limit=50"
    );
}

#[test]
fn test_count_ignores_pagination_and_empty_values() {
    let filters = FilterState {
        search: Some("test".to_string()),
        status: Some(vec!["active".to_string()]),
        priority: Some(vec![]),
        date_range: Some(DateRange::new(Some("2024-01-01"), Some(""))),
        pagination: Some(Pagination::new(1, 20)),
        ..Default::default()
    };
    assert_eq!(count_active_filters(&filters), 3);
    assert!(has_active_filters(&filters));
    assert!(!has_active_filters(&clear_all_filters()));
}

#[test]
fn test_airtable_formula_for_status_list() {
    let filters = FilterState::new().with_status(["On Track", "At Risk"]);
    assert_eq!(
        build_airtable_filter(&filters),
        "OR({Status}='On Track',{Status}='At Risk')"
    );
}

#[test]
fn test_round_trip_with_entity_fields() {
    let registry = FieldRegistry::new()
        .with_field("client", FieldKind::MultiSelect)
        .unwrap()
        .with_field("volume", FieldKind::NumericRange)
        .unwrap()
        .with_field("published", FieldKind::DateRange)
        .unwrap();
    let codec = FilterCodec::new(&registry);

    let filters = full_state()
        .with_priority(["high"])
        .with_sorting("Name", SortDirection::Desc)
        .with_field("client", FilterValue::multi(["Acme, Inc.", "100% Organic"]))
        .with_field("volume", FilterValue::range(Some(100.0), None))
        .with_field(
            "published",
            FilterValue::DateRange(DateRange::new(None, Some("2024-06-30"))),
        );
    let filters = FilterState {
        user_filter: Some(UserFilter::new(["usr1", "usr2"])),
        ..filters
    };

    let query = codec.encode(&filters).to_query_string();
    let decoded = codec.decode(&UrlParams::parse(&query));
    assert_eq!(decoded, filters);
}

#[test]
fn test_decode_reports_malformed_parameters() {
    let registry = FieldRegistry::new();
    let params = UrlParams::parse("?page=0&limit=ten&sortOrder=up&search=ok");

    let (filters, issues) = FilterCodec::new(&registry).decode_with_issues(&params);

    assert_eq!(filters, FilterState::new().with_search("ok"));
    let params: Vec<&str> = issues.iter().map(|i| i.param.as_str()).collect();
    assert!(params.contains(&"page"));
    assert!(params.contains(&"limit"));
    assert!(params.contains(&"sortOrder"));
}

#[test]
fn test_api_params_and_urls_share_the_codec() {
    let params = build_api_params(&full_state());
    assert_eq!(params.get("status"), Some("active,pending"));
    assert_eq!(params.get("page"), Some("2"));
    assert!(build_api_params(&FilterState::new()).is_empty());

    let url = build_url_with_filters("/reports?tab=seo", &FilterState::new().with_search("a b"));
    assert_eq!(url, "/reports?tab=seo&search=a+b");
    assert_eq!(build_url_with_filters("/reports", &FilterState::new()), "/reports");
}

#[test]
fn test_database_query_matches_airtable_semantics() {
    let filters = FilterState::new()
        .with_search("audit")
        .with_status(["active"])
        .with_pagination(3, 10);

    let query = build_database_query(&filters);
    let (sql, binds) = query.to_sql_where();

    assert_eq!(sql, r#"LOWER("Name") LIKE ? ESCAPE '\' AND "Status" IN (?)"#);
    assert_eq!(binds.len(), 2);
    assert_eq!(query.limit, Some(10));
    assert_eq!(query.offset, Some(20));
}

#[test]
fn test_zero_or_empty_pagination_round_trips_after_sanitize() {
    let samples = [
        FilterState {
            pagination: Some(Pagination::default()),
            ..Default::default()
        },
        FilterState {
            pagination: Some(Pagination::page_only(0)),
            ..Default::default()
        },
        FilterState::new().with_search("q").with_pagination(0, 30),
    ];

    for raw in samples {
        let sanitized = sanitize_filter_state(&raw);
        let query = encode_filters_to_url(&sanitized).to_query_string();
        assert_eq!(decode_filters_from_url(&UrlParams::parse(&query)), sanitized);
    }

    assert_eq!(
        sanitize_filter_state(&FilterState::new().with_search("q").with_pagination(0, 30)).pagination,
        Some(Pagination { page: None, limit: Some(30) })
    );
}
