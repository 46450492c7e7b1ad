use trailwalks::{
    models::WalkDetail,
    query::{DEFAULT_PAGE_SIZE, WalkListParams, WalkQuery, WalkSortField},
};
use uuid::Uuid;

fn walk(name: &str, length_in_km: f64) -> WalkDetail {
    WalkDetail {
        id: Uuid::new_v4(),
        name: name.to_string(),
        length_in_km,
        ..WalkDetail::default()
    }
}

fn names(walks: &[WalkDetail]) -> Vec<&str> {
    walks.iter().map(|w| w.name.as_str()).collect()
}

// --- Parameter Normalization ---

#[test]
fn test_defaults_when_no_params_given() {
    let plan = WalkQuery::from_params(&WalkListParams::default());

    assert_eq!(plan.name_contains, None);
    assert_eq!(plan.sort, None);
    assert_eq!(plan.offset, 0);
    assert_eq!(plan.limit, DEFAULT_PAGE_SIZE);
}

#[test]
fn test_filter_recognition_is_case_insensitive() {
    for field in ["Name", "name", "NAME", "nAmE"] {
        let plan = WalkQuery::from_params(&WalkListParams {
            filter_on: Some(field.to_string()),
            filter_query: Some("track".to_string()),
            ..WalkListParams::default()
        });
        assert_eq!(plan.name_contains.as_deref(), Some("track"), "field {field}");
    }
}

#[test]
fn test_unrecognized_filter_field_degrades_silently() {
    let plan = WalkQuery::from_params(&WalkListParams {
        filter_on: Some("LengthInKm".to_string()),
        filter_query: Some("track".to_string()),
        ..WalkListParams::default()
    });
    assert_eq!(plan.name_contains, None);
}

#[test]
fn test_blank_filter_query_means_no_filter() {
    let plan = WalkQuery::from_params(&WalkListParams {
        filter_on: Some("Name".to_string()),
        filter_query: Some("   ".to_string()),
        ..WalkListParams::default()
    });
    assert_eq!(plan.name_contains, None);
}

#[test]
fn test_sort_recognition_and_direction() {
    let plan = WalkQuery::from_params(&WalkListParams {
        sort_by: Some("length".to_string()),
        is_ascending: Some(false),
        ..WalkListParams::default()
    });
    let sort = plan.sort.unwrap();
    assert_eq!(sort.field, WalkSortField::Length);
    assert!(!sort.ascending);

    // Direction defaults to ascending.
    let plan = WalkQuery::from_params(&WalkListParams {
        sort_by: Some("Name".to_string()),
        ..WalkListParams::default()
    });
    assert!(plan.sort.unwrap().ascending);

    // Unrecognized sort field: no sort at all.
    let plan = WalkQuery::from_params(&WalkListParams {
        sort_by: Some("popularity".to_string()),
        is_ascending: Some(false),
        ..WalkListParams::default()
    });
    assert_eq!(plan.sort, None);
}

#[test]
fn test_offset_arithmetic() {
    let plan = WalkQuery::from_params(&WalkListParams {
        page_number: Some(3),
        page_size: Some(25),
        ..WalkListParams::default()
    });
    assert_eq!(plan.offset, 50);
    assert_eq!(plan.limit, 25);

    // Page numbers below 1 never produce a negative offset.
    let plan = WalkQuery::from_params(&WalkListParams {
        page_number: Some(0),
        page_size: Some(25),
        ..WalkListParams::default()
    });
    assert_eq!(plan.offset, 0);

    let plan = WalkQuery::from_params(&WalkListParams {
        page_number: Some(-5),
        page_size: Some(25),
        ..WalkListParams::default()
    });
    assert_eq!(plan.offset, 0);
}

#[test]
fn test_like_pattern_escapes_metacharacters() {
    let plan = WalkQuery::from_params(&WalkListParams {
        filter_on: Some("Name".to_string()),
        filter_query: Some("50%_done\\".to_string()),
        ..WalkListParams::default()
    });
    assert_eq!(plan.like_pattern().unwrap(), "%50\\%\\_done\\\\%");

    let plan = WalkQuery::from_params(&WalkListParams::default());
    assert_eq!(plan.like_pattern(), None);
}

// --- In-Memory Application (reference pipeline semantics) ---

#[test]
fn test_filter_returns_matching_subset() {
    let walks = vec![
        walk("Alpine Crossing", 12.0),
        walk("Beach Loop", 3.5),
        walk("Loop Road Track", 6.0),
    ];
    let plan = WalkQuery::from_params(&WalkListParams {
        filter_on: Some("Name".to_string()),
        filter_query: Some("LOOP".to_string()),
        ..WalkListParams::default()
    });

    let result = plan.apply(walks);
    assert_eq!(names(&result), vec!["Beach Loop", "Loop Road Track"]);
}

#[test]
fn test_sort_by_length_both_directions() {
    let walks = || {
        vec![
            walk("Mid", 8.0),
            walk("Short", 3.5),
            walk("Long", 12.0),
        ]
    };

    let asc = WalkQuery::from_params(&WalkListParams {
        sort_by: Some("Length".to_string()),
        is_ascending: Some(true),
        ..WalkListParams::default()
    })
    .apply(walks());
    assert_eq!(names(&asc), vec!["Short", "Mid", "Long"]);

    let desc = WalkQuery::from_params(&WalkListParams {
        sort_by: Some("Length".to_string()),
        is_ascending: Some(false),
        ..WalkListParams::default()
    })
    .apply(walks());
    assert_eq!(names(&desc), vec!["Long", "Mid", "Short"]);
}

#[test]
fn test_sort_ties_keep_original_order() {
    let walks = vec![
        walk("First In", 5.0),
        walk("Second In", 5.0),
        walk("Third In", 5.0),
    ];
    let plan = WalkQuery::from_params(&WalkListParams {
        sort_by: Some("Length".to_string()),
        ..WalkListParams::default()
    });

    // Stable sort: equal lengths preserve store-native relative order.
    let result = plan.apply(walks);
    assert_eq!(names(&result), vec!["First In", "Second In", "Third In"]);
}

#[test]
fn test_pagination_windows_partition_the_collection() {
    let walks: Vec<WalkDetail> = (0..10)
        .map(|i| walk(&format!("Walk {:02}", i), i as f64 + 1.0))
        .collect();

    // Pages 1..5 of size 2 stitched together equal one page of size 10.
    let mut stitched = Vec::new();
    for page in 1..=5 {
        let plan = WalkQuery::from_params(&WalkListParams {
            sort_by: Some("Name".to_string()),
            page_number: Some(page),
            page_size: Some(2),
            ..WalkListParams::default()
        });
        stitched.extend(plan.apply(walks.clone()));
    }

    let whole = WalkQuery::from_params(&WalkListParams {
        sort_by: Some("Name".to_string()),
        page_size: Some(10),
        ..WalkListParams::default()
    })
    .apply(walks);

    assert_eq!(names(&stitched), names(&whole));
}

#[test]
fn test_page_past_the_end_is_empty() {
    let walks = vec![walk("Only One", 2.0)];
    let plan = WalkQuery::from_params(&WalkListParams {
        page_number: Some(5),
        page_size: Some(10),
        ..WalkListParams::default()
    });
    assert!(plan.apply(walks).is_empty());
}

#[test]
fn test_default_page_holds_a_full_catalogue() {
    // Under the 1000-item default page size, an unparameterized request
    // returns the whole collection.
    let walks: Vec<WalkDetail> = (0..50).map(|i| walk(&format!("W{}", i), 1.0)).collect();
    let plan = WalkQuery::from_params(&WalkListParams::default());
    assert_eq!(plan.apply(walks).len(), 50);
}

#[test]
fn test_filter_then_sort_then_paginate_compose() {
    let walks = vec![
        walk("Coastal Track", 9.0),
        walk("Summit Track", 14.0),
        walk("River Loop", 4.0),
        walk("Forest Track", 6.0),
    ];
    let plan = WalkQuery::from_params(&WalkListParams {
        filter_on: Some("Name".to_string()),
        filter_query: Some("Track".to_string()),
        sort_by: Some("Length".to_string()),
        is_ascending: Some(true),
        page_number: Some(2),
        page_size: Some(1),
        ..WalkListParams::default()
    });

    // Filtered to the three Tracks, sorted by length, second page of one.
    let result = plan.apply(walks);
    assert_eq!(names(&result), vec!["Coastal Track"]);
}
