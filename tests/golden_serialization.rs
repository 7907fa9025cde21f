use std::collections::BTreeSet;

use brief_core::cluster::{Cluster, ClusterSnapshot};
use brief_core::config::{EngineConfig, ScoringWeights};
use brief_core::types::digest::ScoreBreakdown;
use brief_core::{ClusterId, ContentItem, DigestEngine, ItemId, Lane, ScoredAssignment};
use chrono::{TimeZone, Utc};

#[test]
fn golden_scored_assignment_serialization() {
    // 1. Construct an assignment with a known breakdown
    let assignment = ScoredAssignment {
        item_id: ItemId::from("hn-4421"),
        lane: Lane::Builders,
        score: 0.5,
        is_novelty_slot: false,
        why: ScoreBreakdown {
            recency: 1.0,
            trust: 0.5,
            lane: 0.25,
            popularity: 0.0,
            novelty: 1.0,
        },
    };

    // 2. Serialize
    let json_str = serde_json::to_string_pretty(&assignment).unwrap();

    // 3. JSON Snapshot Check
    const EXPECTED_JSON: &str = r#"{
  "item_id": "hn-4421",
  "lane": "builders",
  "score": 0.5,
  "is_novelty_slot": false,
  "why": {
    "recency": 1.0,
    "trust": 0.5,
    "lane": 0.25,
    "popularity": 0.0,
    "novelty": 1.0
  }
}"#;
    assert_eq!(json_str, EXPECTED_JSON);
}

#[test]
fn golden_cluster_snapshot_serialization() {
    let first_seen = Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap();
    let updated = Utc.with_ymd_and_hms(2025, 3, 2, 6, 0, 0).unwrap();

    // Built out of order; stored sorted by id
    let snapshot = ClusterSnapshot::new(vec![
        Cluster {
            id: ClusterId::new("solo-x"),
            member_item_ids: BTreeSet::from([ItemId::from("x")]),
            centroid: Vec::new(),
            first_seen_at: updated,
            last_updated_at: updated,
            degraded: true,
        },
        Cluster {
            id: ClusterId::new("cl-0011"),
            member_item_ids: BTreeSet::from([ItemId::from("b"), ItemId::from("a")]),
            centroid: vec![1.0, 0.5],
            first_seen_at: first_seen,
            last_updated_at: updated,
            degraded: false,
        },
    ]);

    let json_str = serde_json::to_string(&snapshot).unwrap();

    const EXPECTED_JSON: &str = concat!(
        r#"[{"id":"cl-0011","member_item_ids":["a","b"],"centroid":[1.0,0.5],"#,
        r#""first_seen_at":"2025-03-01T06:00:00Z","last_updated_at":"2025-03-02T06:00:00Z","degraded":false},"#,
        r#"{"id":"solo-x","member_item_ids":["x"],"centroid":[],"#,
        r#""first_seen_at":"2025-03-02T06:00:00Z","last_updated_at":"2025-03-02T06:00:00Z","degraded":true}]"#,
    );
    assert_eq!(json_str, EXPECTED_JSON);

    // Stored snapshots in any order load back sorted
    let reversed = r#"[
        {"id":"solo-x","member_item_ids":["x"],"centroid":[],"first_seen_at":"2025-03-02T06:00:00Z","last_updated_at":"2025-03-02T06:00:00Z","degraded":true},
        {"id":"cl-0011","member_item_ids":["a","b"],"centroid":[1.0,0.5],"first_seen_at":"2025-03-01T06:00:00Z","last_updated_at":"2025-03-02T06:00:00Z"}
    ]"#;
    let loaded: ClusterSnapshot = serde_json::from_str(reversed).unwrap();
    assert_eq!(loaded, snapshot);
    assert!(loaded.get(&ClusterId::new("cl-0011")).is_some());
}

#[test]
fn enrichment_records_tolerate_extra_and_bad_fields() {
    let json = r#"{
        "id": "rss-77",
        "url": "https://example.com/post",
        "title": "Patch Tuesday roundup",
        "fetched_at": "2025-03-01T05:00:00Z",
        "published_at": "2025-03-01T03:30:00Z",
        "source_id": "example",
        "source_trust_weight": 0.8,
        "lane_scores": {"security": 1.7, "builders": 0.4, "sports": 0.9},
        "topics": ["patching"],
        "entities": {"vendor": "Example Corp"},
        "embedding": [0.1, 0.2, 0.3],
        "popularity_signal": null
    }"#;

    let item: ContentItem = serde_json::from_str(json).unwrap();

    assert_eq!(item.id.as_str(), "rss-77");
    assert_eq!(item.lane_score(Lane::Security), 1.0);
    assert_eq!(item.lane_score(Lane::Builders), 0.4);
    assert_eq!(item.lane_score(Lane::Business), 0.0);
    assert_eq!(item.lane_scores.iter().count(), 2);
    assert_eq!(item.popularity_signal, None);
    assert_eq!(
        item.effective_published_at(),
        Utc.with_ymd_and_hms(2025, 3, 1, 3, 30, 0).unwrap()
    );
}

#[test]
fn run_output_field_order_is_stable() {
    let engine = DigestEngine::new(EngineConfig::with_weights(ScoringWeights {
        recency: 1.0,
        trust: 1.0,
        lane: 1.0,
        popularity: 0.0,
        novelty: 1.0,
    }))
    .unwrap();
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 7, 0, 0).unwrap();
    let item = ContentItem::new("a", "https://a.com/1", "Release", "s", 0.5, now)
        .with_lane_score(Lane::Business, 0.6)
        .with_embedding(vec![1.0, 0.0]);

    let output = engine.run(vec![item], &ClusterSnapshot::empty(), now).unwrap();
    let json_str = serde_json::to_string_pretty(&output).unwrap();

    // Top-level sections, matched at their two-space indent
    let keys = [
        "\n  \"digest\":",
        "\n  \"canonical_items\":",
        "\n  \"clusters\":",
        "\n  \"assignments\":",
        "\n  \"rejected\":",
        "\n  \"flags\":",
    ];
    let positions: Vec<usize> = keys
        .iter()
        .map(|k| json_str.find(k).unwrap_or_else(|| panic!("missing {k}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    // Entry fields ahead of the metadata block
    let entry_keys = ["\"item\":", "\"lane\":", "\"cluster_id\":", "\"is_novelty_slot\":", "\"degraded\":", "\"metadata\":"];
    let positions: Vec<usize> = entry_keys
        .iter()
        .map(|k| json_str.find(k).unwrap_or_else(|| panic!("missing {k}")))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}
