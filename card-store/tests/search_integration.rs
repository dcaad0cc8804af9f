//! End-to-end parse → compile → execute coverage against an in-memory
//! store seeded with a dozen known cards.

mod common;

use common::*;

#[test]
fn empty_query_matches_all_cards() {
    let store = seeded_store();
    assert_eq!(names(&store, "").len(), all_cards().len());
    assert_eq!(names(&store, "()").len(), all_cards().len());
}

#[test]
fn three_filter_and_round_trip() {
    let store = seeded_store();
    assert_eq!(names(&store, "c:blue t:instant cmc<=2"), vec!["Counterspell"]);
}

#[test]
fn partial_exact_and_strict_name_tiers() {
    let store = seeded_store();
    assert_eq!(names(&store, "bolt"), vec!["Lightning Bolt"]);
    assert_eq!(names(&store, "\"lightning bolt\""), vec!["Lightning Bolt"]);
    // Strict is case-sensitive: the lowercase form matches nothing.
    assert!(names(&store, "!'lightning bolt'").is_empty());
    assert_eq!(names(&store, "!'Lightning Bolt'"), vec!["Lightning Bolt"]);
}

#[test]
fn grouping_changes_the_result_set() {
    let store = seeded_store();
    // elf OR (goblin AND red): Llanowar rides the elf branch.
    let ungrouped = names(&store, "t:elf OR t:goblin c:red");
    assert_eq!(
        ungrouped,
        vec!["Goblin Guide", "Grumgully, the Generous", "Krenko, Mob Boss", "Llanowar Elves"]
    );
    // (elf OR goblin) AND red: Llanowar is not red.
    let grouped = names(&store, "(t:elf OR t:goblin) c:red");
    assert_eq!(
        grouped,
        vec!["Goblin Guide", "Grumgully, the Generous", "Krenko, Mob Boss"]
    );
}

#[test]
fn color_negation_is_or_of_missing() {
    let store = seeded_store();
    // -c:ur keeps any card missing U or missing R. Cards holding both
    // (Izzet Charm, Niv-Mizzet) drop; mono-blue and mono-red stay.
    let matched = names(&store, "-c:ur");
    assert!(!matched.contains(&"Izzet Charm".to_string()));
    assert!(!matched.contains(&"Niv-Mizzet Reborn".to_string()));
    assert!(matched.contains(&"Counterspell".to_string()));
    assert!(matched.contains(&"Lightning Bolt".to_string()));
    assert!(matched.contains(&"Sol Ring".to_string()));
}

#[test]
fn subset_and_superset_algebra() {
    let store = seeded_store();
    // X ⊆ {R,G}: reds, greens, red-green and colorless.
    assert_eq!(
        names(&store, "c<=rg"),
        vec![
            "Goblin Guide",
            "Grumgully, the Generous",
            "Krenko, Mob Boss",
            "Lightning Bolt",
            "Llanowar Elves",
            "Sol Ring",
            "Tarmogoyf",
        ]
    );
    // {R,G} ⊆ X.
    assert_eq!(
        names(&store, "c>=rg"),
        vec!["Grumgully, the Generous", "Niv-Mizzet Reborn"]
    );
    // {R,G} ⊂ X strictly.
    assert_eq!(names(&store, "c>rg"), vec!["Niv-Mizzet Reborn"]);
    // X ⊂ {R,G} strictly: red-green itself drops out.
    assert_eq!(
        names(&store, "c<rg"),
        vec![
            "Goblin Guide",
            "Krenko, Mob Boss",
            "Lightning Bolt",
            "Llanowar Elves",
            "Sol Ring",
            "Tarmogoyf",
        ]
    );
}

#[test]
fn strict_subset_of_one_color_means_colorless() {
    let store = seeded_store();
    assert_eq!(names(&store, "c<r"), vec!["Sol Ring"]);
}

#[test]
fn colorless_sentinel_round_trips() {
    let store = seeded_store();
    assert_eq!(names(&store, "c:c"), vec!["Sol Ring"]);
    assert_eq!(names(&store, "-c:c").len(), all_cards().len() - 1);
}

#[test]
fn double_negation_is_idempotent() {
    let store = seeded_store();
    assert_eq!(names(&store, "kw:flying"), names(&store, "--kw:flying"));
}

#[test]
fn keyword_matches_the_list_not_rules_text() {
    let store = seeded_store();
    // Krenko's oracle text says "haste" but his keyword list is empty.
    assert_eq!(names(&store, "kw:haste"), vec!["Goblin Guide"]);
    // The oracle-text filter, by contrast, sees both.
    assert_eq!(
        names(&store, "o:haste"),
        vec!["Goblin Guide", "Krenko, Mob Boss"]
    );
}

#[test]
fn format_legality_includes_restricted() {
    let store = seeded_store();
    assert_eq!(
        names(&store, "f:modern"),
        vec!["Counterspell", "Lightning Bolt"]
    );
    assert_eq!(names(&store, "f:vintage"), vec!["Sol Ring"]);
}

#[test]
fn unknown_format_matches_nothing_but_still_runs() {
    let store = seeded_store();
    assert!(names(&store, "f:tribalwars").is_empty());
    assert_eq!(names(&store, "-f:tribalwars").len(), all_cards().len());
}

#[test]
fn banned_filter_reads_the_banned_status() {
    let store = seeded_store();
    assert_eq!(names(&store, "banned:legacy"), vec!["Sol Ring"]);
    let not_banned = names(&store, "-banned:legacy");
    assert!(!not_banned.contains(&"Sol Ring".to_string()));
    assert_eq!(not_banned.len(), all_cards().len() - 1);
}

#[test]
fn star_power_and_numeric_power() {
    let store = seeded_store();
    assert_eq!(names(&store, "pow:*"), vec!["Tarmogoyf"]);
    assert_eq!(
        names(&store, "pow>=4"),
        vec!["Niv-Mizzet Reborn", "Serra Angel"]
    );
    // Negated comparison inverts: -pow>=4 is pow<4 over power-bearing rows.
    let small = names(&store, "t:creature -pow>=4");
    assert!(small.contains(&"Goblin Guide".to_string()));
    assert!(!small.contains(&"Serra Angel".to_string()));
}

#[test]
fn numeric_comparisons_and_negation() {
    let store = seeded_store();
    assert_eq!(
        names(&store, "cmc>=4"),
        vec!["Krenko, Mob Boss", "Niv-Mizzet Reborn", "Serra Angel"]
    );
    assert_eq!(names(&store, "-cmc>=2 c:red t:creature"), vec!["Goblin Guide"]);
}

#[test]
fn set_block_and_rarity_filters() {
    let store = seeded_store();
    assert_eq!(
        names(&store, "set:lea"),
        vec!["Lightning Bolt", "Sol Ring"]
    );
    assert_eq!(
        names(&store, "b:innistrad"),
        vec!["Delver of Secrets // Insectile Aberration"]
    );
    assert_eq!(names(&store, "r:mythic"), vec!["Niv-Mizzet Reborn"]);
    assert_eq!(names(&store, "r:m"), vec!["Niv-Mizzet Reborn"]);
}

#[test]
fn price_year_artist_and_collector_number() {
    let store = seeded_store();
    assert_eq!(names(&store, "usd>=2"), vec!["Sol Ring"]);
    assert_eq!(
        names(&store, "year<2000"),
        vec!["Counterspell", "Lightning Bolt", "Sol Ring"]
    );
    assert_eq!(names(&store, "a:rush"), vec!["Lightning Bolt"]);
    assert_eq!(names(&store, "cn:161"), vec!["Lightning Bolt"]);
}

#[test]
fn produces_and_produces_token() {
    let store = seeded_store();
    assert_eq!(names(&store, "produces:g"), vec!["Llanowar Elves"]);
    assert_eq!(names(&store, "produces:c"), vec!["Sol Ring"]);
    assert_eq!(names(&store, "pt:goblin"), vec!["Krenko, Mob Boss"]);
}

#[test]
fn watermark_and_layout() {
    let store = seeded_store();
    assert_eq!(names(&store, "wm:izzet"), vec!["Izzet Charm"]);
    assert_eq!(
        names(&store, "layout:transform"),
        vec!["Delver of Secrets // Insectile Aberration"]
    );
}

#[test]
fn double_faced_card_is_searchable_through_its_faces() {
    let store = seeded_store();
    // Oracle text, type line and stats all come from the faces.
    let matched = names(&store, "o:\"top card of your library\" t:wizard");
    assert_eq!(matched, vec!["Delver of Secrets // Insectile Aberration"]);
    // Stats come from the first face that has them.
    assert!(names(&store, "t:insect pow:1").contains(
        &"Delver of Secrets // Insectile Aberration".to_string()
    ));
}

#[test]
fn mana_cost_contains_and_exact() {
    let store = seeded_store();
    assert_eq!(names(&store, "m:{U}{U}"), vec!["Counterspell"]);
    assert_eq!(
        names(&store, "m={R}"),
        vec!["Goblin Guide", "Lightning Bolt"]
    );
    assert!(names(&store, "m={U}{U}{U}").is_empty());
}

#[test]
fn negated_text_filter_matches_cards_without_the_column() {
    let store = seeded_store();
    // Every card that doesn't say "damage", including any with no text.
    let matched = names(&store, "-o:damage");
    assert!(!matched.contains(&"Lightning Bolt".to_string()));
    assert_eq!(matched.len(), all_cards().len() - 1);
}

#[test]
fn or_of_three_groups() {
    let store = seeded_store();
    assert_eq!(
        names(&store, "t:angel OR t:dragon OR pow:*"),
        vec!["Niv-Mizzet Reborn", "Serra Angel", "Tarmogoyf"]
    );
}

#[test]
fn identity_filters_use_color_identity() {
    let store = seeded_store();
    assert_eq!(
        names(&store, "id<=gruul t:creature pow>=3"),
        vec!["Grumgully, the Generous", "Krenko, Mob Boss"]
    );
}

#[test]
fn count_matches_ignores_pagination() {
    let store = seeded_store();
    let parsed = scry_syntax::parse_query("t:creature").unwrap();
    let count = store.count_matches(&parsed).unwrap();
    let paged = store.execute_query(&parsed, 2, 0).unwrap();
    assert_eq!(paged.len(), 2);
    assert!(count > 2);
}

#[test]
fn pagination_offsets_are_disjoint() {
    let store = seeded_store();
    let parsed = scry_syntax::parse_query("").unwrap();
    let first = store.execute_query(&parsed, 5, 0).unwrap();
    let second = store.execute_query(&parsed, 5, 5).unwrap();
    let first_ids: Vec<_> = first.iter().map(|c| c.id.clone()).collect();
    assert!(second.iter().all(|c| !first_ids.contains(&c.id)));
}
