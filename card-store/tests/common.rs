#![allow(dead_code)]
//! Shared fixtures for `card-store` integration tests: a small pool of
//! real-shaped cards covering every color combination the set-algebra
//! tests need.

use card_store::{Card, CardFace, CardStore};
use serde_json::json;

pub fn card(id: &str, name: &str) -> Card {
    Card {
        id: id.to_string(),
        name: name.to_string(),
        layout: Some("normal".into()),
        ..Card::default()
    }
}

pub fn lightning_bolt() -> Card {
    Card {
        mana_cost: Some("{R}".into()),
        cmc: Some(1.0),
        type_line: Some("Instant".into()),
        oracle_text: Some("Lightning Bolt deals 3 damage to any target.".into()),
        colors: Some(vec!["R".into()]),
        color_identity: vec!["R".into()],
        set_code: Some("lea".into()),
        set_name: Some("Limited Edition Alpha".into()),
        rarity: Some("common".into()),
        artist: Some("Christopher Rush".into()),
        released_at: Some("1993-08-05".into()),
        collector_number: Some("161".into()),
        legalities: Some(json!({"modern": "legal", "legacy": "legal", "standard": "not_legal"})),
        prices: Some(json!({"usd": "1.50", "eur": "1.20"})),
        ..card("bolt", "Lightning Bolt")
    }
}

pub fn counterspell() -> Card {
    Card {
        mana_cost: Some("{U}{U}".into()),
        cmc: Some(2.0),
        type_line: Some("Instant".into()),
        oracle_text: Some("Counter target spell.".into()),
        colors: Some(vec!["U".into()]),
        color_identity: vec!["U".into()],
        set_code: Some("3ed".into()),
        rarity: Some("uncommon".into()),
        released_at: Some("1994-04-01".into()),
        legalities: Some(json!({"legacy": "legal", "modern": "legal"})),
        ..card("counterspell", "Counterspell")
    }
}

pub fn llanowar_elves() -> Card {
    Card {
        mana_cost: Some("{G}".into()),
        cmc: Some(1.0),
        type_line: Some("Creature — Elf Druid".into()),
        oracle_text: Some("{T}: Add {G}.".into()),
        power: Some("1".into()),
        toughness: Some("1".into()),
        colors: Some(vec!["G".into()]),
        color_identity: vec!["G".into()],
        produced_mana: vec!["G".into()],
        set_code: Some("m19".into()),
        rarity: Some("common".into()),
        released_at: Some("2018-07-13".into()),
        ..card("llanowar", "Llanowar Elves")
    }
}

pub fn goblin_guide() -> Card {
    Card {
        mana_cost: Some("{R}".into()),
        cmc: Some(1.0),
        type_line: Some("Creature — Goblin Scout".into()),
        oracle_text: Some("Haste. When Goblin Guide attacks, defending player reveals the top card of their library.".into()),
        power: Some("2".into()),
        toughness: Some("2".into()),
        colors: Some(vec!["R".into()]),
        color_identity: vec!["R".into()],
        keywords: vec!["Haste".into()],
        set_code: Some("zen".into()),
        rarity: Some("rare".into()),
        released_at: Some("2009-10-02".into()),
        ..card("guide", "Goblin Guide")
    }
}

/// Red-green goblin: distinguishes `a OR b c` from `(a OR b) c`.
pub fn grumgully() -> Card {
    Card {
        mana_cost: Some("{1}{R}{G}".into()),
        cmc: Some(3.0),
        type_line: Some("Legendary Creature — Goblin Shaman".into()),
        oracle_text: Some("Each other non-Human creature you control enters with an additional +1/+1 counter on it.".into()),
        power: Some("3".into()),
        toughness: Some("3".into()),
        colors: Some(vec!["R".into(), "G".into()]),
        color_identity: vec!["R".into(), "G".into()],
        set_code: Some("eld".into()),
        rarity: Some("uncommon".into()),
        released_at: Some("2019-10-04".into()),
        ..card("grumgully", "Grumgully, the Generous")
    }
}

pub fn izzet_charm() -> Card {
    Card {
        mana_cost: Some("{U}{R}".into()),
        cmc: Some(2.0),
        type_line: Some("Instant".into()),
        oracle_text: Some("Choose one —".into()),
        colors: Some(vec!["U".into(), "R".into()]),
        color_identity: vec!["U".into(), "R".into()],
        set_code: Some("rtr".into()),
        rarity: Some("uncommon".into()),
        watermark: Some("izzet".into()),
        released_at: Some("2012-10-05".into()),
        ..card("izzet-charm", "Izzet Charm")
    }
}

pub fn serra_angel() -> Card {
    Card {
        mana_cost: Some("{3}{W}{W}".into()),
        cmc: Some(5.0),
        type_line: Some("Creature — Angel".into()),
        oracle_text: Some("Flying, vigilance".into()),
        power: Some("4".into()),
        toughness: Some("4".into()),
        colors: Some(vec!["W".into()]),
        color_identity: vec!["W".into()],
        keywords: vec!["Flying".into(), "Vigilance".into()],
        set_code: Some("dom".into()),
        rarity: Some("uncommon".into()),
        released_at: Some("2018-04-27".into()),
        ..card("serra", "Serra Angel")
    }
}

pub fn tarmogoyf() -> Card {
    Card {
        mana_cost: Some("{1}{G}".into()),
        cmc: Some(2.0),
        type_line: Some("Creature — Lhurgoyf".into()),
        oracle_text: Some("Tarmogoyf's power is equal to the number of card types among cards in all graveyards.".into()),
        power: Some("*".into()),
        toughness: Some("1".into()),
        colors: Some(vec!["G".into()]),
        color_identity: vec!["G".into()],
        set_code: Some("fut".into()),
        rarity: Some("rare".into()),
        released_at: Some("2007-05-04".into()),
        ..card("goyf", "Tarmogoyf")
    }
}

pub fn sol_ring() -> Card {
    Card {
        mana_cost: Some("{1}".into()),
        cmc: Some(1.0),
        type_line: Some("Artifact".into()),
        oracle_text: Some("{T}: Add {C}{C}.".into()),
        colors: Some(vec![]),
        color_identity: vec![],
        produced_mana: vec!["C".into()],
        set_code: Some("lea".into()),
        rarity: Some("uncommon".into()),
        released_at: Some("1993-08-05".into()),
        legalities: Some(json!({
            "commander": "legal",
            "legacy": "banned",
            "vintage": "restricted"
        })),
        prices: Some(json!({"usd": "2.49"})),
        ..card("sol-ring", "Sol Ring")
    }
}

pub fn krenko() -> Card {
    Card {
        mana_cost: Some("{2}{R}{R}".into()),
        cmc: Some(4.0),
        type_line: Some("Legendary Creature — Goblin Warrior".into()),
        oracle_text: Some("{T}: Create X 1/1 red Goblin creature tokens, where X is the number of Goblins you control. It gains haste.".into()),
        power: Some("3".into()),
        toughness: Some("3".into()),
        colors: Some(vec!["R".into()]),
        color_identity: vec!["R".into()],
        set_code: Some("m13".into()),
        rarity: Some("rare".into()),
        released_at: Some("2012-07-13".into()),
        ..card("krenko", "Krenko, Mob Boss")
    }
}

pub fn niv_mizzet_reborn() -> Card {
    Card {
        mana_cost: Some("{W}{U}{B}{R}{G}".into()),
        cmc: Some(5.0),
        type_line: Some("Legendary Creature — Dragon Avatar".into()),
        oracle_text: Some("Flying".into()),
        power: Some("6".into()),
        toughness: Some("6".into()),
        colors: Some(vec!["W".into(), "U".into(), "B".into(), "R".into(), "G".into()]),
        color_identity: vec!["W".into(), "U".into(), "B".into(), "R".into(), "G".into()],
        keywords: vec!["Flying".into()],
        set_code: Some("war".into()),
        rarity: Some("mythic".into()),
        released_at: Some("2019-05-03".into()),
        ..card("niv", "Niv-Mizzet Reborn")
    }
}

pub fn delver_of_secrets() -> Card {
    Card {
        cmc: Some(1.0),
        colors: Some(vec!["U".into()]),
        color_identity: vec!["U".into()],
        keywords: vec!["Flying".into(), "Transform".into()],
        set_code: Some("isd".into()),
        rarity: Some("common".into()),
        released_at: Some("2011-09-30".into()),
        layout: Some("transform".into()),
        card_faces: vec![
            CardFace {
                name: Some("Delver of Secrets".into()),
                mana_cost: Some("{U}".into()),
                type_line: Some("Creature — Human Wizard".into()),
                oracle_text: Some(
                    "At the beginning of your upkeep, look at the top card of your library."
                        .into(),
                ),
                power: Some("1".into()),
                toughness: Some("1".into()),
                colors: Some(vec!["U".into()]),
                ..CardFace::default()
            },
            CardFace {
                name: Some("Insectile Aberration".into()),
                type_line: Some("Creature — Human Insect".into()),
                oracle_text: Some("Flying".into()),
                power: Some("3".into()),
                toughness: Some("2".into()),
                colors: Some(vec!["U".into()]),
                ..CardFace::default()
            },
        ],
        ..card("delver", "Delver of Secrets // Insectile Aberration")
    }
}

pub fn all_cards() -> Vec<Card> {
    vec![
        lightning_bolt(),
        counterspell(),
        llanowar_elves(),
        goblin_guide(),
        grumgully(),
        izzet_charm(),
        serra_angel(),
        tarmogoyf(),
        sol_ring(),
        krenko(),
        niv_mizzet_reborn(),
        delver_of_secrets(),
    ]
}

pub fn seeded_store() -> CardStore {
    let mut store = CardStore::open_in_memory().unwrap();
    store.insert_cards(&all_cards()).unwrap();
    store
}

/// Runs a query and returns the sorted matching names.
pub fn names(store: &CardStore, query: &str) -> Vec<String> {
    let parsed = scry_syntax::parse_query(query).unwrap();
    let mut names: Vec<String> = store
        .execute_query(&parsed, 100, 0)
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    names.sort();
    names
}
