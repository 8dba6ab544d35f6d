//! # chatrs Venue Catalog
//!
//! File: cli/src/chat/venues.rs
//! Author: Christi Mahu
//!
//! Static, deterministic suggestion lists keyed by (city, category). The
//! seeded lists can be extended or replaced through `[[venues]]` tables.

use crate::core::config::VenueEntry;
use serde::Deserialize;
use std::collections::HashMap;

/// Kinds of place the venue rule knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueCategory {
    Bar,
    Cafe,
    Restaurant,
}

impl VenueCategory {
    /// Keyword to category, for single tokens of user text.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "bar" | "bars" | "pub" | "pubs" => Some(Self::Bar),
            "cafe" | "cafes" | "café" | "coffee" => Some(Self::Cafe),
            "restaurant" | "restaurants" => Some(Self::Restaurant),
            _ => None,
        }
    }

    /// Every keyword, in the order the substring matcher tries them.
    pub const KEYWORDS: [(&'static str, VenueCategory); 6] = [
        ("restaurant", VenueCategory::Restaurant),
        ("coffee", VenueCategory::Cafe),
        ("cafe", VenueCategory::Cafe),
        ("café", VenueCategory::Cafe),
        ("pub", VenueCategory::Bar),
        ("bar", VenueCategory::Bar),
    ];

    /// Plural label used in replies.
    pub fn label(self) -> &'static str {
        match self {
            VenueCategory::Bar => "bars",
            VenueCategory::Cafe => "cafes",
            VenueCategory::Restaurant => "restaurants",
        }
    }
}

/// Folds spelling variants of a city onto its catalog key.
pub fn normalize_city(city: &str) -> String {
    let lowered = city.trim().to_lowercase();
    match lowered.as_str() {
        "bangalore" | "bengaluru" | "blr" => "bengaluru".to_string(),
        "bombay" | "mumbai" => "mumbai".to_string(),
        "new delhi" | "delhi" => "delhi".to_string(),
        _ => lowered,
    }
}

/// Display form of a catalog key (`bengaluru` -> `Bengaluru`).
pub fn display_city(key: &str) -> String {
    key.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

const SEED: &[(&str, VenueCategory, &[&str])] = &[
    (
        "bengaluru",
        VenueCategory::Bar,
        &[
            "Toit Brewpub, Indiranagar",
            "Arbor Brewing Company, Magrath Road",
            "Byg Brewski Brewing Company, Hennur",
            "Skyye, UB City",
            "The Biere Club, Lavelle Road",
        ],
    ),
    (
        "bengaluru",
        VenueCategory::Cafe,
        &[
            "Third Wave Coffee, Koramangala",
            "Dyu Art Cafe, Koramangala",
            "Matteo Coffea, Church Street",
            "Blue Tokai Coffee Roasters, Indiranagar",
        ],
    ),
    (
        "bengaluru",
        VenueCategory::Restaurant,
        &[
            "Mavalli Tiffin Rooms (MTR), Lalbagh Road",
            "Vidyarthi Bhavan, Basavanagudi",
            "Karavalli, Residency Road",
            "Truffles, Koramangala",
        ],
    ),
    (
        "mumbai",
        VenueCategory::Bar,
        &[
            "Aer, Worli",
            "Bonobo, Bandra",
            "Toto's Garage, Bandra",
            "Woodside Inn, Colaba",
        ],
    ),
    (
        "mumbai",
        VenueCategory::Cafe,
        &[
            "Kala Ghoda Cafe, Fort",
            "Leopold Cafe, Colaba",
            "Prithvi Cafe, Juhu",
        ],
    ),
    (
        "delhi",
        VenueCategory::Restaurant,
        &[
            "Karim's, Jama Masjid",
            "Indian Accent, Lodhi Road",
            "Bukhara, Chanakyapuri",
        ],
    ),
];

/// (city, category) → ordered suggestion list.
#[derive(Debug, Clone)]
pub struct VenueCatalog {
    lists: HashMap<(String, VenueCategory), Vec<String>>,
}

impl Default for VenueCatalog {
    fn default() -> Self {
        Self::seeded()
    }
}

impl VenueCatalog {
    pub fn seeded() -> Self {
        let lists = SEED
            .iter()
            .map(|(city, category, items)| {
                (
                    (city.to_string(), *category),
                    items.iter().map(|s| s.to_string()).collect(),
                )
            })
            .collect();
        Self { lists }
    }

    /// Seed lists with configured entries layered on top (same key replaces).
    pub fn with_entries(entries: &[VenueEntry]) -> Self {
        let mut catalog = Self::seeded();
        for entry in entries {
            catalog
                .lists
                .insert((normalize_city(&entry.city), entry.category), entry.items.clone());
        }
        catalog
    }

    pub fn lookup(&self, city: &str, category: VenueCategory) -> Option<&[String]> {
        self.lists
            .get(&(normalize_city(city), category))
            .map(Vec::as_slice)
    }

    /// Finds a catalog city (or alias) named in already-normalized text.
    pub fn city_mentioned_in(&self, normalized: &str) -> Option<String> {
        let padded = format!(" {} ", normalized);
        const ALIASES: [&str; 4] = ["bangalore", "bombay", "new delhi", "blr"];
        let mut candidates: Vec<&str> = self.lists.keys().map(|(c, _)| c.as_str()).collect();
        candidates.extend(ALIASES);
        candidates.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        candidates
            .into_iter()
            .find(|city| padded.contains(&format!(" {} ", city)))
            .map(normalize_city)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_bengaluru_bars() {
        let catalog = VenueCatalog::seeded();
        let bars = catalog.lookup("Bangalore", VenueCategory::Bar).unwrap();
        assert_eq!(bars.len(), 5);
        assert_eq!(bars[0], "Toit Brewpub, Indiranagar");
    }

    #[test]
    fn test_entries_replace_and_extend() {
        let catalog = VenueCatalog::with_entries(&[
            VenueEntry {
                city: "Pune".into(),
                category: VenueCategory::Cafe,
                items: vec!["Vohuman Cafe".into()],
            },
            VenueEntry {
                city: "bombay".into(),
                category: VenueCategory::Bar,
                items: vec!["Only One".into()],
            },
        ]);
        assert_eq!(
            catalog.lookup("pune", VenueCategory::Cafe).unwrap(),
            ["Vohuman Cafe".to_string()]
        );
        assert_eq!(catalog.lookup("mumbai", VenueCategory::Bar).unwrap().len(), 1);
        assert!(catalog.lookup("pune", VenueCategory::Bar).is_none());
    }

    #[test]
    fn test_city_mentioned_in_text() {
        let catalog = VenueCatalog::seeded();
        assert_eq!(
            catalog.city_mentioned_in("best bars in bangalore"),
            Some("bengaluru".to_string())
        );
        assert_eq!(
            catalog.city_mentioned_in("cafes in new delhi please"),
            Some("delhi".to_string())
        );
        assert_eq!(catalog.city_mentioned_in("bars near me"), None);
    }

    #[test]
    fn test_display_city() {
        assert_eq!(display_city("bengaluru"), "Bengaluru");
        assert_eq!(display_city("new york"), "New York");
    }
}
