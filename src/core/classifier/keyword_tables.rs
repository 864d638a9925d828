// Keyword tables for the sensitivity classifier.
//
// These are plain data - category names mapped to curated term lists.
// Keeping them as serde structs means moderators can override the built-in
// lists with a JSON file instead of waiting for a redeploy.

use serde::{Deserialize, Serialize};

/// Semantic category a keyword belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Spam,
    Abuse,
    Gambling,
    Adult,
    Fraud,
    Illegal,
    Discrimination,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Spam => write!(f, "spam"),
            Category::Abuse => write!(f, "abuse"),
            Category::Gambling => write!(f, "gambling"),
            Category::Adult => write!(f, "adult"),
            Category::Fraud => write!(f, "fraud"),
            Category::Illegal => write!(f, "illegal"),
            Category::Discrimination => write!(f, "discrimination"),
        }
    }
}

/// One category's term list. Terms are matched as case-insensitive substrings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTable {
    pub category: Category,
    pub terms: Vec<String>,
}

/// The full set of category -> keyword tables the classifier runs against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordTables {
    pub categories: Vec<CategoryTable>,
}

impl KeywordTables {
    /// Parse tables from a JSON document (moderator-supplied override file).
    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

fn table(category: Category, terms: &[&str]) -> CategoryTable {
    CategoryTable {
        category,
        terms: terms.iter().map(|t| t.to_string()).collect(),
    }
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            categories: vec![
                table(
                    Category::Spam,
                    &[
                        "click here",
                        "buy now",
                        "free money",
                        "limited time offer",
                        "make money fast",
                        "work from home",
                        "guaranteed income",
                        "cheap followers",
                        "subscribe to my channel",
                        "visit my site",
                    ],
                ),
                table(
                    Category::Abuse,
                    &[
                        "kill yourself",
                        "kys",
                        "you should die",
                        "go die",
                        "worthless",
                        "pathetic loser",
                        "piece of trash",
                        "nobody likes you",
                        "stupid idiot",
                        "dumbass",
                    ],
                ),
                table(
                    Category::Gambling,
                    &[
                        "casino",
                        "jackpot",
                        "online betting",
                        "sports betting",
                        "place your bets",
                        "slot machine",
                        "betting odds",
                        "lottery win",
                        "roulette",
                        "poker bonus",
                    ],
                ),
                table(
                    Category::Adult,
                    &[
                        "porn",
                        "nude pics",
                        "xxx",
                        "onlyfans",
                        "escort service",
                        "nsfw link",
                        "camgirl",
                        "sex chat",
                        "explicit photos",
                    ],
                ),
                table(
                    Category::Fraud,
                    &[
                        "verify your account",
                        "wire transfer",
                        "send me your password",
                        "bank details",
                        "inheritance fund",
                        "foreign prince",
                        "crypto doubling",
                        "guaranteed returns",
                        "gift card codes",
                        "account suspended click",
                    ],
                ),
                table(
                    Category::Illegal,
                    &[
                        "drugs for sale",
                        "buy weed",
                        "cocaine",
                        "heroin",
                        "meth for sale",
                        "stolen credit cards",
                        "counterfeit money",
                        "fake passport",
                        "sell firearms",
                        "hire a hitman",
                    ],
                ),
                table(
                    Category::Discrimination,
                    &[
                        "go back to your country",
                        "inferior race",
                        "subhuman",
                        "racial purity",
                        "deport them all",
                        "your kind doesn't belong",
                        "ethnic cleansing",
                    ],
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_cover_all_categories() {
        let tables = KeywordTables::default();
        let categories: Vec<Category> =
            tables.categories.iter().map(|t| t.category).collect();

        for expected in [
            Category::Spam,
            Category::Abuse,
            Category::Gambling,
            Category::Adult,
            Category::Fraud,
            Category::Illegal,
            Category::Discrimination,
        ] {
            assert!(
                categories.contains(&expected),
                "missing default table for {}",
                expected
            );
        }

        // No empty term lists - an empty table would silently disable a category.
        for t in &tables.categories {
            assert!(!t.terms.is_empty(), "{} table is empty", t.category);
        }
    }

    #[test]
    fn tables_round_trip_through_json() {
        let json = r#"{
            "categories": [
                { "category": "spam", "terms": ["buy now", "click here"] },
                { "category": "illegal", "terms": ["contraband"] }
            ]
        }"#;

        let tables = KeywordTables::from_json(json).unwrap();
        assert_eq!(tables.categories.len(), 2);
        assert_eq!(tables.categories[0].category, Category::Spam);
        assert_eq!(tables.categories[1].terms, vec!["contraband"]);
    }

    #[test]
    fn invalid_category_name_is_rejected() {
        let json = r#"{ "categories": [ { "category": "nonsense", "terms": ["x"] } ] }"#;
        assert!(KeywordTables::from_json(json).is_err());
    }
}
