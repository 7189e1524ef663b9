use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a movie across every lookup tier.
///
/// The canonical form is `"{title} ({year})"`. Titles are matched exactly
/// (case-sensitive, no trimming, no fuzzy matching), so two keys are equal
/// iff their canonical strings are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MovieKey {
    title: String,
    year: i32,
    canonical: String,
}

impl MovieKey {
    pub fn new(title: impl Into<String>, year: i32) -> Self {
        let title = title.into();
        let canonical = format!("{} ({})", title, year);
        Self {
            title,
            year,
            canonical,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// A key with a blank title can't be looked up anywhere.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

impl fmt::Display for MovieKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Public rating and popularity data for a single movie.
///
/// `public_rating` is on the internal 0-5 scale. A zero in `public_rating`,
/// `vote_count` or `popularity` marks the record as unusable for statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicDataRecord {
    #[serde(alias = "publicRating")]
    pub public_rating: f64,
    #[serde(alias = "voteCount")]
    pub vote_count: f64,
    #[serde(alias = "popularityScore")]
    pub popularity: f64,
    /// Full poster URL, empty when unknown.
    #[serde(alias = "posterUrl")]
    pub poster_url: String,
    /// Catalog identifier of the external source, kept for provenance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<i64>,
}

impl PublicDataRecord {
    pub fn is_usable(&self) -> bool {
        self.public_rating != 0.0 && self.vote_count != 0.0 && self.popularity != 0.0
    }
}

/// A manually curated record that supersedes every other tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    #[serde(flatten)]
    pub data: PublicDataRecord,
    /// When set the movie is treated as absent, whatever other tiers hold.
    #[serde(default)]
    pub ignore: bool,
}

impl OverrideRecord {
    pub fn ignored() -> Self {
        Self {
            data: PublicDataRecord::default(),
            ignore: true,
        }
    }

    pub fn with_data(data: PublicDataRecord) -> Self {
        Self {
            data,
            ignore: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_key_format() {
        let key = MovieKey::new("Arrival", 2016);
        assert_eq!(key.canonical(), "Arrival (2016)");
        assert_eq!(key.to_string(), "Arrival (2016)");
        assert_eq!(key.title(), "Arrival");
        assert_eq!(key.year(), 2016);
    }

    #[test]
    fn test_key_equality_is_exact() {
        assert_eq!(MovieKey::new("Cats", 2019), MovieKey::new("Cats", 2019));
        assert_ne!(MovieKey::new("Cats", 2019), MovieKey::new("cats", 2019));
        assert_ne!(MovieKey::new("Cats", 2019), MovieKey::new("Cats ", 2019));
        assert_ne!(MovieKey::new("Cats", 2019), MovieKey::new("Cats", 1998));
    }

    #[test]
    fn test_blank_title_is_invalid() {
        assert!(!MovieKey::new("", 2000).is_valid());
        assert!(!MovieKey::new("   ", 2000).is_valid());
        assert!(MovieKey::new("M", 1931).is_valid());
    }

    #[test]
    fn test_zero_fields_make_record_unusable() {
        let usable = PublicDataRecord {
            public_rating: 4.0,
            vote_count: 1000.0,
            popularity: 10.0,
            ..Default::default()
        };
        assert!(usable.is_usable());
        assert!(!PublicDataRecord {
            popularity: 0.0,
            ..usable.clone()
        }
        .is_usable());
        assert!(!PublicDataRecord {
            vote_count: 0.0,
            ..usable.clone()
        }
        .is_usable());
        assert!(!PublicDataRecord::default().is_usable());
    }

    #[test]
    fn test_override_json_accepts_partial_documents() {
        let ignored: OverrideRecord = serde_json::from_str(r#"{"ignore": true}"#).unwrap();
        assert!(ignored.ignore);
        assert_eq!(ignored.data, PublicDataRecord::default());

        let replaced: OverrideRecord = serde_json::from_str(
            r#"{"public_rating": 3.5, "vote_count": 12, "popularity": 1.25, "poster_url": "x"}"#,
        )
        .unwrap();
        assert!(!replaced.ignore);
        assert_eq!(replaced.data.public_rating, 3.5);
        assert_eq!(replaced.data.vote_count, 12.0);
        assert_eq!(replaced.data.poster_url, "x");
    }

    #[test]
    fn test_record_json_accepts_legacy_field_names() {
        let record: PublicDataRecord =
            serde_json::from_str(r#"{"publicRating": 3.0, "popularityScore": 7.5}"#).unwrap();
        assert_eq!(record.public_rating, 3.0);
        assert_eq!(record.popularity, 7.5);
        assert_eq!(record.vote_count, 0.0);
    }
}
