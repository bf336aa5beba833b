use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Miles to kilometers, as the profile feed reports distances in miles
const KM_PER_MILE: f64 = 1.609;

/// Outcome of a single judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Approve,
    Reject,
    Review,
    NoInfo,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Vote::Approve => "approve",
            Vote::Reject => "reject",
            Vote::Review => "review",
            Vote::NoInfo => "no_info",
        };
        f.write_str(s)
    }
}

/// Final decision for a candidate profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeAction {
    Like,
    Nope,
    NoAction,
}

impl fmt::Display for SwipeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SwipeAction::Like => "like",
            SwipeAction::Nope => "nope",
            SwipeAction::NoAction => "no_action",
        };
        f.write_str(s)
    }
}

/// Profile attribute judged by word lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordField {
    School,
    Name,
    Bio,
}

impl WordField {
    pub fn as_str(&self) -> &'static str {
        match self {
            WordField::School => "school",
            WordField::Name => "name",
            WordField::Bio => "bio",
        }
    }
}

impl fmt::Display for WordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three mutually exclusive word lists of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WordCategory {
    Approve,
    Reject,
    Review,
}

impl WordCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            WordCategory::Approve => "approve",
            WordCategory::Reject => "reject",
            WordCategory::Review => "review",
        }
    }
}

/// School entry of a profile; both parts are optional in the feed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct School {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: String,
}

/// Candidate profile as delivered by the recommendation feed
///
/// Constructed fresh per API response and never mutated while judged.
/// Only `_id` is mandatory; every other attribute may be absent and the
/// judges decide how to treat missing data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub distance_mi: Option<f64>,
    #[serde(default)]
    pub schools: Vec<School>,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl CandidateProfile {
    /// Distance in whole kilometers, if the feed reported one
    pub fn distance_km(&self) -> Option<u32> {
        self.distance_mi
            .filter(|mi| mi.is_finite() && *mi >= 0.0)
            .map(|mi| (mi * KM_PER_MILE).round() as u32)
    }

    /// Bio with line breaks turned into sentence breaks
    pub fn bio_text(&self) -> Option<String> {
        self.bio
            .as_deref()
            .filter(|bio| !bio.is_empty())
            .map(|bio| bio.replace('\n', ". "))
    }

    /// Age in years, 0 when the birth date is missing or unparsable
    pub fn age(&self) -> u32 {
        self.birth_date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|born| {
                let years = Utc::now().year() - born.with_timezone(&Utc).year();
                years.max(0) as u32
            })
            .unwrap_or(0)
    }

    pub fn photo_urls(&self) -> impl Iterator<Item = &str> {
        self.photos
            .iter()
            .map(|p| p.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

impl fmt::Display for CandidateProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}), {} km",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.age(),
            self.distance_km()
                .map(|d| d.to_string())
                .unwrap_or_else(|| "?".to_string())
        )
    }
}

/// Token triple persisted in the credential file
///
/// Unknown keys in the file are carried along in `extra` so a rewrite never
/// drops settings that other tools keep in the same file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "TINDER_PHONE_NUMBER", default)]
    pub phone_number: Option<String>,
    #[serde(rename = "TINDER_USER_ID", default)]
    pub user_id: Option<String>,
    #[serde(rename = "TINDER_ACCESS_TOKEN", default)]
    pub access_token: Option<String>,
    #[serde(rename = "TINDER_REFRESH_TOKEN", default)]
    pub refresh_token: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_from_feed_json() {
        let profile: CandidateProfile = serde_json::from_value(json!({
            "_id": "abc",
            "name": "Tessa",
            "distance_mi": 120,
            "birth_date": "1986-04-03T00:00:00.000Z",
            "schools": [{"name": "PABO Amsterdam"}, {"id": "42"}],
            "photos": [{"url": "https://img/1.jpg"}]
        }))
        .unwrap();

        assert_eq!(profile.id, "abc");
        assert_eq!(profile.distance_km(), Some(193));
        assert_eq!(profile.schools.len(), 2);
        assert!(profile.schools[1].name.is_none());
        assert!(profile.age() >= 38);
        assert_eq!(profile.photo_urls().count(), 1);
    }

    #[test]
    fn test_profile_without_id_is_rejected() {
        let result = serde_json::from_value::<CandidateProfile>(json!({"name": "Anon"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_bio_newlines_become_sentences() {
        let profile: CandidateProfile =
            serde_json::from_value(json!({"_id": "1", "bio": "hiking\ncoffee"})).unwrap();
        assert_eq!(profile.bio_text().as_deref(), Some("hiking. coffee"));
    }

    #[test]
    fn test_unparsable_birth_date_means_age_zero() {
        let profile: CandidateProfile =
            serde_json::from_value(json!({"_id": "1", "birth_date": "yesterday"})).unwrap();
        assert_eq!(profile.age(), 0);
    }

    #[test]
    fn test_credentials_keep_unknown_keys() {
        let creds: Credentials = serde_json::from_value(json!({
            "TINDER_PHONE_NUMBER": "31600000000",
            "TINDER_ACCESS_TOKEN": null,
            "FACEBOOK_ID": "fb"
        }))
        .unwrap();

        assert_eq!(creds.phone_number.as_deref(), Some("31600000000"));
        assert!(creds.access_token.is_none());
        let back = serde_json::to_value(&creds).unwrap();
        assert_eq!(back["FACEBOOK_ID"], "fb");
    }
}
