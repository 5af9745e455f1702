//! Cross-friend rating comparison.
//!
//! Titles are grouped by case-insensitive name across the caller's list and
//! every accepted friend's list. Only titles rated by at least two people are
//! kept, ranked by how many people rated them.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::{
    error::AppResult,
    models::UserAnimeDetails,
    services::{anime::AnimeService, friends::FriendService, users::UserService},
};

/// One title and the rating one person gave it
#[derive(Debug, Clone, PartialEq)]
pub struct RatedTitle {
    pub title: String,
    pub rating: i16,
}

impl From<&UserAnimeDetails> for RatedTitle {
    fn from(details: &UserAnimeDetails) -> Self {
        Self {
            title: details.anime.title.clone(),
            rating: details.entry.user_rating,
        }
    }
}

/// A friend's label and rated titles
#[derive(Debug, Clone, PartialEq)]
pub struct FriendRatings {
    pub name: String,
    pub entries: Vec<RatedTitle>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRating {
    pub person: String,
    pub rating: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Agreement {
    #[serde(rename = "total agreement")]
    Total,
    #[serde(rename = "good agreement")]
    Good,
    #[serde(rename = "moderate agreement")]
    Moderate,
    #[serde(rename = "divergent opinions")]
    Divergent,
}

impl Agreement {
    /// Buckets a population standard deviation; every bound is exclusive
    pub fn from_std_dev(std_dev: f64) -> Self {
        if std_dev < 0.5 {
            Agreement::Total
        } else if std_dev < 1.0 {
            Agreement::Good
        } else if std_dev < 1.5 {
            Agreement::Moderate
        } else {
            Agreement::Divergent
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Agreement::Total => "total agreement",
            Agreement::Good => "good agreement",
            Agreement::Moderate => "moderate agreement",
            Agreement::Divergent => "divergent opinions",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleComparison {
    pub title: String,
    pub ratings: Vec<PersonRating>,
    pub mean: f64,
    pub std_dev: f64,
    pub agreement: Agreement,
}

/// Mean and population standard deviation (divides by n)
pub fn mean_and_std_dev(ratings: &[i16]) -> (f64, f64) {
    if ratings.is_empty() {
        return (0.0, 0.0);
    }
    let n = ratings.len() as f64;
    let mean = ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / n;
    let variance = ratings
        .iter()
        .map(|r| (f64::from(*r) - mean).powi(2))
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

struct Group {
    title: String,
    ratings: Vec<PersonRating>,
    contributors: HashSet<usize>,
}

/// Groups ratings by lowercased title and ranks titles rated by two or more people
///
/// The displayed title is the casing of the first occurrence. Ties in the
/// number of ratings keep first-seen order.
pub fn compare_all(
    my_entries: &[RatedTitle],
    friends: &[FriendRatings],
    my_label: &str,
) -> Vec<TitleComparison> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Group> = HashMap::new();

    let people = std::iter::once((my_label, my_entries))
        .chain(friends.iter().map(|f| (f.name.as_str(), f.entries.as_slice())));

    for (person_index, (person, entries)) in people.enumerate() {
        for entry in entries {
            let key = entry.title.to_lowercase();
            let group = groups.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                Group {
                    title: entry.title.clone(),
                    ratings: Vec::new(),
                    contributors: HashSet::new(),
                }
            });
            group.ratings.push(PersonRating {
                person: person.to_string(),
                rating: entry.rating,
            });
            group.contributors.insert(person_index);
        }
    }

    let mut ranked: Vec<(usize, TitleComparison)> = order
        .into_iter()
        .filter_map(|key| groups.remove(&key))
        .filter(|group| group.contributors.len() >= 2)
        .map(|group| {
            let values: Vec<i16> = group.ratings.iter().map(|r| r.rating).collect();
            let (mean, std_dev) = mean_and_std_dev(&values);
            let comparison = TitleComparison {
                title: group.title,
                ratings: group.ratings,
                mean,
                std_dev,
                agreement: Agreement::from_std_dev(std_dev),
            };
            (group.contributors.len(), comparison)
        })
        .collect();

    // Stable, so ties keep first-seen order
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.into_iter().map(|(_, comparison)| comparison).collect()
}

/// Keeps comparisons whose title contains `query`, case-insensitively
pub fn filter_by_title(comparisons: Vec<TitleComparison>, query: &str) -> Vec<TitleComparison> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return comparisons;
    }
    comparisons
        .into_iter()
        .filter(|c| c.title.to_lowercase().contains(&needle))
        .collect()
}

/// Builds the comparison for a caller and all of their accepted friends
pub async fn compare_with_friends(
    animes: &AnimeService,
    friends: &FriendService,
    users: &UserService,
    user_id: &str,
    query: Option<&str>,
) -> AppResult<Vec<TitleComparison>> {
    let my_label = users
        .get_current_user(user_id)
        .await?
        .map(|u| u.label().to_string())
        .unwrap_or_else(|| user_id.to_string());

    let mine: Vec<RatedTitle> = animes
        .entries_for_user(user_id)
        .await?
        .iter()
        .map(RatedTitle::from)
        .collect();

    let mut friend_ratings = Vec::new();
    for friend in friends.get_friends(user_id).await? {
        let entries = animes
            .entries_for_user(&friend.friend_id)
            .await?
            .iter()
            .map(RatedTitle::from)
            .collect();
        friend_ratings.push(FriendRatings {
            name: friend.label().to_string(),
            entries,
        });
    }

    let comparisons = compare_all(&mine, &friend_ratings, &my_label);

    tracing::debug!(
        user_id = %user_id,
        friends = friend_ratings.len(),
        titles = comparisons.len(),
        "Comparison built"
    );

    Ok(match query {
        Some(q) => filter_by_title(comparisons, q),
        None => comparisons,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rated(title: &str, rating: i16) -> RatedTitle {
        RatedTitle {
            title: title.to_string(),
            rating,
        }
    }

    fn friend(name: &str, entries: Vec<RatedTitle>) -> FriendRatings {
        FriendRatings {
            name: name.to_string(),
            entries,
        }
    }

    #[test]
    fn test_unanimous_ratings_total_agreement() {
        let result = compare_all(
            &[rated("Mushishi", 4)],
            &[
                friend("Ginko", vec![rated("Mushishi", 4)]),
                friend("Adashino", vec![rated("mushishi", 4)]),
            ],
            "Me",
        );

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].title, "Mushishi");
        assert_eq!(result[0].std_dev, 0.0);
        assert_eq!(result[0].agreement, Agreement::Total);
    }

    #[test]
    fn test_extreme_ratings_divergent() {
        let result = compare_all(
            &[rated("Devilman Crybaby", 1)],
            &[friend("Akira", vec![rated("Devilman Crybaby", 6)])],
            "Me",
        );

        assert_eq!(result[0].mean, 3.5);
        assert_eq!(result[0].std_dev, 2.5);
        assert_eq!(result[0].agreement, Agreement::Divergent);
    }

    #[test]
    fn test_half_point_boundary_is_good_agreement() {
        let (mean, std_dev) = mean_and_std_dev(&[4, 5]);
        assert_eq!(mean, 4.5);
        assert_eq!(std_dev, 0.5);
        assert_eq!(Agreement::from_std_dev(std_dev), Agreement::Good);
        assert_eq!(Agreement::from_std_dev(1.0), Agreement::Moderate);
        assert_eq!(Agreement::from_std_dev(1.5), Agreement::Divergent);
    }

    #[test]
    fn test_single_rater_titles_dropped() {
        let result = compare_all(
            &[rated("Solo Title", 5), rated("solo title", 3), rated("Shared", 5)],
            &[friend("Yuki", vec![rated("Shared", 5), rated("Only Yuki", 2)])],
            "Me",
        );

        let titles: Vec<&str> = result.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Shared"]);
        assert!(filter_by_title(result, "solo").is_empty());
    }

    #[test]
    fn test_ranked_by_people_count_then_first_seen() {
        let result = compare_all(
            &[rated("A", 3), rated("B", 3), rated("C", 3)],
            &[
                friend("F1", vec![rated("A", 3), rated("B", 3), rated("C", 3)]),
                friend("F2", vec![rated("C", 3)]),
            ],
            "Me",
        );

        let titles: Vec<&str> = result.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["C", "A", "B"]);
        assert_eq!(result[0].ratings.len(), 3);
        assert_eq!(result[0].ratings[0].person, "Me");
    }

    #[test]
    fn test_repeat_ratings_by_one_person_do_not_raise_rank() {
        let result = compare_all(
            &[rated("A", 2), rated("a", 5), rated("B", 4)],
            &[
                friend("F1", vec![rated("a", 3), rated("B", 4)]),
                friend("F2", vec![rated("b", 4)]),
            ],
            "Me",
        );

        let titles: Vec<&str> = result.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert_eq!(result[0].ratings.len(), 3);
        assert_eq!(result[1].ratings.len(), 3);
    }

    #[test]
    fn test_filter_is_case_insensitive_substring() {
        let result = compare_all(
            &[rated("Fullmetal Alchemist: Brotherhood", 6), rated("Frieren", 6)],
            &[friend(
                "Ed",
                vec![rated("Fullmetal Alchemist: Brotherhood", 5), rated("Frieren", 6)],
            )],
            "Me",
        );

        let filtered = filter_by_title(result.clone(), "ALCHEMIST");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Fullmetal Alchemist: Brotherhood");
        assert_eq!(filter_by_title(result, "  ").len(), 2);
    }

    #[test]
    fn test_agreement_serializes_to_label() {
        for agreement in [
            Agreement::Total,
            Agreement::Good,
            Agreement::Moderate,
            Agreement::Divergent,
        ] {
            assert_eq!(
                serde_json::to_value(agreement).unwrap(),
                serde_json::json!(agreement.label())
            );
        }
    }
}
