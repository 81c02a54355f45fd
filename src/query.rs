//! Filtering, sorting and year grouping over the post-edit collection.
//!
//! This layer never mutates publications; filters return references into
//! the caller-owned collection.

use crate::normalize::Publication;
use serde::{Deserialize, Serialize};

/// Fallback group label for publications without a year
const NO_YEAR_LABEL: &str = "No year";

/// Filter criteria, AND-combined. Field names double as the HTTP query
/// parameters of the `/publications` endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PubFilter {
    /// Case-insensitive substring over title, abstract, topic hierarchy,
    /// type label and journal
    #[serde(default)]
    pub search: Option<String>,
    /// Short lab-author id the publication must list
    #[serde(default)]
    pub author: Option<String>,
    /// Exact type label
    #[serde(rename = "type", default)]
    pub type_label: Option<String>,
    #[serde(default)]
    pub year_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
}

impl PubFilter {
    /// Whether one publication passes every active criterion.
    pub fn matches(&self, publication: &Publication) -> bool {
        if let Some(search) = self.search.as_deref() {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() {
                let haystack = [
                    publication.title.as_str(),
                    publication.abstract_text.as_str(),
                    publication.topic.as_str(),
                    publication.subfield.as_str(),
                    publication.field.as_str(),
                    publication.domain.as_str(),
                    publication.type_label.as_str(),
                    publication.journal.as_str(),
                ]
                .join(" ")
                .to_lowercase();

                if !haystack.contains(&needle) {
                    return false;
                }
            }
        }

        if let Some(author) = self.author.as_deref() {
            if !author.is_empty()
                && !publication.lab_author_ids.iter().any(|id| id == author)
            {
                return false;
            }
        }

        if let Some(label) = self.type_label.as_deref() {
            if !label.is_empty() && publication.type_label != label {
                return false;
            }
        }

        // A publication without a year fails any year bound
        if let Some(from) = self.year_from {
            match publication.year {
                Some(year) if year >= from => {}
                _ => return false,
            }
        }
        if let Some(to) = self.year_to {
            match publication.year {
                Some(year) if year <= to => {}
                _ => return false,
            }
        }

        true
    }

    /// Apply the filter, preserving order.
    pub fn apply<'a>(&self, publications: &'a [Publication]) -> Vec<&'a Publication> {
        publications.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Sort newest first; publications without a year sort as year 0 (last).
/// The sort is stable, so same-year records keep their collection order.
pub fn sort_by_year_desc(publications: &mut [Publication]) {
    publications.sort_by_key(|p| std::cmp::Reverse(p.year.unwrap_or(0)));
}

/// A contiguous run of publications sharing a year.
#[derive(Debug, Serialize)]
pub struct YearGroup<'a> {
    pub label: String,
    pub items: Vec<&'a Publication>,
}

/// Partition an already-sorted sequence into contiguous year runs,
/// preserving order. This is a streaming partition, not a re-sort.
pub fn group_by_year<'a>(publications: &[&'a Publication]) -> Vec<YearGroup<'a>> {
    let mut groups: Vec<YearGroup<'a>> = Vec::new();

    for publication in publications {
        let label = publication
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| NO_YEAR_LABEL.to_string());

        match groups.last_mut() {
            Some(group) if group.label == label => group.items.push(publication),
            _ => groups.push(YearGroup {
                label,
                items: vec![publication],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication(title: &str, year: Option<i32>) -> Publication {
        Publication {
            id: format!("https://openalex.org/{}", title),
            title: title.to_string(),
            year,
            type_label: "Article".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_sort_puts_yearless_last() {
        let mut pubs = vec![
            publication("Undated", None),
            publication("Old", Some(2015)),
            publication("New", Some(2023)),
        ];
        sort_by_year_desc(&mut pubs);

        let titles: Vec<&str> = pubs.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["New", "Old", "Undated"]);
    }

    #[test]
    fn test_year_range_excludes_yearless() {
        let pubs = vec![
            publication("In Range", Some(2021)),
            publication("Too Old", Some(2019)),
            publication("Too New", Some(2023)),
            publication("Undated", None),
        ];
        let filter = PubFilter {
            year_from: Some(2020),
            year_to: Some(2022),
            ..Default::default()
        };

        let hits = filter.apply(&pubs);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "In Range");
    }

    #[test]
    fn test_search_covers_abstract_and_journal() {
        let mut with_abstract = publication("Dispersal", Some(2022));
        with_abstract.abstract_text = "Seeds travel far on wind currents.".to_string();
        let mut with_journal = publication("Networks", Some(2021));
        with_journal.journal = "Wind Studies Quarterly".to_string();
        let unrelated = publication("Soil", Some(2020));

        let filter = PubFilter {
            search: Some("WIND".to_string()),
            ..Default::default()
        };
        let pubs = [with_abstract, with_journal, unrelated];
        let hits = filter.apply(&pubs);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_author_and_type_filters() {
        let mut by_ada = publication("Hers", Some(2022));
        by_ada.lab_author_ids = vec!["A1".to_string()];
        let mut review = publication("Overview", Some(2022));
        review.type_label = "Review".to_string();

        let pubs = vec![by_ada, review];

        let author_filter = PubFilter {
            author: Some("A1".to_string()),
            ..Default::default()
        };
        assert_eq!(author_filter.apply(&pubs).len(), 1);

        let type_filter = PubFilter {
            type_label: Some("Review".to_string()),
            ..Default::default()
        };
        let hits = type_filter.apply(&pubs);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Overview");
    }

    #[test]
    fn test_blank_criteria_match_everything() {
        let pubs = vec![publication("Anything", None)];
        let filter = PubFilter {
            search: Some("   ".to_string()),
            author: Some(String::new()),
            type_label: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(filter.apply(&pubs).len(), 1);
    }

    #[test]
    fn test_group_by_year_streaming_runs() {
        let mut pubs = vec![
            publication("A", Some(2023)),
            publication("B", Some(2023)),
            publication("C", Some(2021)),
            publication("D", None),
        ];
        sort_by_year_desc(&mut pubs);

        let refs: Vec<&Publication> = pubs.iter().collect();
        let groups = group_by_year(&refs);

        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["2023", "2021", NO_YEAR_LABEL]);
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[2].items[0].title, "D");
    }
}
