use crate::musicbrainz::{MbGenre, Release};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub name: String,
    pub count: u32,
}

/// Where in a release document a genre list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenreSource {
    Release,
    ReleaseGroup,
    Artists,
}

impl GenreSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::ReleaseGroup => "release_group",
            Self::Artists => "artists",
        }
    }
}

impl fmt::Display for GenreSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GenreSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "release" => Ok(Self::Release),
            "release_group" | "release-group" => Ok(Self::ReleaseGroup),
            "artists" | "artist" => Ok(Self::Artists),
            other => Err(format!(
                "unknown genre source '{other}' (expected release, release_group or artists)"
            )),
        }
    }
}

/// Genre lists of one release, one per source.
#[derive(Debug, Default)]
pub struct GenreCollection {
    pub release: Vec<Genre>,
    pub release_group: Vec<Genre>,
    pub artists: Vec<Genre>,
}

impl GenreCollection {
    pub fn get(&self, source: GenreSource) -> &[Genre] {
        match source {
            GenreSource::Release => &self.release,
            GenreSource::ReleaseGroup => &self.release_group,
            GenreSource::Artists => &self.artists,
        }
    }

    pub fn set(&mut self, source: GenreSource, genres: Vec<Genre>) {
        match source {
            GenreSource::Release => self.release = genres,
            GenreSource::ReleaseGroup => self.release_group = genres,
            GenreSource::Artists => self.artists = genres,
        }
    }

    /// Most-voted genres first. Stable, so ties keep document order.
    pub fn sort(&mut self) {
        for list in [
            &mut self.release,
            &mut self.release_group,
            &mut self.artists,
        ] {
            list.sort_by(|a, b| b.count.cmp(&a.count));
        }
    }
}

fn parse_genre_list(list: &[MbGenre]) -> Vec<Genre> {
    list.iter()
        .map(|g| Genre {
            name: g.name.trim().to_string(),
            count: g.count,
        })
        .collect()
}

pub fn genres_for_source(release: &Release, source: GenreSource) -> Vec<Genre> {
    match source {
        GenreSource::Release => parse_genre_list(&release.genres),
        GenreSource::ReleaseGroup => release
            .release_group
            .as_ref()
            .map(|rg| parse_genre_list(&rg.genres))
            .unwrap_or_default(),
        GenreSource::Artists => release
            .artist_credit
            .iter()
            .filter_map(|credit| credit.artist.as_ref())
            .flat_map(|artist| parse_genre_list(&artist.genres))
            .collect(),
    }
}

/// Merge the genre lists of `release` in `source_order` priority into a
/// list of unique names.
pub fn rank_genres(release: &Release, source_order: &[GenreSource]) -> Vec<String> {
    let mut collection = GenreCollection::default();
    for &source in source_order {
        collection.set(source, genres_for_source(release, source));
    }
    collection.sort();

    let mut seen_sources = HashSet::new();
    let mut seen_names = HashSet::new();
    let mut names = Vec::new();

    for &source in source_order {
        if !seen_sources.insert(source) {
            continue;
        }
        for genre in collection.get(source) {
            if seen_names.insert(genre.name.as_str()) {
                names.push(genre.name.clone());
            }
        }
    }

    names
}

#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Zero keeps every genre.
    pub max_genres: usize,
    pub separator: String,
    pub title_case: bool,
}

pub fn format_genres(names: &[String], options: &FormatOptions) -> String {
    let limit = if options.max_genres == 0 {
        names.len()
    } else {
        options.max_genres
    };

    names
        .iter()
        .take(limit)
        .map(|name| {
            if options.title_case {
                title_case(name)
            } else {
                name.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(&options.separator)
}

/// Titlecase every cased letter that follows an uncased character,
/// lowercase the cased letters after it. Uncased letters (CJK, digits)
/// end a word like punctuation does.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut after_cased = false;

    for c in s.chars() {
        if after_cased {
            out.extend(c.to_lowercase());
        } else if let Some(title) = titlecase_form(c) {
            out.push(title);
        } else {
            // Multi-char uppercase forms ("ß" -> "SS") titlecase as "Ss".
            let mut upper = c.to_uppercase();
            if let Some(first) = upper.next() {
                out.push(first);
                out.extend(upper.flat_map(char::to_lowercase));
            }
        }
        after_cased = is_cased(c);
    }

    out
}

fn is_cased(c: char) -> bool {
    c.is_lowercase() || c.is_uppercase() || titlecase_form(c).is_some()
}

/// Letters whose titlecase differs from their uppercase: the Latin digraphs
/// and the Greek vowels with iota subscript.
fn titlecase_form(c: char) -> Option<char> {
    let title = match c as u32 {
        0x01C4..=0x01C6 => 0x01C5,
        0x01C7..=0x01C9 => 0x01C8,
        0x01CA..=0x01CC => 0x01CB,
        0x01F1..=0x01F3 => 0x01F2,
        cp @ (0x1F80..=0x1F87 | 0x1F90..=0x1F97 | 0x1FA0..=0x1FA7) => cp + 8,
        cp @ (0x1F88..=0x1F8F | 0x1F98..=0x1F9F | 0x1FA8..=0x1FAF) => cp,
        0x1FB3 | 0x1FBC => 0x1FBC,
        0x1FC3 | 0x1FCC => 0x1FCC,
        0x1FF3 | 0x1FFC => 0x1FFC,
        _ => return None,
    };
    char::from_u32(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn release(value: serde_json::Value) -> Release {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> Release {
        release(json!({
            "id": "b84ee12a-09ef-421b-82de-0441a926375b",
            "title": "Under Tangled Silence",
            "genres": [
                {"name": "electronic", "count": 1},
                {"name": " ambient ", "count": 4}
            ],
            "release-group": {
                "genres": [
                    {"name": "idm", "count": 2},
                    {"name": "electronic", "count": 7},
                    {"name": "jungle", "count": 2}
                ]
            },
            "artist-credit": [
                {"name": "Djrum", "artist": {"name": "Djrum", "genres": [
                    {"name": "breakbeat", "count": 1},
                    {"name": "dubstep", "count": 3}
                ]}},
                {"name": "Lafawndah", "artist": {"name": "Lafawndah", "genres": [
                    {"name": "art pop", "count": 5}
                ]}}
            ]
        }))
    }

    fn options(max_genres: usize) -> FormatOptions {
        FormatOptions {
            max_genres,
            separator: ", ".to_string(),
            title_case: false,
        }
    }

    #[test]
    fn parses_each_source() {
        let release = sample();

        let own = genres_for_source(&release, GenreSource::Release);
        assert_eq!(own[1].name, "ambient");
        assert_eq!(own[1].count, 4);

        let group = genres_for_source(&release, GenreSource::ReleaseGroup);
        assert_eq!(group.len(), 3);

        let artists: Vec<_> = genres_for_source(&release, GenreSource::Artists)
            .into_iter()
            .map(|g| g.name)
            .collect();
        assert_eq!(artists, vec!["breakbeat", "dubstep", "art pop"]);
    }

    #[test]
    fn missing_sections_are_empty() {
        let release = release(json!({"id": "x"}));
        for source in [
            GenreSource::Release,
            GenreSource::ReleaseGroup,
            GenreSource::Artists,
        ] {
            assert!(genres_for_source(&release, source).is_empty());
        }
    }

    #[test]
    fn missing_count_is_zero() {
        let release = release(json!({"genres": [{"name": "techno"}]}));
        assert_eq!(genres_for_source(&release, GenreSource::Release)[0].count, 0);
    }

    #[test]
    fn ranks_by_source_order_then_count() {
        let ranked = rank_genres(
            &sample(),
            &[
                GenreSource::Release,
                GenreSource::ReleaseGroup,
                GenreSource::Artists,
            ],
        );
        assert_eq!(
            ranked,
            vec![
                "ambient",
                "electronic",
                "idm",
                "jungle",
                "art pop",
                "dubstep",
                "breakbeat"
            ]
        );
    }

    #[test]
    fn artist_genres_sorted_across_credits() {
        let ranked = rank_genres(&sample(), &[GenreSource::Artists]);
        assert_eq!(ranked, vec!["art pop", "dubstep", "breakbeat"]);
    }

    #[test]
    fn equal_counts_keep_document_order() {
        let ranked = rank_genres(&sample(), &[GenreSource::ReleaseGroup]);
        assert_eq!(ranked, vec!["electronic", "idm", "jungle"]);
    }

    #[test]
    fn unlisted_sources_are_ignored() {
        let ranked = rank_genres(&sample(), &[GenreSource::ReleaseGroup, GenreSource::Release]);
        assert_eq!(ranked, vec!["electronic", "idm", "jungle", "ambient"]);
    }

    #[test]
    fn repeated_source_counts_once() {
        let ranked = rank_genres(&sample(), &[GenreSource::Release, GenreSource::Release]);
        assert_eq!(ranked, vec!["ambient", "electronic"]);
    }

    #[test]
    fn truncates_and_joins() {
        let names: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(format_genres(&names, &options(2)), "a, b");
        assert_eq!(format_genres(&names, &options(0)), "a, b, c");
        assert_eq!(format_genres(&names, &options(10)), "a, b, c");
        assert_eq!(format_genres(&[], &options(5)), "");
    }

    #[test]
    fn custom_separator_and_title_case() {
        let names = vec!["hip hop".to_string(), "drum and bass".to_string()];
        let opts = FormatOptions {
            max_genres: 5,
            separator: "; ".to_string(),
            title_case: true,
        };
        assert_eq!(format_genres(&names, &opts), "Hip Hop; Drum And Bass");
    }

    #[test]
    fn title_case_follows_non_letters() {
        assert_eq!(title_case("rock'n'roll"), "Rock'N'Roll");
        assert_eq!(title_case("UK garage"), "Uk Garage");
        assert_eq!(title_case("lo-fi"), "Lo-Fi");
        assert_eq!(title_case("80s pop"), "80S Pop");
    }

    #[test]
    fn title_case_uses_cased_letters_and_titlecase_forms() {
        assert_eq!(title_case("日本rock"), "日本Rock");
        assert_eq!(title_case("ǆazz"), "ǅazz");
        assert_eq!(title_case("ǄAZZ FUSION"), "ǅazz Fusion");
        assert_eq!(title_case("ßass"), "Ssass");
        assert_eq!(title_case("ﬀolk"), "Ffolk");
        assert_eq!(title_case("ΕΛΛΗΝΙΚΟ ροκ"), "Ελληνικο Ροκ");
    }

    #[test]
    fn parses_source_names() {
        assert_eq!("release_group".parse::<GenreSource>(), Ok(GenreSource::ReleaseGroup));
        assert_eq!(" artists".parse::<GenreSource>(), Ok(GenreSource::Artists));
        assert!("label".parse::<GenreSource>().is_err());
    }
}
