//! Rendering issues as posts
//!
//! A post reads `"{title} {url} {hashtags}"`. The posting API counts every
//! URL as [`URL_WEIGHT`] characters regardless of its real length, and every
//! other character as 1 or 2 (see [`char_weight`]), so the budget below is a
//! weighted length rather than a character count.

use url::Url;

use crate::{Error, Issue, Result};

/// Maximum weighted length of a post
pub const MAX_POST_LEN: usize = 280;

/// Weight of any URL in a post (t.co wrapping)
pub const URL_WEIGHT: usize = 23;

/// Code point ranges counted as a single character; everything else counts 2
const LIGHT_RANGES: [(u32, u32); 4] = [
    (0x0000, 0x10FF),
    (0x2000, 0x200D),
    (0x2010, 0x201F),
    (0x2032, 0x2037),
];

/// Below this title weight, language hashtags are dropped to make room
const MIN_TITLE_CHARS: usize = 20;

const ELLIPSIS: char = '…';

/// Turn a REST issue URL into the URL people open in a browser
///
/// `https://api.github.com/repos/{owner}/{repo}/issues/{n}` becomes
/// `https://github.com/{owner}/{repo}/issues/{n}`. Anything else means the
/// API changed shape under us.
pub fn humanize_url(api_url: &str) -> Result<String> {
    let malformed = || Error::Malformed(format!("Format of API URLs has changed: {}", api_url));

    let url = Url::parse(api_url).map_err(|_| malformed())?;
    if url.host_str() != Some("api.github.com") {
        return Err(malformed());
    }

    let segments: Vec<&str> = url.path_segments().ok_or_else(malformed)?.collect();
    match segments.as_slice() {
        ["repos", owner, repo, "issues", number]
            if !owner.is_empty() && !repo.is_empty() && number.parse::<u64>().is_ok() =>
        {
            Ok(format!(
                "https://github.com/{}/{}/issues/{}",
                owner, repo, number
            ))
        }
        _ => Err(malformed()),
    }
}

/// Composes post text for issues
#[derive(Debug, Clone)]
pub struct PostFormatter {
    hashtags: Vec<String>,
    max_language_tags: usize,
}

impl PostFormatter {
    /// Create a formatter
    ///
    /// `hashtags` are given without the leading `#`.
    pub fn new(hashtags: &[String], max_language_tags: usize) -> Self {
        Self {
            hashtags: hashtags
                .iter()
                .filter_map(|t| sanitize_tag(t))
                .map(|t| format!("#{}", t))
                .collect(),
            max_language_tags,
        }
    }

    /// Compose the post for `issue`
    pub fn compose(&self, issue: &Issue) -> Result<String> {
        let url = humanize_url(&issue.api_url)?;
        let title = normalize_title(&issue.title);

        let mut all_tags = self.hashtags.clone();
        for tag in self.language_tags(&issue.languages) {
            if !all_tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                all_tags.push(tag);
            }
        }

        let with_languages = all_tags.join(" ");
        let base_only = self.hashtags.join(" ");

        if let Some(room) = title_room(&with_languages) {
            if room >= MIN_TITLE_CHARS || text_weight(&title) <= room {
                return Ok(render(&title, room, &url, &with_languages));
            }
        }

        if let Some(room) = title_room(&base_only) {
            return Ok(render(&title, room, &url, &base_only));
        }

        Err(Error::Config(format!(
            "Hashtags '{}' leave no room for an issue title",
            base_only
        )))
    }

    fn language_tags(&self, languages: &[String]) -> Vec<String> {
        languages
            .iter()
            .filter_map(|l| sanitize_tag(l))
            .take(self.max_language_tags)
            .map(|l| format!("#{}", l))
            .collect()
    }
}

/// Weight of one character as the posting API counts it
fn char_weight(c: char) -> usize {
    let code = u32::from(c);
    if LIGHT_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&code))
    {
        1
    } else {
        2
    }
}

fn text_weight(text: &str) -> usize {
    text.chars().map(char_weight).sum()
}

/// Weighted length of a post produced by this module
fn weighted_len(title: &str, tags: &str) -> usize {
    let tags_len = if tags.is_empty() {
        0
    } else {
        text_weight(tags) + 1
    };
    text_weight(title) + 1 + URL_WEIGHT + tags_len
}

/// Weight left for the title once the URL and `tags` are placed
fn title_room(tags: &str) -> Option<usize> {
    let fixed = weighted_len("", tags);
    // at least one character plus the ellipsis
    MAX_POST_LEN.checked_sub(fixed).filter(|room| *room >= 2)
}

fn render(title: &str, room: usize, url: &str, tags: &str) -> String {
    let title = truncate(title, room);
    if tags.is_empty() {
        format!("{} {}", title, url)
    } else {
        format!("{} {} {}", title, url, tags)
    }
}

/// Cut `title` to at most `max_weight`, ending in an ellipsis when shortened
fn truncate(title: &str, max_weight: usize) -> String {
    if text_weight(title) <= max_weight {
        return title.to_string();
    }

    let budget = max_weight.saturating_sub(char_weight(ELLIPSIS));
    let mut used = 0;
    let mut cut: String = title
        .chars()
        .take_while(|c| {
            used += char_weight(*c);
            used <= budget
        })
        .collect();
    cut.truncate(cut.trim_end().len());
    cut.push(ELLIPSIS);
    cut
}

fn normalize_title(title: &str) -> String {
    let joined = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        "Untitled issue".to_string()
    } else {
        joined
    }
}

/// Keep only ASCII alphanumerics; `None` when nothing survives
fn sanitize_tag(raw: &str) -> Option<String> {
    let clean: String = raw
        .trim_start_matches('#')
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    (!clean.is_empty()).then_some(clean)
}
