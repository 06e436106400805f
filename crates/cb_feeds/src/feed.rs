use serde::{Deserialize, Serialize};

/// One syndication feed the pipeline ingests from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSource {
    /// Name of the source, stored on every article it yields.
    pub name: String,
    /// RSS/Atom feed URL.
    pub url: String,
    /// Base URL of the publication.
    pub site_url: String,
}

impl FeedSource {
    pub fn new(name: &str, url: &str, site_url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            site_url: site_url.to_string(),
        }
    }
}

/// Curated feeds with regular coverage of topics that matter to students:
/// education policy, money, careers, housing, tech.
pub fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new(
            "BBC Education",
            "https://feeds.bbci.co.uk/news/education/rss.xml",
            "https://bbc.com",
        ),
        FeedSource::new(
            "Guardian Education",
            "https://www.theguardian.com/education/rss",
            "https://theguardian.com",
        ),
        FeedSource::new(
            "Guardian Money",
            "https://www.theguardian.com/money/rss",
            "https://theguardian.com",
        ),
        FeedSource::new(
            "NPR Education",
            "https://feeds.npr.org/1013/rss.xml",
            "https://npr.org",
        ),
        FeedSource::new(
            "Times Higher Education",
            "https://www.timeshighereducation.com/feed",
            "https://timeshighereducation.com",
        ),
        FeedSource::new(
            "MIT Technology Review",
            "https://www.technologyreview.com/feed/",
            "https://technologyreview.com",
        ),
    ]
}
