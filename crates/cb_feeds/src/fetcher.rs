use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use tracing::debug;

use cb_core::{Article, Error, Result};

use crate::feed::FeedSource;
use crate::html::{extract_image_from_html, strip_html};

const USER_AGENT: &str = "CampusBrief/1.0";

/// Fetches a syndication feed and normalizes its entries into unscored
/// article records.
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Fetch one feed. `fetch_date` is the pipeline's ingestion day and is
    /// stamped onto every returned article.
    pub async fn fetch(&self, feed: &FeedSource, fetch_date: NaiveDate) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(&feed.url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", feed.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "{} returned status {}",
                feed.url,
                response.status()
            )));
        }

        let content = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("{}: {}", feed.url, e)))?;

        let articles = parse_feed(&content, feed, fetch_date)?;
        debug!("Fetched {} items from {}", articles.len(), feed.name);
        Ok(articles)
    }
}

impl Default for FeedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a feed payload, trying RSS first and falling back to Atom.
pub fn parse_feed(content: &[u8], feed: &FeedSource, fetch_date: NaiveDate) -> Result<Vec<Article>> {
    if let Ok(channel) = rss::Channel::read_from(content) {
        return Ok(parse_rss_channel(&channel, feed, fetch_date));
    }

    if let Ok(atom_feed) = atom_syndication::Feed::read_from(content) {
        return Ok(parse_atom_feed(&atom_feed, feed, fetch_date));
    }

    Err(Error::Parse(format!("not a parseable feed: {}", feed.url)))
}

fn parse_rss_channel(channel: &rss::Channel, feed: &FeedSource, fetch_date: NaiveDate) -> Vec<Article> {
    channel
        .items()
        .iter()
        .filter_map(|item| {
            // Title and link are the minimum we can rank and link to.
            let title = item.title()?.trim().to_string();
            let link = item.link()?.trim().to_string();
            if title.is_empty() || link.is_empty() {
                return None;
            }

            let pub_date = item
                .pub_date()
                .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
                .map(|d| d.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);

            let description_html = item.description().unwrap_or_default();

            let image_url = item
                .enclosure()
                .filter(|e| e.mime_type().starts_with("image/"))
                .map(|e| e.url().to_string())
                .or_else(|| extract_image_from_html(description_html));

            let creator = item
                .dublin_core_ext()
                .and_then(|dc| dc.creators().first().cloned())
                .or_else(|| item.author().map(|a| a.to_string()))
                .unwrap_or_default();

            Some(new_article(
                link,
                item.guid().map(|g| g.value().to_string()),
                title,
                strip_html(description_html),
                item.content().map(strip_html),
                pub_date,
                creator,
                item.categories()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect(),
                image_url,
                feed,
                fetch_date,
            ))
        })
        .collect()
}

fn parse_atom_feed(
    atom_feed: &atom_syndication::Feed,
    feed: &FeedSource,
    fetch_date: NaiveDate,
) -> Vec<Article> {
    atom_feed
        .entries()
        .iter()
        .filter_map(|entry| {
            let title = entry.title().trim().to_string();
            let link = entry
                .links()
                .first()
                .map(|l| l.href().to_string())
                .unwrap_or_default();
            if title.is_empty() || link.is_empty() {
                return None;
            }

            let pub_date = entry
                .published()
                .copied()
                .unwrap_or_else(|| *entry.updated())
                .with_timezone(&Utc);

            let summary_html = entry.summary().map(|s| s.to_string()).unwrap_or_default();

            Some(new_article(
                link,
                Some(entry.id().to_string()),
                title,
                strip_html(&summary_html),
                entry
                    .content()
                    .and_then(|c| c.value())
                    .map(strip_html),
                pub_date,
                entry
                    .authors()
                    .first()
                    .map(|p| p.name().to_string())
                    .unwrap_or_default(),
                entry
                    .categories()
                    .iter()
                    .map(|c| c.term().to_string())
                    .collect(),
                extract_image_from_html(&summary_html),
                feed,
                fetch_date,
            ))
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn new_article(
    link: String,
    guid: Option<String>,
    title: String,
    description: String,
    content: Option<String>,
    pub_date: DateTime<Utc>,
    creator: String,
    categories: Vec<String>,
    image_url: Option<String>,
    feed: &FeedSource,
    fetch_date: NaiveDate,
) -> Article {
    Article {
        link,
        guid,
        title,
        description,
        content: content.filter(|c| !c.is_empty()),
        pub_date,
        creator,
        categories,
        image_url,
        source_name: feed.name.clone(),
        source_url: feed.site_url.clone(),
        relevance_score: 0.0,
        student_priority: false,
        ai_reasoning: String::new(),
        ai_categories: Vec::new(),
        ai_scored: false,
        scoring_error: false,
        fetch_date,
        daily_rank: None,
    }
}
