use async_trait::async_trait;
use kb_core::{ArticleRecord, ArticleSource, Config, Result, UNKNOWN_MARKER};
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;
use super::{classify, utils};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleLink {
    pub title: String,
    pub url: String,
}

/// What an article page tells us beyond its link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticlePage {
    pub text: String,
    pub word_count: usize,
    pub has_screenshots: bool,
    pub has_video: bool,
    pub last_updated: String,
}

/// Scrapes a help center laid out as index -> categories -> articles.
#[derive(Debug, Clone)]
pub struct HelpCenterScraper {
    client: Client,
    base_url: Url,
    id_prefix: String,
    max_articles: Option<usize>,
}

impl HelpCenterScraper {
    pub fn new(base_url: Url, id_prefix: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            id_prefix: id_prefix.into(),
            max_articles: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.base_url()?, config.id_prefix.clone()).with_max_articles(config.max_articles))
    }

    pub fn with_max_articles(mut self, max_articles: Option<usize>) -> Self {
        self.max_articles = max_articles;
        self
    }

    async fn get(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        Ok(self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?)
    }

    fn next_id(&self, n: usize) -> String {
        format!("{}-{}", self.id_prefix, n)
    }
}

#[async_trait]
impl ArticleSource for HelpCenterScraper {
    fn name(&self) -> &str {
        self.base_url.host_str().unwrap_or("help center")
    }

    async fn fetch_all(&self) -> Result<Vec<ArticleRecord>> {
        let index = self.get(self.base_url.as_str()).await?;
        let categories = parse_categories(&index, &self.base_url)?;
        info!("Found {} categories at {}", categories.len(), self.base_url);

        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for category in categories {
            let listing = self.get(&category.url).await?;
            let links = parse_article_links(&listing, &self.base_url)?;
            debug!("{}: {} article link(s)", category.name, links.len());

            for link in links {
                if !seen.insert(link.url.clone()) {
                    continue;
                }
                let page = self.get(&link.url).await?;
                let Some(page) = parse_article_page(&page)? else {
                    warn!("No article body at {}, skipping", link.url);
                    continue;
                };

                let id = self.next_id(records.len() + 1);
                info!("{}: {}", id, link.title);
                records.push(ArticleRecord {
                    id,
                    content_type: classify(&link.title),
                    title: link.title,
                    category: category.name.clone(),
                    url: link.url,
                    last_updated: page.last_updated,
                    topics_covered: String::new(),
                    word_count: page.word_count,
                    has_screenshots: page.has_screenshots,
                    has_video: page.has_video,
                    gap_identified: String::new(),
                    text: page.text,
                });

                if self.max_articles.is_some_and(|max| records.len() >= max) {
                    info!("Reached the limit of {} articles", records.len());
                    return Ok(records);
                }
            }
        }

        Ok(records)
    }
}

/// Category links of the help-center index (`a.category`, name in its `h3`).
pub fn parse_categories(html: &str, base: &Url) -> Result<Vec<CategoryLink>> {
    let document = Html::parse_document(html);
    let link = utils::selector("a.category")?;
    let heading = utils::selector("h3")?;

    let mut categories = Vec::new();
    for element in document.select(&link) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let name = utils::first_text(&element, &heading).unwrap_or_else(|| utils::element_text(&element));
        categories.push(CategoryLink {
            name,
            url: utils::join_url(base, href)?,
        });
    }
    Ok(categories)
}

/// Article links of one category page (`ul.articleList a[href]`, title in its `span`).
pub fn parse_article_links(html: &str, base: &Url) -> Result<Vec<ArticleLink>> {
    let document = Html::parse_document(html);
    let list = utils::selector("ul.articleList")?;
    let link = utils::selector("a[href]")?;
    let span = utils::selector("span")?;

    let Some(list) = document.select(&list).next() else {
        return Ok(Vec::new());
    };

    let mut links = Vec::new();
    for element in list.select(&link) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let title = utils::first_text(&element, &span).unwrap_or_else(|| utils::element_text(&element));
        links.push(ArticleLink {
            title,
            url: utils::join_url(base, href)?,
        });
    }
    Ok(links)
}

/// Body statistics of an article page, `None` when it has no `<article>`.
pub fn parse_article_page(html: &str) -> Result<Option<ArticlePage>> {
    let document = Html::parse_document(html);
    let article = utils::selector("article")?;
    let image = utils::selector("img")?;
    let video = utils::selector("iframe, video")?;
    let updated = utils::selector("time.lu")?;

    let Some(body) = document.select(&article).next() else {
        return Ok(None);
    };

    let text = utils::element_text(&body);
    let last_updated = document
        .select(&updated)
        .next()
        .and_then(|time| time.value().attr("datetime"))
        .map(|datetime| datetime.trim().to_string())
        .filter(|datetime| !datetime.is_empty())
        .unwrap_or_else(|| UNKNOWN_MARKER.to_string());

    Ok(Some(ArticlePage {
        word_count: text.split_whitespace().count(),
        has_screenshots: body.select(&image).next().is_some(),
        has_video: body.select(&video).next().is_some(),
        last_updated,
        text,
    }))
}
