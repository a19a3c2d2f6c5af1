//! Prompt builders. Every prompt asks for a bare JSON object so the reply can
//! go straight to [`crate::parse`].

use kb_core::{ArticleRecord, Gap};
use std::fmt::Write;

const ROLE: &str = "Act as a Senior Technical Writer and QA Auditor.";

pub fn enrichment(batch: &[ArticleRecord]) -> String {
    let mut articles = String::new();
    for article in batch {
        let _ = writeln!(
            articles,
            "ID: {} | Title: {} | Content: {}",
            article.id, article.title, article.text
        );
    }

    format!(
        r#"{ROLE} For each article provided, perform two distinct tasks:

1. Extract 4 key technical topics (e.g. JIRA Cloud, API, API Token, Webhooks).

2. Identify ONE specific 'Documentation Gap': a missing piece of critical information
a user would need based on the article's title (e.g. an article named 'API errors'
without API error codes has the gap 'Missing API error codes'). Keep it under 80
characters. If no gap is found, return 'None identified'.

Return ONLY a JSON object whose keys are the article ids and whose values hold
'topics' and 'gap'.
Example: {{"KB-1": {{"topics": "JIRA, Mapping", "gap": "Missing API token generation steps"}}}}

Articles:
{articles}"#
    )
}

pub fn global_gaps(catalog: &[ArticleRecord], count: usize) -> String {
    let mut summary = String::new();
    for article in catalog {
        let _ = writeln!(
            summary,
            "{} | {} | {} | {}",
            article.id, article.category, article.title, article.gap_identified
        );
    }

    format!(
        r#"{ROLE} Below is the catalog of a product help center, one article per line
(id | category | title | gap identified for that article).

{summary}
Identify {count} Global Documentation Gaps. These are not about single articles but
about the documentation as a whole: undocumented major features (API, security,
integrations), common user questions without an answer, and material that
comparable products document and this one does not. A topic missing from several
articles may be a global gap, but do not rely on the per-article gaps alone.

Return ONLY a JSON object with a list called 'global_gaps'. Each entry must have:
- "Gap ID": G-001 format
- "Category": e.g. Integrations, Security, Onboarding, Developer, API
- "Gap Description": 1-2 sentences
- "Priority": High, Medium or Low
- "Suggested Article Title"
- "Rationale": why users need this article"#
    )
}

pub fn deep_dive(gaps: &[Gap], n: usize) -> String {
    let mut summary = String::new();
    for gap in gaps {
        let _ = writeln!(
            summary,
            "{} | {} | {} | {} | {} | {}",
            gap.gap_id, gap.category, gap.description, gap.priority, gap.suggested_title, gap.rationale
        );
    }

    format!(
        r#"{ROLE} Below are the most important documentation gaps of a product help
center (id | category | description | priority | suggested title | rationale).

{summary}
1. Select the TOP {n} gaps with the highest priority and business impact (blocked
   sales, churn, customer confusion). Pick the most important, not the first ones.
2. Explain why these were chosen over the others and why they matter to customers.
3. Write an article outline for each: title (from the data), goal, key sections and
   a brief introduction.

Return ONLY a JSON object with a list called 'deep_dive' containing exactly {n} objects,
each with "Gap ID", "Selection Rationale" and "Article Outline" (a single string)."#
    )
}
