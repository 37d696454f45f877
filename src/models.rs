use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Article {
    pub url: String,
    pub title: String,
    pub image: String,
    pub alt: String,
    /// Absent on failed scrapes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapo: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScrapeResponse {
    pub articles: Vec<Article>,
}
