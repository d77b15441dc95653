//! Book catalog lookup
//!
//! Fetches title/author/page metadata and cover URLs from two public
//! providers: Hardcover (GraphQL, primary) and Open Library (REST,
//! secondary). A provider failure falls through to the next one; results
//! are normalized into one shape regardless of where they came from.
//!
//! An `Err` means every provider failed, which is distinct from an `Ok`
//! empty list (the providers answered and genuinely found nothing).

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Fetch timeout in seconds
const FETCH_TIMEOUT: u64 = 10;
/// Cap on search results per provider
const RESULT_LIMIT: usize = 20;

const HARDCOVER_URL: &str = "https://api.hardcover.app/v1/graphql";
const OPEN_LIBRARY_URL: &str = "https://openlibrary.org";

/// Which provider produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Hardcover,
    OpenLibrary,
}

impl Provider {
    pub fn label(&self) -> &'static str {
        match self {
            Provider::Hardcover => "Hardcover",
            Provider::OpenLibrary => "Open Library",
        }
    }
}

/// Catalog lookup failures
#[derive(Error, Debug)]
pub enum LookupError {
    /// One provider failed (network or non-OK response)
    #[error("{provider} request failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Every provider failed; "not found" rather than "confirmed empty"
    #[error("All catalog providers failed")]
    AllProvidersFailed,
}

/// Unified result shape across providers
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogBook {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub pages: u32,
    pub description: String,
    pub isbn: String,
    pub publisher: String,
    pub cover_url: String,
    pub source: Provider,
}

/// Client querying the catalog providers in fallback order
pub struct CatalogClient {
    http: reqwest::Client,
}

impl CatalogClient {
    pub fn new() -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT))
            .user_agent("Mozilla/5.0 (compatible; Shelfwise/0.4)")
            .build()
            .map_err(|e| LookupError::Provider {
                provider: "http",
                message: e.to_string(),
            })?;
        Ok(Self { http })
    }

    /// Search by title, primary provider first, capped at 20 results
    pub async fn search(&self, query: &str) -> Result<Vec<CatalogBook>, LookupError> {
        let mut confirmed_empty = false;

        match self.search_hardcover(query).await {
            Ok(results) if !results.is_empty() => return Ok(results),
            Ok(_) => confirmed_empty = true,
            Err(err) => warn!("Hardcover search failed: {}", err),
        }

        match self.search_open_library(query).await {
            Ok(results) if !results.is_empty() => Ok(results),
            Ok(_) => Ok(Vec::new()),
            Err(err) => {
                warn!("Open Library search failed: {}", err);
                if confirmed_empty {
                    Ok(Vec::new())
                } else {
                    Err(LookupError::AllProvidersFailed)
                }
            }
        }
    }

    /// Look a single book up by ISBN, primary provider first
    pub async fn lookup_isbn(&self, isbn: &str) -> Result<Option<CatalogBook>, LookupError> {
        let mut confirmed_missing = false;

        match self.lookup_isbn_hardcover(isbn).await {
            Ok(Some(book)) => return Ok(Some(book)),
            Ok(None) => confirmed_missing = true,
            Err(err) => warn!("Hardcover ISBN lookup failed: {}", err),
        }

        match self.lookup_isbn_open_library(isbn).await {
            Ok(found) => Ok(found),
            Err(err) => {
                warn!("Open Library ISBN lookup failed: {}", err);
                if confirmed_missing {
                    Ok(None)
                } else {
                    Err(LookupError::AllProvidersFailed)
                }
            }
        }
    }

    async fn search_hardcover(&self, query: &str) -> Result<Vec<CatalogBook>, LookupError> {
        let graphql = format!(
            "query SearchBooks($q: String!) {{\n\
             books(where: {{title: {{_ilike: $q}}}}, order_by: {{users_count: desc}}, limit: {}) {{\n\
             id title\n\
             contributions {{ author {{ name }} }}\n\
             default_physical_edition {{ isbn_13 isbn_10 pages_count image {{ url }} publisher {{ name }} }}\n\
             cached_image {{ url }}\n\
             description\n\
             }}\n}}",
            RESULT_LIMIT
        );
        let body = json!({
            "query": graphql,
            "variables": { "q": format!("%{}%", query) },
        });
        let text = self.post_json(HARDCOVER_URL, &body, "Hardcover").await?;
        parse_hardcover(&text)
    }

    async fn lookup_isbn_hardcover(&self, isbn: &str) -> Result<Option<CatalogBook>, LookupError> {
        let graphql = format!(
            "query {{ books(where: {{default_physical_edition: {{isbn_13: {{_eq: \"{}\"}}}}}}, limit: 1) {{\n\
             id title\n\
             contributions {{ author {{ name }} }}\n\
             default_physical_edition {{ isbn_13 isbn_10 pages_count image {{ url }} publisher {{ name }} }}\n\
             cached_image {{ url }}\n\
             description\n\
             }} }}",
            isbn.replace('"', "")
        );
        let body = json!({ "query": graphql });
        let text = self.post_json(HARDCOVER_URL, &body, "Hardcover").await?;
        Ok(parse_hardcover(&text)?.into_iter().next())
    }

    async fn search_open_library(&self, query: &str) -> Result<Vec<CatalogBook>, LookupError> {
        let url = format!(
            "{}/search.json?q={}&limit={}&fields=key,title,author_name,isbn,number_of_pages_median,subject,publisher,cover_i",
            OPEN_LIBRARY_URL,
            urlencode(query),
            RESULT_LIMIT
        );
        let text = self.get_text(&url, "Open Library").await?;
        parse_open_library_search(&text)
    }

    async fn lookup_isbn_open_library(&self, isbn: &str) -> Result<Option<CatalogBook>, LookupError> {
        let url = format!("{}/isbn/{}.json", OPEN_LIBRARY_URL, urlencode(isbn));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| provider_err("Open Library", e))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LookupError::Provider {
                provider: "Open Library",
                message: format!("HTTP {}", response.status()),
            });
        }
        let text = response.text().await.map_err(|e| provider_err("Open Library", e))?;
        Ok(parse_open_library_isbn(&text, isbn)?)
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        provider: &'static str,
    ) -> Result<String, LookupError> {
        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| provider_err(provider, e))?;
        if !response.status().is_success() {
            return Err(LookupError::Provider {
                provider,
                message: format!("HTTP {}", response.status()),
            });
        }
        response.text().await.map_err(|e| provider_err(provider, e))
    }

    async fn get_text(&self, url: &str, provider: &'static str) -> Result<String, LookupError> {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| provider_err(provider, e))?;
        if !response.status().is_success() {
            return Err(LookupError::Provider {
                provider,
                message: format!("HTTP {}", response.status()),
            });
        }
        response.text().await.map_err(|e| provider_err(provider, e))
    }
}

fn provider_err(provider: &'static str, err: impl std::fmt::Display) -> LookupError {
    LookupError::Provider {
        provider,
        message: err.to_string(),
    }
}

/// Minimal percent-encoding for query values
fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

// ---- Hardcover response shape ----

#[derive(Deserialize)]
struct HardcoverResponse {
    data: Option<HardcoverData>,
}

#[derive(Deserialize)]
struct HardcoverData {
    #[serde(default)]
    books: Vec<HardcoverBook>,
}

#[derive(Deserialize)]
struct HardcoverBook {
    id: Option<serde_json::Value>,
    title: Option<String>,
    #[serde(default)]
    contributions: Vec<HardcoverContribution>,
    default_physical_edition: Option<HardcoverEdition>,
    cached_image: Option<HardcoverImage>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct HardcoverContribution {
    author: Option<HardcoverAuthor>,
}

#[derive(Deserialize)]
struct HardcoverAuthor {
    name: Option<String>,
}

#[derive(Deserialize)]
struct HardcoverEdition {
    isbn_13: Option<String>,
    isbn_10: Option<String>,
    pages_count: Option<u32>,
    image: Option<HardcoverImage>,
    publisher: Option<HardcoverPublisher>,
}

#[derive(Deserialize)]
struct HardcoverImage {
    url: Option<String>,
}

#[derive(Deserialize)]
struct HardcoverPublisher {
    name: Option<String>,
}

/// Map a Hardcover GraphQL response to the unified shape
fn parse_hardcover(body: &str) -> Result<Vec<CatalogBook>, LookupError> {
    let response: HardcoverResponse =
        serde_json::from_str(body).map_err(|e| provider_err("Hardcover", e))?;
    let books = response.data.map(|d| d.books).unwrap_or_default();
    Ok(books
        .into_iter()
        .map(|book| {
            let edition = book.default_physical_edition;
            let author = book
                .contributions
                .iter()
                .filter_map(|c| c.author.as_ref().and_then(|a| a.name.clone()))
                .collect::<Vec<_>>()
                .join(", ");
            let id = match book.id {
                Some(serde_json::Value::Number(n)) => n.to_string(),
                Some(serde_json::Value::String(s)) => s,
                _ => String::new(),
            };
            let cover_url = book
                .cached_image
                .and_then(|i| i.url)
                .or_else(|| {
                    edition
                        .as_ref()
                        .and_then(|e| e.image.as_ref().and_then(|i| i.url.clone()))
                })
                .unwrap_or_default();
            let isbn = edition
                .as_ref()
                .and_then(|e| e.isbn_13.clone().or_else(|| e.isbn_10.clone()))
                .unwrap_or_else(|| id.clone());
            CatalogBook {
                title: book.title.unwrap_or_else(|| "Unknown Title".to_string()),
                author: if author.is_empty() {
                    "Unknown".to_string()
                } else {
                    author
                },
                genre: String::new(),
                pages: edition.as_ref().and_then(|e| e.pages_count).unwrap_or(0),
                description: book.description.unwrap_or_default(),
                isbn,
                publisher: edition
                    .and_then(|e| e.publisher.and_then(|p| p.name))
                    .unwrap_or_default(),
                cover_url,
                id,
                source: Provider::Hardcover,
            }
        })
        .collect())
}

// ---- Open Library response shape ----

#[derive(Deserialize)]
struct OpenLibrarySearchResponse {
    #[serde(default)]
    docs: Vec<OpenLibraryDoc>,
}

#[derive(Deserialize)]
struct OpenLibraryDoc {
    key: Option<String>,
    title: Option<String>,
    #[serde(default)]
    author_name: Vec<String>,
    #[serde(default)]
    isbn: Vec<String>,
    number_of_pages_median: Option<u32>,
    #[serde(default)]
    subject: Vec<String>,
    #[serde(default)]
    publisher: Vec<String>,
    cover_i: Option<i64>,
}

/// Map an Open Library search response to the unified shape
fn parse_open_library_search(body: &str) -> Result<Vec<CatalogBook>, LookupError> {
    let response: OpenLibrarySearchResponse =
        serde_json::from_str(body).map_err(|e| provider_err("Open Library", e))?;
    Ok(response
        .docs
        .into_iter()
        .map(|doc| {
            let isbn = doc.isbn.first().cloned().unwrap_or_default();
            let cover_url = match doc.cover_i {
                Some(cover_id) => format!("https://covers.openlibrary.org/b/id/{}-L.jpg", cover_id),
                None if !isbn.is_empty() => {
                    format!("https://covers.openlibrary.org/b/isbn/{}-L.jpg", isbn)
                }
                None => String::new(),
            };
            let author = doc.author_name.join(", ");
            CatalogBook {
                id: doc.key.unwrap_or_else(|| isbn.clone()),
                title: doc.title.unwrap_or_else(|| "Unknown Title".to_string()),
                author: if author.is_empty() {
                    "Unknown".to_string()
                } else {
                    author
                },
                genre: doc.subject.iter().take(2).cloned().collect::<Vec<_>>().join(", "),
                pages: doc.number_of_pages_median.unwrap_or(0),
                description: String::new(),
                isbn,
                publisher: doc.publisher.first().cloned().unwrap_or_default(),
                cover_url,
                source: Provider::OpenLibrary,
            }
        })
        .collect())
}

#[derive(Deserialize)]
struct OpenLibraryEdition {
    title: Option<String>,
    number_of_pages: Option<u32>,
    #[serde(default)]
    publishers: Vec<String>,
    #[serde(default)]
    covers: Vec<i64>,
}

/// Map an Open Library edition document to the unified shape
fn parse_open_library_isbn(body: &str, isbn: &str) -> Result<Option<CatalogBook>, LookupError> {
    let edition: OpenLibraryEdition =
        serde_json::from_str(body).map_err(|e| provider_err("Open Library", e))?;
    let cover_url = match edition.covers.first() {
        Some(cover_id) => format!("https://covers.openlibrary.org/b/id/{}-L.jpg", cover_id),
        None => format!("https://covers.openlibrary.org/b/isbn/{}-L.jpg", isbn),
    };
    Ok(Some(CatalogBook {
        id: isbn.to_string(),
        title: edition
            .title
            .unwrap_or_else(|| "Unknown Title".to_string()),
        author: "Unknown".to_string(),
        genre: String::new(),
        pages: edition.number_of_pages.unwrap_or(0),
        description: String::new(),
        isbn: isbn.to_string(),
        publisher: edition.publishers.first().cloned().unwrap_or_default(),
        cover_url,
        source: Provider::OpenLibrary,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hardcover_full() {
        let body = r#"{
            "data": { "books": [{
                "id": 123,
                "title": "Dune",
                "contributions": [{"author": {"name": "Frank Herbert"}}],
                "default_physical_edition": {
                    "isbn_13": "9780441013593",
                    "isbn_10": "0441013597",
                    "pages_count": 412,
                    "image": {"url": "https://img.example/edition.jpg"},
                    "publisher": {"name": "Ace"}
                },
                "cached_image": {"url": "https://img.example/cached.jpg"},
                "description": "Spice and sandworms"
            }]}
        }"#;
        let books = parse_hardcover(body).unwrap();
        assert_eq!(books.len(), 1);
        let book = &books[0];
        assert_eq!(book.title, "Dune");
        assert_eq!(book.author, "Frank Herbert");
        assert_eq!(book.pages, 412);
        assert_eq!(book.isbn, "9780441013593");
        assert_eq!(book.publisher, "Ace");
        // Cached image wins over the edition image
        assert_eq!(book.cover_url, "https://img.example/cached.jpg");
        assert_eq!(book.source, Provider::Hardcover);
    }

    #[test]
    fn test_parse_hardcover_sparse() {
        let body = r#"{"data": {"books": [{"id": 7, "title": "Mystery"}]}}"#;
        let books = parse_hardcover(body).unwrap();
        assert_eq!(books[0].author, "Unknown");
        assert_eq!(books[0].pages, 0);
        // Falls back to the provider id when no ISBN exists
        assert_eq!(books[0].isbn, "7");
    }

    #[test]
    fn test_parse_hardcover_empty_and_garbage() {
        assert!(parse_hardcover(r#"{"data": {"books": []}}"#).unwrap().is_empty());
        assert!(parse_hardcover(r#"{}"#).unwrap().is_empty());
        assert!(parse_hardcover("<html>").is_err());
    }

    #[test]
    fn test_parse_open_library_search() {
        let body = r#"{
            "docs": [{
                "key": "/works/OL893415W",
                "title": "Dune",
                "author_name": ["Frank Herbert"],
                "isbn": ["9780441013593", "0441013597"],
                "number_of_pages_median": 412,
                "subject": ["Science fiction", "Deserts", "Politics"],
                "publisher": ["Ace"],
                "cover_i": 12345
            }]
        }"#;
        let books = parse_open_library_search(body).unwrap();
        let book = &books[0];
        assert_eq!(book.id, "/works/OL893415W");
        assert_eq!(book.author, "Frank Herbert");
        // First ISBN wins; first two subjects become the genre hint
        assert_eq!(book.isbn, "9780441013593");
        assert_eq!(book.genre, "Science fiction, Deserts");
        assert_eq!(
            book.cover_url,
            "https://covers.openlibrary.org/b/id/12345-L.jpg"
        );
        assert_eq!(book.source, Provider::OpenLibrary);
    }

    #[test]
    fn test_parse_open_library_isbn_cover_fallback() {
        let body = r#"{"title": "Dune", "number_of_pages": 412, "publishers": ["Ace"]}"#;
        let book = parse_open_library_isbn(body, "9780441013593")
            .unwrap()
            .unwrap();
        assert_eq!(book.title, "Dune");
        // No cover id: fall back to the by-ISBN cover URL
        assert_eq!(
            book.cover_url,
            "https://covers.openlibrary.org/b/isbn/9780441013593-L.jpg"
        );
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("dune messiah"), "dune+messiah");
        assert_eq!(urlencode("a&b"), "a%26b");
        assert_eq!(urlencode("safe-chars_ok.~"), "safe-chars_ok.~");
    }
}
