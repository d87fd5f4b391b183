//! Handler tests for the catalog domain
//!
//! Exercise the HTTP layer end to end against in-memory stores, a file blob
//! store in a temp dir, and a keyword embedder standing in for the models:
//! - Request parsing (query params, JSON, multipart)
//! - Response bodies and status codes
//! - Partial ingestion visibility

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use domain_catalog::index::DEFAULT_TOP_K;
use domain_catalog::models::{CaptionedImage, CreatedProduct, IndexedDocument, ProductsWithAnswer};
use domain_catalog::*;
use http_body_util::BodyExt;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt; // For oneshot()
use uuid::Uuid;

const KEYWORDS: [&str; 6] = ["shoe", "red", "blue", "hat", "bag", "leather"];
const PUBLIC_URL: &str = "http://catalog.test";
const BOUNDARY: &str = "catalog-test-boundary";

/// Counts keyword occurrences, plus a constant bias so no vector is zero
struct KeywordEmbedder;

fn keyword_vector(text: &str) -> Vec<f32> {
    let text = text.to_lowercase();
    let mut vector: Vec<f32> = KEYWORDS
        .iter()
        .map(|kw| text.matches(kw).count() as f32)
        .collect();
    vector.push(0.1);
    vector
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed(&self, payload: &str) -> CatalogResult<Vec<f32>> {
        Ok(keyword_vector(payload))
    }
}

/// Image payloads are file paths whose contents are plain text
struct FileKeywordEmbedder;

#[async_trait]
impl Embedder for FileKeywordEmbedder {
    async fn embed(&self, payload: &str) -> CatalogResult<Vec<f32>> {
        let text = tokio::fs::read_to_string(payload)
            .await
            .map_err(|e| CatalogError::Validation(e.to_string()))?;
        Ok(keyword_vector(&text))
    }
}

struct FixedModels;

#[async_trait]
impl Captioner for FixedModels {
    async fn caption(&self, image_uri: &str) -> CatalogResult<String> {
        let text = tokio::fs::read_to_string(image_uri)
            .await
            .map_err(|e| CatalogError::Validation(e.to_string()))?;
        Ok(format!("a photo of a {}", text.trim()))
    }
}

#[async_trait]
impl ContentGenerator for FixedModels {
    async fn generate(&self, description: &str) -> CatalogResult<Content> {
        Ok(Content::new(
            "Generated",
            description,
            vec!["one".into(), "two".into(), "three".into(), "four".into(), "five".into()],
        ))
    }
}

#[async_trait]
impl AnswerGenerator for FixedModels {
    async fn answer(&self, question: &str, context: &[String]) -> CatalogResult<String> {
        Ok(format!("{} products match '{}'", context.len(), question))
    }
}

/// Image index whose writes always fail while reads still work
struct WriteFailingIndex(Arc<dyn ProductIndex>);

#[async_trait]
impl ProductIndex for WriteFailingIndex {
    fn modality(&self) -> Modality {
        self.0.modality()
    }

    async fn add(&self, _document: IndexedDocument) -> CatalogResult<()> {
        Err(CatalogError::upstream("image index", "connection refused"))
    }

    async fn search(&self, query: &str, k: usize) -> CatalogResult<Vec<Uuid>> {
        self.0.search(query, k).await
    }
}

struct TestApp {
    dir: TempDir,
    catalog: CatalogService,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        Self::build(false)
    }

    fn with_failing_image_index() -> Self {
        Self::build(true)
    }

    fn build(fail_image_writes: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();

        let repository: Arc<dyn CatalogRepository> = Arc::new(InMemoryCatalogRepository::new());
        let blobs: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(dir.path().join("store")));
        let uploads: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(dir.path().join("temp")));

        let text_index: Arc<dyn ProductIndex> = Arc::new(EmbeddingIndex::new(
            Modality::Text,
            Arc::new(KeywordEmbedder),
            Arc::new(InMemoryVectorStore::new("text index")),
        ));
        let mut image_index: Arc<dyn ProductIndex> = Arc::new(EmbeddingIndex::new(
            Modality::Image,
            Arc::new(FileKeywordEmbedder),
            Arc::new(InMemoryVectorStore::new("image index")),
        ));
        if fail_image_writes {
            image_index = Arc::new(WriteFailingIndex(image_index));
        }

        let models = Arc::new(FixedModels);
        let catalog = CatalogService::new(
            repository.clone(),
            blobs.clone(),
            uploads,
            text_index.clone(),
            image_index.clone(),
            models.clone(),
            models.clone(),
        );
        let retrieval = RetrievalService::new(repository, blobs, text_index, image_index, models);

        let app = handlers::router(CatalogState {
            catalog: catalog.clone(),
            retrieval,
            public_url: PUBLIC_URL.to_string(),
        });

        Self { dir, catalog, app }
    }

    /// Write a text "image" into the temp dir
    fn image(&self, name: &str, description: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, description).unwrap();
        path
    }

    async fn ingest(&self, title: &str, body: &str, tags: &[&str], image: &Path) -> Uuid {
        let content = Content::new(title, body, tags.iter().map(|t| t.to_string()).collect());
        self.catalog.ingest(content, image).await.unwrap()
    }

    async fn get(&self, uri: &str) -> axum::response::Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    async fn post_image(&self, uri: &str, file_name: &str, bytes: &str) -> axum::response::Response {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{f}\"\r\nContent-Type: image/png\r\n\r\n{bytes}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = file_name,
        );
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Three unrelated products, returned in insertion order
    async fn seed(&self) -> (Uuid, Uuid, Uuid) {
        let shoe = self
            .ingest(
                "Red running shoe",
                "A red shoe for running",
                &["shoe", "red"],
                &self.image("shoe.png", "red shoe"),
            )
            .await;
        let hat = self
            .ingest(
                "Blue hat",
                "A blue hat for winter",
                &["hat", "blue"],
                &self.image("hat.png", "blue hat"),
            )
            .await;
        let bag = self
            .ingest(
                "Leather bag",
                "A leather bag for work",
                &["bag", "leather"],
                &self.image("bag.png", "leather bag"),
            )
            .await;
        (shoe, hat, bag)
    }
}

// Helper to parse JSON response body
async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn ids(products: &[ProductResponse]) -> Vec<Uuid> {
    products.iter().map(|p| p.id).collect()
}

#[tokio::test]
async fn test_text_search_ranks_best_match_first() {
    let t = TestApp::new();
    let (shoe, _, _) = t.seed().await;

    let response = t.get("/search?query=red%20shoe").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: ProductsWithAnswer = json_body(response).await;
    assert_eq!(body.products[0].id, shoe);
    assert!(body.products.len() <= DEFAULT_TOP_K);
    assert_eq!(body.answer, "3 products match 'red shoe'");
}

#[tokio::test]
async fn test_search_rejects_empty_query() {
    let t = TestApp::new();
    let response = t.get("/search?query=").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tag_search_matches_substrings_in_insertion_order() {
    let t = TestApp::new();
    let (shoe, hat, bag) = t.seed().await;

    // "e" appears in "shoe", "red", "blue" and "leather"
    let response = t.get("/tags?tag=e").await;
    assert_eq!(response.status(), StatusCode::OK);
    let products: Vec<ProductResponse> = json_body(response).await;
    assert_eq!(ids(&products), vec![shoe, hat, bag]);

    let response = t.get("/tags?tag=e&limit=2&skip=1").await;
    let products: Vec<ProductResponse> = json_body(response).await;
    assert_eq!(ids(&products), vec![hat, bag]);

    let response = t.get("/tags?tag=Red").await;
    let products: Vec<ProductResponse> = json_body(response).await;
    assert!(products.is_empty());
}

#[tokio::test]
async fn test_tag_search_rejects_zero_limit() {
    let t = TestApp::new();
    let response = t.get("/tags?tag=shoe&limit=0").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_product_round_trip() {
    let t = TestApp::new();
    let (shoe, _, _) = t.seed().await;

    let response = t.get(&format!("/product?product_id={}", shoe)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let product: ProductResponse = json_body(response).await;
    assert_eq!(product.id, shoe);
    assert_eq!(product.content.title, "Red running shoe");
    assert_eq!(
        product.image_uri,
        format!("{}/api/v1/image?id={}", PUBLIC_URL, product.image_id)
    );

    let response = t.get(&format!("/image?id={}", product.image_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"red shoe");
}

#[tokio::test]
async fn test_get_unknown_product_is_404() {
    let t = TestApp::new();
    let response = t.get(&format!("/product?product_id={}", Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = t.get(&format!("/image?id={}", Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_product_id_is_400() {
    let t = TestApp::new();
    let response = t.get("/product?product_id=not-a-uuid").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_similar_products_for_unknown_id_is_empty() {
    let t = TestApp::new();
    t.seed().await;

    let response = t
        .get(&format!("/similar_products?product_id={}", Uuid::new_v4()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let products: Vec<ProductResponse> = json_body(response).await;
    assert!(products.is_empty());
}

#[tokio::test]
async fn test_similar_products_are_deduplicated() {
    let t = TestApp::new();
    let (shoe, _, _) = t.seed().await;

    let response = t
        .get(&format!("/similar_products?product_id={}", shoe))
        .await;
    let products: Vec<ProductResponse> = json_body(response).await;

    // Both indexes return all three; the union holds each once, seed first
    assert_eq!(products.len(), 3);
    assert_eq!(products[0].id, shoe);
}

#[tokio::test]
async fn test_homepage_draws_six_with_repeats() {
    let t = TestApp::new();

    let response = t.get("/homepage").await;
    let products: Vec<ProductResponse> = json_body(response).await;
    assert!(products.is_empty());

    let only = t
        .ingest("Solo", "the only product", &["solo"], &t.image("solo.png", "solo"))
        .await;

    let response = t.get("/homepage").await;
    let products: Vec<ProductResponse> = json_body(response).await;
    assert_eq!(ids(&products), vec![only; 6]);
}

#[tokio::test]
async fn test_upload_generate_and_create_flow() {
    let t = TestApp::new();

    let response = t.post_image("/image", "shoe.png", "red shoe").await;
    assert_eq!(response.status(), StatusCode::OK);
    let staged: CaptionedImage = json_body(response).await;
    assert_eq!(staged.caption, "a photo of a red shoe");

    let request = Request::builder()
        .method("POST")
        .uri("/generate?caption=a%20photo%20of%20a%20red%20shoe")
        .body(Body::empty())
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content: Content = json_body(response).await;
    assert_eq!(content.tags.len(), 5);

    let request = Request::builder()
        .method("POST")
        .uri(format!("/products?temp_image_id={}", staged.temp_image_id))
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&json!({
                "title": "Red shoe",
                "content": content.content,
                "tags": ["shoe", "red"]
            }))
            .unwrap(),
        ))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: CreatedProduct = json_body(response).await;

    let response = t.get("/tags?tag=shoe").await;
    let products: Vec<ProductResponse> = json_body(response).await;
    assert_eq!(ids(&products), vec![created.product_id]);

    let response = t.post_image("/image_search", "query.png", "red shoe").await;
    assert_eq!(response.status(), StatusCode::OK);
    let products: Vec<ProductResponse> = json_body(response).await;
    assert_eq!(ids(&products), vec![created.product_id]);
}

#[tokio::test]
async fn test_create_product_rejects_blank_title() {
    let t = TestApp::new();
    let response = t.post_image("/image", "shoe.png", "red shoe").await;
    let staged: CaptionedImage = json_body(response).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/products?temp_image_id={}", staged.temp_image_id))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "title": "", "content": "body", "tags": [] }).to_string(),
        ))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_product_with_unknown_staged_image_is_404() {
    let t = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/products?temp_image_id={}", Uuid::new_v4()))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "title": "Shoe", "content": "body", "tags": ["shoe"] }).to_string(),
        ))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_without_image_field_is_400() {
    let t = TestApp::new();
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"other\"\r\n\r\nvalue\r\n--{b}--\r\n",
        b = BOUNDARY
    );
    let request = Request::builder()
        .method("POST")
        .uri("/image")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_index_failure_leaves_product_partially_visible() {
    let t = TestApp::with_failing_image_index();

    let response = t.post_image("/image", "shoe.png", "red shoe").await;
    let staged: CaptionedImage = json_body(response).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/products?temp_image_id={}", staged.temp_image_id))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "title": "Red shoe", "content": "A red shoe", "tags": ["shoe"] }).to_string(),
        ))
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // Saved and text-indexed, never rolled back
    let response = t.get("/tags?tag=shoe").await;
    let by_tag: Vec<ProductResponse> = json_body(response).await;
    assert_eq!(by_tag.len(), 1);

    let response = t.get("/search?query=red%20shoe").await;
    let by_text: ProductsWithAnswer = json_body(response).await;
    assert_eq!(ids(&by_text.products), ids(&by_tag));

    let response = t.post_image("/image_search", "query.png", "red shoe").await;
    let by_image: Vec<ProductResponse> = json_body(response).await;
    assert!(by_image.is_empty());
}
