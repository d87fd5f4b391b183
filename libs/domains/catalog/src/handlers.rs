//! HTTP handlers for the catalog API

use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{ErrorResponse, ImageUpload, QueryParams, ValidatedJson};
use utoipa::OpenApi;
use validator::Validate;

use crate::blob::{content_type_for, read_image};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    CaptionQuery, CaptionedImage, Content, CreatedProduct, ImageIdQuery, ImageUploadForm, Product,
    ProductIdQuery, ProductResponse, ProductsWithAnswer, SearchQuery, TagQuery, TempImageQuery,
};
use crate::service::{CatalogService, RetrievalService};

/// OpenAPI documentation for the catalog API
#[derive(OpenApi)]
#[openapi(
    servers((url = "/api/v1")),
    paths(
        upload_image,
        generate_content,
        create_product,
        search,
        similar_products,
        image_search,
        homepage,
        get_image,
        get_product,
        search_by_tag,
    ),
    components(schemas(
        Content,
        ProductResponse,
        ProductsWithAnswer,
        CaptionedImage,
        CreatedProduct,
        ImageUploadForm,
        ErrorResponse
    )),
    tags(
        (name = "Catalog", description = "Product ingestion and lookup"),
        (name = "Search", description = "Text, image, tag and similarity retrieval")
    )
)]
pub struct ApiDoc;

/// Services and settings shared by every handler
pub struct CatalogState {
    pub catalog: CatalogService,
    pub retrieval: RetrievalService,
    /// Base URL used to build product image links
    pub public_url: String,
}

type SharedState = Arc<CatalogState>;

/// Create the catalog router with all HTTP endpoints
pub fn router(state: CatalogState) -> Router {
    Router::new()
        .route("/image", post(upload_image).get(get_image))
        .route("/generate", post(generate_content))
        .route("/products", post(create_product))
        .route("/product", get(get_product))
        .route("/search", get(search))
        .route("/similar_products", get(similar_products))
        .route("/image_search", post(image_search))
        .route("/homepage", get(homepage))
        .route("/tags", get(search_by_tag))
        .with_state(Arc::new(state))
}

fn validate(input: &impl Validate) -> CatalogResult<()> {
    input
        .validate()
        .map_err(|e| CatalogError::Validation(e.to_string()))
}

fn respond(state: &CatalogState, products: Vec<Product>) -> Json<Vec<ProductResponse>> {
    Json(
        products
            .into_iter()
            .map(|p| ProductResponse::from_product(p, &state.public_url))
            .collect(),
    )
}

/// Stage an image and caption it
#[utoipa::path(
    post,
    path = "/image",
    tag = "Catalog",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Staged image and its caption", body = CaptionedImage),
        (status = 400, description = "Missing or empty upload", body = ErrorResponse),
        (status = 503, description = "Captioner unavailable", body = ErrorResponse)
    )
)]
async fn upload_image(
    State(state): State<SharedState>,
    upload: ImageUpload,
) -> CatalogResult<Json<CaptionedImage>> {
    let temp_image_id = state
        .catalog
        .stage_upload(&upload.file_name, &upload.bytes)
        .await?;
    let uri = state.catalog.staged_upload_uri(temp_image_id).await?;
    let caption = state.catalog.caption(&uri).await?;

    Ok(Json(CaptionedImage {
        temp_image_id,
        caption,
    }))
}

/// Generate product content from a caption
#[utoipa::path(
    post,
    path = "/generate",
    tag = "Catalog",
    params(CaptionQuery),
    responses(
        (status = 200, description = "Generated content", body = Content),
        (status = 400, description = "Empty caption", body = ErrorResponse),
        (status = 502, description = "Generator returned malformed content", body = ErrorResponse)
    )
)]
async fn generate_content(
    State(state): State<SharedState>,
    QueryParams(query): QueryParams<CaptionQuery>,
) -> CatalogResult<Json<Content>> {
    validate(&query)?;
    let content = state.catalog.generate_content(&query.caption).await?;
    Ok(Json(content))
}

/// Ingest a staged image with its content
#[utoipa::path(
    post,
    path = "/products",
    tag = "Catalog",
    params(TempImageQuery),
    request_body = Content,
    responses(
        (status = 201, description = "Product created", body = CreatedProduct),
        (status = 400, description = "Invalid content", body = ErrorResponse),
        (status = 404, description = "Staged image not found", body = ErrorResponse),
        (status = 500, description = "Product saved but not fully indexed", body = ErrorResponse)
    )
)]
async fn create_product(
    State(state): State<SharedState>,
    QueryParams(query): QueryParams<TempImageQuery>,
    ValidatedJson(content): ValidatedJson<Content>,
) -> CatalogResult<impl IntoResponse> {
    let uri = state.catalog.staged_upload_uri(query.temp_image_id).await?;
    let product_id = state.catalog.ingest(content, Path::new(&uri)).await?;
    Ok((StatusCode::CREATED, Json(CreatedProduct { product_id })))
}

/// Text search with a generated answer
#[utoipa::path(
    get,
    path = "/search",
    tag = "Search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Answer and matching products", body = ProductsWithAnswer),
        (status = 400, description = "Empty query", body = ErrorResponse)
    )
)]
async fn search(
    State(state): State<SharedState>,
    QueryParams(query): QueryParams<SearchQuery>,
) -> CatalogResult<Json<ProductsWithAnswer>> {
    validate(&query)?;
    let (answer, products) = state
        .retrieval
        .search_by_text_with_answer(&query.query)
        .await?;
    let Json(products) = respond(&state, products);
    Ok(Json(ProductsWithAnswer { answer, products }))
}

/// Products similar to the given one by text or image
#[utoipa::path(
    get,
    path = "/similar_products",
    tag = "Search",
    params(ProductIdQuery),
    responses(
        (status = 200, description = "Deduplicated similar products", body = Vec<ProductResponse>)
    )
)]
async fn similar_products(
    State(state): State<SharedState>,
    QueryParams(query): QueryParams<ProductIdQuery>,
) -> CatalogResult<Json<Vec<ProductResponse>>> {
    let products = state.retrieval.find_similar(query.product_id).await?;
    Ok(respond(&state, products))
}

/// Search by an uploaded image
#[utoipa::path(
    post,
    path = "/image_search",
    tag = "Search",
    request_body(content = ImageUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Visually similar products", body = Vec<ProductResponse>),
        (status = 400, description = "Missing or empty upload", body = ErrorResponse)
    )
)]
async fn image_search(
    State(state): State<SharedState>,
    upload: ImageUpload,
) -> CatalogResult<Json<Vec<ProductResponse>>> {
    let temp_image_id = state
        .catalog
        .stage_upload(&upload.file_name, &upload.bytes)
        .await?;
    let uri = state.catalog.staged_upload_uri(temp_image_id).await?;
    let products = state.retrieval.search_by_image(&uri).await?;
    Ok(respond(&state, products))
}

/// Random selection for the home screen, may repeat
#[utoipa::path(
    get,
    path = "/homepage",
    tag = "Search",
    responses(
        (status = 200, description = "Home screen products", body = Vec<ProductResponse>)
    )
)]
async fn homepage(State(state): State<SharedState>) -> CatalogResult<Json<Vec<ProductResponse>>> {
    let products = state.retrieval.home_screen().await?;
    Ok(respond(&state, products))
}

/// Raw bytes of a stored product image
#[utoipa::path(
    get,
    path = "/image",
    tag = "Catalog",
    params(ImageIdQuery),
    responses(
        (status = 200, description = "Image file"),
        (status = 404, description = "Image not found", body = ErrorResponse)
    )
)]
async fn get_image(
    State(state): State<SharedState>,
    QueryParams(query): QueryParams<ImageIdQuery>,
) -> CatalogResult<impl IntoResponse> {
    let uri = state.catalog.get_image_uri(query.id).await?;
    let bytes = read_image(&uri).await.map_err(|e| match e {
        CatalogError::Validation(_) => CatalogError::ImageNotFound(query.id),
        other => other,
    })?;

    Ok(([(header::CONTENT_TYPE, content_type_for(&uri))], bytes))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/product",
    tag = "Catalog",
    params(ProductIdQuery),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = ErrorResponse)
    )
)]
async fn get_product(
    State(state): State<SharedState>,
    QueryParams(query): QueryParams<ProductIdQuery>,
) -> CatalogResult<Json<ProductResponse>> {
    let product = state
        .catalog
        .get_product(query.product_id)
        .await?
        .ok_or(CatalogError::NotFound(query.product_id))?;
    Ok(Json(ProductResponse::from_product(
        product,
        &state.public_url,
    )))
}

/// Products whose tags contain the given text
#[utoipa::path(
    get,
    path = "/tags",
    tag = "Search",
    params(TagQuery),
    responses(
        (status = 200, description = "Matching products in insertion order", body = Vec<ProductResponse>),
        (status = 400, description = "Invalid tag or pagination", body = ErrorResponse)
    )
)]
async fn search_by_tag(
    State(state): State<SharedState>,
    QueryParams(query): QueryParams<TagQuery>,
) -> CatalogResult<Json<Vec<ProductResponse>>> {
    validate(&query)?;
    let products = state
        .retrieval
        .search_by_tag(&query.tag, query.limit, query.skip)
        .await?;
    Ok(respond(&state, products))
}
