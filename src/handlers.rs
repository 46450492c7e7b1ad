use crate::{
    AppState,
    auth::create_jwt_token,
    error::ApiError,
    models::{
        AddRegionRequest, AddWalkRequest, DifficultyDto, Image, ImageDto, LoginRequest,
        LoginResponse, RegionDto, RegisterRequest, UpdateRegionRequest, UpdateWalkRequest, WalkDto,
    },
    query::{WalkListParams, WalkQuery},
    validation::{
        FieldError, validate_add_region, validate_add_walk, validate_register,
        validate_update_region, validate_update_walk,
    },
};
use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Auth Handlers ---

/// register
///
/// [Public Route] Creates a new identity with a hashed password and the
/// requested roles. Creation and role attachment are atomic in the
/// repository: a failure at any step leaves nothing behind and is reported
/// as one generic 400, with no detail on which step failed.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered"),
        (status = 400, description = "Invalid input or registration failed")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, &'static str), ApiError> {
    validate_register(&payload)?;

    let password_hash = crate::auth::hash_password(&payload.password)?;

    match state
        .repo
        .create_user_with_roles(&payload.username, &password_hash, &payload.roles)
        .await?
    {
        Some(_) => Ok((StatusCode::OK, "User was registered! Please login.")),
        None => Err(ApiError::Registration),
    }
}

/// login
///
/// [Public Route] Authenticates a username/password pair and mints a signed
/// bearer token carrying the identity's role claims. Unknown user and wrong
/// password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 400, description = "Incorrect credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .repo
        .get_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::BadCredentials)?;

    if !crate::auth::verify_password(&payload.password, &user.password_hash)? {
        return Err(ApiError::BadCredentials);
    }

    let roles = state.repo.get_user_roles(user.id).await?;
    let jwt_token = create_jwt_token(&user.username, &roles, &state.config)?;

    Ok(Json(LoginResponse { jwt_token }))
}

// --- Region Handlers ---

/// get_regions
///
/// [Reader Route] Lists all regions.
#[utoipa::path(
    get,
    path = "/api/regions",
    responses((status = 200, description = "All regions", body = [RegionDto]))
)]
pub async fn get_regions(State(state): State<AppState>) -> Result<Json<Vec<RegionDto>>, ApiError> {
    let regions = state.repo.get_regions().await?;
    Ok(Json(regions.into_iter().map(|r| r.into_dto()).collect()))
}

/// get_region
///
/// [Reader Route] Retrieves a single region by ID.
#[utoipa::path(
    get,
    path = "/api/regions/{id}",
    params(("id" = Uuid, Path, description = "Region ID")),
    responses(
        (status = 200, description = "Found", body = RegionDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_region(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RegionDto>, ApiError> {
    let region = state.repo.get_region(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(region.into_dto()))
}

/// create_region
///
/// [Writer Route] Creates a region after boundary validation of the code and
/// name bounds.
#[utoipa::path(
    post,
    path = "/api/regions",
    request_body = AddRegionRequest,
    responses(
        (status = 201, description = "Created", body = RegionDto),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn create_region(
    State(state): State<AppState>,
    Json(payload): Json<AddRegionRequest>,
) -> Result<(StatusCode, Json<RegionDto>), ApiError> {
    validate_add_region(&payload)?;
    let region = state.repo.create_region(payload).await?;
    Ok((StatusCode::CREATED, Json(region.into_dto())))
}

/// update_region
///
/// [Writer Route] Replaces a region's fields.
#[utoipa::path(
    put,
    path = "/api/regions/{id}",
    params(("id" = Uuid, Path, description = "Region ID")),
    request_body = UpdateRegionRequest,
    responses(
        (status = 200, description = "Updated", body = RegionDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_region(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRegionRequest>,
) -> Result<Json<RegionDto>, ApiError> {
    validate_update_region(&payload)?;
    let region = state
        .repo
        .update_region(id, payload)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(region.into_dto()))
}

/// delete_region
///
/// [Writer Route] Deletes a region and echoes the deleted representation.
#[utoipa::path(
    delete,
    path = "/api/regions/{id}",
    params(("id" = Uuid, Path, description = "Region ID")),
    responses(
        (status = 200, description = "Deleted", body = RegionDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_region(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RegionDto>, ApiError> {
    let region = state
        .repo
        .delete_region(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(region.into_dto()))
}

// --- Difficulty Handlers (lookup only) ---

/// get_difficulties
///
/// [Reader Route] Lists the difficulty lookup entries.
#[utoipa::path(
    get,
    path = "/api/difficulties",
    responses((status = 200, description = "All difficulties", body = [DifficultyDto]))
)]
pub async fn get_difficulties(
    State(state): State<AppState>,
) -> Result<Json<Vec<DifficultyDto>>, ApiError> {
    let difficulties = state.repo.get_difficulties().await?;
    Ok(Json(
        difficulties.into_iter().map(|d| d.into_dto()).collect(),
    ))
}

/// get_difficulty
///
/// [Reader Route] Retrieves a single difficulty by ID.
#[utoipa::path(
    get,
    path = "/api/difficulties/{id}",
    params(("id" = Uuid, Path, description = "Difficulty ID")),
    responses(
        (status = 200, description = "Found", body = DifficultyDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_difficulty(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DifficultyDto>, ApiError> {
    let difficulty = state
        .repo
        .get_difficulty(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(difficulty.into_dto()))
}

// --- Walk Handlers ---

/// get_walks
///
/// [Reader Route] The listing pipeline: filter -> sort -> paginate over the
/// walk collection, each result embedding its resolved region and difficulty.
/// Unrecognized filter/sort selectors degrade silently; no parameter value
/// returns a 4xx from this endpoint.
#[utoipa::path(
    get,
    path = "/api/walks",
    params(WalkListParams),
    responses((status = 200, description = "Filtered, sorted, paginated walks", body = [WalkDto]))
)]
pub async fn get_walks(
    State(state): State<AppState>,
    Query(params): Query<WalkListParams>,
) -> Result<Json<Vec<WalkDto>>, ApiError> {
    let plan = WalkQuery::from_params(&params);
    let walks = state.repo.get_walks(&plan).await?;
    Ok(Json(walks.into_iter().map(|w| w.into_dto()).collect()))
}

/// get_walk
///
/// [Reader Route] Retrieves a single walk by ID with its relations resolved.
#[utoipa::path(
    get,
    path = "/api/walks/{id}",
    params(("id" = Uuid, Path, description = "Walk ID")),
    responses(
        (status = 200, description = "Found", body = WalkDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_walk(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WalkDto>, ApiError> {
    let walk = state.repo.get_walk(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(walk.into_dto()))
}

/// create_walk
///
/// [Writer Route] Creates a walk. The referenced region and difficulty must
/// exist; the store's referential integrity is the final arbiter.
#[utoipa::path(
    post,
    path = "/api/walks",
    request_body = AddWalkRequest,
    responses(
        (status = 201, description = "Created", body = WalkDto),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn create_walk(
    State(state): State<AppState>,
    Json(payload): Json<AddWalkRequest>,
) -> Result<(StatusCode, Json<WalkDto>), ApiError> {
    validate_add_walk(&payload)?;
    let walk = state.repo.create_walk(payload).await?;
    Ok((StatusCode::CREATED, Json(walk.into_dto())))
}

/// update_walk
///
/// [Writer Route] Replaces a walk's fields.
#[utoipa::path(
    put,
    path = "/api/walks/{id}",
    params(("id" = Uuid, Path, description = "Walk ID")),
    request_body = UpdateWalkRequest,
    responses(
        (status = 200, description = "Updated", body = WalkDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_walk(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWalkRequest>,
) -> Result<Json<WalkDto>, ApiError> {
    validate_update_walk(&payload)?;
    let walk = state
        .repo
        .update_walk(id, payload)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(walk.into_dto()))
}

/// delete_walk
///
/// [Writer Route] Deletes a walk and echoes the deleted representation,
/// relations included.
#[utoipa::path(
    delete,
    path = "/api/walks/{id}",
    params(("id" = Uuid, Path, description = "Walk ID")),
    responses(
        (status = 200, description = "Deleted", body = WalkDto),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_walk(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WalkDto>, ApiError> {
    let walk = state
        .repo
        .delete_walk(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(walk.into_dto()))
}

// --- Image Handlers ---

/// Allowed upload extensions, lowercase, dot included.
const ALLOWED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];
/// Upload size cap: 10 MB. The upload route's body limit sits above this so
/// oversized files reach the check here and get the field-level message.
pub const MAX_IMAGE_BYTES: usize = 10_485_760;

/// upload_image
///
/// [Writer Route] Accepts a multipart form (`file`, `fileName`,
/// `fileDescription`), validates extension and size, writes the bytes to the
/// image store and persists a metadata row. Returns the stored metadata
/// including the public URL.
#[utoipa::path(
    post,
    path = "/api/images/upload",
    responses(
        (status = 200, description = "Uploaded", body = ImageDto),
        (status = 400, description = "Validation failure")
    )
)]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImageDto>, ApiError> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;
    let mut file_name: Option<String> = None;
    let mut file_description: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("file") => {
                original_name = field.file_name().map(|n| n.to_string());
                file_bytes = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            Some("fileName") => {
                file_name = Some(field.text().await.map_err(multipart_error)?);
            }
            Some("fileDescription") => {
                file_description = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {}
        }
    }

    let mut errors = Vec::new();

    let extension = original_name
        .as_deref()
        .and_then(|name| name.rfind('.').map(|idx| name[idx..].to_lowercase()))
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        errors.push(FieldError::new("file", "Unsupported file extension"));
    }

    let bytes = file_bytes.unwrap_or_default();
    if bytes.is_empty() {
        errors.push(FieldError::new("file", "File is required"));
    } else if bytes.len() > MAX_IMAGE_BYTES {
        errors.push(FieldError::new(
            "file",
            "File size more than 10MB, please upload a smaller size file",
        ));
    }

    let file_name = file_name.unwrap_or_default();
    if file_name.trim().is_empty() {
        errors.push(FieldError::new("fileName", "File name is required"));
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let file_path = state.images.save(&file_name, &extension, &bytes).await?;

    let image = state
        .repo
        .create_image(Image {
            id: Uuid::new_v4(),
            file_name,
            file_description,
            file_extension: extension,
            file_size_in_bytes: bytes.len() as i64,
            file_path,
        })
        .await?;

    Ok(Json(image.into_dto()))
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError::Validation(vec![FieldError::new(
        "file",
        &format!("Malformed multipart body: {}", err),
    )])
}
