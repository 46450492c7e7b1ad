use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// Region
///
/// Represents a geographic region record from the `regions` table.
/// Every walk belongs to exactly one region.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Region {
    pub id: Uuid,
    /// Short region code, 3 to 5 characters (e.g. "AKL", "WGTN").
    pub code: String,
    /// Display name, at most 20 characters.
    pub name: String,
    pub region_image_url: Option<String>,
}

/// Difficulty
///
/// Read-mostly lookup entity from the `difficulties` table (Easy/Medium/Hard).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Difficulty {
    pub id: Uuid,
    pub name: String,
}

/// Walk
///
/// Raw walk record from the `walks` table. Carries foreign keys only;
/// use `WalkDetail` when the resolved region and difficulty are needed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Walk {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub region_id: Uuid,
}

/// WalkDetail
///
/// A walk joined with its region and difficulty. This is what the listing
/// pipeline and the single-walk reads produce: relations are resolved in the
/// same query, never lazily per item.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalkDetail {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub region: Region,
    pub difficulty: Difficulty,
}

/// WalkRow
///
/// Raw database row (internal use) for the joined walk query. The flat,
/// aliased column set keeps the repository to a single round trip; it is
/// folded into `WalkDetail` before leaving the repository.
#[derive(Debug, Clone, FromRow)]
pub struct WalkRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub region_id: Uuid,
    pub region_code: String,
    pub region_name: String,
    pub region_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub difficulty_name: String,
}

impl WalkRow {
    /// Folds the flat join row into the nested domain shape.
    pub fn into_detail(self) -> WalkDetail {
        WalkDetail {
            id: self.id,
            name: self.name,
            description: self.description,
            length_in_km: self.length_in_km,
            walk_image_url: self.walk_image_url,
            region: Region {
                id: self.region_id,
                code: self.region_code,
                name: self.region_name,
                region_image_url: self.region_image_url,
            },
            difficulty: Difficulty {
                id: self.difficulty_id,
                name: self.difficulty_name,
            },
        }
    }
}

/// Image
///
/// Metadata record for an uploaded image from the `images` table. The bytes
/// themselves live on local disk; `file_path` is the public URL.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Image {
    pub id: Uuid,
    pub file_name: String,
    pub file_description: Option<String>,
    pub file_extension: String,
    pub file_size_in_bytes: i64,
    pub file_path: String,
}

/// User
///
/// Canonical identity record from the `users` table. The username doubles as
/// the email address. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

// --- Response DTOs (Output Schemas) ---
//
// Mapping between domain rows and DTOs is hand-written per entity pair, so
// every field transfer is checked at compile time.

/// RegionDto
///
/// Externally-facing shape of a region.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegionDto {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub region_image_url: Option<String>,
}

/// DifficultyDto
///
/// Externally-facing shape of a difficulty lookup entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DifficultyDto {
    pub id: Uuid,
    pub name: String,
}

/// WalkDto
///
/// Externally-facing shape of a walk, embedding its resolved region and
/// difficulty representations.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct WalkDto {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub region: RegionDto,
    pub difficulty: DifficultyDto,
}

/// ImageDto
///
/// Externally-facing shape of an uploaded image's metadata.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImageDto {
    pub id: Uuid,
    pub file_name: String,
    pub file_description: Option<String>,
    pub file_extension: String,
    pub file_size_in_bytes: i64,
    pub file_path: String,
}

impl Region {
    pub fn into_dto(self) -> RegionDto {
        RegionDto {
            id: self.id,
            code: self.code,
            name: self.name,
            region_image_url: self.region_image_url,
        }
    }
}

impl Difficulty {
    pub fn into_dto(self) -> DifficultyDto {
        DifficultyDto {
            id: self.id,
            name: self.name,
        }
    }
}

impl WalkDetail {
    pub fn into_dto(self) -> WalkDto {
        WalkDto {
            id: self.id,
            name: self.name,
            description: self.description,
            length_in_km: self.length_in_km,
            walk_image_url: self.walk_image_url,
            region: self.region.into_dto(),
            difficulty: self.difficulty.into_dto(),
        }
    }
}

impl Image {
    pub fn into_dto(self) -> ImageDto {
        ImageDto {
            id: self.id,
            file_name: self.file_name,
            file_description: self.file_description,
            file_extension: self.file_extension,
            file_size_in_bytes: self.file_size_in_bytes,
            file_path: self.file_path,
        }
    }
}

// --- Request Payloads (Input Schemas) ---

/// AddRegionRequest
///
/// Input payload for creating a region (POST /api/regions).
/// Bounds are enforced by `validation::validate_region` before persistence.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddRegionRequest {
    pub code: String,
    pub name: String,
    pub region_image_url: Option<String>,
}

/// UpdateRegionRequest
///
/// Input payload for replacing a region's fields (PUT /api/regions/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateRegionRequest {
    pub code: String,
    pub name: String,
    pub region_image_url: Option<String>,
}

/// AddWalkRequest
///
/// Input payload for creating a walk (POST /api/walks). The referenced region
/// and difficulty must exist; the store enforces referential integrity.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddWalkRequest {
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub region_id: Uuid,
}

/// UpdateWalkRequest
///
/// Input payload for replacing a walk's fields (PUT /api/walks/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateWalkRequest {
    pub name: String,
    pub description: String,
    pub length_in_km: f64,
    pub walk_image_url: Option<String>,
    pub difficulty_id: Uuid,
    pub region_id: Uuid,
}

/// RegisterRequest
///
/// Input payload for the registration endpoint (POST /api/auth/register).
/// The username is used as both login name and email. The password is
/// transported once and only its Argon2id hash is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Role names to grant (`Reader`, `Writer`). Registration fails as a
    /// whole if any requested role does not exist.
    #[serde(default)]
    pub roles: Vec<String>,
}

/// LoginRequest
///
/// Input payload for the login endpoint (POST /api/auth/login).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// LoginResponse
///
/// Output schema for a successful login: the serialized signed token.
/// The server keeps no record of it; validity is self-contained.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    #[serde(rename = "jwtToken")]
    #[ts(rename = "jwtToken")]
    pub jwt_token: String,
}
