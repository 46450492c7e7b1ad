use crate::models::{
    AddRegionRequest, AddWalkRequest, Difficulty, Image, Region, UpdateRegionRequest,
    UpdateWalkRequest, User, Walk, WalkDetail, WalkRow,
};
use crate::query::{WalkQuery, WalkSortField};
use async_trait::async_trait;
use sqlx::{PgPool, query_builder::QueryBuilder};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations. This is the
/// core of the Repository Abstraction pattern, allowing the handlers to
/// interact with the data layer without knowing the specific implementation
/// (Postgres, Mock, etc.).
///
/// Every method surfaces store failures as `sqlx::Error`; nothing here
/// retries. Absent records are `Ok(None)`, never an error.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Regions ---
    async fn get_regions(&self) -> Result<Vec<Region>, sqlx::Error>;
    async fn get_region(&self, id: Uuid) -> Result<Option<Region>, sqlx::Error>;
    async fn create_region(&self, req: AddRegionRequest) -> Result<Region, sqlx::Error>;
    async fn update_region(
        &self,
        id: Uuid,
        req: UpdateRegionRequest,
    ) -> Result<Option<Region>, sqlx::Error>;
    // Returns the deleted record so the handler can echo it back.
    async fn delete_region(&self, id: Uuid) -> Result<Option<Region>, sqlx::Error>;

    // --- Difficulties (read-mostly lookup) ---
    async fn get_difficulties(&self) -> Result<Vec<Difficulty>, sqlx::Error>;
    async fn get_difficulty(&self, id: Uuid) -> Result<Option<Difficulty>, sqlx::Error>;

    // --- Walks ---
    // The listing pipeline: consumes the normalized filter/sort/page plan and
    // returns walks with region and difficulty resolved in the same query.
    async fn get_walks(&self, query: &WalkQuery) -> Result<Vec<WalkDetail>, sqlx::Error>;
    async fn get_walk(&self, id: Uuid) -> Result<Option<WalkDetail>, sqlx::Error>;
    async fn create_walk(&self, req: AddWalkRequest) -> Result<WalkDetail, sqlx::Error>;
    async fn update_walk(
        &self,
        id: Uuid,
        req: UpdateWalkRequest,
    ) -> Result<Option<WalkDetail>, sqlx::Error>;
    async fn delete_walk(&self, id: Uuid) -> Result<Option<WalkDetail>, sqlx::Error>;

    // --- Images ---
    async fn create_image(&self, image: Image) -> Result<Image, sqlx::Error>;

    // --- Identity ---
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    // Role names in attachment order.
    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error>;
    /// Creates the identity and attaches every requested role as one atomic
    /// unit. `Ok(None)` means the registration failed as a whole (duplicate
    /// username or unknown role name) and nothing was persisted; the caller
    /// reports it as a generic failure with no further detail.
    async fn create_user_with_roles(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[String],
    ) -> Result<Option<User>, sqlx::Error>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Shared SELECT head for the joined walk queries; both the listing and the
// single-walk read go through it so the embedded shapes never drift apart.
const WALK_SELECT: &str = r#"
    SELECT
        w.id, w.name, w.description, w.length_in_km, w.walk_image_url,
        r.id AS region_id, r.code AS region_code, r.name AS region_name, r.region_image_url,
        d.id AS difficulty_id, d.name AS difficulty_name
    FROM walks w
    JOIN regions r ON w.region_id = r.id
    JOIN difficulties d ON w.difficulty_id = d.id
"#;

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_regions(&self) -> Result<Vec<Region>, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            "SELECT id, code, name, region_image_url FROM regions ORDER BY code",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn get_region(&self, id: Uuid) -> Result<Option<Region>, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            "SELECT id, code, name, region_image_url FROM regions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_region(&self, req: AddRegionRequest) -> Result<Region, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            r#"INSERT INTO regions (id, code, name, region_image_url)
               VALUES ($1, $2, $3, $4)
               RETURNING id, code, name, region_image_url"#,
        )
        .bind(Uuid::new_v4())
        .bind(req.code)
        .bind(req.name)
        .bind(req.region_image_url)
        .fetch_one(&self.pool)
        .await
    }

    async fn update_region(
        &self,
        id: Uuid,
        req: UpdateRegionRequest,
    ) -> Result<Option<Region>, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            r#"UPDATE regions
               SET code = $2, name = $3, region_image_url = $4
               WHERE id = $1
               RETURNING id, code, name, region_image_url"#,
        )
        .bind(id)
        .bind(req.code)
        .bind(req.name)
        .bind(req.region_image_url)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_region(&self, id: Uuid) -> Result<Option<Region>, sqlx::Error> {
        sqlx::query_as::<_, Region>(
            r#"DELETE FROM regions WHERE id = $1
               RETURNING id, code, name, region_image_url"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_difficulties(&self) -> Result<Vec<Difficulty>, sqlx::Error> {
        sqlx::query_as::<_, Difficulty>("SELECT id, name FROM difficulties ORDER BY name")
            .fetch_all(&self.pool)
            .await
    }

    async fn get_difficulty(&self, id: Uuid) -> Result<Option<Difficulty>, sqlx::Error> {
        sqlx::query_as::<_, Difficulty>("SELECT id, name FROM difficulties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// get_walks
    ///
    /// Renders the normalized listing plan to SQL with QueryBuilder so every
    /// user-supplied value is bound, never spliced. Filter and sort are only
    /// present when the plan recognized them; the ORDER BY fragments are
    /// fixed strings chosen by enum match.
    async fn get_walks(&self, query: &WalkQuery) -> Result<Vec<WalkDetail>, sqlx::Error> {
        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(WALK_SELECT);

        if let Some(pattern) = query.like_pattern() {
            builder.push(" WHERE w.name ILIKE ");
            builder.push_bind(pattern);
        }

        if let Some(sort) = query.sort {
            builder.push(match (sort.field, sort.ascending) {
                (WalkSortField::Name, true) => " ORDER BY w.name ASC",
                (WalkSortField::Name, false) => " ORDER BY w.name DESC",
                (WalkSortField::Length, true) => " ORDER BY w.length_in_km ASC",
                (WalkSortField::Length, false) => " ORDER BY w.length_in_km DESC",
            });
        }

        builder.push(" OFFSET ");
        builder.push_bind(query.offset);
        builder.push(" LIMIT ");
        builder.push_bind(query.limit);

        let rows = builder
            .build_query_as::<WalkRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(WalkRow::into_detail).collect())
    }

    async fn get_walk(&self, id: Uuid) -> Result<Option<WalkDetail>, sqlx::Error> {
        let row = sqlx::query_as::<_, WalkRow>(&format!("{WALK_SELECT} WHERE w.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(WalkRow::into_detail))
    }

    /// create_walk
    ///
    /// Inserts and re-reads through the joined query so the response carries
    /// the resolved region and difficulty. A dangling region/difficulty id is
    /// rejected by the store's foreign keys and propagates as a store error.
    async fn create_walk(&self, req: AddWalkRequest) -> Result<WalkDetail, sqlx::Error> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO walks (id, name, description, length_in_km, walk_image_url, difficulty_id, region_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.length_in_km)
        .bind(req.walk_image_url)
        .bind(req.difficulty_id)
        .bind(req.region_id)
        .execute(&self.pool)
        .await?;

        self.get_walk(id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    async fn update_walk(
        &self,
        id: Uuid,
        req: UpdateWalkRequest,
    ) -> Result<Option<WalkDetail>, sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE walks
               SET name = $2, description = $3, length_in_km = $4,
                   walk_image_url = $5, difficulty_id = $6, region_id = $7
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(req.name)
        .bind(req.description)
        .bind(req.length_in_km)
        .bind(req.walk_image_url)
        .bind(req.difficulty_id)
        .bind(req.region_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_walk(id).await
    }

    async fn delete_walk(&self, id: Uuid) -> Result<Option<WalkDetail>, sqlx::Error> {
        // Read the joined detail first; the response echoes the deleted walk
        // with its relations, which are gone after the DELETE.
        let Some(detail) = self.get_walk(id).await? else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM walks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(Some(detail))
    }

    async fn create_image(&self, image: Image) -> Result<Image, sqlx::Error> {
        sqlx::query_as::<_, Image>(
            r#"INSERT INTO images (id, file_name, file_description, file_extension, file_size_in_bytes, file_path)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, file_name, file_description, file_extension, file_size_in_bytes, file_path"#,
        )
        .bind(image.id)
        .bind(image.file_name)
        .bind(image.file_description)
        .bind(image.file_extension)
        .bind(image.file_size_in_bytes)
        .bind(image.file_path)
        .fetch_one(&self.pool)
        .await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, password_hash FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        // Attachment order is the explicit ordinal stamped at registration;
        // timestamps within one transaction all share the same now().
        sqlx::query_scalar::<_, String>(
            r#"SELECT r.name FROM user_roles ur
               JOIN roles r ON ur.role_id = r.id
               WHERE ur.user_id = $1
               ORDER BY ur.ordinal"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// create_user_with_roles
    ///
    /// Identity creation and role attachment run inside one transaction: an
    /// unknown role name or a taken username rolls the whole registration
    /// back, so a failed registration never leaves a half-created identity.
    async fn create_user_with_roles(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[String],
    ) -> Result<Option<User>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, username, password_hash)
               VALUES ($1, $2, $3)
               ON CONFLICT (username) DO NOTHING
               RETURNING id, username, password_hash"#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&mut *tx)
        .await?;

        // Username taken: dropping the transaction rolls back.
        let Some(user) = inserted else {
            return Ok(None);
        };

        for (ordinal, role) in roles.iter().enumerate() {
            let role_id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM roles WHERE name = $1")
                .bind(role)
                .fetch_optional(&mut *tx)
                .await?;
            // Unknown role: abandon everything, including the user row.
            let Some(role_id) = role_id else {
                return Ok(None);
            };
            sqlx::query(
                r#"INSERT INTO user_roles (user_id, role_id, ordinal)
                   VALUES ($1, $2, $3) ON CONFLICT DO NOTHING"#,
            )
            .bind(user.id)
            .bind(role_id)
            .bind(ordinal as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(user))
    }
}

// --- Mock Implementation (for HTTP-level tests) ---

#[derive(Default)]
struct MockData {
    regions: Vec<Region>,
    difficulties: Vec<Difficulty>,
    walks: Vec<Walk>,
    images: Vec<Image>,
    users: Vec<User>,
    roles: Vec<(Uuid, String)>,
    user_roles: Vec<(Uuid, Uuid)>,
}

/// MockRepository
///
/// In-memory implementation of `Repository` used by the integration tests to
/// drive the full router without a live database. Store-native order is
/// insertion order; the walk listing reuses `WalkQuery::apply`, so both
/// backends share the same pipeline semantics.
pub struct MockRepository {
    inner: Mutex<MockData>,
    /// When true, every operation reports a simulated store failure.
    should_fail: bool,
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRepository {
    /// Creates a mock with the same seed data a fresh database carries:
    /// the three difficulties and the two roles.
    pub fn new() -> Self {
        let difficulties = ["Easy", "Medium", "Hard"]
            .into_iter()
            .map(|name| Difficulty {
                id: Uuid::new_v4(),
                name: name.to_string(),
            })
            .collect();
        let roles = ["Reader", "Writer"]
            .into_iter()
            .map(|name| (Uuid::new_v4(), name.to_string()))
            .collect();

        Self {
            inner: Mutex::new(MockData {
                difficulties,
                roles,
                ..MockData::default()
            }),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            inner: Mutex::new(MockData::default()),
            should_fail: true,
        }
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            // Stands in for "store unreachable".
            Err(sqlx::Error::PoolClosed)
        } else {
            Ok(())
        }
    }

    fn detail_for(data: &MockData, walk: &Walk) -> Option<WalkDetail> {
        let region = data.regions.iter().find(|r| r.id == walk.region_id)?;
        let difficulty = data
            .difficulties
            .iter()
            .find(|d| d.id == walk.difficulty_id)?;
        Some(WalkDetail {
            id: walk.id,
            name: walk.name.clone(),
            description: walk.description.clone(),
            length_in_km: walk.length_in_km,
            walk_image_url: walk.walk_image_url.clone(),
            region: region.clone(),
            difficulty: difficulty.clone(),
        })
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn get_regions(&self) -> Result<Vec<Region>, sqlx::Error> {
        self.check()?;
        Ok(self.inner.lock().unwrap().regions.clone())
    }

    async fn get_region(&self, id: Uuid) -> Result<Option<Region>, sqlx::Error> {
        self.check()?;
        let data = self.inner.lock().unwrap();
        Ok(data.regions.iter().find(|r| r.id == id).cloned())
    }

    async fn create_region(&self, req: AddRegionRequest) -> Result<Region, sqlx::Error> {
        self.check()?;
        let region = Region {
            id: Uuid::new_v4(),
            code: req.code,
            name: req.name,
            region_image_url: req.region_image_url,
        };
        self.inner.lock().unwrap().regions.push(region.clone());
        Ok(region)
    }

    async fn update_region(
        &self,
        id: Uuid,
        req: UpdateRegionRequest,
    ) -> Result<Option<Region>, sqlx::Error> {
        self.check()?;
        let mut data = self.inner.lock().unwrap();
        let Some(region) = data.regions.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        region.code = req.code;
        region.name = req.name;
        region.region_image_url = req.region_image_url;
        Ok(Some(region.clone()))
    }

    async fn delete_region(&self, id: Uuid) -> Result<Option<Region>, sqlx::Error> {
        self.check()?;
        let mut data = self.inner.lock().unwrap();
        if data.walks.iter().any(|w| w.region_id == id) {
            // The real store's foreign keys reject this.
            return Err(sqlx::Error::Protocol(
                "foreign key violation: walks reference region".into(),
            ));
        }
        let Some(pos) = data.regions.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        Ok(Some(data.regions.remove(pos)))
    }

    async fn get_difficulties(&self) -> Result<Vec<Difficulty>, sqlx::Error> {
        self.check()?;
        Ok(self.inner.lock().unwrap().difficulties.clone())
    }

    async fn get_difficulty(&self, id: Uuid) -> Result<Option<Difficulty>, sqlx::Error> {
        self.check()?;
        let data = self.inner.lock().unwrap();
        Ok(data.difficulties.iter().find(|d| d.id == id).cloned())
    }

    async fn get_walks(&self, query: &WalkQuery) -> Result<Vec<WalkDetail>, sqlx::Error> {
        self.check()?;
        let data = self.inner.lock().unwrap();
        let details = data
            .walks
            .iter()
            .filter_map(|w| Self::detail_for(&data, w))
            .collect();
        Ok(query.apply(details))
    }

    async fn get_walk(&self, id: Uuid) -> Result<Option<WalkDetail>, sqlx::Error> {
        self.check()?;
        let data = self.inner.lock().unwrap();
        Ok(data
            .walks
            .iter()
            .find(|w| w.id == id)
            .and_then(|w| Self::detail_for(&data, w)))
    }

    async fn create_walk(&self, req: AddWalkRequest) -> Result<WalkDetail, sqlx::Error> {
        self.check()?;
        let mut data = self.inner.lock().unwrap();
        let walk = Walk {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            length_in_km: req.length_in_km,
            walk_image_url: req.walk_image_url,
            difficulty_id: req.difficulty_id,
            region_id: req.region_id,
        };
        // Referential integrity, as the real store would enforce it.
        let Some(detail) = Self::detail_for(&data, &walk) else {
            return Err(sqlx::Error::Protocol(
                "foreign key violation: unknown region or difficulty".into(),
            ));
        };
        data.walks.push(walk);
        Ok(detail)
    }

    async fn update_walk(
        &self,
        id: Uuid,
        req: UpdateWalkRequest,
    ) -> Result<Option<WalkDetail>, sqlx::Error> {
        self.check()?;
        let mut data = self.inner.lock().unwrap();
        let Some(pos) = data.walks.iter().position(|w| w.id == id) else {
            return Ok(None);
        };
        let updated = Walk {
            id,
            name: req.name,
            description: req.description,
            length_in_km: req.length_in_km,
            walk_image_url: req.walk_image_url,
            difficulty_id: req.difficulty_id,
            region_id: req.region_id,
        };
        let Some(detail) = Self::detail_for(&data, &updated) else {
            return Err(sqlx::Error::Protocol(
                "foreign key violation: unknown region or difficulty".into(),
            ));
        };
        data.walks[pos] = updated;
        Ok(Some(detail))
    }

    async fn delete_walk(&self, id: Uuid) -> Result<Option<WalkDetail>, sqlx::Error> {
        self.check()?;
        let mut data = self.inner.lock().unwrap();
        let Some(pos) = data.walks.iter().position(|w| w.id == id) else {
            return Ok(None);
        };
        let walk = data.walks.remove(pos);
        Ok(Self::detail_for(&data, &walk))
    }

    async fn create_image(&self, image: Image) -> Result<Image, sqlx::Error> {
        self.check()?;
        self.inner.lock().unwrap().images.push(image.clone());
        Ok(image)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        let data = self.inner.lock().unwrap();
        Ok(data.users.iter().find(|u| u.username == username).cloned())
    }

    async fn get_user_roles(&self, user_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
        self.check()?;
        let data = self.inner.lock().unwrap();
        Ok(data
            .user_roles
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| {
                data.roles
                    .iter()
                    .find(|(id, _)| id == rid)
                    .map(|(_, name)| name.clone())
            })
            .collect())
    }

    async fn create_user_with_roles(
        &self,
        username: &str,
        password_hash: &str,
        roles: &[String],
    ) -> Result<Option<User>, sqlx::Error> {
        self.check()?;
        let mut data = self.inner.lock().unwrap();
        if data.users.iter().any(|u| u.username == username) {
            return Ok(None);
        }
        // Resolve every role before mutating anything, so an unknown role
        // leaves no trace, same atomicity as the transactional real path.
        let mut role_ids = Vec::with_capacity(roles.len());
        for role in roles {
            match data.roles.iter().find(|(_, name)| name == role) {
                Some((id, _)) => role_ids.push(*id),
                None => return Ok(None),
            }
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
        };
        data.users.push(user.clone());
        for role_id in role_ids {
            if !data
                .user_roles
                .iter()
                .any(|(uid, rid)| *uid == user.id && *rid == role_id)
            {
                data.user_roles.push((user.id, role_id));
            }
        }
        Ok(Some(user))
    }
}
