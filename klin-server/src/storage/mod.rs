pub mod models;
pub mod schema;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use klin_shared::auth::MemberRole;
use klin_shared::domain::{self, Recurrence};
use models::{
    Badge, Household, HouseholdMember, NewBadge, NewHousehold, NewHouseholdMember, NewSession,
    NewTask, NewTaskInstance, NewUser, NewUserBadge, NewUserPoints, NewUserStreak, Task,
    TaskInstance, User, UserBadge, UserStreak,
};
use tracing::{debug, trace};

/// How many fresh ids to try when a new household's invite code collides.
const INVITE_CODE_ATTEMPTS: usize = 8;

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A row the operation depends on does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The write collides with existing state.
    #[error("conflict: {0}")]
    Conflict(String),
}

/// Fields of a task template to insert.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub title: String,
    pub recurrence: Recurrence,
    pub due_day_of_week: Option<i32>,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

/// One member's standing in a household.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub user_name: String,
    pub points: i64,
    pub streak: i32,
    pub badges: Vec<String>,
    pub tasks_completed: i64,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        let store = Store { pool };
        store
            .with_conn(|conn| {
                const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await?;
        Ok(store)
    }

    /// Runs `f` on a pooled connection off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            f(&mut conn)
        })
        .await?
    }

    pub async fn seed_badges(&self, catalog: &[domain::Badge]) -> Result<(), StorageError> {
        use schema::badges;
        let owned = catalog.to_owned();
        self.with_conn(move |conn| {
            for b in &owned {
                let row = NewBadge {
                    id: &b.id,
                    name: &b.name,
                    emoji: &b.emoji,
                    condition: &b.condition,
                    description: b.description.as_deref(),
                };
                diesel::insert_into(badges::table)
                    .values(&row)
                    .on_conflict(badges::id)
                    .do_update()
                    .set((
                        badges::name.eq(row.name),
                        badges::emoji.eq(row.emoji),
                        badges::condition.eq(row.condition),
                        badges::description.eq(row.description),
                    ))
                    .execute(conn)?;
            }
            Ok(())
        })
        .await
    }

    // Users

    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
        timezone: &str,
    ) -> Result<User, StorageError> {
        use schema::users;
        let email = email.to_string();
        let name = name.to_string();
        let hash = password_hash.to_string();
        let tz = timezone.to_string();
        self.with_conn(move |conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let row = NewUser {
                id: &id,
                email: &email,
                name: &name,
                password_hash: &hash,
                timezone: &tz,
                created_at: Utc::now().naive_utc(),
            };
            match diesel::insert_into(users::table).values(&row).execute(conn) {
                Ok(_) => {}
                Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                    return Err(StorageError::Conflict("email already registered".into()));
                }
                Err(e) => return Err(e.into()),
            }
            Ok(users::table
                .find(&id)
                .select(User::as_select())
                .first(conn)?)
        })
        .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        use schema::users;
        let uid = user_id.to_string();
        self.with_conn(move |conn| {
            Ok(users::table
                .find(&uid)
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        use schema::users;
        let email = email.to_string();
        self.with_conn(move |conn| {
            Ok(users::table
                .filter(users::email.eq(&email))
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    // Session helpers for JWT inactivity windows

    pub async fn create_session(&self, jti_: &str, user_id_: &str) -> Result<(), StorageError> {
        use schema::sessions;
        let j = jti_.to_string();
        let u = user_id_.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now().naive_utc();
            let new = NewSession {
                jti: &j,
                user_id: &u,
                issued_at: now,
                last_used_at: now,
            };
            diesel::insert_into(sessions::table)
                .values(&new)
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    pub async fn delete_session(&self, jti_: &str) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(sessions.filter(jti.eq(&j))).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Touch session atomically, but only if it hasn't expired.
    /// Returns `true` if the session was found and updated, `false` otherwise.
    pub async fn touch_session_with_cutoff(
        &self,
        jti_: &str,
        cutoff: NaiveDateTime,
    ) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let j = jti_.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now().naive_utc();
            let updated =
                diesel::update(sessions.filter(jti.eq(&j)).filter(last_used_at.ge(cutoff)))
                    .set(last_used_at.eq(now))
                    .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    // Households

    /// Creates a household and makes `user_id` its admin.
    pub async fn create_household(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Household, StorageError> {
        use schema::{household_members, households};
        let uid = user_id.to_string();
        let name = name.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Household, StorageError> {
                for _ in 0..INVITE_CODE_ATTEMPTS {
                    let id = uuid::Uuid::new_v4().to_string();
                    let code = domain::invite_code_for(&id);
                    let taken: i64 = households::table
                        .filter(households::invite_code.eq(&code))
                        .count()
                        .get_result(conn)?;
                    if taken > 0 {
                        debug!(invite_code = %code, "invite code collision; regenerating id");
                        continue;
                    }
                    let now = Utc::now().naive_utc();
                    diesel::insert_into(households::table)
                        .values(&NewHousehold {
                            id: &id,
                            name: &name,
                            invite_code: &code,
                            created_by: &uid,
                            created_at: now,
                        })
                        .execute(conn)?;
                    diesel::insert_into(household_members::table)
                        .values(&NewHouseholdMember {
                            household_id: &id,
                            user_id: &uid,
                            role: MemberRole::Admin.as_str(),
                            joined_at: now,
                        })
                        .execute(conn)?;
                    return Ok(households::table
                        .find(&id)
                        .select(Household::as_select())
                        .first(conn)?);
                }
                Err(StorageError::Conflict(
                    "could not allocate a unique invite code".into(),
                ))
            })
        })
        .await
    }

    /// Adds `user_id` as a plain member of the household whose invite code matches.
    pub async fn join_household(
        &self,
        user_id: &str,
        invite_code: &str,
    ) -> Result<Household, StorageError> {
        use schema::{household_members, households};
        let uid = user_id.to_string();
        let code = domain::normalize_invite_code(invite_code);
        trace!(invite_code = %code, "join_household starting");
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Household, StorageError> {
                let household = households::table
                    .filter(households::invite_code.eq(&code))
                    .select(Household::as_select())
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| StorageError::InvalidInput("invalid invite code".into()))?;
                let already: i64 = household_members::table
                    .filter(household_members::household_id.eq(&household.id))
                    .filter(household_members::user_id.eq(&uid))
                    .count()
                    .get_result(conn)?;
                if already > 0 {
                    return Err(StorageError::Conflict("already a member".into()));
                }
                diesel::insert_into(household_members::table)
                    .values(&NewHouseholdMember {
                        household_id: &household.id,
                        user_id: &uid,
                        role: MemberRole::Member.as_str(),
                        joined_at: Utc::now().naive_utc(),
                    })
                    .execute(conn)?;
                Ok(household)
            })
        })
        .await
    }

    pub async fn list_households_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Household>, StorageError> {
        use schema::{household_members, households};
        let uid = user_id.to_string();
        self.with_conn(move |conn| {
            Ok(households::table
                .inner_join(household_members::table)
                .filter(household_members::user_id.eq(&uid))
                .order(households::created_at.asc())
                .select(Household::as_select())
                .load(conn)?)
        })
        .await
    }

    pub async fn get_household(&self, household_id: &str) -> Result<Option<Household>, StorageError> {
        use schema::households;
        let hid = household_id.to_string();
        self.with_conn(move |conn| {
            Ok(households::table
                .find(&hid)
                .select(Household::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn member_role(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> Result<Option<MemberRole>, StorageError> {
        use schema::household_members as hm;
        let hid = household_id.to_string();
        let uid = user_id.to_string();
        self.with_conn(move |conn| {
            let role: Option<String> = hm::table
                .filter(hm::household_id.eq(&hid))
                .filter(hm::user_id.eq(&uid))
                .select(hm::role)
                .first(conn)
                .optional()?;
            role.map(|r| r.parse::<MemberRole>().map_err(StorageError::InvalidInput))
                .transpose()
        })
        .await
    }

    pub async fn list_members(
        &self,
        household_id: &str,
    ) -> Result<Vec<(HouseholdMember, User)>, StorageError> {
        use schema::{household_members, users};
        let hid = household_id.to_string();
        self.with_conn(move |conn| {
            Ok(household_members::table
                .inner_join(users::table)
                .filter(household_members::household_id.eq(&hid))
                .order(household_members::joined_at.asc())
                .select((HouseholdMember::as_select(), User::as_select()))
                .load(conn)?)
        })
        .await
    }

    // Task templates

    pub async fn create_task(
        &self,
        household_id: &str,
        created_by: &str,
        spec: TaskSpec,
    ) -> Result<Task, StorageError> {
        use schema::tasks;
        spec.recurrence
            .validate_due_day(spec.due_day_of_week)
            .map_err(StorageError::InvalidInput)?;
        let title = spec.title.trim().to_string();
        if title.is_empty() {
            return Err(StorageError::InvalidInput("title must not be empty".into()));
        }
        let hid = household_id.to_string();
        let uid = created_by.to_string();
        self.with_conn(move |conn| {
            let id = uuid::Uuid::new_v4().to_string();
            let row = NewTask {
                id: &id,
                household_id: &hid,
                title: &title,
                description: spec.description.as_deref(),
                emoji: spec.emoji.as_deref(),
                recurrence: spec.recurrence.as_str(),
                due_day_of_week: spec.due_day_of_week,
                created_by: &uid,
                created_at: Utc::now().naive_utc(),
            };
            diesel::insert_into(tasks::table).values(&row).execute(conn)?;
            Ok(tasks::table
                .find(&id)
                .select(Task::as_select())
                .first(conn)?)
        })
        .await
    }

    /// Task templates of a household, newest first.
    pub async fn list_tasks(&self, household_id: &str) -> Result<Vec<Task>, StorageError> {
        use schema::tasks;
        let hid = household_id.to_string();
        self.with_conn(move |conn| {
            Ok(tasks::table
                .filter(tasks::household_id.eq(&hid))
                .order((tasks::created_at.desc(), tasks::id.desc()))
                .select(Task::as_select())
                .load(conn)?)
        })
        .await
    }

    /// Removes a template together with its instances. Returns `false` when nothing matched.
    pub async fn delete_task(&self, household_id: &str, task_id: &str) -> Result<bool, StorageError> {
        use schema::{task_instances, tasks};
        let hid = household_id.to_string();
        let tid = task_id.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<bool, StorageError> {
                let deleted = diesel::delete(
                    tasks::table
                        .filter(tasks::id.eq(&tid))
                        .filter(tasks::household_id.eq(&hid)),
                )
                .execute(conn)?;
                if deleted == 0 {
                    return Ok(false);
                }
                diesel::delete(task_instances::table.filter(task_instances::task_id.eq(&tid)))
                    .execute(conn)?;
                Ok(true)
            })
        })
        .await
    }

    // Task instances

    /// Materializes one dated occurrence of a template. Idempotent per (task, due date).
    pub async fn create_task_instance(
        &self,
        household_id: &str,
        task_id: &str,
        due_date: NaiveDate,
        assigned_to: Option<&str>,
    ) -> Result<TaskInstance, StorageError> {
        use schema::{household_members, task_instances, tasks};
        let hid = household_id.to_string();
        let tid = task_id.to_string();
        let assignee = assigned_to.map(|s| s.to_string());
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<TaskInstance, StorageError> {
                let task_count: i64 = tasks::table
                    .filter(tasks::id.eq(&tid))
                    .filter(tasks::household_id.eq(&hid))
                    .count()
                    .get_result(conn)?;
                if task_count == 0 {
                    return Err(StorageError::NotFound(format!("task not found: {tid}")));
                }
                if let Some(a) = assignee.as_deref() {
                    let is_member: i64 = household_members::table
                        .filter(household_members::household_id.eq(&hid))
                        .filter(household_members::user_id.eq(a))
                        .count()
                        .get_result(conn)?;
                    if is_member == 0 {
                        return Err(StorageError::InvalidInput(
                            "assignee is not a household member".into(),
                        ));
                    }
                }
                let id = uuid::Uuid::new_v4().to_string();
                diesel::insert_into(task_instances::table)
                    .values(&NewTaskInstance {
                        id: &id,
                        task_id: &tid,
                        household_id: &hid,
                        assigned_to: assignee.as_deref(),
                        due_date,
                    })
                    .on_conflict_do_nothing()
                    .execute(conn)?;
                Ok(task_instances::table
                    .filter(task_instances::task_id.eq(&tid))
                    .filter(task_instances::due_date.eq(due_date))
                    .select(TaskInstance::as_select())
                    .first(conn)?)
            })
        })
        .await
    }

    /// Instances due within `[from, to]`, earliest first.
    pub async fn list_task_instances(
        &self,
        household_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<TaskInstance>, StorageError> {
        use schema::task_instances as ti;
        if from > to {
            return Err(StorageError::InvalidInput(format!(
                "range start {from} is after end {to}"
            )));
        }
        let hid = household_id.to_string();
        self.with_conn(move |conn| {
            Ok(ti::table
                .filter(ti::household_id.eq(&hid))
                .filter(ti::due_date.ge(from))
                .filter(ti::due_date.le(to))
                .order((ti::due_date.asc(), ti::id.asc()))
                .select(TaskInstance::as_select())
                .load(conn)?)
        })
        .await
    }

    /// Marks an instance done. Only the instance row changes; points and streaks are untouched.
    pub async fn complete_task_instance(
        &self,
        household_id: &str,
        instance_id: &str,
        user_id: &str,
        photo_url: Option<&str>,
        points: i32,
    ) -> Result<TaskInstance, StorageError> {
        use schema::task_instances as ti;
        let hid = household_id.to_string();
        let iid = instance_id.to_string();
        let uid = user_id.to_string();
        let photo = photo_url.map(|s| s.to_string());
        self.with_conn(move |conn| {
            let updated = diesel::update(
                ti::table
                    .filter(ti::id.eq(&iid))
                    .filter(ti::household_id.eq(&hid)),
            )
            .set((
                ti::completed_at.eq(Some(Utc::now().naive_utc())),
                ti::completed_by.eq(Some(&uid)),
                ti::photo_url.eq(photo.as_deref()),
                ti::points_awarded.eq(Some(points)),
            ))
            .execute(conn)?;
            if updated == 0 {
                return Err(StorageError::NotFound(format!(
                    "task instance not found: {iid}"
                )));
            }
            Ok(ti::table
                .find(&iid)
                .select(TaskInstance::as_select())
                .first(conn)?)
        })
        .await
    }

    // Points ledger

    /// Total points of a user in a household; a missing row counts as zero.
    pub async fn get_points(&self, household_id: &str, user_id: &str) -> Result<i64, StorageError> {
        use schema::user_points as up;
        let hid = household_id.to_string();
        let uid = user_id.to_string();
        self.with_conn(move |conn| {
            let total: Option<i64> = up::table
                .filter(up::household_id.eq(&hid))
                .filter(up::user_id.eq(&uid))
                .select(up::total_points)
                .first(conn)
                .optional()?;
            Ok(total.unwrap_or(0))
        })
        .await
    }

    /// Adds `amount` and returns the new total. The read and the upsert share one
    /// immediate transaction, so concurrent adds serialize.
    pub async fn add_points(
        &self,
        household_id: &str,
        user_id: &str,
        amount: i64,
    ) -> Result<i64, StorageError> {
        use schema::user_points as up;
        if amount == 0 {
            return Err(StorageError::InvalidInput("amount must not be zero".into()));
        }
        let hid = household_id.to_string();
        let uid = user_id.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<i64, StorageError> {
                let current: Option<i64> = up::table
                    .filter(up::household_id.eq(&hid))
                    .filter(up::user_id.eq(&uid))
                    .select(up::total_points)
                    .first(conn)
                    .optional()?;
                // SQLite turns an overflowing integer sum into REAL
                let total = current
                    .unwrap_or(0)
                    .checked_add(amount)
                    .ok_or_else(|| StorageError::InvalidInput("points total out of range".into()))?;
                let now = Utc::now().naive_utc();
                diesel::insert_into(up::table)
                    .values(&NewUserPoints {
                        user_id: &uid,
                        household_id: &hid,
                        total_points: total,
                        last_updated_at: now,
                    })
                    .on_conflict((up::user_id, up::household_id))
                    .do_update()
                    .set((
                        up::total_points.eq(total),
                        up::last_updated_at.eq(now),
                    ))
                    .execute(conn)?;
                Ok(total)
            })
        })
        .await
    }

    // Streaks

    pub async fn get_streak(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> Result<Option<UserStreak>, StorageError> {
        let hid = household_id.to_string();
        let uid = user_id.to_string();
        self.with_conn(move |conn| Ok(load_streak(conn, &hid, &uid)?))
            .await
    }

    /// Extends an active streak, or starts a new one at 1. Returns the new count.
    pub async fn increment_streak(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> Result<i32, StorageError> {
        use schema::user_streaks as us;
        let hid = household_id.to_string();
        let uid = user_id.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<i32, StorageError> {
                let now = Utc::now().naive_utc();
                let target = us::table
                    .filter(us::household_id.eq(&hid))
                    .filter(us::user_id.eq(&uid));
                match load_streak(conn, &hid, &uid)? {
                    Some(s) if s.is_active => {
                        diesel::update(target)
                            .set((
                                us::current_streak.eq(us::current_streak + 1),
                                us::last_task_completed_at.eq(now),
                            ))
                            .execute(conn)?;
                        Ok(s.current_streak + 1)
                    }
                    Some(_) => {
                        diesel::update(target)
                            .set((
                                us::current_streak.eq(1),
                                us::last_task_completed_at.eq(now),
                                us::is_active.eq(true),
                                us::streak_started_at.eq(now),
                                us::broken_at.eq(None::<NaiveDateTime>),
                            ))
                            .execute(conn)?;
                        Ok(1)
                    }
                    None => {
                        diesel::insert_into(us::table)
                            .values(&NewUserStreak {
                                user_id: &uid,
                                household_id: &hid,
                                current_streak: 1,
                                last_task_completed_at: now,
                                is_active: true,
                                streak_started_at: now,
                            })
                            .execute(conn)?;
                        Ok(1)
                    }
                }
            })
        })
        .await
    }

    /// Deactivates an active streak, keeping its count. No-op without a row.
    pub async fn break_streak(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> Result<Option<UserStreak>, StorageError> {
        use schema::user_streaks as us;
        let hid = household_id.to_string();
        let uid = user_id.to_string();
        self.with_conn(move |conn| {
            diesel::update(
                us::table
                    .filter(us::household_id.eq(&hid))
                    .filter(us::user_id.eq(&uid))
                    .filter(us::is_active.eq(true)),
            )
            .set((
                us::is_active.eq(false),
                us::broken_at.eq(Some(Utc::now().naive_utc())),
            ))
            .execute(conn)?;
            Ok(load_streak(conn, &hid, &uid)?)
        })
        .await
    }

    // Badges

    pub async fn list_badges(&self) -> Result<Vec<Badge>, StorageError> {
        use schema::badges;
        self.with_conn(|conn| {
            Ok(badges::table
                .order(badges::id.asc())
                .select(Badge::as_select())
                .load(conn)?)
        })
        .await
    }

    pub async fn list_user_badges(
        &self,
        household_id: &str,
        user_id: &str,
    ) -> Result<Vec<UserBadge>, StorageError> {
        use schema::user_badges as ub;
        let hid = household_id.to_string();
        let uid = user_id.to_string();
        self.with_conn(move |conn| {
            Ok(ub::table
                .filter(ub::household_id.eq(&hid))
                .filter(ub::user_id.eq(&uid))
                .order(ub::earned_at.asc())
                .select(UserBadge::as_select())
                .load(conn)?)
        })
        .await
    }

    /// Awards a badge once per (user, badge). Returns `true` when a row was created.
    pub async fn award_badge(
        &self,
        household_id: &str,
        user_id: &str,
        badge_id: &str,
    ) -> Result<bool, StorageError> {
        use schema::{badges, user_badges as ub};
        let hid = household_id.to_string();
        let uid = user_id.to_string();
        let bid = badge_id.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<bool, StorageError> {
                let known: i64 = badges::table
                    .filter(badges::id.eq(&bid))
                    .count()
                    .get_result(conn)?;
                if known == 0 {
                    return Err(StorageError::NotFound(format!("unknown badge: {bid}")));
                }
                let earned: i64 = ub::table
                    .filter(ub::user_id.eq(&uid))
                    .filter(ub::badge_id.eq(&bid))
                    .count()
                    .get_result(conn)?;
                if earned > 0 {
                    return Ok(false);
                }
                let inserted = diesel::insert_into(ub::table)
                    .values(&NewUserBadge {
                        user_id: &uid,
                        household_id: &hid,
                        badge_id: &bid,
                        earned_at: Utc::now().naive_utc(),
                    })
                    .on_conflict_do_nothing()
                    .execute(conn)?;
                Ok(inserted > 0)
            })
        })
        .await
    }

    // Leaderboard

    /// Standings of every member, highest points first, ties by name.
    pub async fn leaderboard(&self, household_id: &str) -> Result<Vec<LeaderboardRow>, StorageError> {
        use diesel::dsl::count_star;
        use schema::{
            household_members as hm, task_instances as ti, user_badges as ub, user_points as up,
            user_streaks as us, users,
        };
        let hid = household_id.to_string();
        self.with_conn(move |conn| {
            let members: Vec<(String, String)> = hm::table
                .inner_join(users::table)
                .filter(hm::household_id.eq(&hid))
                .select((users::id, users::name))
                .load(conn)?;
            let points: HashMap<String, i64> = up::table
                .filter(up::household_id.eq(&hid))
                .select((up::user_id, up::total_points))
                .load::<(String, i64)>(conn)?
                .into_iter()
                .collect();
            let streaks: HashMap<String, i32> = us::table
                .filter(us::household_id.eq(&hid))
                .select((us::user_id, us::current_streak, us::is_active))
                .load::<(String, i32, bool)>(conn)?
                .into_iter()
                .map(|(u, n, active)| (u, if active { n } else { 0 }))
                .collect();
            let mut badges: HashMap<String, Vec<String>> = HashMap::new();
            for (u, b) in ub::table
                .filter(ub::household_id.eq(&hid))
                .order(ub::earned_at.asc())
                .select((ub::user_id, ub::badge_id))
                .load::<(String, String)>(conn)?
            {
                badges.entry(u).or_default().push(b);
            }
            let completed: HashMap<String, i64> = ti::table
                .filter(ti::household_id.eq(&hid))
                .filter(ti::completed_by.is_not_null())
                .group_by(ti::completed_by)
                .select((ti::completed_by, count_star()))
                .load::<(Option<String>, i64)>(conn)?
                .into_iter()
                .filter_map(|(u, n)| u.map(|u| (u, n)))
                .collect();

            let mut rows: Vec<LeaderboardRow> = members
                .into_iter()
                .map(|(user_id, user_name)| LeaderboardRow {
                    points: points.get(&user_id).copied().unwrap_or(0),
                    streak: streaks.get(&user_id).copied().unwrap_or(0),
                    badges: badges.remove(&user_id).unwrap_or_default(),
                    tasks_completed: completed.get(&user_id).copied().unwrap_or(0),
                    user_id,
                    user_name,
                })
                .collect();
            rows.sort_by(|a, b| {
                b.points
                    .cmp(&a.points)
                    .then_with(|| a.user_name.cmp(&b.user_name))
            });
            Ok(rows)
        })
        .await
    }
}

fn load_streak(
    conn: &mut SqliteConnection,
    household_id: &str,
    user_id: &str,
) -> Result<Option<UserStreak>, diesel::result::Error> {
    use schema::user_streaks as us;
    us::table
        .filter(us::household_id.eq(household_id))
        .filter(us::user_id.eq(user_id))
        .select(UserStreak::as_select())
        .first(conn)
        .optional()
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Enable WAL for better read/write concurrency and set a busy timeout
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    diesel::sql_query("PRAGMA foreign_keys=ON;").execute(conn)?;
    Ok(())
}
