//! SeaORM implementation of UserRepository

use async_trait::async_trait;
use log::debug;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};

use crate::domain::user::{PaymentMethod, Role, RoleSet, User, UserRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::user;

pub struct SeaOrmUserRepository {
    db: DatabaseConnection,
}

impl SeaOrmUserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(crate) fn model_to_domain(m: user::Model) -> User {
    User {
        id: m.id,
        email: m.email,
        password_hash: m.password_hash,
        first_name: m.first_name,
        last_name: m.last_name,
        university_id: m.university_id,
        phone: m.phone,
        photo_url: m.photo_url,
        roles: RoleSet::decode(&m.roles),
        active_role: Role::parse(&m.active_role).unwrap_or(Role::Passenger),
        active_vehicle_id: m.active_vehicle_id,
        emergency_contact: m.emergency_contact,
        preferred_payment_method: PaymentMethod::parse(&m.preferred_payment_method)
            .unwrap_or(PaymentMethod::Cash),
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn domain_to_active(u: User) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(u.id),
        email: Set(u.email),
        password_hash: Set(u.password_hash),
        first_name: Set(u.first_name),
        last_name: Set(u.last_name),
        university_id: Set(u.university_id),
        phone: Set(u.phone),
        photo_url: Set(u.photo_url),
        roles: Set(u.roles.encode()),
        active_role: Set(u.active_role.as_str().to_string()),
        active_vehicle_id: Set(u.active_vehicle_id),
        emergency_contact: Set(u.emergency_contact),
        preferred_payment_method: Set(u.preferred_payment_method.as_str().to_string()),
        created_at: Set(u.created_at),
        updated_at: Set(u.updated_at),
    }
}

pub(crate) fn db_err(e: DbErr) -> DomainError {
    match &e {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
            DomainError::Unavailable("DATABASE_UNAVAILABLE".into())
        }
        _ => DomainError::internal(format!("database error: {}", e)),
    }
}

/// Map a unique-key violation onto its stable conflict code.
fn insert_err(e: DbErr) -> DomainError {
    let text = e.to_string();
    if text.contains("users.email") {
        DomainError::conflict("DUPLICATE_EMAIL")
    } else if text.contains("users.university_id") {
        DomainError::conflict("DUPLICATE_UNIVERSITY_ID")
    } else {
        db_err(e)
    }
}

// ── UserRepository impl ─────────────────────────────────────────

#[async_trait]
impl UserRepository for SeaOrmUserRepository {
    async fn insert(&self, u: User) -> DomainResult<()> {
        debug!("Inserting user: {}", u.email);
        domain_to_active(u)
            .insert(&self.db)
            .await
            .map_err(insert_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_ids(&self, ids: &[String]) -> DomainResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let models = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().cloned()))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update(&self, u: User) -> DomainResult<()> {
        debug!("Updating user: {}", u.id);
        let existing = user::Entity::find_by_id(&u.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("User", "id", u.id));
        }
        domain_to_active(u).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_password(&self, user_id: &str, password_hash: &str) -> DomainResult<()> {
        let existing = user::Entity::find_by_id(user_id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        let Some(existing) = existing else {
            return Err(DomainError::not_found("User", "id", user_id));
        };

        let mut active: user::ActiveModel = existing.into();
        active.password_hash = Set(password_hash.to_string());
        active.updated_at = Set(chrono::Utc::now());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        user::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
