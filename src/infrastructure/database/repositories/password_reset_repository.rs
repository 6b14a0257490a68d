//! SeaORM implementation of PasswordResetRepository

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::domain::password_reset::{PasswordReset, PasswordResetRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{password_reset, user};

use super::user_repository::db_err;

pub struct SeaOrmPasswordResetRepository {
    db: DatabaseConnection,
}

impl SeaOrmPasswordResetRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: password_reset::Model) -> PasswordReset {
    PasswordReset {
        id: m.id,
        user_id: m.user_id,
        token_hash: m.token_hash,
        expires_at: m.expires_at,
        used: m.used,
        created_at: m.created_at,
    }
}

#[async_trait]
impl PasswordResetRepository for SeaOrmPasswordResetRepository {
    async fn issue(&self, reset: PasswordReset) -> DomainResult<()> {
        debug!("Issuing password reset for user {}", reset.user_id);
        let txn = self.db.begin().await.map_err(db_err)?;

        // At most one live token per user.
        password_reset::Entity::update_many()
            .col_expr(password_reset::Column::Used, Expr::value(true))
            .filter(password_reset::Column::UserId.eq(&reset.user_id))
            .filter(password_reset::Column::Used.eq(false))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        password_reset::ActiveModel {
            id: Set(reset.id),
            user_id: Set(reset.user_id),
            token_hash: Set(reset.token_hash),
            expires_at: Set(reset.expires_at),
            used: Set(reset.used),
            created_at: Set(reset.created_at),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> DomainResult<Option<PasswordReset>> {
        let model = password_reset::Entity::find()
            .filter(password_reset::Column::TokenHash.eq(token_hash))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn redeem(&self, token_id: &str, new_password_hash: &str) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let token = password_reset::Entity::find_by_id(token_id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("PasswordReset", "id", token_id))?;

        // Conditional on `used = false` so a double redemption loses.
        let consumed = password_reset::Entity::update_many()
            .col_expr(password_reset::Column::Used, Expr::value(true))
            .filter(password_reset::Column::Id.eq(token_id))
            .filter(password_reset::Column::Used.eq(false))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if consumed.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::precondition("TOKEN_INVALID_OR_EXPIRED"));
        }

        let updated = user::Entity::update_many()
            .col_expr(
                user::Column::PasswordHash,
                Expr::value(new_password_hash),
            )
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(&token.user_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if updated.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::not_found("User", "id", token.user_id));
        }

        txn.commit().await.map_err(db_err)?;
        debug!("Password reset {} redeemed", token_id);
        Ok(())
    }
}
