use std::sync::Arc;

use crate::core::config::BootstrapConfig;
use crate::core::error::{AppError, Result};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::users::dtos::{CreateUserDto, UserResponseDto};
use crate::features::users::models::{CreateUser, Role};
use crate::features::users::repositories::UserRepository;
use crate::shared::types::PaginationQuery;

pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Create a user. A manager cannot create accounts above their own role.
    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        dto: CreateUserDto,
    ) -> Result<UserResponseDto> {
        ensure_can_grant(actor, dto.role)?;

        let user = self
            .users
            .create(CreateUser {
                email: normalize_email(&dto.email),
                full_name: dto.full_name.trim().to_string(),
                department: dto.department,
                role: dto.role,
            })
            .await?;

        tracing::info!(
            user_id = user.id,
            role = %user.role,
            created_by = actor.id,
            "User created"
        );

        Ok(user.into())
    }

    pub async fn get(&self, id: i64) -> Result<UserResponseDto> {
        self.users
            .find_by_id(id)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// The caller's own record
    pub async fn me(&self, actor: &AuthenticatedUser) -> Result<UserResponseDto> {
        self.get(actor.id).await
    }

    /// Change a user's role.
    ///
    /// A manager may neither grant a role above their own nor touch a user
    /// who already outranks them.
    pub async fn update_role(
        &self,
        actor: &AuthenticatedUser,
        id: i64,
        role: Role,
    ) -> Result<UserResponseDto> {
        ensure_can_grant(actor, role)?;

        let target = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        if target.role > actor.role {
            return Err(AppError::Forbidden(
                "Cannot change the role of a user who outranks you".to_string(),
            ));
        }

        let updated = self
            .users
            .update_role(id, role)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        tracing::info!(
            user_id = id,
            from = %target.role,
            to = %updated.role,
            changed_by = actor.id,
            "User role changed"
        );

        Ok(updated.into())
    }

    /// Managers and admins see everyone; users see their own department
    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: &PaginationQuery,
    ) -> Result<(Vec<UserResponseDto>, i64)> {
        let department = if actor.has_manager_access() {
            None
        } else {
            Some(actor.department.as_str())
        };

        let (users, total) = self
            .users
            .list(department, query.limit(), query.offset())
            .await?;

        Ok((users.into_iter().map(Into::into).collect(), total))
    }

    /// Create the configured admin account if it does not exist yet.
    /// Returns true when an account was created.
    pub async fn ensure_bootstrap_admin(&self, config: &BootstrapConfig) -> Result<bool> {
        let email = normalize_email(&config.admin_email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Ok(false);
        }

        let created = self
            .users
            .create(CreateUser {
                email,
                full_name: config.admin_name.clone(),
                department: config.admin_department.clone(),
                role: Role::Admin,
            })
            .await;

        match created {
            Ok(user) => {
                tracing::info!(user_id = user.id, email = %user.email, "Bootstrap admin created");
                Ok(true)
            }
            // Another instance got there first
            Err(AppError::Conflict(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn ensure_can_grant(actor: &AuthenticatedUser, role: Role) -> Result<()> {
    if role > actor.role {
        return Err(AppError::Forbidden(format!(
            "A {} cannot grant the {} role",
            actor.role, role
        )));
    }
    Ok(())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
