//! First-run seeding of an operator account.

use npuwatch_db::models::user::CreateUser;
use npuwatch_db::repositories::UserRepo;
use npuwatch_db::DbPool;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Create the default admin when no user exists. Returns whether one was
/// created.
pub async fn ensure_default_admin(pool: &DbPool) -> AppResult<bool> {
    if UserRepo::count(pool).await? > 0 {
        return Ok(false);
    }

    let password_hash = hash_password(DEFAULT_ADMIN_PASSWORD)
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {e}")))?;
    let user = UserRepo::create(
        pool,
        &CreateUser {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password_hash,
        },
    )
    .await?;

    tracing::warn!(
        user_id = user.id,
        username = %user.username,
        "Created default admin user; change its password"
    );
    Ok(true)
}
