//! Seeding of the database roles and login users behind the three role names.
//!
//! Statements run one by one in autocommit mode on a single session, so an
//! ignored duplicate does not poison the statements after it.

use sqlx::{PgConnection, PgPool};
use tracing::{info, warn};

use crate::access::Role;
use crate::error::{DUPLICATE_OBJECT, TableResult, has_sqlstate};
use crate::ident::{Ident, quote_ident};

/// Run a `CREATE ROLE`/`CREATE USER`, treating "already exists" as success.
/// Returns whether the object was created.
async fn create_if_missing(conn: &mut PgConnection, sql: &str, object: &str) -> TableResult<bool> {
    match sqlx::query(sql).execute(conn).await {
        Ok(_) => Ok(true),
        Err(e) if has_sqlstate(&e, DUPLICATE_OBJECT) => {
            warn!(object, "already exists, skipping");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

async fn seed_roles_on(conn: &mut PgConnection) -> TableResult<()> {
    for role in Role::ALL {
        let sql = format!("CREATE ROLE {} WITH LOGIN", quote_ident(role.as_str()));
        create_if_missing(conn, &sql, role.as_str()).await?;
    }
    Ok(())
}

async fn create_user_on(conn: &mut PgConnection, username: &Ident, role: Role) -> TableResult<String> {
    let sql = format!("CREATE USER {} WITH LOGIN", username.quoted());
    create_if_missing(conn, &sql, username.as_str()).await?;

    // A role trivially holds itself; granting it to itself is an error.
    if username.as_str() != role.as_str() {
        let sql = format!(
            "GRANT {} TO {}",
            quote_ident(role.as_str()),
            username.quoted()
        );
        sqlx::query(&sql).execute(&mut *conn).await?;
    }
    info!(username = %username, role = %role, "user provisioned");
    Ok(format!("User {username} created and granted role {role}"))
}

pub async fn seed_roles(pool: &PgPool) -> TableResult<String> {
    let mut session = pool.acquire().await?;
    seed_roles_on(&mut session).await?;
    Ok("Roles created successfully".into())
}

pub async fn create_user(pool: &PgPool, username: &str, role: &str) -> TableResult<String> {
    let username = Ident::parse(username)?;
    let role: Role = role.parse()?;
    let mut session = pool.acquire().await?;
    create_user_on(&mut session, &username, role).await
}

/// Seed the roles, then one login user per role, named after the role.
pub async fn init_system(pool: &PgPool) -> TableResult<Vec<String>> {
    let mut session = pool.acquire().await?;
    seed_roles_on(&mut session).await?;

    let mut details = Vec::with_capacity(Role::ALL.len());
    for role in Role::ALL {
        let username = Ident::parse(role.as_str())?;
        details.push(create_user_on(&mut session, &username, role).await?);
    }
    Ok(details)
}
