use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::fairing;
use rocket::{Build, Rocket};
use rocket_sync_db_pools::database;

use crate::api::user_management::models::{NewUser, Role};
use crate::api::user_management::password;
use crate::schema;
use crate::settings::Settings;

#[database("gamezone")]
pub struct DbConn(diesel::PgConnection);

pub(crate) const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub(crate) async fn run_db_migrations(rocket: Rocket<Build>) -> fairing::Result {
    let Some(conn) = DbConn::get_one(&rocket).await else {
        tracing::error!("no database connection for migrations");
        return Err(rocket);
    };

    let applied = conn
        .run(|c| {
            c.run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.len())
                .map_err(|err| err.to_string())
        })
        .await;

    match applied {
        Ok(count) => {
            tracing::info!(count, "database migrations applied");
            Ok(rocket)
        }
        Err(err) => {
            tracing::error!(%err, "couldn't run database migrations");
            Err(rocket)
        }
    }
}

/// Creates the configured administrator, or promotes an existing account
/// with the same email.
pub(crate) async fn bootstrap_admin(rocket: Rocket<Build>) -> Rocket<Build> {
    let Some(settings) = rocket.state::<Settings>().cloned() else {
        return rocket;
    };
    let (Some(admin_email), Some(admin_password)) =
        (settings.admin_email.clone(), settings.admin_password.clone())
    else {
        return rocket;
    };
    let admin_username = settings
        .admin_username
        .clone()
        .unwrap_or_else(|| "admin".to_string());

    let admin_hash = match password::hash(&admin_password) {
        Ok(hash) => hash,
        Err(err) => {
            tracing::error!(%err, "couldn't hash bootstrap admin password");
            return rocket;
        }
    };

    let Some(conn) = DbConn::get_one(&rocket).await else {
        tracing::error!("no database connection for admin bootstrap");
        return rocket;
    };

    let result = conn
        .run(move |c| {
            use schema::users::dsl::*;

            let promoted = diesel::update(users.filter(email.eq(&admin_email)))
                .set((
                    role.eq(Role::Admin.as_str()),
                    is_staff.eq(true),
                    is_active.eq(true),
                    is_email_verified.eq(true),
                ))
                .execute(c)?;

            if promoted == 0 {
                let admin = NewUser {
                    username: admin_username,
                    email: admin_email,
                    password_hash: admin_hash,
                    first_name: "Admin".to_string(),
                    last_name: "User".to_string(),
                    role: Role::Admin.as_str().to_string(),
                    phone_number: None,
                    is_staff: true,
                    is_email_verified: true,
                    email_verification_token: None,
                };
                diesel::insert_into(users).values(&admin).execute(c)?;
                return Ok::<_, diesel::result::Error>(true);
            }

            Ok(false)
        })
        .await;

    match result {
        Ok(true) => tracing::info!("created bootstrap admin account"),
        Ok(false) => tracing::info!("bootstrap admin account already present"),
        Err(err) => tracing::error!(%err, "couldn't bootstrap admin account"),
    }

    rocket
}
