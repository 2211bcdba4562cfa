use crate::api::user_management::models::{NewUser, Role, User, UserOut};
use crate::api::user_management::password;
use crate::api::user_management::sessions::generate_token;
use crate::db::DbConn;
use crate::error::ErrorResponse;
use crate::schema;
use crate::settings::Settings;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use rocket::form::Form;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;

pub(crate) const VERIFICATION_TOKEN_LEN: usize = 50;

#[derive(FromForm)]
pub struct FormRegister {
    username: String,
    email: String,
    password: String,
    #[field(default = String::new())]
    first_name: String,
    #[field(default = String::new())]
    last_name: String,
    role: Role,
    phone_number: Option<String>,
}

/// Rejects registration input the database would accept but the
/// marketplace should not.
pub(crate) fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<(), String> {
    if username.trim().is_empty() {
        return Err("Username is required".to_string());
    }
    if !email.contains('@') {
        return Err("A valid email address is required".to_string());
    }
    if password.chars().count() < password::MIN_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            password::MIN_LENGTH
        ));
    }
    if role == Role::Admin {
        return Err("Invalid role selected".to_string());
    }
    Ok(())
}

/// Emails are stored trimmed and lowercased, and looked up the same way.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn verification_url(settings: &Settings, token: &str) -> String {
    format!(
        "{}/api/v1/verify_email/{}",
        settings.public_url.trim_end_matches('/'),
        token
    )
}

#[post("/register", data = "<form_register>")]
pub(crate) async fn register(
    form_register: Form<FormRegister>,
    conn: DbConn,
    settings: &State<Settings>,
) -> Result<Json<UserOut>, ErrorResponse> {
    let form = form_register.into_inner();

    validate_registration(&form.username, &form.email, &form.password, form.role)
        .map_err(ErrorResponse::bad_request)?;

    let plain_password = form.password.clone();
    let hashed = rocket::tokio::task::spawn_blocking(move || password::hash(&plain_password))
        .await
        .map_err(|_| ErrorResponse::new(Status { code: 500 }, "Couldn't hash password".to_string()))?
        .map_err(|err| {
            ErrorResponse::new(
                Status { code: 500 },
                format!("Couldn't hash password: {}", err),
            )
        })?;

    let token = generate_token(VERIFICATION_TOKEN_LEN);
    let new_user = NewUser {
        username: form.username.trim().to_string(),
        email: normalize_email(&form.email),
        password_hash: hashed,
        first_name: form.first_name,
        last_name: form.last_name,
        role: form.role.as_str().to_string(),
        phone_number: form.phone_number.filter(|phone| !phone.is_empty()),
        is_staff: false,
        is_email_verified: false,
        email_verification_token: Some(token.clone()),
    };

    let user = conn
        .run(move |c| {
            use schema::users::dsl::*;
            diesel::insert_into(users)
                .values(&new_user)
                .get_result::<User>(c)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        ErrorResponse::new(
                            Status { code: 409 },
                            "Username or email already registered".to_string(),
                        )
                    }
                    err => ErrorResponse::new(
                        Status { code: 500 },
                        format!("Couldn't create user: {}", err),
                    ),
                })
        })
        .await?;

    tracing::info!(
        user_id = user.id,
        verification_url = %verification_url(settings, &token),
        "registered user, email verification pending"
    );

    Ok(Json(UserOut::from(user)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_compared_case_insensitively() {
        assert_eq!(normalize_email(" Bob@Example.com "), "bob@example.com");
        assert_eq!(normalize_email("BOB@EXAMPLE.COM"), normalize_email("bob@example.com"));
    }

    #[test]
    fn registration_requires_sane_fields() {
        assert!(validate_registration("gamer", "gamer@example.com", "longenough", Role::Customer).is_ok());
        assert!(validate_registration("  ", "gamer@example.com", "longenough", Role::Customer).is_err());
        assert!(validate_registration("gamer", "gamer.example.com", "longenough", Role::Vendor).is_err());
        assert_eq!(
            validate_registration("gamer", "gamer@example.com", "short", Role::Vendor),
            Err("Password must be at least 8 characters".to_string())
        );
    }

    #[test]
    fn admin_role_cannot_be_registered() {
        assert_eq!(
            validate_registration("gamer", "gamer@example.com", "longenough", Role::Admin),
            Err("Invalid role selected".to_string())
        );
    }
}
