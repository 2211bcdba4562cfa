use crate::api::user_management::models::{GamingExperience, Role, User, UserLoggedIn, UserOut, UserProfile};
use crate::db::DbConn;
use crate::error::{db_error, ErrorResponse};
use crate::schema;
use crate::schema::{user_profiles, users};
use chrono::Utc;
use diesel::prelude::*;
use rocket::form::Form;
use rocket::serde::json::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct ProfileOut {
    pub user: UserOut,
    pub profile: UserProfile,
}

#[derive(FromForm)]
pub struct FormProfile {
    first_name: Option<String>,
    last_name: Option<String>,
    phone_number: Option<String>,
    bio: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    gaming_experience: Option<GamingExperience>,
    favorite_genres: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = users)]
struct UserChanges {
    first_name: Option<String>,
    last_name: Option<String>,
    phone_number: Option<String>,
}

#[derive(AsChangeset)]
#[diesel(table_name = user_profiles)]
struct ProfileChanges {
    bio: Option<String>,
    city: Option<String>,
    state: Option<String>,
    country: Option<String>,
    gaming_experience: Option<String>,
    favorite_genres: Option<String>,
    updated_at: chrono::NaiveDateTime,
}

impl UserChanges {
    fn is_empty(&self) -> bool {
        self.first_name.is_none() && self.last_name.is_none() && self.phone_number.is_none()
    }
}

#[derive(FromForm)]
pub struct FormRole {
    role: Role,
}

/// Loads the profile of `uid`, creating the default one on first access.
pub(crate) fn profile_for(uid: i32, c: &mut PgConnection) -> QueryResult<UserProfile> {
    use schema::user_profiles::dsl::*;

    diesel::insert_into(user_profiles)
        .values(user_id.eq(uid))
        .on_conflict(user_id)
        .do_nothing()
        .execute(c)?;

    user_profiles.filter(user_id.eq(uid)).first::<UserProfile>(c)
}

#[get("/profile")]
pub(crate) async fn get_profile(user: UserLoggedIn, conn: DbConn) -> Result<Json<ProfileOut>, ErrorResponse> {
    let uid = user.0.id;
    let profile = conn
        .run(move |c| profile_for(uid, c).map_err(db_error("profile")))
        .await?;

    Ok(Json(ProfileOut {
        user: user.0,
        profile,
    }))
}

#[post("/profile", data = "<form_profile>")]
pub(crate) async fn update_profile(
    user: UserLoggedIn,
    form_profile: Form<FormProfile>,
    conn: DbConn,
) -> Result<Json<ProfileOut>, ErrorResponse> {
    let form = form_profile.into_inner();
    let uid = user.0.id;

    let user_changes = UserChanges {
        first_name: form.first_name,
        last_name: form.last_name,
        phone_number: form.phone_number,
    };
    let profile_changes = ProfileChanges {
        bio: form.bio,
        city: form.city,
        state: form.state,
        country: form.country,
        gaming_experience: form.gaming_experience.map(|exp| exp.as_str().to_string()),
        favorite_genres: form.favorite_genres,
        updated_at: Utc::now().naive_utc(),
    };

    let (user, profile) = conn
        .run(move |c| {
            c.transaction::<_, diesel::result::Error, _>(|c| {
                let user = if user_changes.is_empty() {
                    users::table.find(uid).first::<User>(c)?
                } else {
                    diesel::update(users::table.find(uid))
                        .set(&user_changes)
                        .get_result::<User>(c)?
                };

                profile_for(uid, c)?;
                let profile = diesel::update(user_profiles::table.filter(user_profiles::user_id.eq(uid)))
                    .set(&profile_changes)
                    .get_result::<UserProfile>(c)?;

                Ok((user, profile))
            })
            .map_err(db_error("profile"))
        })
        .await?;

    tracing::info!(user_id = uid, "profile updated");

    Ok(Json(ProfileOut {
        user: UserOut::from(user),
        profile,
    }))
}

#[post("/switch_role", data = "<form_role>")]
pub(crate) async fn switch_role(
    user: UserLoggedIn,
    form_role: Form<FormRole>,
    conn: DbConn,
) -> Result<Json<UserOut>, ErrorResponse> {
    let new_role = form_role.role;
    if new_role == Role::Admin {
        return Err(ErrorResponse::bad_request("Invalid role selected"));
    }

    let uid = user.0.id;
    let user = conn
        .run(move |c| {
            use schema::users::dsl::*;
            diesel::update(users.find(uid))
                .set(role.eq(new_role.as_str()))
                .get_result::<User>(c)
                .map_err(db_error("user"))
        })
        .await?;

    tracing::info!(user_id = uid, role = %new_role, "role switched");

    Ok(Json(UserOut::from(user)))
}
