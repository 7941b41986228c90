//! Registration and session commands.

use avatar_studio_client::flows::{LoginFlow, ProfileForm, ProfileSubmissionFlow, RemoteSync};
use avatar_studio_client::session::SessionStore;
use avatar_studio_core::{AgeRange, Ethnicity, Gender, Profile};
use secrecy::SecretString;

use super::{CommandError, Context, clear_sentry_user, set_sentry_user};
use crate::output;

/// Registration form as collected from the command line.
pub struct RegisterInput {
    pub user_id: String,
    pub password: SecretString,
    pub country_of_origin: String,
    /// Falls back to the detected country.
    pub country_of_occupation: Option<String>,
    pub age: Vec<AgeRange>,
    pub gender: Option<Gender>,
    pub ethnicity: Option<Ethnicity>,
    pub occupation: String,
    pub languages: Vec<String>,
}

/// Submit the profile form.
///
/// # Errors
///
/// Returns error if validation or the local save fails. A failed remote save
/// is reported but does not fail the command.
pub async fn register(ctx: &Context, input: RegisterInput) -> Result<(), CommandError> {
    let country_of_occupation = input
        .country_of_occupation
        .or_else(|| ctx.store.load().location.country)
        .unwrap_or_default();

    let form = ProfileForm {
        user_id: input.user_id,
        password: input.password,
        profile: Profile {
            country_of_origin: input.country_of_origin,
            country_of_occupation,
            age_ranges: input.age.into_iter().collect(),
            gender: input.gender,
            ethnicity: input.ethnicity,
            occupation: input.occupation,
            languages: input.languages.into_iter().collect(),
        },
    };

    let flow = ProfileSubmissionFlow::new(&ctx.store, &ctx.api, &ctx.verifier);
    let submission = flow.submit(form).await?;
    set_sentry_user(&submission.user_id);

    output::line(format_args!("Profile saved. Logged in as {}.", submission.user_id));
    if let RemoteSync::Failed(e) = &submission.remote {
        output::error(format_args!("The server could not store your profile: {e}"));
    }
    Ok(())
}

/// # Errors
///
/// Returns `FlowError::InvalidCredentials` if the credentials do not match.
pub fn login(ctx: &Context, user_id: &str, password: &SecretString) -> Result<(), CommandError> {
    LoginFlow::new(&ctx.store, &ctx.verifier).login(user_id, password)?;
    if let Some(user_id) = ctx.store.load().user_id() {
        set_sentry_user(user_id);
        output::line(format_args!("Logged in as {user_id}."));
    }
    Ok(())
}

/// # Errors
///
/// Returns error if the session file cannot be removed.
pub fn logout(ctx: &Context) -> Result<(), CommandError> {
    LoginFlow::new(&ctx.store, &ctx.verifier).logout()?;
    clear_sentry_user();
    output::line("Logged out.");
    Ok(())
}

/// # Errors
///
/// Returns `FlowError::InvalidCredentials` if `user_id` is not the stored one.
pub fn reset_password(
    ctx: &Context,
    user_id: &str,
    password: &SecretString,
) -> Result<(), CommandError> {
    LoginFlow::new(&ctx.store, &ctx.verifier).reset_password(user_id, password)?;
    output::line("Password reset successful.");
    Ok(())
}

/// Print the stored session.
pub fn status(ctx: &Context) {
    let snapshot = ctx.store.load();

    output::line(format_args!("Session: {}", snapshot.state()));
    match snapshot.user_id() {
        Some(user_id) => output::line(format_args!("User: {user_id}")),
        None => output::line("User: (none)"),
    }

    let profile = &snapshot.profile;
    let or_dash = |s: &str| if s.is_empty() { "-".to_owned() } else { s.to_owned() };
    output::line(format_args!(
        "Country of origin: {}",
        or_dash(&profile.country_of_origin)
    ));
    output::line(format_args!(
        "Country of occupation: {}",
        or_dash(&profile.country_of_occupation)
    ));
    output::line(format_args!("Age: {}", or_dash(&profile.age_labels().join(", "))));
    output::line(format_args!(
        "Gender: {}",
        profile.gender.map_or("-", |g| g.as_str())
    ));
    output::line(format_args!(
        "Ethnicity: {}",
        profile.ethnicity.map_or("-", |e| e.as_str())
    ));
    output::line(format_args!("Occupation: {}", or_dash(&profile.occupation)));
    output::line(format_args!(
        "Languages: {}",
        or_dash(&profile.languages.iter().cloned().collect::<Vec<_>>().join(", "))
    ));
    output::line(format_args!(
        "Detected country: {}",
        snapshot.location.country.as_deref().unwrap_or("-")
    ));

    let missing = profile.missing_for_generation();
    if snapshot.state().is_authenticated() && !missing.is_empty() {
        output::line(format_args!(
            "Profile incomplete for generation, missing: {}",
            missing.join(", ")
        ));
    }
}
