//! Generation and gallery commands.

use std::path::Path;

use avatar_studio_client::flows::{
    AvatarRequestFlow, Gallery, GalleryFetchFlow, GenerationOutcome,
};

use super::{CommandError, Context};
use crate::output;

/// Print the remaining generation count.
pub async fn quota(ctx: &Context) {
    let flow = AvatarRequestFlow::new(&ctx.store, &ctx.api);
    let counter = flow.enter().await;
    output::line(
        counter
            .describe()
            .unwrap_or_else(|| "Remaining avatars unknown.".to_owned()),
    );
}

/// Generate one avatar and write it to `out`.
///
/// # Errors
///
/// Returns error if the session is not authenticated, a precondition fails,
/// the backend call fails or the image cannot be written.
pub async fn generate(ctx: &Context, prompt: &str, out: &Path) -> Result<(), CommandError> {
    ctx.require_authenticated()?;

    let flow = AvatarRequestFlow::new(&ctx.store, &ctx.api);
    if let Some(line) = flow.enter().await.describe() {
        output::line(line);
    }

    match flow.generate(prompt).await? {
        GenerationOutcome::Applied(avatar) => {
            tokio::fs::write(out, &avatar.bytes).await?;
            output::line(format_args!("Saved avatar to {}", out.display()));
            if let Some(line) = flow.quota().describe() {
                output::line(line);
            }
        }
        GenerationOutcome::Discarded => {
            tracing::debug!("Generation result discarded");
        }
    }
    flow.leave();
    Ok(())
}

/// List previous avatars, optionally writing each image to `out_dir`.
///
/// # Errors
///
/// Returns error if the session is not authenticated, the fetch fails or an
/// image cannot be written.
pub async fn gallery(ctx: &Context, out_dir: Option<&Path>) -> Result<(), CommandError> {
    ctx.require_authenticated()?;

    let gallery = GalleryFetchFlow::new(&ctx.store, &ctx.api).fetch().await?;
    let items = match &gallery {
        Gallery::Empty => {
            output::line(gallery.notice().unwrap_or_default());
            return Ok(());
        }
        Gallery::Items(items) => items,
    };

    if let Some(dir) = out_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    for (n, avatar) in items.iter().enumerate() {
        let number = n + 1;
        let when = avatar.timestamp.map_or_else(
            || "-".to_owned(),
            |t| t.format("%Y-%m-%d %H:%M UTC").to_string(),
        );
        output::line(format_args!(
            "{number}. {when} [{}] {}",
            if avatar.country.is_empty() { "-" } else { avatar.country.as_str() },
            avatar.prompt,
        ));

        let Some(dir) = out_dir else { continue };
        match avatar.image.decode() {
            Ok(bytes) => {
                let path = dir.join(format!("avatar-{number}.png"));
                tokio::fs::write(&path, bytes).await?;
                output::line(format_args!("   saved to {}", path.display()));
            }
            Err(e) => tracing::warn!(number, error = %e, "Skipping undecodable image"),
        }
    }
    Ok(())
}
