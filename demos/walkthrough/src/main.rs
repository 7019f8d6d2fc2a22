use std::sync::Arc;

use authgate::prelude::*;

// ---------------------------------------------------------------------------
// A scripted session against the in-process stack:
// register → login → verify → refresh → stale replay → logout → reset →
// profile update.
// ---------------------------------------------------------------------------

const LOGIN: &str = "ada@example.com";
const PASSWORD: &str = "Analyt1cal!";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AuthConfig::from_env()?;
    authgate::telemetry::init(&config.log_filter);

    let service = AuthService::builder()
        .config(config)
        .open(Arc::new(MemoryCredentialStore::new()));
    let web = Platform::new("web");
    let ios = Platform::new("ios");

    let ctx = RequestContext::generated();
    let user = service
        .register(
            &ctx,
            NewUser {
                login_name: LOGIN.into(),
                nickname: "Ada".into(),
                ..NewUser::default()
            },
            PASSWORD,
        )
        .await?;
    tracing::info!(user_id = %user.id, "registered");

    let (_, tokens) = service.login(&ctx, LOGIN, PASSWORD, &web).await?;
    let (_, ios_tokens) = service.login(&ctx, LOGIN, PASSWORD, &ios).await?;
    let verdict = service.verify(&ctx, &tokens.access_token).await?;
    tracing::info!(approved = verdict.approved, "verified web access token");

    let rotated = service.refresh(&ctx, &tokens.refresh_token).await?;
    tracing::info!(expires_in = rotated.duration, "refreshed web session");

    match service.refresh(&ctx, &tokens.refresh_token).await {
        Err(e) => tracing::info!(code = e.code(), error = %e, "stale replay rejected"),
        Ok(_) => tracing::error!("stale replay was accepted"),
    }

    service.logout(&ctx, user.id, &web).await?;
    let verdict = service.verify(&ctx, &rotated.access_token).await?;
    tracing::info!(approved = verdict.approved, "verified web token after logout");

    let grant = service.apply_password_reset(&ctx, LOGIN).await?;
    service
        .reset_password(&ctx, &grant.token, &grant.code, "Differ3nce!Engine")
        .await?;
    let verdict = service.verify(&ctx, &ios_tokens.access_token).await?;
    tracing::info!(approved = verdict.approved, "verified ios token after password reset");

    service
        .update_user_info(
            &ctx,
            user.id,
            ProfileUpdate {
                nickname: "Countess of Lovelace".into(),
                slogan: "The engine weaves algebraic patterns".into(),
                ..ProfileUpdate::default()
            },
        )
        .await?;
    let profile = service.user_info(&ctx, user.id).await?;
    tracing::info!(nickname = %profile.nickname, "profile updated");
    tracing::info!(login_name = %profile.login_name, "profile as shown to others");

    service.close().await?;
    Ok(())
}
